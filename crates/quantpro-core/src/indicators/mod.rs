//! Indicator calculator.
//!
//! [`annotate`] consumes a [`BarSeries`] and returns an [`IndicatedSeries`]
//! holding the original bars plus one derived column per indicator. All
//! windows are trailing. VWAP is cumulative from the first loaded bar, so it
//! depends on how far back the fetch reached. The "52-week" range is a
//! 252-row window regardless of interval.

pub mod rolling;

use serde::Serialize;

use crate::config::IndicatorSet;
use crate::{Bar, BarSeries, Interval, Symbol, UtcDateTime};

pub const RSI_PERIOD: usize = 14;
pub const EMA_SPAN: usize = 20;
pub const SMA_FAST: usize = 50;
pub const SMA_SLOW: usize = 200;
pub const YEAR_ROWS: usize = 252;
pub const AVG_VOLUME_ROWS: usize = 20;

/// Bars plus derived columns, one entry per bar in every column.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatedSeries {
    pub symbol: Symbol,
    pub interval: Interval,
    bars: Vec<Bar>,
    pub rsi14: Vec<Option<f64>>,
    pub ema20: Vec<f64>,
    pub sma50: Vec<Option<f64>>,
    pub sma200: Option<Vec<Option<f64>>>,
    pub vwap: Vec<Option<f64>>,
    pub high_52w: Vec<f64>,
    pub low_52w: Vec<f64>,
    pub pct_change: Vec<Option<f64>>,
    pub avg_volume_20: Option<Vec<Option<f64>>>,
}

/// One row of an [`IndicatedSeries`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatedRow {
    pub ts: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub rsi14: Option<f64>,
    pub ema20: f64,
    pub sma50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma200: Option<f64>,
    pub vwap: Option<f64>,
    pub high_52w: f64,
    pub low_52w: f64,
    pub pct_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_volume_20: Option<f64>,
}

/// Annotates with the base indicator set.
pub fn annotate(series: BarSeries) -> IndicatedSeries {
    annotate_with(series, IndicatorSet::base())
}

/// Annotates with the base set plus whatever `set` enables.
pub fn annotate_with(series: BarSeries, set: IndicatorSet) -> IndicatedSeries {
    let symbol = series.symbol.clone();
    let interval = series.interval;
    let bars = series.into_bars();

    let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
    let highs: Vec<f64> = bars.iter().map(|bar| bar.high).collect();
    let lows: Vec<f64> = bars.iter().map(|bar| bar.low).collect();

    let avg_volume_20 = set.avg_volume_20.then(|| {
        let volumes: Vec<f64> = bars.iter().map(|bar| bar.volume as f64).collect();
        rolling::sma(&volumes, AVG_VOLUME_ROWS)
    });

    IndicatedSeries {
        symbol,
        interval,
        rsi14: rolling::rsi(&closes, RSI_PERIOD),
        ema20: rolling::ema(&closes, EMA_SPAN),
        sma50: rolling::sma(&closes, SMA_FAST),
        sma200: set.sma200.then(|| rolling::sma(&closes, SMA_SLOW)),
        vwap: rolling::cumulative_vwap(&bars),
        high_52w: rolling::rolling_max(&highs, YEAR_ROWS),
        low_52w: rolling::rolling_min(&lows, YEAR_ROWS),
        pct_change: rolling::pct_change(&closes),
        avg_volume_20,
        bars,
    }
}

impl IndicatedSeries {
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<IndicatedRow> {
        let bar = self.bars.get(i)?;
        Some(IndicatedRow {
            ts: bar.ts,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
            rsi14: self.rsi14[i],
            ema20: self.ema20[i],
            sma50: self.sma50[i],
            sma200: self.sma200.as_ref().and_then(|column| column[i]),
            vwap: self.vwap[i],
            high_52w: self.high_52w[i],
            low_52w: self.low_52w[i],
            pct_change: self.pct_change[i],
            avg_volume_20: self.avg_volume_20.as_ref().and_then(|column| column[i]),
        })
    }

    pub fn last_row(&self) -> Option<IndicatedRow> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }

    /// Rows in chronological order.
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = IndicatedRow> + '_ {
        (0..self.len()).filter_map(|i| self.row(i))
    }
}
