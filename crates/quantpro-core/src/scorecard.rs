//! Read-only projections of an [`IndicatedSeries`] for presentation.

use serde::Serialize;

use crate::config::SignalThresholds;
use crate::indicators::{IndicatedRow, IndicatedSeries};
use crate::signal::{Action, Zone};
use crate::{Interval, ResolvedSymbol, UtcDateTime};

/// Snapshot of the newest bar and its indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scorecard {
    pub symbol: ResolvedSymbol,
    pub interval: Interval,
    pub as_of: UtcDateTime,
    pub ltp: f64,
    pub change_pct: Option<f64>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub vwap: Option<f64>,
    pub ema20: f64,
    pub sma50: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sma200: Option<f64>,
    pub high_52w: f64,
    pub low_52w: f64,
    pub volume: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_volume_20: Option<f64>,
    pub rsi: Option<f64>,
    pub zone: Zone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl Scorecard {
    /// `None` for an empty series.
    pub fn from_series(
        series: &IndicatedSeries,
        symbol: &ResolvedSymbol,
        thresholds: &SignalThresholds,
    ) -> Option<Self> {
        let last = series.last_row()?;
        Some(Self {
            symbol: symbol.clone(),
            interval: series.interval,
            as_of: last.ts,
            ltp: last.close,
            change_pct: last.pct_change,
            open: last.open,
            high: last.high,
            low: last.low,
            vwap: last.vwap,
            ema20: last.ema20,
            sma50: last.sma50,
            sma200: last.sma200,
            high_52w: last.high_52w,
            low_52w: last.low_52w,
            volume: last.volume,
            avg_volume_20: last.avg_volume_20,
            rsi: last.rsi14,
            zone: Zone::classify(last.rsi14, thresholds),
            action: Action::classify(last.rsi14, thresholds),
        })
    }
}

/// Newest-first rows, at most `limit` of them.
pub fn audit_log(series: &IndicatedSeries, limit: usize) -> Vec<IndicatedRow> {
    series.rows().rev().take(limit).collect()
}

/// Plots the most recent `width` RSI values on a 0..=100 grid `height` lines
/// tall, top line first. Lines holding the oversold/overbought levels carry a
/// label and a dashed guide; undefined RSI leaves its column blank.
pub fn rsi_chart(
    series: &IndicatedSeries,
    width: usize,
    height: usize,
    thresholds: &SignalThresholds,
) -> Vec<String> {
    let height = height.max(2);
    let start = series.rsi14.len().saturating_sub(width);
    let window = &series.rsi14[start..];

    let line_of = |value: f64| -> usize {
        let clamped = value.clamp(0.0, 100.0);
        ((100.0 - clamped) / 100.0 * (height - 1) as f64).round() as usize
    };
    let overbought_line = line_of(thresholds.overbought);
    let oversold_line = line_of(thresholds.oversold);
    let points: Vec<Option<usize>> = window.iter().map(|value| value.map(line_of)).collect();

    (0..height)
        .map(|line| {
            let (label, guide) = if line == overbought_line {
                (format!("{:>3.0} ┤", thresholds.overbought), '-')
            } else if line == oversold_line {
                (format!("{:>3.0} ┤", thresholds.oversold), '-')
            } else if line == 0 {
                (String::from("100 ┤"), ' ')
            } else if line == height - 1 {
                (String::from("  0 ┤"), ' ')
            } else {
                (String::from("    │"), ' ')
            };

            let cells: String = points
                .iter()
                .map(|point| match point {
                    Some(row) if *row == line => '●',
                    _ => guide,
                })
                .collect();
            format!("{label}{cells}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndicatorSet;
    use crate::indicators::annotate_with;
    use crate::{Bar, BarSeries, Symbol};

    fn indicated(closes: &[f64], set: IndicatorSet) -> IndicatedSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, close)| {
                let ts = UtcDateTime::from_unix_seconds(1_700_000_000 + i as i64 * 900)
                    .expect("timestamp");
                Bar::new(ts, *close, close + 0.5, close - 0.5, *close, 10 + i as u64).expect("bar")
            })
            .collect();
        let series = BarSeries::new(
            Symbol::parse("IRFC.NS").expect("symbol"),
            Interval::FifteenMinutes,
            bars,
        )
        .expect("series");
        annotate_with(series, set)
    }

    fn resolved() -> ResolvedSymbol {
        ResolvedSymbol::new(Symbol::parse("IRFC.NS").expect("symbol"))
    }

    #[test]
    fn scorecard_reflects_the_last_row() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let series = indicated(&closes, IndicatorSet::extended());
        let card = Scorecard::from_series(&series, &resolved(), &SignalThresholds::with_actions())
            .expect("non-empty");

        assert_eq!(card.ltp, 129.0);
        assert_eq!(card.volume, 39);
        assert_eq!(card.rsi, Some(100.0));
        assert_eq!(card.zone, Zone::Overbought);
        assert_eq!(card.action, Some(Action::Sell));
        assert!(card.avg_volume_20.is_some());
        assert!(card.sma200.is_none());
        let change = card.change_pct.expect("two rows");
        assert!((change - 100.0 / 128.0).abs() < 1e-9);
    }

    #[test]
    fn scorecard_of_empty_series_is_none() {
        let series = indicated(&[], IndicatorSet::base());
        assert!(Scorecard::from_series(&series, &resolved(), &SignalThresholds::zones_only()).is_none());
    }

    #[test]
    fn audit_log_is_newest_first_and_bounded() {
        let closes: Vec<f64> = (0..10).map(|i| 50.0 + i as f64).collect();
        let series = indicated(&closes, IndicatorSet::base());

        let log = audit_log(&series, 3);
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].close, 59.0);
        assert_eq!(log[2].close, 57.0);
        assert_eq!(audit_log(&series, 200).len(), 10);
    }

    #[test]
    fn rsi_chart_draws_guides_and_points() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let series = indicated(&closes, IndicatorSet::base());
        let lines = rsi_chart(&series, 10, 11, &SignalThresholds::zones_only());

        assert_eq!(lines.len(), 11);
        assert!(lines[3].starts_with(" 70 ┤"));
        assert!(lines[7].starts_with(" 30 ┤"));
        // RSI is 100 for every defined column in the window.
        assert_eq!(lines[0].chars().filter(|ch| *ch == '●').count(), 7);
        assert!(lines[3].ends_with('-'));
    }
}
