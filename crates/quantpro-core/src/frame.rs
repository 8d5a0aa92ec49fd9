//! Provider-shaped price frames and their recovery into a clean [`BarSeries`].
//!
//! Providers do not agree on a schema. Column headers may come back with one
//! level (`Close`) or several (`Close` × `RELIANCE.NS`, or the reverse order),
//! field names vary in case and spacing (`Adj Close`, `adjclose`), and the
//! index may be epoch seconds, epoch milliseconds or date strings. Everything
//! downstream of this module sees flat field names and ascending UTC
//! timestamps only.

use tracing::{debug, warn};

use crate::{Bar, BarSeries, FrameError, Interval, Symbol, UtcDateTime, ValidationError};

/// Raw index value as delivered by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTimestamp {
    UnixSeconds(i64),
    UnixMillis(i64),
    Text(String),
}

impl RawTimestamp {
    pub fn to_utc(&self) -> Result<UtcDateTime, ValidationError> {
        match self {
            Self::UnixSeconds(seconds) => UtcDateTime::from_unix_seconds(*seconds),
            Self::UnixMillis(millis) => UtcDateTime::from_unix_seconds(millis.div_euclid(1_000)),
            Self::Text(text) => UtcDateTime::parse_lenient(text),
        }
    }
}

/// One provider column; `key` holds every header level, outermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub key: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl RawColumn {
    pub fn new<S: AsRef<str>>(key: &[S], values: Vec<Option<f64>>) -> Self {
        Self {
            key: key.iter().map(|level| level.as_ref().to_owned()).collect(),
            values,
        }
    }

    fn label(&self) -> String {
        self.key.join("/")
    }
}

/// Column-oriented frame exactly as a provider returned it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFrame {
    pub index: Vec<RawTimestamp>,
    pub columns: Vec<RawColumn>,
}

impl RawFrame {
    pub fn new(index: Vec<RawTimestamp>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_column<S: AsRef<str>>(mut self, key: &[S], values: Vec<Option<f64>>) -> Self {
        self.columns.push(RawColumn::new(key, values));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Deepest header level across all columns.
    pub fn header_depth(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.key.len())
            .max()
            .unwrap_or(0)
    }

    pub fn is_multi_level(&self) -> bool {
        self.header_depth() > 1
    }

    /// Collapses multi-level headers to a single level holding the field name.
    ///
    /// The level that names a known OHLCV field wins; when no level does, the
    /// outermost one is kept.
    pub fn flatten(mut self) -> Self {
        if !self.is_multi_level() {
            return self;
        }

        for column in &mut self.columns {
            let chosen = column
                .key
                .iter()
                .find(|level| Field::from_header(level).is_some())
                .or_else(|| column.key.first())
                .cloned()
                .unwrap_or_default();
            column.key = vec![chosen];
        }
        self
    }

    /// Flattens, validates and orders the frame into a [`BarSeries`].
    ///
    /// Rows missing any of open/high/low/close are dropped. Rows whose
    /// high/low do not bracket open and close are kept, with high/low widened
    /// to cover them. Missing volume reads as zero. Duplicate timestamps keep the
    /// last row. With `auto_adjust` and an adjusted-close column present,
    /// prices are rescaled by `adjclose / close`.
    pub fn into_series(
        self,
        symbol: Symbol,
        interval: Interval,
        auto_adjust: bool,
    ) -> Result<BarSeries, FrameError> {
        if self.is_empty() {
            return Ok(BarSeries::empty(symbol, interval));
        }

        let frame = self.flatten();
        let expected = frame.index.len();
        for column in &frame.columns {
            if column.values.len() != expected {
                return Err(FrameError::RaggedColumn {
                    column: column.label(),
                    expected,
                    actual: column.values.len(),
                });
            }
        }

        let open = frame.required(Field::Open)?;
        let high = frame.required(Field::High)?;
        let low = frame.required(Field::Low)?;
        let close = frame.required(Field::Close)?;
        let volume = frame.column(Field::Volume);
        let adj_close = if auto_adjust {
            frame.column(Field::AdjClose)
        } else {
            None
        };

        let mut bars = Vec::with_capacity(expected);
        let mut dropped = 0_usize;
        let mut repaired = 0_usize;
        for (row, raw_ts) in frame.index.iter().enumerate() {
            let ts = raw_ts.to_utc()?;
            let (Some(o), Some(h), Some(l), Some(c)) = (
                finite(open[row]),
                finite(high[row]),
                finite(low[row]),
                finite(close[row]),
            ) else {
                dropped += 1;
                continue;
            };

            let factor = adj_close
                .and_then(|values| finite(values[row]))
                .filter(|_| c > 0.0)
                .map_or(1.0, |adjusted| adjusted / c);

            let shares = volume
                .and_then(|values| finite(values[row]))
                .filter(|value| *value >= 0.0)
                .map_or(0, |value| value.round() as u64);

            let (o, h, l, c) = (o * factor, h * factor, l * factor, c * factor);
            let bar_high = h.max(o).max(c);
            let bar_low = l.min(o).min(c);
            if bar_high != h || bar_low != l {
                repaired += 1;
            }

            match Bar::new(ts, o, bar_high, bar_low, c, shares) {
                Ok(bar) => bars.push(bar),
                Err(error) => {
                    warn!(symbol = %symbol, row, error = %error, "rejected provider row");
                    dropped += 1;
                }
            }
        }

        bars.sort_by_key(|bar| bar.ts);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(previous) if previous.ts == bar.ts => *previous = bar,
                _ => deduped.push(bar),
            }
        }

        if dropped > 0 {
            debug!(symbol = %symbol, dropped, kept = deduped.len(), "dropped incomplete rows");
        }
        if repaired > 0 {
            warn!(symbol = %symbol, repaired, "widened high/low to cover open and close");
        }

        Ok(BarSeries::new(symbol, interval, deduped)?)
    }

    fn column(&self, field: Field) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|column| {
                column
                    .key
                    .first()
                    .and_then(|name| Field::from_header(name))
                    == Some(field)
            })
            .map(|column| column.values.as_slice())
    }

    fn required(&self, field: Field) -> Result<&[Option<f64>], FrameError> {
        self.column(field).ok_or(FrameError::MissingColumn {
            field: field.as_str(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Open,
    High,
    Low,
    Close,
    AdjClose,
    Volume,
}

impl Field {
    fn from_header(header: &str) -> Option<Self> {
        let normalized: String = header
            .chars()
            .filter(|ch| !matches!(ch, ' ' | '_' | '-'))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "open" => Some(Self::Open),
            "high" => Some(Self::High),
            "low" => Some(Self::Low),
            "close" => Some(Self::Close),
            "adjclose" | "adjustedclose" => Some(Self::AdjClose),
            "volume" => Some(Self::Volume),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::AdjClose => "adjclose",
            Self::Volume => "volume",
        }
    }
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
