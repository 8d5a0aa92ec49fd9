use std::future::Future;
use std::pin::Pin;

use crate::data_source::{DataSource, HistoryRequest, SourceError};
use crate::{Interval, ProviderId, RawFrame, RawTimestamp, Symbol, UtcDateTime};

/// Tickers the offline generator knows, with their starting price.
const CATALOG: &[(&str, f64)] = &[
    ("RELIANCE.NS", 2_900.0),
    ("TCS.NS", 3_900.0),
    ("ZOMATO.NS", 180.0),
    ("IRFC.NS", 150.0),
    ("HDFCBANK.NS", 1_650.0),
    ("INFY.NS", 1_500.0),
    ("RELIANCE.BO", 2_905.0),
    ("AAPL", 190.0),
    ("MSFT", 410.0),
];

/// Deterministic offline price generator.
///
/// Each catalog symbol gets a seeded random walk, so the same symbol always
/// yields the same bars relative to the anchor. Unknown symbols produce an
/// empty frame, exactly like an upstream "no data" answer. Columns are keyed
/// `(ticker, field)`.
#[derive(Debug, Clone, Default)]
pub struct SyntheticSource {
    anchor: Option<UtcDateTime>,
}

impl SyntheticSource {
    /// Pins the timestamp of the newest bar instead of using "now".
    pub fn anchored_at(anchor: UtcDateTime) -> Self {
        Self {
            anchor: Some(anchor),
        }
    }

    fn generate(&self, req: &HistoryRequest) -> RawFrame {
        let Some(start_price) = CATALOG
            .iter()
            .find(|(symbol, _)| *symbol == req.symbol.as_str())
            .map(|(_, price)| *price)
        else {
            return RawFrame::empty();
        };

        let rows = row_count(req.interval);
        let step = req.interval.seconds();
        let newest = self.anchor.unwrap_or_else(UtcDateTime::now).unix_seconds();
        let newest = newest - newest.rem_euclid(step);

        let mut rng = fastrand::Rng::with_seed(symbol_seed(&req.symbol));
        let mut index = Vec::with_capacity(rows);
        let mut open = Vec::with_capacity(rows);
        let mut high = Vec::with_capacity(rows);
        let mut low = Vec::with_capacity(rows);
        let mut close = Vec::with_capacity(rows);
        let mut volume = Vec::with_capacity(rows);

        let mut previous = start_price;
        for row in 0..rows {
            let offset = (rows - 1 - row) as i64 * step;
            let drift = (rng.f64() - 0.5) * 0.02;
            let o = previous;
            let c = (o * (1.0 + drift)).max(0.01);
            let h = o.max(c) * (1.0 + rng.f64() * 0.004);
            let l = o.min(c) * (1.0 - rng.f64() * 0.004);

            index.push(RawTimestamp::UnixSeconds(newest - offset));
            open.push(Some(o));
            high.push(Some(h));
            low.push(Some(l));
            close.push(Some(c));
            volume.push(Some(rng.u64(10_000..100_000) as f64));
            previous = c;
        }

        let ticker = req.symbol.as_str();
        RawFrame::new(index)
            .with_column(&[ticker, "Open"], open)
            .with_column(&[ticker, "High"], high)
            .with_column(&[ticker, "Low"], low)
            .with_column(&[ticker, "Close"], close)
            .with_column(&[ticker, "Volume"], volume)
    }
}

impl DataSource for SyntheticSource {
    fn id(&self) -> ProviderId {
        ProviderId::Synthetic
    }

    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawFrame, SourceError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.generate(&req)) })
    }
}

fn row_count(interval: Interval) -> usize {
    match interval {
        Interval::FiveMinutes => 1_500,
        Interval::FifteenMinutes => 1_000,
        Interval::OneHour => 420,
        Interval::OneDay => 1_500,
    }
}

fn symbol_seed(symbol: &Symbol) -> u64 {
    symbol.as_str().bytes().fold(0_u64, |acc, byte| {
        acc.wrapping_mul(33).wrapping_add(u64::from(byte))
    })
}
