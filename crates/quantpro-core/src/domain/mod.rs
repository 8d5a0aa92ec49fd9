//! # Domain Models
//!
//! Canonical domain types for the QuantPro pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bar`] | OHLCV bar with timestamp |
//! | [`BarSeries`] | Ordered bars for a symbol/interval |
//! | [`Symbol`] | Validated ticker |
//! | [`ResolvedSymbol`] | Exchange-qualified ticker that produced data |
//! | [`Interval`] | Sampling interval (5m, 15m, 1h, 1d) |
//! | [`Lookback`] | Provider history window for an interval |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! All domain types enforce their invariants at construction time:
//!
//! ```rust
//! use quantpro_core::{Bar, UtcDateTime, ValidationError};
//!
//! let ts = UtcDateTime::parse("2024-01-01T00:00:00Z").unwrap();
//! assert!(Bar::new(ts, 100.0, 105.0, 95.0, 102.0, 1_000).is_ok());
//!
//! let invalid = Bar::new(ts, 100.0, 95.0, 105.0, 102.0, 1_000);
//! assert!(matches!(invalid, Err(ValidationError::InvalidBarRange)));
//! ```

mod interval;
mod models;
mod symbol;
mod timestamp;

pub use interval::{Interval, Lookback};
pub use models::{Bar, BarSeries};
pub use symbol::{ResolvedSymbol, Symbol};
pub use timestamp::UtcDateTime;
