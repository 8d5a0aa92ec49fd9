//! Core pipeline for quantpro.
//!
//! This crate contains:
//! - Domain models (symbols, intervals, bars) and validation
//! - Provider adapters behind the `DataSource` trait, with throttling
//! - Raw frame recovery, retrying symbol resolution and a TTL cache
//! - The indicator calculator and RSI signal classification
//! - Presentation projections, session state and the response envelope

pub mod adapters;
pub mod cache;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod fetcher;
pub mod frame;
pub mod http_client;
pub mod indicators;
pub mod retry;
pub mod scorecard;
pub mod session;
pub mod signal;
pub mod source;
pub mod throttling;

pub use adapters::{SyntheticSource, YahooSource};
pub use cache::{CacheMode, CacheStore};
pub use config::{CandidateStrategy, IndicatorSet, PipelineConfig, Profile, SignalThresholds};
pub use data_source::{DataSource, HistoryRequest, SourceError, SourceErrorKind};
pub use domain::{Bar, BarSeries, Interval, Lookback, ResolvedSymbol, Symbol, UtcDateTime};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{ConfigError, FrameError, ValidationError};
pub use fetcher::{FetchError, FetchFailure, FetchOutcome, Fetcher};
pub use frame::{RawColumn, RawFrame, RawTimestamp};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use indicators::{annotate, annotate_with, IndicatedRow, IndicatedSeries};
pub use retry::{Backoff, RetryPolicy};
pub use scorecard::{audit_log, rsi_chart, Scorecard};
pub use session::{Screen, SessionState};
pub use signal::{Action, Zone};
pub use source::ProviderId;
pub use throttling::ProviderThrottle;
