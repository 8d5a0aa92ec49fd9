//! Provider adapter contract and its request/error types.
//!
//! A [`DataSource`] answers one question: give me the raw price history for
//! `(symbol, interval, lookback)`. It returns the provider's frame untouched
//! (see [`RawFrame`]); flattening and validation happen in the fetcher so every
//! adapter benefits from the same recovery logic.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{Interval, Lookback, ProviderId, RawFrame, Symbol};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    MalformedPayload,
    Internal,
}

/// Structured source error; `retryable` drives the fetcher's retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedPayload,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::MalformedPayload => "source.malformed_payload",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Request payload for the history endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub interval: Interval,
    pub lookback: Lookback,
}

impl HistoryRequest {
    /// Builds a request using the fixed lookback for `interval`.
    pub fn new(symbol: Symbol, interval: Interval) -> Self {
        Self {
            symbol,
            interval,
            lookback: interval.lookback(),
        }
    }
}

/// Source adapter contract.
///
/// An unknown or delisted symbol is not an error: adapters answer with an
/// empty [`RawFrame`] so the resolver can move on to its next candidate.
/// Errors are reserved for transport and payload failures, and must be
/// flagged retryable only when another attempt could plausibly succeed.
pub trait DataSource: Send + Sync {
    fn id(&self) -> ProviderId;

    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawFrame, SourceError>> + Send + 'a>>;
}
