use thiserror::Error;

/// Validation and contract errors exposed by `quantpro-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter, digit or '^': '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid interval '{value}', expected one of 5m, 15m, 1h, 1d")]
    InvalidInterval { value: String },
    #[error("invalid profile '{value}', expected one of smart, institutional")]
    InvalidProfile { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unrecognised timestamp '{value}'")]
    UnparsableTimestamp { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("bar high must be >= low")]
    InvalidBarRange,
    #[error("bar open/close must be within high/low range")]
    InvalidBarBounds,
    #[error("bar timestamps must be strictly ascending")]
    UnorderedBars,

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
}

/// Failures raised while turning a provider [`RawFrame`](crate::RawFrame) into a
/// [`BarSeries`](crate::BarSeries).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("required column '{field}' is missing")]
    MissingColumn { field: &'static str },
    #[error("column '{column}' has {actual} values, index has {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Index(#[from] ValidationError),
}

/// Errors raised while loading configuration from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value '{value}': {reason}")]
    InvalidEnvVar {
        name: &'static str,
        value: String,
        reason: String,
    },
}
