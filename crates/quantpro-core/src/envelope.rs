use serde::Serialize;
use uuid::Uuid;

use crate::{ProviderId, ResolvedSymbol, UtcDateTime, ValidationError};

pub const SCHEMA_VERSION: &str = "v1.0.0";

/// Standard response envelope for every machine-readable `quantpro` output.
///
/// `data` is absent when the request failed; `errors` then explains why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            meta,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn failure(meta: EnvelopeMeta, error: EnvelopeError) -> Self {
        Self {
            meta,
            data: None,
            errors: vec![error],
        }
    }
}

/// Metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub schema_version: String,
    pub generated_at: UtcDateTime,
    pub source: ProviderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_symbol: Option<ResolvedSymbol>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    /// Fresh metadata with a random v4 request id.
    pub fn new(source: ProviderId, latency_ms: u64, cache_hit: bool) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            schema_version: SCHEMA_VERSION.to_owned(),
            generated_at: UtcDateTime::now(),
            source,
            resolved_symbol: None,
            latency_ms,
            cache_hit,
            warnings: Vec::new(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Result<Self, ValidationError> {
        self.request_id = request_id.into();
        self.validate()?;
        Ok(self)
    }

    pub fn with_resolved_symbol(mut self, symbol: ResolvedSymbol) -> Self {
        self.resolved_symbol = Some(symbol);
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_id.trim().len() < 8 {
            return Err(ValidationError::InvalidRequestId);
        }

        if !is_valid_schema_version(&self.schema_version) {
            return Err(ValidationError::InvalidSchemaVersion {
                value: self.schema_version.clone(),
            });
        }

        Ok(())
    }
}

/// Structured error entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
}

impl EnvelopeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

fn is_valid_schema_version(value: &str) -> bool {
    let Some(version) = value.strip_prefix('v') else {
        return false;
    };

    let mut parts = version.split('.');
    let major = parts.next();
    let minor = parts.next();
    let patch = parts.next();

    if parts.next().is_some() {
        return false;
    }

    [major, minor, patch].iter().all(|part| {
        part.is_some_and(|segment| {
            !segment.is_empty() && segment.chars().all(|ch| ch.is_ascii_digit())
        })
    })
}
