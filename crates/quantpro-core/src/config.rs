//! Pipeline configuration and the two dashboard profiles.
//!
//! Both profiles share one fetch/indicator pipeline. They differ only in the
//! policy knobs collected in [`PipelineConfig`]: how candidate symbols are
//! generated, how often a failed request is retried, which optional
//! indicators are computed and whether a BUY/HOLD/SELL action is derived.

use std::env;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::retry::RetryPolicy;
use crate::{ConfigError, Symbol, ValidationError};

pub const ENV_CACHE_TTL_SECS: &str = "QUANTPRO_CACHE_TTL_SECS";
pub const ENV_HTTP_TIMEOUT_MS: &str = "QUANTPRO_HTTP_TIMEOUT_MS";
pub const ENV_DEFAULT_SUFFIX: &str = "QUANTPRO_DEFAULT_SUFFIX";
pub const ENV_RETRY_BACKOFF: &str = "QUANTPRO_RETRY_BACKOFF";

const DEFAULT_SUFFIX: &str = ".NS";

/// Named bundle of policy defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Suffix fallback, single attempt, base indicator set.
    Smart,
    /// Forced suffix, bounded retry, extended indicators and actions.
    Institutional,
}

impl Profile {
    pub const ALL: [Self; 2] = [Self::Smart, Self::Institutional];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Institutional => "institutional",
        }
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "smart" => Ok(Self::Smart),
            "institutional" | "pro" => Ok(Self::Institutional),
            _ => Err(ValidationError::InvalidProfile {
                value: value.to_owned(),
            }),
        }
    }
}

/// How a normalized query turns into exchange-qualified symbols to try.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateStrategy {
    /// Without a `.` in the query, try `QUERY{suffix}` first and then the
    /// bare query. Queries that already carry a dot are tried as-is.
    SuffixFallback { suffix: String },
    /// Append `suffix` unless the query already ends with one of
    /// `recognized`.
    AppendUnlessListed {
        suffix: String,
        recognized: Vec<String>,
    },
}

impl CandidateStrategy {
    /// Ordered, de-duplicated candidate symbols for an already normalized
    /// query.
    pub fn candidates(&self, query: &str) -> Result<Vec<Symbol>, ValidationError> {
        let raw: Vec<String> = match self {
            Self::SuffixFallback { suffix } => {
                if query.contains('.') {
                    vec![query.to_owned()]
                } else {
                    vec![format!("{query}{suffix}"), query.to_owned()]
                }
            }
            Self::AppendUnlessListed { suffix, recognized } => {
                if recognized.iter().any(|known| query.ends_with(known.as_str())) {
                    vec![query.to_owned()]
                } else {
                    vec![format!("{query}{suffix}")]
                }
            }
        };

        let mut out: Vec<Symbol> = Vec::with_capacity(raw.len());
        for candidate in raw {
            let symbol = Symbol::parse(&candidate)?;
            if !out.contains(&symbol) {
                out.push(symbol);
            }
        }
        Ok(out)
    }

    fn with_suffix(&self, new_suffix: &str) -> Self {
        match self {
            Self::SuffixFallback { .. } => Self::SuffixFallback {
                suffix: new_suffix.to_owned(),
            },
            Self::AppendUnlessListed { recognized, .. } => {
                let mut recognized = recognized.clone();
                if !recognized.iter().any(|known| known == new_suffix) {
                    recognized.push(new_suffix.to_owned());
                }
                Self::AppendUnlessListed {
                    suffix: new_suffix.to_owned(),
                    recognized,
                }
            }
        }
    }
}

/// Optional indicator columns; the base set is always computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IndicatorSet {
    pub sma200: bool,
    pub avg_volume_20: bool,
}

impl IndicatorSet {
    pub const fn base() -> Self {
        Self {
            sma200: false,
            avg_volume_20: false,
        }
    }

    pub const fn extended() -> Self {
        Self {
            sma200: true,
            avg_volume_20: true,
        }
    }
}

/// Fixed RSI cut-offs. Zones use 30/70; the optional action uses 35/65.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalThresholds {
    pub oversold: f64,
    pub overbought: f64,
    /// `(buy_below, sell_above)` when actions are derived.
    pub action: Option<(f64, f64)>,
}

impl SignalThresholds {
    pub const ZONE_OVERSOLD: f64 = 30.0;
    pub const ZONE_OVERBOUGHT: f64 = 70.0;
    pub const ACTION_BUY_BELOW: f64 = 35.0;
    pub const ACTION_SELL_ABOVE: f64 = 65.0;

    pub const fn zones_only() -> Self {
        Self {
            oversold: Self::ZONE_OVERSOLD,
            overbought: Self::ZONE_OVERBOUGHT,
            action: None,
        }
    }

    pub const fn with_actions() -> Self {
        Self {
            oversold: Self::ZONE_OVERSOLD,
            overbought: Self::ZONE_OVERBOUGHT,
            action: Some((Self::ACTION_BUY_BELOW, Self::ACTION_SELL_ABOVE)),
        }
    }
}

/// Every policy knob of the fetch → annotate pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub profile: Profile,
    pub candidates: CandidateStrategy,
    pub retry: RetryPolicy,
    pub indicators: IndicatorSet,
    pub thresholds: SignalThresholds,
    pub cache_ttl: Duration,
    pub http_timeout_ms: u64,
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub auto_adjust: bool,
    pub audit_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::for_profile(Profile::Smart)
    }
}

impl PipelineConfig {
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
    pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;
    pub const DEFAULT_AUDIT_ROWS: usize = 200;

    pub fn for_profile(profile: Profile) -> Self {
        let (candidates, retry, indicators, thresholds) = match profile {
            Profile::Smart => (
                CandidateStrategy::SuffixFallback {
                    suffix: DEFAULT_SUFFIX.to_owned(),
                },
                RetryPolicy::no_retry(),
                IndicatorSet::base(),
                SignalThresholds::zones_only(),
            ),
            Profile::Institutional => (
                CandidateStrategy::AppendUnlessListed {
                    suffix: DEFAULT_SUFFIX.to_owned(),
                    recognized: vec![".NS".to_owned(), ".BO".to_owned()],
                },
                RetryPolicy::fixed(Duration::from_secs(1), 3),
                IndicatorSet::extended(),
                SignalThresholds::with_actions(),
            ),
        };

        Self {
            profile,
            candidates,
            retry,
            indicators,
            thresholds,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
            http_timeout_ms: Self::DEFAULT_HTTP_TIMEOUT_MS,
            quota_window: Duration::from_secs(60),
            quota_limit: 60,
            auto_adjust: true,
            audit_rows: Self::DEFAULT_AUDIT_ROWS,
        }
    }

    /// Profile defaults with `QUANTPRO_*` environment overrides applied.
    pub fn from_env(profile: Profile) -> Result<Self, ConfigError> {
        Self::from_lookup(profile, |name| env::var(name).ok())
    }

    /// Same as [`PipelineConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(profile: Profile, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::for_profile(profile);

        if let Some(value) = lookup(ENV_CACHE_TTL_SECS) {
            config.cache_ttl = Duration::from_secs(parse_number(ENV_CACHE_TTL_SECS, &value)?);
        }

        if let Some(value) = lookup(ENV_HTTP_TIMEOUT_MS) {
            let timeout = parse_number(ENV_HTTP_TIMEOUT_MS, &value)?;
            if timeout == 0 {
                return Err(ConfigError::InvalidEnvVar {
                    name: ENV_HTTP_TIMEOUT_MS,
                    value,
                    reason: String::from("must be greater than zero"),
                });
            }
            config.http_timeout_ms = timeout;
        }

        if let Some(value) = lookup(ENV_DEFAULT_SUFFIX) {
            let suffix = value.trim().to_ascii_uppercase();
            let valid = suffix.len() >= 2
                && suffix.starts_with('.')
                && suffix[1..].chars().all(|ch| ch.is_ascii_alphanumeric());
            if !valid {
                return Err(ConfigError::InvalidEnvVar {
                    name: ENV_DEFAULT_SUFFIX,
                    value,
                    reason: String::from("expected a market suffix such as .NS"),
                });
            }
            config.candidates = config.candidates.with_suffix(&suffix);
        }

        if let Some(value) = lookup(ENV_RETRY_BACKOFF) {
            match value.trim().to_ascii_lowercase().as_str() {
                "fixed" => {}
                "exponential" => {
                    config.retry = RetryPolicy::exponential(config.retry.max_attempts);
                }
                _ => {
                    return Err(ConfigError::InvalidEnvVar {
                        name: ENV_RETRY_BACKOFF,
                        value,
                        reason: String::from("expected fixed or exponential"),
                    });
                }
            }
        }

        Ok(config)
    }
}

fn parse_number(name: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|error| ConfigError::InvalidEnvVar {
            name,
            value: value.to_owned(),
            reason: error.to_string(),
        })
}
