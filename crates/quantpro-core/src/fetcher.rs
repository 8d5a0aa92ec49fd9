//! Symbol resolution, retrying fetch and short-lived caching.
//!
//! [`Fetcher::fetch`] is the single entry point the presentation layer calls
//! with whatever the user typed. It normalizes the query, walks the candidate
//! symbols produced by the configured [`CandidateStrategy`], retries transient
//! provider failures per candidate, recovers the provider frame into a clean
//! [`BarSeries`] and caches the outcome keyed by `(query, interval)`.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheMode, CacheStore};
use crate::config::{CandidateStrategy, PipelineConfig};
use crate::data_source::{DataSource, HistoryRequest, SourceError};
use crate::retry::RetryPolicy;
use crate::{BarSeries, Interval, ProviderId, ResolvedSymbol, Symbol};

/// Hint shown with every user-facing fetch failure.
pub const KNOWN_GOOD_HINT: &str = "Try RELIANCE, TCS, or HDFC";

/// Why a fetch produced no series.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// Every candidate answered with an empty result.
    #[error("no data found for any candidate symbol")]
    NoDataFound,
    /// The provider errored on the last candidate that failed. Retryable
    /// errors are retried until the attempt budget runs out; terminal errors
    /// stop after the attempt that raised them.
    #[error("provider failed after {attempts} attempt(s): {last_error}")]
    TransientFailure {
        attempts: u32,
        last_error: SourceError,
    },
    /// The query could not be turned into a valid symbol.
    #[error("malformed input: {detail}")]
    MalformedInput { detail: String },
}

/// Fetch failure with the best-guess symbol it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not fetch '{symbol}': {reason}")]
pub struct FetchError {
    pub symbol: String,
    pub reason: FetchFailure,
}

impl FetchError {
    fn new(symbol: impl Into<String>, reason: FetchFailure) -> Self {
        Self {
            symbol: symbol.into(),
            reason,
        }
    }

    /// Stable diagnostic code; the user-facing message does not distinguish.
    pub const fn code(&self) -> &'static str {
        match self.reason {
            FetchFailure::NoDataFound => "fetch.no_data",
            FetchFailure::TransientFailure { .. } => "fetch.transient",
            FetchFailure::MalformedInput { .. } => "fetch.malformed_input",
        }
    }

    /// The one message end users see, whatever the underlying reason.
    pub fn user_message(&self) -> String {
        format!(
            "Could not find data for '{}'. {KNOWN_GOOD_HINT}.",
            self.symbol
        )
    }
}

/// A successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub series: BarSeries,
    pub resolved: ResolvedSymbol,
    pub source: ProviderId,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    query: String,
    interval: Interval,
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}", self.query, self.interval)
    }
}

#[derive(Debug, Clone)]
struct CachedSeries {
    series: BarSeries,
    resolved: ResolvedSymbol,
}

enum CandidateResult {
    Found(BarSeries),
    Empty,
    Exhausted { attempts: u32, error: SourceError },
}

/// Resolves user queries to bar series through one [`DataSource`].
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn DataSource>,
    candidates: CandidateStrategy,
    retry: RetryPolicy,
    auto_adjust: bool,
    cache: CacheStore<CacheKey, CachedSeries>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("source", &self.source.id())
            .field("candidates", &self.candidates)
            .field("retry", &self.retry)
            .field("auto_adjust", &self.auto_adjust)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    pub fn new(source: Arc<dyn DataSource>, config: &PipelineConfig) -> Self {
        Self {
            source,
            candidates: config.candidates.clone(),
            retry: config.retry.clone(),
            auto_adjust: config.auto_adjust,
            cache: CacheStore::new(config.cache_ttl),
        }
    }

    pub fn source_id(&self) -> ProviderId {
        self.source.id()
    }

    /// Uppercased, trimmed query.
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_ascii_uppercase()
    }

    /// Fetches through the cache.
    pub async fn fetch(&self, raw: &str, interval: Interval) -> Result<FetchOutcome, FetchError> {
        self.fetch_with_mode(raw, interval, CacheMode::Use).await
    }

    pub async fn fetch_with_mode(
        &self,
        raw: &str,
        interval: Interval,
        mode: CacheMode,
    ) -> Result<FetchOutcome, FetchError> {
        let query = Self::normalize(raw);
        if query.is_empty() {
            return Err(FetchError::new(
                raw,
                FetchFailure::MalformedInput {
                    detail: String::from("symbol cannot be empty"),
                },
            ));
        }

        let key = CacheKey {
            query: query.clone(),
            interval,
        };

        if mode.reads() {
            if let Some(cached) = self.cache.get(&key).await {
                debug!(key = %key, resolved = %cached.resolved, "cache hit");
                return Ok(FetchOutcome {
                    series: cached.series,
                    resolved: cached.resolved,
                    source: self.source.id(),
                    cache_hit: true,
                });
            }
        }

        let candidates = self.candidates.candidates(&query).map_err(|error| {
            FetchError::new(
                query.as_str(),
                FetchFailure::MalformedInput {
                    detail: error.to_string(),
                },
            )
        })?;

        let mut exhausted: Option<(u32, SourceError)> = None;
        for symbol in candidates {
            match self.try_candidate(&symbol, interval).await {
                CandidateResult::Found(series) => {
                    let resolved = ResolvedSymbol::new(symbol);
                    info!(
                        query = %query,
                        resolved = %resolved,
                        interval = %interval,
                        bars = series.len(),
                        "resolved symbol"
                    );
                    if mode.writes() {
                        self.cache
                            .put(
                                key,
                                CachedSeries {
                                    series: series.clone(),
                                    resolved: resolved.clone(),
                                },
                                None,
                            )
                            .await;
                    }
                    return Ok(FetchOutcome {
                        series,
                        resolved,
                        source: self.source.id(),
                        cache_hit: false,
                    });
                }
                CandidateResult::Empty => {
                    debug!(candidate = %symbol, interval = %interval, "candidate returned no data");
                }
                CandidateResult::Exhausted { attempts, error } => {
                    warn!(
                        candidate = %symbol,
                        attempts,
                        error = %error,
                        "candidate failed"
                    );
                    exhausted = Some((attempts, error));
                }
            }
        }

        let reason = match exhausted {
            Some((attempts, last_error)) => FetchFailure::TransientFailure {
                attempts,
                last_error,
            },
            None => FetchFailure::NoDataFound,
        };
        Err(FetchError::new(query, reason))
    }

    async fn try_candidate(&self, symbol: &Symbol, interval: Interval) -> CandidateResult {
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            let request = HistoryRequest::new(symbol.clone(), interval);
            debug!(
                candidate = %symbol,
                interval = %interval,
                lookback = %request.lookback,
                attempt,
                "requesting history"
            );

            let error = match self.source.history(request).await {
                Ok(frame) if frame.is_empty() => return CandidateResult::Empty,
                Ok(frame) => {
                    return match frame.into_series(symbol.clone(), interval, self.auto_adjust) {
                        Ok(series) if series.is_empty() => CandidateResult::Empty,
                        Ok(series) => CandidateResult::Found(series),
                        Err(error) => {
                            warn!(candidate = %symbol, error = %error, "unusable provider frame");
                            CandidateResult::Empty
                        }
                    };
                }
                Err(error) => error,
            };

            match self.retry.next_delay(attempt, &error) {
                Some(delay) => {
                    debug!(
                        candidate = %symbol,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying after transient failure"
                    );
                    pause(delay).await;
                }
                None => {
                    return CandidateResult::Exhausted {
                        attempts: attempt,
                        error,
                    };
                }
            }
        }
    }

    /// Drops every cached series.
    pub async fn clear_cache(&self) {
        let entries = self.cache.len().await;
        self.cache.clear().await;
        debug!(entries, "cache cleared");
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::Profile;
    use crate::{RawFrame, RawTimestamp};

    struct StaticSource {
        known: &'static str,
        calls: AtomicUsize,
    }

    impl DataSource for StaticSource {
        fn id(&self) -> ProviderId {
            ProviderId::Synthetic
        }

        fn history<'a>(
            &'a self,
            req: HistoryRequest,
        ) -> Pin<Box<dyn Future<Output = Result<crate::RawFrame, SourceError>> + Send + 'a>>
        {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if req.symbol.as_str() != self.known {
                    return Ok(RawFrame::empty());
                }
                Ok(RawFrame::new(vec![
                    RawTimestamp::UnixSeconds(1_700_000_000),
                    RawTimestamp::UnixSeconds(1_700_086_400),
                ])
                .with_column(&["Open"], vec![Some(10.0), Some(11.0)])
                .with_column(&["High"], vec![Some(12.0), Some(12.0)])
                .with_column(&["Low"], vec![Some(9.0), Some(10.0)])
                .with_column(&["Close"], vec![Some(11.0), Some(11.5)])
                .with_column(&["Volume"], vec![Some(100.0), Some(200.0)]))
            })
        }
    }

    fn fetcher(known: &'static str) -> (Fetcher, Arc<StaticSource>) {
        let source = Arc::new(StaticSource {
            known,
            calls: AtomicUsize::new(0),
        });
        let fetcher = Fetcher::new(source.clone(), &PipelineConfig::for_profile(Profile::Smart));
        (fetcher, source)
    }

    #[tokio::test]
    async fn falls_back_to_the_bare_symbol() {
        let (fetcher, source) = fetcher("AAPL");
        let outcome = fetcher.fetch(" aapl ", Interval::OneDay).await.expect("fetch");

        assert_eq!(outcome.resolved.as_str(), "AAPL");
        assert_eq!(outcome.series.len(), 2);
        assert!(!outcome.cache_hit);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_query_fails_without_calling_the_provider() {
        let (fetcher, source) = fetcher("AAPL");
        let err = fetcher.fetch("   ", Interval::OneDay).await.expect_err("empty");

        assert_eq!(err.code(), "fetch.malformed_input");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_mode_skips_the_cached_entry() {
        let (fetcher, source) = fetcher("TCS.NS");
        fetcher.fetch("tcs", Interval::OneDay).await.expect("first");
        let refreshed = fetcher
            .fetch_with_mode("tcs", Interval::OneDay, CacheMode::Refresh)
            .await
            .expect("refresh");

        assert!(!refreshed.cache_hit);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        let cached = fetcher.fetch("TCS", Interval::OneDay).await.expect("cached");
        assert!(cached.cache_hit);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clearing_the_cache_forces_a_refetch() {
        let (fetcher, source) = fetcher("IRFC.NS");
        fetcher.fetch("irfc", Interval::OneDay).await.expect("first");
        fetcher.clear_cache().await;

        let again = fetcher.fetch("irfc", Interval::OneDay).await.expect("again");

        assert!(!again.cache_hit);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn user_message_is_uniform_across_reasons() {
        let no_data = FetchError::new("XYZ", FetchFailure::NoDataFound);
        let transient = FetchError::new(
            "XYZ",
            FetchFailure::TransientFailure {
                attempts: 3,
                last_error: SourceError::unavailable("timeout"),
            },
        );

        assert_eq!(no_data.user_message(), transient.user_message());
        assert_eq!(
            no_data.user_message(),
            "Could not find data for 'XYZ'. Try RELIANCE, TCS, or HDFC."
        );
        assert_ne!(no_data.code(), transient.code());
    }
}
