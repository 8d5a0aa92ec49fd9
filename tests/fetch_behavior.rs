//! Behaviour tests for symbol resolution, retry, recovery and caching.
//!
//! A scripted in-memory `DataSource` stands in for the provider so every
//! scenario can count exactly how many network calls were made.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use quantpro_core::{
    annotate, CacheMode, DataSource, FetchFailure, Fetcher, HistoryRequest, Interval, Lookback,
    PipelineConfig, Profile, ProviderId, RawFrame, RawTimestamp, RetryPolicy, SourceError,
    SyntheticSource, UtcDateTime,
};

// =============================================================================
// Scripted provider
// =============================================================================

#[derive(Clone)]
enum Reply {
    Frame(RawFrame),
    Fail(SourceError),
}

/// Replies per symbol are consumed in order; the last one repeats. Symbols
/// without a script get an empty frame.
#[derive(Default)]
struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<HistoryRequest>>,
}

impl ScriptedSource {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn script(self: Arc<Self>, symbol: &str, replies: Vec<Reply>) -> Arc<Self> {
        self.scripts
            .lock()
            .expect("lock")
            .insert(symbol.to_owned(), replies.into());
        self
    }

    fn calls(&self) -> Vec<HistoryRequest> {
        self.calls.lock().expect("lock").clone()
    }

    fn called_symbols(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|req| req.symbol.as_str().to_owned())
            .collect()
    }
}

impl DataSource for ScriptedSource {
    fn id(&self) -> ProviderId {
        ProviderId::Synthetic
    }

    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawFrame, SourceError>> + Send + 'a>> {
        let reply = {
            let mut scripts = self.scripts.lock().expect("lock");
            match scripts.get_mut(req.symbol.as_str()) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        self.calls.lock().expect("lock").push(req);

        Box::pin(async move {
            match reply {
                Some(Reply::Frame(frame)) => Ok(frame),
                Some(Reply::Fail(error)) => Err(error),
                None => Ok(RawFrame::empty()),
            }
        })
    }
}

fn daily_index(rows: usize) -> Vec<RawTimestamp> {
    (0..rows)
        .map(|i| RawTimestamp::UnixSeconds(1_704_067_200 + i as i64 * 86_400))
        .collect()
}

/// `(field, ticker)` headers, the shape multi-ticker downloads come back in.
fn two_level_frame(ticker: &str, closes: &[f64]) -> RawFrame {
    let opens: Vec<Option<f64>> = closes.iter().map(|c| Some(*c)).collect();
    let highs: Vec<Option<f64>> = closes.iter().map(|c| Some(c + 1.0)).collect();
    let lows: Vec<Option<f64>> = closes.iter().map(|c| Some(c - 1.0)).collect();
    let volumes: Vec<Option<f64>> = closes.iter().map(|_| Some(1_000.0)).collect();
    RawFrame::new(daily_index(closes.len()))
        .with_column(&["Close", ticker], closes.iter().map(|c| Some(*c)).collect())
        .with_column(&["High", ticker], highs)
        .with_column(&["Low", ticker], lows)
        .with_column(&["Open", ticker], opens)
        .with_column(&["Volume", ticker], volumes)
}

fn prices(rows: usize) -> Vec<f64> {
    (0..rows).map(|i| 100.0 + (i % 5) as f64).collect()
}

fn smart(source: Arc<ScriptedSource>) -> Fetcher {
    Fetcher::new(source, &PipelineConfig::for_profile(Profile::Smart))
}

fn institutional_fast_retry(source: Arc<ScriptedSource>) -> Fetcher {
    let mut config = PipelineConfig::for_profile(Profile::Institutional);
    config.retry = RetryPolicy::fixed(Duration::ZERO, 3);
    Fetcher::new(source, &config)
}

// =============================================================================
// Symbol resolution
// =============================================================================

#[tokio::test]
async fn when_bare_name_has_data_on_default_market_resolver_picks_qualified_symbol() {
    // Given: the provider knows RELIANCE.NS
    let source = ScriptedSource::new().script(
        "RELIANCE.NS",
        vec![Reply::Frame(two_level_frame("RELIANCE.NS", &prices(30)))],
    );
    let fetcher = smart(source.clone());

    // When: the user types a bare lowercase name
    let outcome = fetcher.fetch("  reliance ", Interval::OneDay).await.expect("fetch");

    // Then: the qualified form is tried first and wins
    assert_eq!(outcome.resolved.as_str(), "RELIANCE.NS");
    assert_eq!(source.called_symbols(), vec!["RELIANCE.NS"]);
    assert_eq!(outcome.series.len(), 30);
    assert!(!outcome.cache_hit);
}

#[tokio::test]
async fn when_qualified_symbol_is_empty_resolver_falls_back_to_raw_query() {
    let source = ScriptedSource::new().script(
        "AAPL",
        vec![Reply::Frame(two_level_frame("AAPL", &prices(5)))],
    );
    let fetcher = smart(source.clone());

    let outcome = fetcher.fetch("AAPL", Interval::OneDay).await.expect("fetch");

    assert_eq!(outcome.resolved.as_str(), "AAPL");
    assert_eq!(source.called_symbols(), vec!["AAPL.NS", "AAPL"]);
}

#[tokio::test]
async fn when_query_has_a_suffix_it_is_tried_verbatim() {
    let source = ScriptedSource::new();
    let fetcher = smart(source.clone());

    let _ = fetcher.fetch("reliance.bo", Interval::OneDay).await;

    assert_eq!(source.called_symbols(), vec!["RELIANCE.BO"]);
}

#[tokio::test]
async fn institutional_profile_appends_suffix_unless_recognized() {
    let source = ScriptedSource::new();
    let fetcher = institutional_fast_retry(source.clone());

    let _ = fetcher.fetch("tcs", Interval::OneDay).await;
    let _ = fetcher.fetch("tcs.bo", Interval::OneDay).await;

    assert_eq!(source.called_symbols(), vec!["TCS.NS", "TCS.BO"]);
}

#[tokio::test]
async fn requests_carry_the_fixed_lookback_for_the_interval() {
    let source = ScriptedSource::new();
    let fetcher = smart(source.clone());

    for interval in Interval::ALL {
        let _ = fetcher.fetch("X.NS", interval).await;
    }

    let lookbacks: Vec<Lookback> = source.calls().iter().map(|req| req.lookback).collect();
    assert_eq!(
        lookbacks,
        vec![
            Lookback::OneMonth,
            Lookback::SixtyDays,
            Lookback::SixtyDays,
            Lookback::Max
        ]
    );
}

// =============================================================================
// Failure classification
// =============================================================================

#[tokio::test]
async fn when_every_candidate_is_empty_fetch_reports_no_data_found() {
    // Given: a provider that knows nothing
    let source = ScriptedSource::new();
    let fetcher = institutional_fast_retry(source.clone());

    // When
    let error = fetcher.fetch("NOPE", Interval::OneDay).await.expect_err("no data");

    // Then: empty results are never retried
    assert_eq!(error.reason, FetchFailure::NoDataFound);
    assert_eq!(error.symbol, "NOPE");
    assert_eq!(error.code(), "fetch.no_data");
    assert_eq!(source.calls().len(), 1);
    assert_eq!(
        error.user_message(),
        "Could not find data for 'NOPE'. Try RELIANCE, TCS, or HDFC."
    );
}

#[tokio::test]
async fn transient_failures_are_retried_up_to_the_attempt_budget() {
    let source = ScriptedSource::new().script(
        "INFY.NS",
        vec![Reply::Fail(SourceError::unavailable("connection reset"))],
    );
    let fetcher = institutional_fast_retry(source.clone());

    let error = fetcher.fetch("INFY", Interval::OneHour).await.expect_err("exhausted");

    assert_eq!(source.calls().len(), 3);
    match error.reason {
        FetchFailure::TransientFailure {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_error.message(), "connection reset");
        }
        other => panic!("unexpected reason: {other:?}"),
    }
}

#[tokio::test]
async fn a_transient_failure_followed_by_data_succeeds() {
    let source = ScriptedSource::new().script(
        "ZOMATO.NS",
        vec![
            Reply::Fail(SourceError::rate_limited("slow down")),
            Reply::Frame(two_level_frame("ZOMATO.NS", &prices(10))),
        ],
    );
    let fetcher = institutional_fast_retry(source.clone());

    let outcome = fetcher.fetch("zomato", Interval::OneDay).await.expect("second attempt");

    assert_eq!(outcome.resolved.as_str(), "ZOMATO.NS");
    assert_eq!(source.calls().len(), 2);
}

#[tokio::test]
async fn terminal_provider_errors_are_not_retried() {
    let source = ScriptedSource::new().script(
        "IRFC.NS",
        vec![Reply::Fail(SourceError::invalid_request("bad request"))],
    );
    let fetcher = institutional_fast_retry(source.clone());

    let error = fetcher.fetch("IRFC", Interval::OneDay).await.expect_err("terminal");

    assert_eq!(source.calls().len(), 1);
    assert!(matches!(
        error.reason,
        FetchFailure::TransientFailure { attempts: 1, .. }
    ));
}

#[tokio::test]
async fn smart_profile_moves_to_the_next_candidate_after_a_single_failure() {
    let source = ScriptedSource::new()
        .script("TCS.NS", vec![Reply::Fail(SourceError::unavailable("timeout"))])
        .script("TCS", vec![Reply::Frame(two_level_frame("TCS", &prices(3)))]);
    let fetcher = smart(source.clone());

    let outcome = fetcher.fetch("TCS", Interval::OneDay).await.expect("fallback");

    assert_eq!(outcome.resolved.as_str(), "TCS");
    assert_eq!(source.called_symbols(), vec!["TCS.NS", "TCS"]);
}

#[tokio::test]
async fn tickers_starting_with_a_digit_reach_the_provider() {
    // Given: the provider knows 3MINDIA.NS
    let source = ScriptedSource::new().script(
        "3MINDIA.NS",
        vec![Reply::Frame(two_level_frame("3MINDIA.NS", &prices(12)))],
    );
    let fetcher = smart(source.clone());

    // When: the user types the bare listing name
    let outcome = fetcher.fetch("3mindia", Interval::OneDay).await.expect("fetch");

    // Then: it resolves like any other ticker
    assert_eq!(outcome.resolved.as_str(), "3MINDIA.NS");
    assert_eq!(source.called_symbols(), vec!["3MINDIA.NS"]);
    assert_eq!(outcome.series.len(), 12);

    let _ = fetcher.fetch("0700.hk", Interval::OneDay).await;
    assert_eq!(source.called_symbols(), vec!["3MINDIA.NS", "0700.HK"]);
}

#[tokio::test]
async fn malformed_queries_fail_without_network_calls() {
    let source = ScriptedSource::new();
    let fetcher = smart(source.clone());

    for query in ["", "   ", "RELI ANCE", "TCS$", ".NS"] {
        let error = fetcher.fetch(query, Interval::OneDay).await.expect_err("malformed");
        assert!(
            matches!(error.reason, FetchFailure::MalformedInput { .. }),
            "{query:?} gave {:?}",
            error.reason
        );
    }
    assert!(source.calls().is_empty());
}

// =============================================================================
// Data recovery
// =============================================================================

#[tokio::test]
async fn two_level_headers_are_flattened_before_annotation() {
    let source = ScriptedSource::new().script(
        "HDFCBANK.NS",
        vec![Reply::Frame(two_level_frame("HDFCBANK.NS", &[10.0, 11.0, 12.0]))],
    );
    let fetcher = smart(source);

    let outcome = fetcher.fetch("hdfcbank", Interval::OneDay).await.expect("fetch");
    let closes = outcome.series.closes();
    assert_eq!(closes, vec![10.0, 11.0, 12.0]);

    let indicated = annotate(outcome.series);
    assert_eq!(indicated.len(), 3);
    assert_eq!(indicated.ema20[0], 10.0);
}

#[tokio::test]
async fn unordered_millisecond_index_is_normalized_to_ascending_utc() {
    let frame = RawFrame::new(vec![
        RawTimestamp::UnixMillis(1_704_153_600_000),
        RawTimestamp::UnixMillis(1_704_067_200_000),
    ])
    .with_column(&["close"], vec![Some(2.0), Some(1.0)])
    .with_column(&["open"], vec![Some(2.0), Some(1.0)])
    .with_column(&["high"], vec![Some(2.0), Some(1.0)])
    .with_column(&["low"], vec![Some(2.0), Some(1.0)]);
    let source = ScriptedSource::new().script("AAPL.NS", vec![Reply::Frame(frame)]);
    let fetcher = smart(source);

    let outcome = fetcher.fetch("AAPL", Interval::OneDay).await.expect("fetch");
    let bars = outcome.series.bars();

    assert_eq!(bars[0].ts, UtcDateTime::parse("2024-01-01T00:00:00Z").expect("ts"));
    assert_eq!(bars[1].close, 2.0);
    assert_eq!(bars[0].volume, 0);
}

#[tokio::test]
async fn rows_with_slightly_inconsistent_prices_are_kept() {
    // Given: a provider row whose close rounds just above its high
    let frame = RawFrame::new(daily_index(3))
        .with_column(&["Open"], vec![Some(10.0), Some(11.0), Some(11.5)])
        .with_column(&["High"], vec![Some(10.5), Some(11.5), Some(12.0)])
        .with_column(&["Low"], vec![Some(9.5), Some(10.5), Some(11.0)])
        .with_column(&["Close"], vec![Some(10.2), Some(11.2), Some(12.000001)])
        .with_column(&["Volume"], vec![Some(100.0), Some(100.0), Some(100.0)]);
    let source = ScriptedSource::new().script("RELIANCE.NS", vec![Reply::Frame(frame)]);
    let fetcher = smart(source);

    // When
    let outcome = fetcher.fetch("RELIANCE", Interval::OneDay).await.expect("fetch");

    // Then: every provider row survives and indicators see all of them
    assert_eq!(outcome.series.len(), 3);
    assert_eq!(outcome.series.closes(), vec![10.2, 11.2, 12.000001]);
    let last = &outcome.series.bars()[2];
    assert!(last.high >= last.close);

    let indicated = annotate(outcome.series);
    assert!(indicated.pct_change[2].is_some());
}

#[tokio::test]
async fn frames_without_price_columns_count_as_no_data() {
    let frame = RawFrame::new(daily_index(2)).with_column(&["Volume"], vec![Some(1.0), Some(2.0)]);
    let source = ScriptedSource::new().script("MSFT", vec![Reply::Frame(frame)]);
    let fetcher = smart(source.clone());

    let error = fetcher.fetch("MSFT", Interval::OneDay).await.expect_err("unusable");

    assert_eq!(error.reason, FetchFailure::NoDataFound);
    assert_eq!(source.called_symbols(), vec!["MSFT.NS", "MSFT"]);
}

// =============================================================================
// Cache
// =============================================================================

#[tokio::test]
async fn identical_fetches_within_ttl_make_one_network_call() {
    let source = ScriptedSource::new().script(
        "RELIANCE.NS",
        vec![Reply::Frame(two_level_frame("RELIANCE.NS", &prices(20)))],
    );
    let fetcher = smart(source.clone());

    let first = fetcher.fetch("RELIANCE", Interval::FifteenMinutes).await.expect("first");
    let second = fetcher.fetch("reliance", Interval::FifteenMinutes).await.expect("second");

    assert_eq!(source.calls().len(), 1);
    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(first.series, second.series);
    assert_eq!(first.resolved, second.resolved);
}

#[tokio::test]
async fn cache_is_keyed_by_interval_too() {
    let source = ScriptedSource::new().script(
        "TCS.NS",
        vec![Reply::Frame(two_level_frame("TCS.NS", &prices(20)))],
    );
    let fetcher = smart(source.clone());

    fetcher.fetch("TCS", Interval::OneDay).await.expect("daily");
    fetcher.fetch("TCS", Interval::OneHour).await.expect("hourly");

    assert_eq!(source.calls().len(), 2);
}

#[tokio::test]
async fn failures_are_not_cached() {
    let source = ScriptedSource::new();
    let fetcher = smart(source.clone());

    let _ = fetcher.fetch("GHOST.NS", Interval::OneDay).await;
    let _ = fetcher.fetch("GHOST.NS", Interval::OneDay).await;

    assert_eq!(source.calls().len(), 2);
}

#[tokio::test]
async fn zero_ttl_disables_caching_and_bypass_skips_it() {
    let source = ScriptedSource::new().script(
        "IRFC.NS",
        vec![Reply::Frame(two_level_frame("IRFC.NS", &prices(5)))],
    );
    let mut config = PipelineConfig::for_profile(Profile::Smart);
    config.cache_ttl = Duration::ZERO;
    let fetcher = Fetcher::new(source.clone(), &config);

    fetcher.fetch("IRFC", Interval::OneDay).await.expect("first");
    fetcher.fetch("IRFC", Interval::OneDay).await.expect("second");
    assert_eq!(source.calls().len(), 2);

    let cached = smart(source.clone());
    cached.fetch("IRFC", Interval::OneDay).await.expect("warm");
    let bypass = cached
        .fetch_with_mode("IRFC", Interval::OneDay, CacheMode::Bypass)
        .await
        .expect("bypass");
    assert!(!bypass.cache_hit);
    assert_eq!(source.calls().len(), 4);
}

// =============================================================================
// Synthetic source end to end
// =============================================================================

#[tokio::test]
async fn synthetic_source_resolves_watchlist_names() {
    let fetcher = Fetcher::new(
        Arc::new(SyntheticSource::default()),
        &PipelineConfig::for_profile(Profile::Smart),
    );

    for name in ["RELIANCE", "ZOMATO", "TCS", "IRFC"] {
        let outcome = fetcher.fetch(name, Interval::FifteenMinutes).await.expect("catalog");
        assert_eq!(outcome.resolved.as_str(), format!("{name}.NS"));
        assert_eq!(outcome.source, ProviderId::Synthetic);
        assert!(!outcome.series.is_empty());
    }

    let error = fetcher
        .fetch("HDFC", Interval::FifteenMinutes)
        .await
        .expect_err("not in catalog");
    assert_eq!(error.reason, FetchFailure::NoDataFound);
}
