use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::data_source::{DataSource, HistoryRequest, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::throttling::ProviderThrottle;
use crate::{Interval, ProviderId, RawFrame, RawTimestamp};

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance chart-endpoint adapter.
///
/// Columns come back as two header levels, `(field, ticker)`, the shape a
/// ticker-qualified download has; the fetcher flattens them.
#[derive(Clone)]
pub struct YahooSource {
    http_client: Arc<dyn HttpClient>,
    throttle: ProviderThrottle,
    timeout_ms: u64,
}

impl Default for YahooSource {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new()))
    }
}

impl YahooSource {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            throttle: ProviderThrottle::new(Duration::from_secs(60), 60),
            timeout_ms: 10_000,
        }
    }

    pub fn with_throttle(mut self, throttle: ProviderThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn chart_url(&self, req: &HistoryRequest) -> String {
        format!(
            "{CHART_BASE_URL}/v8/finance/chart/{}?range={}&interval={}&includeAdjustedClose=true&events=div%2Csplits",
            urlencoding::encode(req.symbol.as_str()),
            req.lookback.as_str(),
            yahoo_interval(req.interval),
        )
    }

    async fn fetch_chart(&self, req: &HistoryRequest) -> Result<RawFrame, SourceError> {
        self.throttle.acquire().await;

        let url = self.chart_url(req);
        debug!(symbol = %req.symbol, interval = %req.interval, %url, "requesting yahoo chart");

        let request = HttpRequest::get(url)
            .with_header("referer", "https://finance.yahoo.com/")
            .with_header("accept", "application/json")
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.retryable() {
                SourceError::unavailable(format!("yahoo transport error: {}", error.message()))
            } else {
                SourceError::internal(format!("yahoo transport error: {}", error.message()))
            }
        })?;

        match response.status {
            200..=299 => {}
            404 => {
                debug!(symbol = %req.symbol, "yahoo has no chart for symbol");
                return Ok(RawFrame::empty());
            }
            429 => {
                return Err(SourceError::rate_limited("yahoo returned status 429"));
            }
            408 | 500..=599 => {
                return Err(SourceError::unavailable(format!(
                    "yahoo returned status {}",
                    response.status
                )));
            }
            status => {
                return Err(SourceError::invalid_request(format!(
                    "yahoo returned status {status}"
                )));
            }
        }

        parse_chart(&response.body, req.symbol.as_str())
    }
}

impl DataSource for YahooSource {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawFrame, SourceError>> + Send + 'a>> {
        Box::pin(async move { self.fetch_chart(&req).await })
    }
}

fn yahoo_interval(interval: Interval) -> &'static str {
    match interval {
        Interval::FiveMinutes => "5m",
        Interval::FifteenMinutes => "15m",
        Interval::OneHour => "60m",
        Interval::OneDay => "1d",
    }
}

fn parse_chart(body: &str, requested: &str) -> Result<RawFrame, SourceError> {
    let chart: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed_payload(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = chart.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Ok(RawFrame::empty());
        }
        return Err(SourceError::invalid_request(format!(
            "yahoo chart error {}: {}",
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    let Some(result) = chart.chart.result.and_then(|results| results.into_iter().next()) else {
        return Ok(RawFrame::empty());
    };

    let timestamps = result.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        return Ok(RawFrame::empty());
    }

    let ticker = result
        .meta
        .and_then(|meta| meta.symbol)
        .unwrap_or_else(|| requested.to_owned());

    let Some(quote) = result.indicators.quote.into_iter().next() else {
        warn!(%ticker, "yahoo chart carried timestamps without quote arrays");
        return Ok(RawFrame::empty());
    };

    let mut frame = RawFrame::new(timestamps.into_iter().map(RawTimestamp::UnixSeconds).collect())
        .with_column(&["Open", ticker.as_str()], quote.open)
        .with_column(&["High", ticker.as_str()], quote.high)
        .with_column(&["Low", ticker.as_str()], quote.low)
        .with_column(&["Close", ticker.as_str()], quote.close)
        .with_column(&["Volume", ticker.as_str()], quote.volume);

    if let Some(adjusted) = result
        .indicators
        .adjclose
        .and_then(|series| series.into_iter().next())
    {
        frame = frame.with_column(&["Adj Close", ticker.as_str()], adjusted.adjclose);
    }

    Ok(frame)
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooChartError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartMeta {
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
    #[serde(default)]
    adjclose: Option<Vec<YahooAdjClose>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::Symbol;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct RecordingHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn responding(response: Result<HttpResponse, HttpError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    const CHART_BODY: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "RELIANCE.NS", "currency": "INR"},
                "timestamp": [1704067200, 1704153600],
                "indicators": {
                    "quote": [{
                        "open": [2500.0, 2510.0],
                        "high": [2520.0, 2530.5],
                        "low": [2490.0, 2505.0],
                        "close": [2510.0, 2525.0],
                        "volume": [1200000, null]
                    }],
                    "adjclose": [{"adjclose": [2510.0, 2525.0]}]
                }
            }],
            "error": null
        }
    }"#;

    fn request(symbol: &str, interval: Interval) -> HistoryRequest {
        HistoryRequest::new(Symbol::parse(symbol).expect("valid symbol"), interval)
    }

    #[tokio::test]
    async fn chart_response_becomes_two_level_frame() {
        let client = RecordingHttpClient::responding(Ok(HttpResponse::ok_json(CHART_BODY)));
        let source = YahooSource::new(client.clone());

        let frame = source
            .history(request("RELIANCE.NS", Interval::OneDay))
            .await
            .expect("chart should parse");

        assert_eq!(frame.index.len(), 2);
        assert_eq!(frame.header_depth(), 2);
        assert_eq!(frame.columns[0].key, vec!["Open", "RELIANCE.NS"]);
        assert_eq!(frame.columns.len(), 6);

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.contains("/v8/finance/chart/RELIANCE.NS"));
        assert!(requests[0].url.contains("range=max"));
        assert!(requests[0].url.contains("interval=1d"));
    }

    #[tokio::test]
    async fn intraday_requests_use_short_lookback() {
        let client = RecordingHttpClient::responding(Ok(HttpResponse::ok_json(CHART_BODY)));
        let source = YahooSource::new(client.clone());

        source
            .history(request("TCS.NS", Interval::OneHour))
            .await
            .expect("chart should parse");

        let url = &client.recorded_requests()[0].url;
        assert!(url.contains("range=60d"));
        assert!(url.contains("interval=60m"));
    }

    #[tokio::test]
    async fn not_found_is_an_empty_frame() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let client = RecordingHttpClient::responding(Ok(HttpResponse::with_status(404, body)));
        let source = YahooSource::new(client);

        let frame = source
            .history(request("NOSUCH", Interval::OneDay))
            .await
            .expect("404 is not an error");
        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let client = RecordingHttpClient::responding(Ok(HttpResponse::with_status(503, "")));
        let source = YahooSource::new(client);

        let error = source
            .history(request("TCS.NS", Interval::OneDay))
            .await
            .expect_err("503 must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert!(error.retryable());
    }

    #[tokio::test]
    async fn transport_failures_are_retryable() {
        let client = RecordingHttpClient::responding(Err(HttpError::new("connection reset")));
        let source = YahooSource::new(client);

        let error = source
            .history(request("TCS.NS", Interval::OneDay))
            .await
            .expect_err("transport must fail");
        assert!(error.retryable());
        assert!(error.message().contains("connection reset"));
    }

    #[tokio::test]
    async fn garbage_payload_is_terminal() {
        let client = RecordingHttpClient::responding(Ok(HttpResponse::ok_json("<html>")));
        let source = YahooSource::new(client);

        let error = source
            .history(request("TCS.NS", Interval::OneDay))
            .await
            .expect_err("html must fail");
        assert_eq!(error.kind(), SourceErrorKind::MalformedPayload);
        assert!(!error.retryable());
    }

    #[tokio::test]
    async fn unsupported_range_is_terminal() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input - interval=5m is not supported"}}}"#;
        let client = RecordingHttpClient::responding(Ok(HttpResponse::ok_json(body)));
        let source = YahooSource::new(client);

        let error = source
            .history(request("TCS.NS", Interval::FiveMinutes))
            .await
            .expect_err("chart error must fail");
        assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    }
}
