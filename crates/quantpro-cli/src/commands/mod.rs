mod profiles;
mod session;
mod terminal;

use std::sync::Arc;
use std::time::{Duration, Instant};

use quantpro_core::{
    annotate_with, audit_log, rsi_chart, DataSource, Envelope, EnvelopeError, EnvelopeMeta,
    Fetcher, IndicatedRow, Interval, PipelineConfig, ProviderId, ProviderThrottle, Scorecard,
    SyntheticSource, YahooSource,
};
use serde::Serialize;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

/// Height of the RSI chart in text lines.
const CHART_HEIGHT: usize = 11;

/// Everything one terminal screen shows.
#[derive(Debug, Clone, Serialize)]
pub struct TerminalView {
    pub scorecard: Scorecard,
    pub bars: usize,
    pub audit_log: Vec<IndicatedRow>,
    #[serde(skip)]
    pub rsi_chart: Vec<String>,
}

/// Fetch + annotate pipeline shared by the commands.
pub struct Pipeline {
    pub config: PipelineConfig,
    fetcher: Fetcher,
}

impl Pipeline {
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let mut config = PipelineConfig::from_env(cli.profile.into())?;
        if let Some(ttl) = cli.cache_ttl_secs {
            config.cache_ttl = Duration::from_secs(ttl);
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            if timeout_ms == 0 {
                return Err(CliError::Command(String::from(
                    "--timeout-ms must be greater than zero",
                )));
            }
            config.http_timeout_ms = timeout_ms;
        }
        if let Some(rows) = cli.audit_rows {
            config.audit_rows = rows;
        }

        let source = build_source(cli.source.into(), &config);
        debug!(profile = %config.profile, source = %source.id(), "pipeline ready");
        let fetcher = Fetcher::new(source, &config);
        Ok(Self { config, fetcher })
    }

    pub fn source_id(&self) -> ProviderId {
        self.fetcher.source_id()
    }

    /// Forgets cached series so the next view goes back to the provider.
    pub async fn refresh(&self) {
        self.fetcher.clear_cache().await;
    }

    /// Runs one fetch → annotate → project cycle and wraps it in an envelope.
    pub async fn view(
        &self,
        raw_symbol: &str,
        interval: Interval,
        chart_width: usize,
    ) -> Envelope<TerminalView> {
        let started = Instant::now();
        let result = self.fetcher.fetch(raw_symbol, interval).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(error) => {
                debug!(code = error.code(), error = %error, "fetch failed");
                let meta = EnvelopeMeta::new(self.source_id(), latency_ms, false);
                return Envelope::failure(
                    meta,
                    EnvelopeError::new(error.code(), error.user_message()),
                );
            }
        };

        let indicated = annotate_with(outcome.series, self.config.indicators);
        let mut meta = EnvelopeMeta::new(outcome.source, latency_ms, outcome.cache_hit)
            .with_resolved_symbol(outcome.resolved.clone());
        if interval.is_intraday() {
            meta.push_warning("52W high/low span 252 bars, not a calendar year, on intraday intervals");
        }

        let Some(scorecard) =
            Scorecard::from_series(&indicated, &outcome.resolved, &self.config.thresholds)
        else {
            return Envelope::failure(
                meta,
                EnvelopeError::new("fetch.no_data", "provider returned no usable bars"),
            );
        };

        let view = TerminalView {
            scorecard,
            bars: indicated.len(),
            audit_log: audit_log(&indicated, self.config.audit_rows),
            rsi_chart: rsi_chart(&indicated, chart_width, CHART_HEIGHT, &self.config.thresholds),
        };
        Envelope::success(meta, view)
    }
}

fn build_source(id: ProviderId, config: &PipelineConfig) -> Arc<dyn DataSource> {
    match id {
        ProviderId::Yahoo => Arc::new(
            YahooSource::default()
                .with_timeout_ms(config.http_timeout_ms)
                .with_throttle(ProviderThrottle::new(config.quota_window, config.quota_limit)),
        ),
        ProviderId::Synthetic => Arc::new(SyntheticSource::default()),
    }
}

/// Result of one command, ready for exit-code mapping.
pub enum Outcome {
    Success,
    FetchFailed,
}

pub async fn run(cli: &Cli) -> Result<Outcome, CliError> {
    match &cli.command {
        Command::Terminal(args) => {
            let pipeline = Pipeline::from_cli(cli)?;
            terminal::run(args, &pipeline, cli).await
        }
        Command::Session(args) => {
            let pipeline = Pipeline::from_cli(cli)?;
            session::run(args, &pipeline, cli).await
        }
        Command::Profiles => profiles::run(cli),
    }
}
