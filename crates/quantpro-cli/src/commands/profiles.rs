use quantpro_core::{
    CandidateStrategy, Envelope, EnvelopeMeta, IndicatorSet, PipelineConfig, Profile,
    SignalThresholds,
};
use serde::Serialize;

use crate::cli::{Cli, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::Outcome;

#[derive(Debug, Serialize)]
struct ProfileSummary {
    profile: Profile,
    candidates: CandidateStrategy,
    max_attempts: u32,
    indicators: IndicatorSet,
    thresholds: SignalThresholds,
    cache_ttl_secs: u64,
    http_timeout_ms: u64,
    audit_rows: usize,
}

impl From<PipelineConfig> for ProfileSummary {
    fn from(config: PipelineConfig) -> Self {
        Self {
            profile: config.profile,
            candidates: config.candidates,
            max_attempts: config.retry.max_attempts,
            indicators: config.indicators,
            thresholds: config.thresholds,
            cache_ttl_secs: config.cache_ttl.as_secs(),
            http_timeout_ms: config.http_timeout_ms,
            audit_rows: config.audit_rows,
        }
    }
}

pub fn run(cli: &Cli) -> Result<Outcome, CliError> {
    let summaries = Profile::ALL
        .into_iter()
        .map(|profile| PipelineConfig::from_env(profile).map(ProfileSummary::from))
        .collect::<Result<Vec<_>, _>>()?;

    match cli.format {
        OutputFormat::Json => {
            let meta = EnvelopeMeta::new(cli.source.into(), 0, false);
            output::render_json(&Envelope::success(meta, summaries), cli.pretty)?;
        }
        OutputFormat::Table => {
            for summary in &summaries {
                println!("{}", summary.profile);
                println!("  candidates : {}", describe_candidates(&summary.candidates));
                println!("  attempts   : {}", summary.max_attempts);
                println!("  indicators : {}", describe_indicators(summary.indicators));
                println!("  signals    : {}", describe_thresholds(&summary.thresholds));
                println!("  cache ttl  : {}s", summary.cache_ttl_secs);
                println!("  timeout    : {}ms", summary.http_timeout_ms);
            }
        }
    }

    Ok(Outcome::Success)
}

fn describe_candidates(strategy: &CandidateStrategy) -> String {
    match strategy {
        CandidateStrategy::SuffixFallback { suffix } => {
            format!("try X{suffix} then X when X has no market suffix")
        }
        CandidateStrategy::AppendUnlessListed { suffix, recognized } => {
            format!("append {suffix} unless X ends with {}", recognized.join(" or "))
        }
    }
}

fn describe_indicators(set: IndicatorSet) -> String {
    let mut names = vec!["RSI 14", "EMA 20", "SMA 50", "VWAP", "52W H/L", "chg%"];
    if set.sma200 {
        names.push("SMA 200");
    }
    if set.avg_volume_20 {
        names.push("avg vol 20");
    }
    names.join(", ")
}

fn describe_thresholds(thresholds: &SignalThresholds) -> String {
    let zones = format!(
        "zones <{} / >{}",
        thresholds.oversold, thresholds.overbought
    );
    match thresholds.action {
        Some((buy, sell)) => format!("{zones}, actions BUY <{buy} / SELL >{sell}"),
        None => zones,
    }
}
