//! CLI argument definitions for QuantPro.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `terminal` | Fetch, annotate and render one symbol |
//! | `session` | Interactive watchlist/terminal loop on stdin |
//! | `profiles` | Show the policy knobs of each profile |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `table` | Output format (table, json) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--profile` | `smart` | Pipeline profile (smart, institutional) |
//! | `--source` | `yahoo` | Data source (yahoo, synthetic) |
//! | `--cache-ttl-secs` | env or `60` | Fetch cache lifetime |
//! | `--timeout-ms` | env or `10000` | HTTP request timeout |
//! | `--audit-rows` | `200` | Rows in the audit log |
//! | `-v` | off | Debug logging on stderr |
//!
//! # Examples
//!
//! ```bash
//! quantpro terminal RELIANCE --interval 1d
//! quantpro --profile institutional --format json --pretty terminal tcs
//! quantpro --source synthetic session
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use quantpro_core::{ProviderId, Profile};

/// QuantPro - technical audit terminal for equities
#[derive(Debug, Parser)]
#[command(
    name = "quantpro",
    author,
    version,
    about = "Technical audit terminal: RSI, VWAP, moving averages and 52-week range"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Pipeline profile.
    ///
    /// - smart: suffix fallback, single attempt, base indicators
    /// - institutional: forced suffix, 3 attempts, SMA 200, average volume, actions
    #[arg(long, global = true, value_enum, default_value_t = ProfileArg::Smart)]
    pub profile: ProfileArg,

    /// Market data source.
    #[arg(long, global = true, value_enum, default_value_t = SourceSelector::Yahoo)]
    pub source: SourceSelector,

    /// Seconds a fetched series stays cached (0 disables the cache).
    #[arg(long, global = true)]
    pub cache_ttl_secs: Option<u64>,

    /// HTTP request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Rows shown in the historical audit log.
    #[arg(long, global = true)]
    pub audit_rows: Option<usize>,

    /// Raise log verbosity on stderr (RUST_LOG still wins when set).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Scorecard, RSI chart and audit log for the terminal.
    Table,
    /// Single JSON envelope.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    Smart,
    Institutional,
}

impl From<ProfileArg> for Profile {
    fn from(value: ProfileArg) -> Self {
        match value {
            ProfileArg::Smart => Profile::Smart,
            ProfileArg::Institutional => Profile::Institutional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceSelector {
    /// Yahoo Finance chart API.
    Yahoo,
    /// Deterministic offline generator.
    Synthetic,
}

impl From<SourceSelector> for ProviderId {
    fn from(value: SourceSelector) -> Self {
        match value {
            SourceSelector::Yahoo => ProviderId::Yahoo,
            SourceSelector::Synthetic => ProviderId::Synthetic,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one symbol and render its technical scorecard.
    ///
    /// # Examples
    ///
    ///   quantpro terminal RELIANCE
    ///   quantpro terminal zomato --interval 1h
    Terminal(TerminalArgs),

    /// Interactive session driven by commands on stdin.
    ///
    /// Commands: open, search <SYMBOL>, add <SYMBOL>, remove <SYMBOL>,
    /// home, terminal, interval <15m|1h|1d>, list, show, quit.
    Session(SessionArgs),

    /// Show the policy knobs of each profile.
    Profiles,
}

#[derive(Debug, Args)]
pub struct TerminalArgs {
    /// Ticker or company symbol; the market suffix is optional.
    pub symbol: String,

    /// Bar interval: 5m, 15m, 1h or 1d.
    #[arg(long, default_value = "15m")]
    pub interval: String,

    /// Number of recent RSI values drawn in the chart.
    #[arg(long, default_value_t = 60)]
    pub chart_width: usize,
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Number of recent RSI values drawn in the chart.
    #[arg(long, default_value_t = 60)]
    pub chart_width: usize,
}
