use std::str::FromStr;

use quantpro_core::Interval;

use crate::cli::{Cli, TerminalArgs};
use crate::error::CliError;
use crate::output;

use super::{Outcome, Pipeline};

pub async fn run(args: &TerminalArgs, pipeline: &Pipeline, cli: &Cli) -> Result<Outcome, CliError> {
    let interval = Interval::from_str(&args.interval)?;

    let envelope = pipeline.view(&args.symbol, interval, args.chart_width).await;
    output::render_view(&envelope, cli.format, cli.pretty)?;

    if envelope.errors.is_empty() {
        Ok(Outcome::Success)
    } else {
        Ok(Outcome::FetchFailed)
    }
}
