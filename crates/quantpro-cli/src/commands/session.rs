use std::str::FromStr;

use quantpro_core::{Interval, Screen, SessionState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::cli::{Cli, SessionArgs};
use crate::error::CliError;
use crate::output;

use super::{Outcome, Pipeline};

/// One parsed line of session input.
#[derive(Debug, PartialEq, Eq)]
enum SessionCommand {
    Open(Option<String>),
    Search(String),
    Add(String),
    Remove(String),
    Home,
    Terminal,
    Interval(String),
    List,
    Show,
    Refresh,
    Help,
    Quit,
}

impl FromStr for SessionCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or("").to_ascii_lowercase();
        let argument = parts.collect::<Vec<_>>().join(" ");
        let required = |name: &str| {
            if argument.is_empty() {
                Err(format!("'{name}' needs a symbol"))
            } else {
                Ok(argument.clone())
            }
        };

        match verb.as_str() {
            "open" => Ok(Self::Open((!argument.is_empty()).then(|| argument.clone()))),
            "search" => required("search").map(Self::Search),
            "add" => required("add").map(Self::Add),
            "remove" | "rm" => required("remove").map(Self::Remove),
            "home" | "welcome" => Ok(Self::Home),
            "terminal" => Ok(Self::Terminal),
            "interval" => {
                if argument.is_empty() {
                    Err(String::from("'interval' needs one of 15m, 1h, 1d"))
                } else {
                    Ok(Self::Interval(argument.clone()))
                }
            }
            "list" | "ls" => Ok(Self::List),
            "show" | "" => Ok(Self::Show),
            "refresh" | "r" => Ok(Self::Refresh),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}', type 'help'")),
        }
    }
}

pub async fn run(args: &SessionArgs, pipeline: &Pipeline, cli: &Cli) -> Result<Outcome, CliError> {
    let mut state = SessionState::default();
    info!(profile = %pipeline.config.profile, source = %pipeline.source_id(), "session started");
    render(&state, pipeline, cli, args.chart_width).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        debug!(?command, "session command");

        let redraw = match command {
            SessionCommand::Quit => break,
            SessionCommand::Help => {
                print_help();
                false
            }
            SessionCommand::List => {
                output::render_watchlist(&state);
                false
            }
            SessionCommand::Show => true,
            SessionCommand::Refresh => {
                pipeline.refresh().await;
                state.screen() == Screen::Terminal
            }
            SessionCommand::Home => {
                state.navigate(Screen::Welcome);
                true
            }
            SessionCommand::Terminal | SessionCommand::Open(None) => {
                state.navigate(Screen::Terminal);
                true
            }
            SessionCommand::Open(Some(ticker)) => state.select_ticker(&ticker),
            SessionCommand::Search(query) => state.launch_search(&query),
            SessionCommand::Add(ticker) => {
                if !state.add_to_watchlist(&ticker) {
                    eprintln!("'{}' is already watched", ticker.trim().to_ascii_uppercase());
                }
                output::render_watchlist(&state);
                false
            }
            SessionCommand::Remove(ticker) => {
                if !state.remove_from_watchlist(&ticker) {
                    eprintln!("'{}' is not on the watchlist", ticker.trim().to_ascii_uppercase());
                }
                output::render_watchlist(&state);
                false
            }
            SessionCommand::Interval(value) => match Interval::from_str(&value) {
                Ok(interval) if state.set_interval(interval) => state.screen() == Screen::Terminal,
                Ok(interval) => {
                    eprintln!("interval {interval} is not offered, use 15m, 1h or 1d");
                    false
                }
                Err(error) => {
                    eprintln!("{error}");
                    false
                }
            },
        };

        if redraw {
            render(&state, pipeline, cli, args.chart_width).await?;
        }
    }

    info!("session ended");
    Ok(Outcome::Success)
}

async fn render(
    state: &SessionState,
    pipeline: &Pipeline,
    cli: &Cli,
    chart_width: usize,
) -> Result<(), CliError> {
    match state.screen() {
        Screen::Welcome => {
            output::render_welcome();
            output::render_watchlist(state);
        }
        Screen::Terminal => {
            let envelope = pipeline
                .view(state.active_ticker(), state.interval(), chart_width)
                .await;
            output::render_view(&envelope, cli.format, cli.pretty)?;
        }
    }
    Ok(())
}

fn print_help() {
    println!("open [SYMBOL]      open the terminal (optionally on SYMBOL)");
    println!("search SYMBOL      watch SYMBOL, activate it and open the terminal");
    println!("add SYMBOL         add SYMBOL to the watchlist");
    println!("remove SYMBOL      remove SYMBOL from the watchlist");
    println!("interval 15m|1h|1d change the timeframe");
    println!("home | terminal    switch screens");
    println!("list | show        print the watchlist / redraw the screen");
    println!("refresh            drop cached series and refetch");
    println!("quit               leave the session");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            "search infy".parse::<SessionCommand>(),
            Ok(SessionCommand::Search(String::from("infy")))
        );
        assert_eq!("OPEN".parse::<SessionCommand>(), Ok(SessionCommand::Open(None)));
        assert_eq!(
            "open tcs".parse::<SessionCommand>(),
            Ok(SessionCommand::Open(Some(String::from("tcs"))))
        );
        assert_eq!(
            "interval 1h".parse::<SessionCommand>(),
            Ok(SessionCommand::Interval(String::from("1h")))
        );
        assert_eq!("".parse::<SessionCommand>(), Ok(SessionCommand::Show));
        assert_eq!("exit".parse::<SessionCommand>(), Ok(SessionCommand::Quit));
        assert_eq!("Refresh".parse::<SessionCommand>(), Ok(SessionCommand::Refresh));
    }

    #[test]
    fn rejects_missing_arguments_and_unknown_verbs() {
        assert!("add".parse::<SessionCommand>().is_err());
        assert!("interval".parse::<SessionCommand>().is_err());
        assert!("chart".parse::<SessionCommand>().is_err());
    }
}
