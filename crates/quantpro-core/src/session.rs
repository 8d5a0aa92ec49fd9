//! Per-user dashboard navigation state.
//!
//! One [`SessionState`] value belongs to one viewer; the presentation layer
//! owns it and mutates it only through the transition methods below.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

use crate::Interval;

/// Which page the viewer is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    #[default]
    Welcome,
    Terminal,
}

impl Screen {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Terminal => "terminal",
        }
    }
}

impl Display for Screen {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Screen {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "welcome" | "home" => Ok(Self::Welcome),
            "terminal" => Ok(Self::Terminal),
            other => Err(format!("unknown screen '{other}'")),
        }
    }
}

/// Intervals offered by the timeframe selector.
pub const SELECTABLE_INTERVALS: [Interval; 3] = [
    Interval::FifteenMinutes,
    Interval::OneHour,
    Interval::OneDay,
];

const DEFAULT_WATCHLIST: [&str; 4] = ["RELIANCE", "ZOMATO", "TCS", "IRFC"];
const DEFAULT_TICKER: &str = "RELIANCE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    screen: Screen,
    active_ticker: String,
    watchlist: Vec<String>,
    interval: Interval,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            screen: Screen::Welcome,
            active_ticker: DEFAULT_TICKER.to_owned(),
            watchlist: DEFAULT_WATCHLIST.iter().map(|item| (*item).to_owned()).collect(),
            interval: Interval::FifteenMinutes,
        }
    }
}

fn normalize(input: &str) -> Option<String> {
    let value = input.trim().to_ascii_uppercase();
    (!value.is_empty()).then_some(value)
}

impl SessionState {
    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn active_ticker(&self) -> &str {
        &self.active_ticker
    }

    pub fn watchlist(&self) -> &[String] {
        &self.watchlist
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Activates `ticker` and opens the terminal. Returns `false` for blank
    /// input.
    pub fn select_ticker(&mut self, ticker: &str) -> bool {
        let Some(ticker) = normalize(ticker) else {
            return false;
        };
        self.active_ticker = ticker;
        self.screen = Screen::Terminal;
        true
    }

    /// Appends `ticker` if it is not listed yet. Returns `true` when added.
    pub fn add_to_watchlist(&mut self, ticker: &str) -> bool {
        let Some(ticker) = normalize(ticker) else {
            return false;
        };
        if self.watchlist.contains(&ticker) {
            return false;
        }
        self.watchlist.push(ticker);
        true
    }

    /// Removes `ticker`. The active ticker is left untouched.
    pub fn remove_from_watchlist(&mut self, ticker: &str) -> bool {
        let Some(ticker) = normalize(ticker) else {
            return false;
        };
        let before = self.watchlist.len();
        self.watchlist.retain(|item| *item != ticker);
        self.watchlist.len() != before
    }

    pub fn navigate(&mut self, screen: Screen) {
        self.screen = screen;
    }

    /// Search box "launch": watch, activate and open the terminal.
    pub fn launch_search(&mut self, query: &str) -> bool {
        let Some(query) = normalize(query) else {
            return false;
        };
        self.add_to_watchlist(&query);
        self.select_ticker(&query)
    }

    /// Only intervals from [`SELECTABLE_INTERVALS`] are accepted.
    pub fn set_interval(&mut self, interval: Interval) -> bool {
        if !SELECTABLE_INTERVALS.contains(&interval) {
            return false;
        }
        self.interval = interval;
        true
    }
}
