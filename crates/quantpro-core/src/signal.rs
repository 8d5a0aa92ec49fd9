//! RSI zone and action classification.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::config::SignalThresholds;

/// Momentum zone derived from RSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Zone {
    Oversold,
    Neutral,
    Overbought,
}

impl Zone {
    /// Strictly below `oversold` or strictly above `overbought`; anything
    /// else, including an undefined RSI, is neutral.
    pub fn classify(rsi: Option<f64>, thresholds: &SignalThresholds) -> Self {
        match rsi {
            Some(value) if value < thresholds.oversold => Self::Oversold,
            Some(value) if value > thresholds.overbought => Self::Overbought,
            _ => Self::Neutral,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Oversold => "OVERSOLD",
            Self::Neutral => "NEUTRAL",
            Self::Overbought => "OVERBOUGHT",
        }
    }
}

impl Display for Zone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse trade hint derived from RSI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl Action {
    /// `None` when the thresholds carry no action band.
    pub fn classify(rsi: Option<f64>, thresholds: &SignalThresholds) -> Option<Self> {
        let (buy_below, sell_above) = thresholds.action?;
        Some(match rsi {
            Some(value) if value < buy_below => Self::Buy,
            Some(value) if value > sell_above => Self::Sell,
            _ => Self::Hold,
        })
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Hold => "HOLD",
            Self::Sell => "SELL",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
