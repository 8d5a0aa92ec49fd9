//! Trailing window primitives.
//!
//! Every function returns one output per input row and only looks at rows
//! `0..=i` to produce row `i`. `None` marks rows where the window does not
//! have enough history yet.

use std::collections::VecDeque;

use crate::Bar;

/// Trailing simple moving average; `None` until `period` rows exist.
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    for i in (period - 1)..values.len() {
        let start = i + 1 - period;
        let sum: f64 = values[start..=i].iter().sum();
        out[i] = Some(sum / period as f64);
    }

    out
}

/// Recursive EMA with `alpha = 2 / (span + 1)`, seeded with the first value.
///
/// This is the unadjusted form: `ema[0] = x[0]` and
/// `ema[i] = alpha * x[i] + (1 - alpha) * ema[i - 1]`.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut previous: Option<f64> = None;

    for &value in values {
        let next = match previous {
            None => value,
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
        };
        out.push(next);
        previous = Some(next);
    }

    out
}

/// RSI with simple-average smoothing of gains and losses.
///
/// Row 0 has no prior close and contributes a zero move, so the first defined
/// value is at row `period - 1`. A window with losses of zero and positive
/// gains saturates at 100; a window without any movement stays undefined.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        let delta = if i == 0 { 0.0 } else { closes[i] - closes[i - 1] };
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }

    let avg_gain = sma(&gains, period);
    let avg_loss = sma(&losses, period);

    avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|(gain, loss)| match (gain?, loss?) {
            (gain, loss) if loss == 0.0 && gain == 0.0 => None,
            (_, loss) if loss == 0.0 => Some(100.0),
            (gain, loss) => Some(100.0 - 100.0 / (1.0 + gain / loss)),
        })
        .collect()
}

/// Trailing maximum over at most `window` rows, defined from row 0.
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, |candidate, kept| candidate >= kept)
}

/// Trailing minimum over at most `window` rows, defined from row 0.
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_extreme(values, window, |candidate, kept| candidate <= kept)
}

// Monotonic deque of indices; `dominates(new, old)` evicts `old` from the back.
fn rolling_extreme<F>(values: &[f64], window: usize, dominates: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> bool,
{
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut deque: VecDeque<usize> = VecDeque::new();

    for (i, &value) in values.iter().enumerate() {
        while deque.back().is_some_and(|&j| dominates(value, values[j])) {
            deque.pop_back();
        }
        deque.push_back(i);

        while deque.front().is_some_and(|&j| j + window <= i) {
            deque.pop_front();
        }

        match deque.front() {
            Some(&j) => out.push(values[j]),
            None => out.push(value),
        }
    }

    out
}

/// Cumulative volume-weighted typical price from the first bar.
///
/// Undefined while cumulative volume is still zero.
pub fn cumulative_vwap(bars: &[Bar]) -> Vec<Option<f64>> {
    let mut price_volume = 0.0_f64;
    let mut volume = 0.0_f64;

    bars.iter()
        .map(|bar| {
            let bar_volume = bar.volume as f64;
            price_volume += bar.typical_price() * bar_volume;
            volume += bar_volume;
            (volume > 0.0).then(|| price_volume / volume)
        })
        .collect()
}

/// Row-over-row percent change of `values`.
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i == 0 || values[i - 1] == 0.0 {
            out.push(None);
        } else {
            out.push(Some((values[i] - values[i - 1]) / values[i - 1] * 100.0));
        }
    }
    out
}
