use quantpro_core::{Envelope, IndicatedRow, Scorecard, SessionState};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::commands::TerminalView;
use crate::error::CliError;

pub fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{payload}");
    Ok(())
}

pub fn render_view(
    envelope: &Envelope<TerminalView>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => render_json(envelope, pretty),
        OutputFormat::Table => {
            render_view_table(envelope);
            Ok(())
        }
    }
}

fn render_view_table(envelope: &Envelope<TerminalView>) {
    let Some(view) = &envelope.data else {
        for error in &envelope.errors {
            println!("error: {}", error.message);
        }
        return;
    };

    let card = &view.scorecard;
    println!(
        "{}  [{}]  source={}  bars={}  latency={}ms{}",
        card.symbol,
        card.interval,
        envelope.meta.source,
        view.bars,
        envelope.meta.latency_ms,
        if envelope.meta.cache_hit { "  (cached)" } else { "" }
    );
    println!(
        "LTP {}  {}   as of {}",
        price(card.ltp),
        signed_pct(card.change_pct),
        card.as_of
    );
    println!();

    for line in scorecard_lines(card) {
        println!("{line}");
    }

    for warning in &envelope.meta.warnings {
        println!("note: {warning}");
    }

    println!();
    println!("Relative Strength Index (RSI 14)");
    for line in &view.rsi_chart {
        println!("{line}");
    }

    println!();
    println!("Historical audit log (newest first, {} rows)", view.audit_log.len());
    println!("{}", audit_header());
    for row in &view.audit_log {
        println!("{}", audit_line(row));
    }
}

fn scorecard_lines(card: &Scorecard) -> Vec<String> {
    let mut columns: Vec<Vec<String>> = vec![
        vec![
            String::from("Session"),
            format!("Open: {}", price(card.open)),
            format!("High: {}", price(card.high)),
            format!("Low:  {}", price(card.low)),
        ],
        vec![
            String::from("Institutional"),
            format!("VWAP:   {}", opt_price(card.vwap)),
            format!("EMA 20: {}", price(card.ema20)),
            format!("SMA 50: {}", opt_price(card.sma50)),
        ],
        vec![
            String::from("Benchmarks"),
            format!("52W H: {}", price(card.high_52w)),
            format!("52W L: {}", price(card.low_52w)),
            format!("Vol:   {}", group_thousands(card.volume.to_string())),
        ],
        vec![
            String::from("Momentum"),
            format!("RSI (14): {}", opt_fixed(card.rsi)),
            format!("Zone:     {}", card.zone),
        ],
    ];

    if let Some(sma200) = card.sma200 {
        columns[1].push(format!("SMA 200: {}", price(sma200)));
    }
    if let Some(avg) = card.avg_volume_20 {
        columns[2].push(format!("Avg Vol 20: {}", group_thousands(format!("{avg:.0}"))));
    }
    if let Some(action) = card.action {
        columns[3].push(format!("Action:   {action}"));
    }

    let depth = columns.iter().map(Vec::len).max().unwrap_or(0);
    (0..depth)
        .map(|i| {
            columns
                .iter()
                .map(|column| format!("{:<22}", column.get(i).map(String::as_str).unwrap_or("")))
                .collect::<String>()
                .trim_end()
                .to_owned()
        })
        .collect()
}

fn audit_header() -> String {
    format!(
        "{:<20} {:>11} {:>11} {:>11} {:>11} {:>12} {:>7} {:>11} {:>11} {:>11} {:>8}",
        "time", "open", "high", "low", "close", "volume", "rsi", "ema20", "sma50", "vwap", "chg%"
    )
}

fn audit_line(row: &IndicatedRow) -> String {
    let ts = row.ts.format_rfc3339();
    let ts = ts.trim_end_matches('Z').replacen('T', " ", 1);
    format!(
        "{:<20} {:>11.2} {:>11.2} {:>11.2} {:>11.2} {:>12} {:>7} {:>11.2} {:>11} {:>11} {:>8}",
        ts,
        row.open,
        row.high,
        row.low,
        row.close,
        row.volume,
        opt_fixed(row.rsi14),
        row.ema20,
        opt_fixed(row.sma50),
        opt_fixed(row.vwap),
        opt_fixed(row.pct_change),
    )
}

pub fn render_welcome() {
    println!("Welcome to QuantPro");
    println!("Professional grade market auditing for everyone.");
    println!();
    println!("  Smart search     just type the name, market suffixes are handled for you");
    println!("  Momentum tools   RSI with oversold/overbought guides");
    println!("  Quick watchlist  save assets and switch between them instantly");
    println!();
    println!("Type 'open' to launch the terminal or 'search <SYMBOL>' to analyse a stock.");
}

pub fn render_watchlist(state: &SessionState) {
    println!("Watchlist ({} | interval {}):", state.screen(), state.interval());
    for item in state.watchlist() {
        let marker = if item == state.active_ticker() { '>' } else { ' ' };
        println!(" {marker} {item}");
    }
}

fn price(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{}.{fraction}", group_thousands(whole.to_owned()))
}

fn opt_price(value: Option<f64>) -> String {
    value.map(price).unwrap_or_else(|| String::from("n/a"))
}

fn opt_fixed(value: Option<f64>) -> String {
    value
        .map(|value| format!("{value:.2}"))
        .unwrap_or_else(|| String::from("-"))
}

fn signed_pct(value: Option<f64>) -> String {
    value
        .map(|value| format!("{value:+.2}%"))
        .unwrap_or_else(|| String::from("n/a"))
}

fn group_thousands(digits: String) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
