//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! - **JSON**: full round-trip serialization of a [`RunResult`] with schema versioning
//! - **CSV**: the trade log and a per-symbol summary table
//! - **Markdown**: a human-readable run report
//!
//! All persisted artifacts include a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use trident_core::domain::SimulatedTrade;
use trident_core::BacktestSummary;

use crate::runner::{RunResult, SCHEMA_VERSION};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunResult` to pretty JSON.
pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the trade log, one row per simulated trade.
///
/// Columns: symbol, direction, entry_time, entry_price, stop_loss, exit_time,
/// exit_price, pnl_pips, rr_ratio, result, exit_reason
pub fn export_trades_csv<'a>(trades: impl IntoIterator<Item = &'a SimulatedTrade>) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "symbol",
        "direction",
        "entry_time",
        "entry_price",
        "stop_loss",
        "exit_time",
        "exit_price",
        "pnl_pips",
        "rr_ratio",
        "result",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            t.symbol.as_str(),
            t.direction.as_str(),
            &t.entry_time.format(TIME_FORMAT).to_string(),
            &format!("{:.5}", t.entry_price),
            &format!("{:.5}", t.stop_loss),
            &t.exit_time
                .map(|ts| ts.format(TIME_FORMAT).to_string())
                .unwrap_or_default(),
            &t.exit_price.map(|p| format!("{p:.5}")).unwrap_or_default(),
            &format!("{:.1}", t.pnl_pips),
            &format!("{:.2}", t.rr_ratio),
            t.outcome.as_str(),
            t.exit_reason.map(|r| r.as_str()).unwrap_or(""),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export per-symbol statistics, one row per symbol.
pub fn export_summary_csv<'a>(
    summaries: impl IntoIterator<Item = &'a BacktestSummary>,
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "total_trades",
        "wins",
        "losses",
        "win_rate_pct",
        "total_pnl_pips",
        "avg_rr",
        "best_trade_pips",
        "worst_trade_pips",
        "max_drawdown_pips",
    ])?;
    for s in summaries {
        wtr.write_record([
            s.symbol.as_str(),
            &s.total_trades.to_string(),
            &s.wins.to_string(),
            &s.losses.to_string(),
            &format!("{:.1}", s.win_rate_pct()),
            &format!("{:.1}", s.total_pnl_pips),
            &format!("{:.2}", s.avg_rr),
            &format!("{:.1}", s.best_trade_pips),
            &format!("{:.1}", s.worst_trade_pips),
            &format!("{:.1}", s.max_drawdown_pips),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a run.
///
/// Creates a directory named `{label}_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json`: the full `RunResult`
/// - `trades.csv`: the trade log
/// - `summary.csv`: per-symbol statistics
/// - `report.md`: the Markdown report
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        result.label(),
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    write(&run_dir.join("manifest.json"), &json)?;

    let trades_csv = export_trades_csv(result.all_trades())?;
    write(&run_dir.join("trades.csv"), &trades_csv)?;

    let summary_csv = export_summary_csv(result.results.iter().map(|r| &r.summary))?;
    write(&run_dir.join("summary.csv"), &summary_csv)?;

    write(&run_dir.join("report.md"), &generate_report(result))?;

    Ok(run_dir)
}

/// Load a `RunResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<RunResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report: metadata, one block per symbol, then the
/// overall summary.
pub fn generate_report(result: &RunResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Trident Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start.format("%Y-%m-%d"),
        result.end.format("%Y-%m-%d")
    ));
    md.push_str(&format!(
        "| Timeframes | {} entry, {} bias |\n",
        result.config.backtest.entry_timeframe, result.config.backtest.bias_timeframe
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    md.push_str(&format!("| Config Hash | {} |\n", result.config_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    for r in &result.results {
        let s = &r.summary;
        md.push_str(&format!("## {}\n\n", r.symbol));
        if r.intraday_bars == 0 {
            md.push_str("_No data._\n\n");
            continue;
        }
        md.push_str("| Metric | Value |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| Bars | {} ({} daily) |\n", r.intraday_bars, r.daily_bars));
        md.push_str(&format!("| Total Trades | {} |\n", s.total_trades));
        md.push_str(&format!("| Wins / Losses | {} / {} |\n", s.wins, s.losses));
        md.push_str(&format!("| Win Rate | {:.1}% |\n", s.win_rate_pct()));
        md.push_str(&format!("| Total PnL (pips) | {:+.1} |\n", s.total_pnl_pips));
        md.push_str(&format!("| Avg R:R | {:+.2} |\n", s.avg_rr));
        md.push_str(&format!("| Best Trade | {:+.1} pips |\n", s.best_trade_pips));
        md.push_str(&format!("| Worst Trade | {:+.1} pips |\n", s.worst_trade_pips));
        md.push_str(&format!("| Max Drawdown | {:.1} pips |\n", s.max_drawdown_pips));
        md.push('\n');
    }

    let o = &result.overall;
    md.push_str("## Overall Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbols | {} |\n", o.symbols));
    md.push_str(&format!("| Total Trades | {} |\n", o.total_trades));
    md.push_str(&format!("| Overall Win Rate | {:.1}% |\n", o.win_rate_pct()));
    md.push_str(&format!("| Total PnL (pips) | {:+.1} |\n", o.total_pnl_pips));

    md
}
