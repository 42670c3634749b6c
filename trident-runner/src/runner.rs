//! Backtest runner: wires loaded candles through the validator and the
//! simulation engine.
//!
//! Two entry points:
//! - `run_backtest()`: validates the config, loads data from a provider, then runs. Used by CLI.
//! - `run_loaded()`: takes pre-loaded data, no I/O. Symbols run in parallel.

use chrono::{DateTime, Duration, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use trident_core::data::{CandleProvider, DataSource};
use trident_core::domain::SimulatedTrade;
use trident_core::simulation::{Backtest, BacktestSummary, DailySeries, OverallSummary};
use trident_core::TridentValidator;

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_symbols, LoadError, LoadedData, LoadedSeries};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Outcome of one symbol's backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolResult {
    pub symbol: String,
    pub source: DataSource,
    pub intraday_bars: usize,
    pub daily_bars: usize,
    pub summary: BacktestSummary,
    pub trades: Vec<SimulatedTrade>,
}

/// Complete result of a multi-symbol run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config: BacktestConfig,
    pub config_hash: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub results: Vec<SymbolResult>,
    pub overall: OverallSummary,
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunResult {
    /// Every trade across symbols, in symbol order.
    pub fn all_trades(&self) -> impl Iterator<Item = &SimulatedTrade> {
        self.results.iter().flat_map(|r| r.trades.iter())
    }

    /// Short name used for artifact directories.
    pub fn label(&self) -> String {
        match self.results.as_slice() {
            [only] => only.symbol.clone(),
            _ => "trident".to_string(),
        }
    }
}

/// Validate the config, load every symbol through `provider`, run.
///
/// `now` anchors the lookback window when the config has no explicit end.
pub fn run_backtest(
    config: &BacktestConfig,
    provider: &dyn CandleProvider,
    now: DateTime<Utc>,
) -> Result<RunResult, RunError> {
    config.validate()?;
    let loaded = load_symbols(provider, config, now)?;
    let end = config.end_or(now);
    let start = end - Duration::days(i64::from(config.backtest.days));
    Ok(run_loaded(config, &loaded, start, end))
}

/// Run every loaded symbol; no I/O.
///
/// Symbols are independent, so they run on the rayon pool. Result order
/// matches the load order.
pub fn run_loaded(
    config: &BacktestConfig,
    loaded: &LoadedData,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> RunResult {
    let results: Vec<SymbolResult> = loaded
        .series
        .par_iter()
        .map(|series| run_symbol(config, series))
        .collect();

    let overall = OverallSummary::from_summaries(results.iter().map(|r| &r.summary));
    info!(
        symbols = overall.symbols,
        trades = overall.total_trades,
        win_rate = format_args!("{:.1}%", overall.win_rate_pct()),
        pnl = format_args!("{:+.1}", overall.total_pnl_pips),
        "backtest complete"
    );

    RunResult {
        schema_version: SCHEMA_VERSION,
        config: config.clone(),
        config_hash: config.config_hash(),
        start,
        end,
        results,
        overall,
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
    }
}

/// Backtest one symbol. Pure: the same series and config give the same result.
pub fn run_symbol(config: &BacktestConfig, series: &LoadedSeries) -> SymbolResult {
    let trades = if series.intraday.is_empty() {
        warn!(symbol = %series.symbol, "no intraday candles, skipping");
        Vec::new()
    } else {
        let validator = TridentValidator::new(config.pattern.clone(), config.sessions.clone());
        let daily = DailySeries::new(series.daily.clone(), &config.pattern.ema);
        Backtest::new(&validator, &config.simulation).run(
            &series.instrument,
            &series.intraday,
            &daily,
        )
    };

    let summary = BacktestSummary::from_trades(&series.symbol, &trades);
    info!(
        symbol = %series.symbol,
        bars = series.intraday.len(),
        trades = summary.total_trades,
        win_rate = format_args!("{:.1}%", summary.win_rate_pct()),
        pnl = format_args!("{:+.1}", summary.total_pnl_pips),
        "symbol done"
    );

    SymbolResult {
        symbol: series.symbol.clone(),
        source: series.source,
        intraday_bars: series.intraday.len(),
        daily_bars: series.daily.len(),
        summary,
        trades,
    }
}
