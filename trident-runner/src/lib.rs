//! Trident Runner: configuration, candle loading, backtest orchestration,
//! artifacts and the live scan tick.
//!
//! This crate builds on `trident-core` to provide:
//! - TOML configuration with validation and a stable hash
//! - Candle loading from CSV files, a deterministic synthetic source, or memory
//! - Parallel multi-symbol backtests with per-symbol and overall summaries
//! - JSON/CSV/Markdown artifacts with schema versioning
//! - A one-shot live scan and position monitor against an order executor

pub mod config;
pub mod data_loader;
pub mod export;
pub mod live;
pub mod runner;

pub use config::{BacktestConfig, BacktestSection, ConfigError, LiveSection};
pub use data_loader::{
    load_symbols, CsvCandleProvider, LoadError, LoadedData, LoadedSeries, MemoryProvider,
    SyntheticProvider,
};
pub use export::{export_json, export_trades_csv, generate_report, import_json, save_artifacts};
pub use live::{
    DryRunExecutor, ExecutionError, LiveScanner, MonitorOutcome, OpenPosition, OrderExecutor,
    OrderRequest, TickOutcome,
};
pub use runner::{run_backtest, run_loaded, run_symbol, RunError, RunResult, SymbolResult};
