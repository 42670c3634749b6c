//! Simulation Engine: sliding scan, forward exits, aggregation.

pub mod daily;
pub mod exit;
pub mod scan;
pub mod summary;

pub use daily::{daily_exit_signal, DailySeries, DayClock};
pub use exit::{stop_exit, ExitSimulator};
pub use scan::{window_starts, Backtest};
pub use summary::{max_drawdown, BacktestSummary, OverallSummary};
