//! Trident Core: candles, indicators, gap detection, pattern validation and
//! forward exit simulation.
//!
//! Pure computation only: every function here is a deterministic function of
//! its inputs. File and network access live in `trident-runner`.
//!
//! - Domain types (candles, gaps, signals, trades, instruments)
//! - Indicator Engine (EMA series, stacking, trend bias, doji)
//! - Time Window Filter (kill zone, gap formation window, trading days)
//! - Pattern Validator (gap → doji → confirmation → trend gates)
//! - Simulation Engine (sliding scan, forward exits, summary statistics)

pub mod data;
pub mod domain;
pub mod indicators;
pub mod params;
pub mod pattern;
pub mod simulation;
pub mod time_filter;

pub use domain::{Candle, Direction, Instrument, SimulatedTrade, TradeSignal};
pub use params::{EmaPeriods, PatternParams, SimulationParams};
pub use pattern::TridentValidator;
pub use simulation::{Backtest, BacktestSummary, DailySeries};
pub use time_filter::SessionCalendar;
