//! Strategy and simulation parameters.
//!
//! Threaded explicitly into the validator and simulation constructors. Every
//! field has a default so partial TOML sections deserialize cleanly.

use serde::{Deserialize, Serialize};

/// Moving-average layout: fast periods ordered fastest first, plus the slow
/// trend period used for bias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaPeriods {
    pub fast: Vec<usize>,
    pub trend: usize,
}

impl Default for EmaPeriods {
    fn default() -> Self {
        Self {
            fast: vec![5, 9, 13, 21],
            trend: 200,
        }
    }
}

impl EmaPeriods {
    /// Fast periods only; the daily exit check does not use the trend average.
    pub fn fast_only(&self) -> Self {
        Self {
            fast: self.fast.clone(),
            trend: 0,
        }
    }

    /// Every period to compute, fast first. A zero trend period is skipped.
    pub fn all(&self) -> Vec<usize> {
        let mut periods = self.fast.clone();
        if self.trend > 0 && !periods.contains(&self.trend) {
            periods.push(self.trend);
        }
        periods
    }
}

/// Pattern Validator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    pub ema: EmaPeriods,
    /// Maximum |close - open| / (high - low) for a doji.
    pub doji_body_ratio: f64,
    /// Sequences shorter than this never produce a signal.
    pub min_bars: usize,
    /// Gate gaps on the formation window and confirmations on the kill zone.
    pub check_time: bool,
    /// Use hard price stops even on wick-prone instruments.
    pub wick_prone_hard_stop: bool,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            ema: EmaPeriods::default(),
            doji_body_ratio: 0.3,
            min_bars: 6,
            check_time: true,
            wick_prone_hard_stop: false,
        }
    }
}

/// Sliding-scan and forward-simulation parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Bars per scanned window.
    pub window_size: usize,
    /// Bars between window starts.
    pub window_step: usize,
    /// Bars after an accepted signal during which new signals are suppressed.
    pub cooldown_bars: usize,
    /// Forward bars before a trade is force-closed.
    pub max_hold_bars: usize,
    /// Day boundaries between daily stacking re-evaluations.
    pub reevaluate_every_days: usize,
    /// Daily bars required before the daily stacking check runs.
    pub min_daily_bars: usize,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            window_size: 50,
            window_step: 25,
            cooldown_bars: 10,
            max_hold_bars: 960,
            reevaluate_every_days: 1,
            min_daily_bars: 5,
        }
    }
}
