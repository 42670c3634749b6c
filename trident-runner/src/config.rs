//! Serializable backtest configuration.
//!
//! One TOML file drives a run:
//!
//! ```toml
//! [backtest]
//! symbols = ["EURUSD", "XAUUSD"]
//! days = 120
//!
//! [pattern]
//! doji_body_ratio = 0.3
//!
//! [pattern.ema]
//! fast = [5, 9, 13, 21]
//! trend = 200
//!
//! [sessions]
//! timezone = "America/New_York"
//! kill_zone = { start = "03:00", end = "06:30" }
//!
//! [simulation]
//! window_size = 50
//! ```
//!
//! Every section and field is optional; missing values take the defaults.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trident_core::data::Timeframe;
use trident_core::{PatternParams, SessionCalendar, SimulationParams};

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for a backtest or live scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub pattern: PatternParams,
    pub sessions: SessionCalendar,
    pub simulation: SimulationParams,
    pub live: LiveSection,
}

/// Universe and lookback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub symbols: Vec<String>,
    pub entry_timeframe: Timeframe,
    pub bias_timeframe: Timeframe,
    /// Calendar days of history ending at `end`.
    pub days: u32,
    /// End of the lookback; `None` means now.
    pub end: Option<DateTime<Utc>>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbols: vec![
                "EURUSD".into(),
                "GBPUSD".into(),
                "USDJPY".into(),
                "XAUUSD".into(),
            ],
            entry_timeframe: Timeframe::M30,
            bias_timeframe: Timeframe::D1,
            days: 90,
            end: None,
        }
    }
}

/// Live scan tick settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSection {
    /// Intraday candles fetched per symbol per tick.
    pub candle_count: usize,
    /// Daily candles fetched for the position monitor.
    pub daily_count: usize,
    pub lot_size: f64,
    pub max_open_trades: usize,
}

impl Default for LiveSection {
    fn default() -> Self {
        Self {
            candle_count: 200,
            daily_count: 100,
            lot_size: 0.01,
            max_open_trades: 3,
        }
    }
}

impl BacktestConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: BacktestConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// End of the lookback window, defaulting to `now`.
    pub fn end_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.backtest.end.unwrap_or(now)
    }

    /// Deterministic BLAKE3 hash of the configuration.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.backtest.symbols.is_empty() {
            return invalid("backtest.symbols must not be empty".into());
        }
        if self.backtest.symbols.iter().any(|s| s.trim().is_empty()) {
            return invalid("backtest.symbols contains an empty symbol".into());
        }
        if self.backtest.days == 0 {
            return invalid("backtest.days must be > 0".into());
        }

        let ema = &self.pattern.ema;
        if ema.fast.len() < 2 {
            return invalid("pattern.ema.fast needs at least two periods".into());
        }
        if ema.fast.contains(&0) {
            return invalid("pattern.ema.fast periods must be > 0".into());
        }
        if !ema.fast.windows(2).all(|w| w[0] < w[1]) {
            return invalid(format!(
                "pattern.ema.fast must be strictly ascending, got {:?}",
                ema.fast
            ));
        }
        if ema.trend == 0 {
            return invalid("pattern.ema.trend must be > 0".into());
        }
        let ratio = self.pattern.doji_body_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return invalid(format!("pattern.doji_body_ratio must be in (0, 1], got {ratio}"));
        }
        if self.pattern.min_bars < 6 {
            return invalid("pattern.min_bars must be >= 6".into());
        }

        if !self.sessions.kill_zone.is_valid() {
            return invalid("sessions.kill_zone start must not be after end".into());
        }
        if !self.sessions.gap_window.is_valid() {
            return invalid("sessions.gap_window start must not be after end".into());
        }

        let sim = &self.simulation;
        if sim.window_size < self.pattern.min_bars {
            return invalid(format!(
                "simulation.window_size ({}) must be >= pattern.min_bars ({})",
                sim.window_size, self.pattern.min_bars
            ));
        }
        if sim.window_step == 0 || sim.window_step > sim.window_size {
            return invalid("simulation.window_step must be in 1..=window_size".into());
        }
        if sim.max_hold_bars == 0 {
            return invalid("simulation.max_hold_bars must be > 0".into());
        }
        if sim.reevaluate_every_days == 0 {
            return invalid("simulation.reevaluate_every_days must be > 0".into());
        }
        if sim.min_daily_bars < 2 {
            return invalid("simulation.min_daily_bars must be >= 2".into());
        }

        if self.live.lot_size.is_nan() || self.live.lot_size <= 0.0 {
            return invalid("live.lot_size must be > 0".into());
        }
        if self.live.candle_count < self.pattern.min_bars {
            return invalid("live.candle_count must be >= pattern.min_bars".into());
        }
        Ok(())
    }
}
