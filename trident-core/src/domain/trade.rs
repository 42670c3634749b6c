//! SimulatedTrade: a trade opened from a signal and resolved by an exit rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::direction::Direction;
use super::instrument::Instrument;
use super::signal::TradeSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    /// Only while the forward simulation is stepping.
    Open,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Win => "win",
            Outcome::Loss => "loss",
            Outcome::Open => "open",
        }
    }
}

/// Why a trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    CloseFilter,
    TrendUnstack,
    MaxHold,
    OpposingDailyCandle,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop loss",
            ExitReason::CloseFilter => "close filter",
            ExitReason::TrendUnstack => "trend unstack",
            ExitReason::MaxHold => "max hold",
            ExitReason::OpposingDailyCandle => "opposing daily candle",
        }
    }

    /// Stop exits are losses regardless of the realized sign.
    fn forces_loss(self) -> bool {
        matches!(self, ExitReason::StopLoss | ExitReason::CloseFilter)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and why a trade left the market.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub price: f64,
    pub time: DateTime<Utc>,
    pub bar_index: usize,
    pub reason: ExitReason,
}

/// Created when a signal is accepted, closed exactly once by the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrade {
    pub symbol: String,
    pub direction: Direction,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: DateTime<Utc>,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub use_hard_sl: bool,

    // ── Exit ──
    pub exit_index: Option<usize>,
    pub exit_time: Option<DateTime<Utc>>,
    pub exit_price: Option<f64>,

    // ── Result ──
    /// Signed P&L in normalized price units.
    pub pnl_pips: f64,
    pub rr_ratio: f64,
    pub outcome: Outcome,
    pub exit_reason: Option<ExitReason>,
}

impl SimulatedTrade {
    /// Open a trade at the signal's confirmation close. `entry_index` is global.
    pub fn open(signal: &TradeSignal, entry_index: usize) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            entry_index,
            entry_time: signal.signal_time,
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
            use_hard_sl: signal.use_hard_sl,
            exit_index: None,
            exit_time: None,
            exit_price: None,
            pnl_pips: 0.0,
            rr_ratio: 0.0,
            outcome: Outcome::Open,
            exit_reason: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.outcome == Outcome::Open
    }

    /// Initial distance between entry and stop.
    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    pub fn bars_held(&self) -> usize {
        self.exit_index
            .map(|exit| exit.saturating_sub(self.entry_index))
            .unwrap_or(0)
    }

    /// Resolve the trade. Stop exits are losses; every other exit is a win only
    /// when the signed P&L is strictly positive.
    pub fn close(mut self, fill: ExitFill, instrument: &Instrument) -> Self {
        debug_assert!(self.is_open(), "trade closed twice");

        let pnl = instrument.pnl_units(self.direction, self.entry_price, fill.price);
        let risk = self.risk();

        self.exit_index = Some(fill.bar_index);
        self.exit_time = Some(fill.time);
        self.exit_price = Some(fill.price);
        self.pnl_pips = pnl;
        self.rr_ratio = if risk > 0.0 {
            pnl * instrument.unit_size / risk
        } else {
            0.0
        };
        self.outcome = if fill.reason.forces_loss() || pnl <= 0.0 {
            Outcome::Loss
        } else {
            Outcome::Win
        };
        self.exit_reason = Some(fill.reason);
        self
    }

    pub fn is_winner(&self) -> bool {
        self.outcome == Outcome::Win
    }
}
