//! Aggregation of simulated trades into per-symbol and overall statistics.

use serde::{Deserialize, Serialize};

use crate::domain::{Outcome, SimulatedTrade};

/// Statistics for one symbol, recomputed from its trade list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub symbol: String,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Fraction in [0, 1]; 0 when there are no trades.
    pub win_rate: f64,
    pub total_pnl_pips: f64,
    /// Mean over nonzero risk:reward values.
    pub avg_rr: f64,
    pub best_trade_pips: f64,
    pub worst_trade_pips: f64,
    pub max_drawdown_pips: f64,
}

impl BacktestSummary {
    pub fn from_trades(symbol: impl Into<String>, trades: &[SimulatedTrade]) -> Self {
        let total_trades = trades.len();
        let wins = trades.iter().filter(|t| t.outcome == Outcome::Win).count();
        let losses = trades.iter().filter(|t| t.outcome == Outcome::Loss).count();
        let pnl: Vec<f64> = trades.iter().map(|t| t.pnl_pips).collect();

        let nonzero_rr: Vec<f64> = trades
            .iter()
            .map(|t| t.rr_ratio)
            .filter(|&r| r != 0.0)
            .collect();
        let avg_rr = if nonzero_rr.is_empty() {
            0.0
        } else {
            nonzero_rr.iter().sum::<f64>() / nonzero_rr.len() as f64
        };

        Self {
            symbol: symbol.into(),
            total_trades,
            wins,
            losses,
            win_rate: ratio(wins, total_trades),
            total_pnl_pips: pnl.iter().sum(),
            avg_rr,
            best_trade_pips: pnl.iter().copied().reduce(f64::max).unwrap_or(0.0),
            worst_trade_pips: pnl.iter().copied().reduce(f64::min).unwrap_or(0.0),
            max_drawdown_pips: max_drawdown(&pnl),
        }
    }

    pub fn win_rate_pct(&self) -> f64 {
        self.win_rate * 100.0
    }
}

/// Totals across every symbol in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallSummary {
    pub symbols: usize,
    pub total_trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub total_pnl_pips: f64,
}

impl OverallSummary {
    pub fn from_summaries<'a>(summaries: impl IntoIterator<Item = &'a BacktestSummary>) -> Self {
        let mut out = Self::default();
        for s in summaries {
            out.symbols += 1;
            out.total_trades += s.total_trades;
            out.wins += s.wins;
            out.total_pnl_pips += s.total_pnl_pips;
        }
        out.win_rate = ratio(out.wins, out.total_trades);
        out
    }

    pub fn win_rate_pct(&self) -> f64 {
        self.win_rate * 100.0
    }
}

/// Largest drop of the cumulative P&L curve below its running maximum.
///
/// The running maximum starts at the first cumulative value, not at zero, so a
/// curve that only falls from its first point measures from there.
pub fn max_drawdown(pnl: &[f64]) -> f64 {
    let mut cumulative = 0.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for p in pnl {
        cumulative += p;
        peak = peak.max(cumulative);
        worst = worst.max(peak - cumulative);
    }
    worst
}

fn ratio(n: usize, d: usize) -> f64 {
    if d == 0 {
        0.0
    } else {
        n as f64 / d as f64
    }
}
