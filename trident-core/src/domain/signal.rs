//! TradeSignal: a fully validated Trident setup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::direction::Direction;
use super::gap::Gap;

/// Produced once per accepted pattern; immutable.
///
/// Invariant: `stop_loss` sits on the losing side of `entry_price`
/// (below for long, above for short).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub symbol: String,
    pub direction: Direction,
    /// Close of the confirmation candle.
    pub entry_price: f64,
    pub stop_loss: f64,
    pub gap: Gap,
    pub doji_index: usize,
    pub confirmation_index: usize,
    pub signal_time: DateTime<Utc>,
    /// Hard price stop (true) or close-based filter (false).
    pub use_hard_sl: bool,
}

impl TradeSignal {
    /// Initial distance between entry and stop.
    pub fn risk(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }

    /// Map window-local indices to global ones.
    pub fn shifted(mut self, offset: usize) -> Self {
        self.gap = self.gap.shifted(offset);
        self.doji_index += offset;
        self.confirmation_index += offset;
        self
    }

    /// Identity used to discard repeat detections from overlapping windows.
    pub fn key(&self) -> SignalKey {
        SignalKey {
            time: self.signal_time,
            price_bits: self.entry_price.to_bits(),
            direction: self.direction,
        }
    }
}

/// (entry timestamp, entry price, direction) deduplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub time: DateTime<Utc>,
    price_bits: u64,
    pub direction: Direction,
}

impl SignalKey {
    pub fn price(&self) -> f64 {
        f64::from_bits(self.price_bits)
    }
}
