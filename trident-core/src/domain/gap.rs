//! Gap: a three-candle price imbalance ("fair value gap").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::direction::GapDirection;

/// A gap formed by three consecutive candles whose outer ranges do not overlap.
///
/// Invariant: `top > bottom` and `midpoint == (top + bottom) / 2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub direction: GapDirection,
    pub top: f64,
    pub bottom: f64,
    /// 50% level (consequent encroachment).
    pub midpoint: f64,
    pub first_index: usize,
    /// Index of the middle ("impulse") candle.
    pub impulse_index: usize,
    pub last_index: usize,
    /// Open time of the first forming candle.
    pub formed_at: DateTime<Utc>,
    pub impulse_high: f64,
    pub impulse_low: f64,
}

impl Gap {
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Stop-loss anchor: the impulse low for up gaps, the impulse high for down gaps.
    pub fn stop_anchor(&self) -> f64 {
        match self.direction {
            GapDirection::Up => self.impulse_low,
            GapDirection::Down => self.impulse_high,
        }
    }

    /// Shift all indices by `offset`, mapping window-local indices to global ones.
    pub fn shifted(mut self, offset: usize) -> Self {
        self.first_index += offset;
        self.impulse_index += offset;
        self.last_index += offset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn up_gap() -> Gap {
        Gap {
            direction: GapDirection::Up,
            top: 10.5,
            bottom: 10.0,
            midpoint: 10.25,
            first_index: 3,
            impulse_index: 4,
            last_index: 5,
            formed_at: Utc.with_ymd_and_hms(2024, 1, 2, 7, 0, 0).unwrap(),
            impulse_high: 10.8,
            impulse_low: 9.9,
        }
    }

    #[test]
    fn stop_anchor_follows_direction() {
        let mut g = up_gap();
        assert_eq!(g.stop_anchor(), 9.9);
        g.direction = GapDirection::Down;
        assert_eq!(g.stop_anchor(), 10.8);
    }

    #[test]
    fn shifted_moves_every_index() {
        let g = up_gap().shifted(100);
        assert_eq!((g.first_index, g.impulse_index, g.last_index), (103, 104, 105));
        assert!((g.height() - 0.5).abs() < 1e-12);
    }
}
