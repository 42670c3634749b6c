//! Closed enumerations for trade direction, trend bias, gap and candle direction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directional bias from the slow trend average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Long,
    Short,
    Neutral,
}

impl Bias {
    pub fn agrees_with(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Bias::Long, Direction::Long) | (Bias::Short, Direction::Short)
        )
    }
}

/// Direction of a three-candle price gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapDirection {
    Up,
    Down,
}

impl GapDirection {
    /// Trade direction a gap sets up: up gaps are bought, down gaps are sold.
    pub fn trade_direction(self) -> Direction {
        match self {
            GapDirection::Up => Direction::Long,
            GapDirection::Down => Direction::Short,
        }
    }
}

/// Colour of a single candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandleDirection {
    Bullish,
    Bearish,
    Neutral,
}

impl CandleDirection {
    /// True when the candle closes against `direction`.
    pub fn opposes(self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (CandleDirection::Bearish, Direction::Long) | (CandleDirection::Bullish, Direction::Short)
        )
    }
}
