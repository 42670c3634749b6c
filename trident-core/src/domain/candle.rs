//! Candle: the fundamental market data unit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::direction::CandleDirection;

/// OHLC(V) candle for one symbol over one bar interval.
///
/// Candles are immutable once fetched. A sequence of candles is ordered by
/// strictly increasing `timestamp` and addressed by array position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl Candle {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Absolute open/close distance.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// High/low distance.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Calendar date of the bar open (UTC).
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn direction(&self) -> CandleDirection {
        if self.close > self.open {
            CandleDirection::Bullish
        } else if self.close < self.open {
            CandleDirection::Bearish
        } else {
            CandleDirection::Neutral
        }
    }

    /// Basic OHLC sanity check: finite values, high is the top, low the bottom.
    pub fn is_sane(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}
