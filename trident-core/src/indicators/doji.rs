//! Doji classification.

use crate::domain::Candle;

/// True iff |close - open| / (high - low) <= `body_ratio_threshold`.
/// A zero-range candle is never a doji.
pub fn is_doji(candle: &Candle, body_ratio_threshold: f64) -> bool {
    let range = candle.range();
    if range <= 0.0 {
        return false;
    }
    candle.body() / range <= body_ratio_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap(), open, high, low, close)
    }

    #[test]
    fn small_body_is_doji() {
        // body 0.02, range 0.15, ratio ~0.133
        assert!(is_doji(&candle(100.00, 100.10, 99.95, 100.02), 0.3));
        assert!(!is_doji(&candle(100.00, 100.10, 99.95, 100.02), 0.1));
    }

    #[test]
    fn ratio_equal_to_threshold_passes() {
        assert!(is_doji(&candle(10.0, 12.0, 8.0, 11.0), 0.25));
    }

    #[test]
    fn zero_range_is_never_doji() {
        assert!(!is_doji(&candle(5.0, 5.0, 5.0, 5.0), 1.0));
    }

    #[test]
    fn marubozu_is_not_doji() {
        assert!(!is_doji(&candle(10.0, 12.0, 10.0, 12.0), 0.3));
    }
}
