//! Gap Detector: three-candle price imbalances.
//!
//! An up gap exists when the third candle's low clears the first candle's high;
//! a down gap when the third candle's high stays under the first candle's low.

use chrono::{DateTime, Utc};

use crate::domain::{Candle, Gap, GapDirection};

/// Scan every 3-candle position left to right.
///
/// When `window_filter` is given, a gap is kept only if the middle (impulse)
/// candle's timestamp satisfies it. Output is in ascending formation order.
pub fn find_gaps(
    candles: &[Candle],
    window_filter: Option<&dyn Fn(DateTime<Utc>) -> bool>,
) -> Vec<Gap> {
    candles
        .windows(3)
        .enumerate()
        .filter(|(_, w)| window_filter.map_or(true, |f| f(w[1].timestamp)))
        .filter_map(|(i, w)| gap_at(i, &w[0], &w[1], &w[2]))
        .collect()
}

/// The most recent gap in `direction`, if any.
pub fn find_latest_gap(
    candles: &[Candle],
    direction: GapDirection,
    window_filter: Option<&dyn Fn(DateTime<Utc>) -> bool>,
) -> Option<Gap> {
    find_gaps(candles, window_filter)
        .into_iter()
        .rev()
        .find(|g| g.direction == direction)
}

fn gap_at(i: usize, first: &Candle, impulse: &Candle, last: &Candle) -> Option<Gap> {
    let (direction, top, bottom) = if last.low > first.high {
        (GapDirection::Up, last.low, first.high)
    } else if last.high < first.low {
        (GapDirection::Down, first.low, last.high)
    } else {
        return None;
    };

    Some(Gap {
        direction,
        top,
        bottom,
        midpoint: (top + bottom) / 2.0,
        first_index: i,
        impulse_index: i + 1,
        last_index: i + 2,
        formed_at: first.timestamp,
        impulse_high: impulse.high,
        impulse_low: impulse.low,
    })
}
