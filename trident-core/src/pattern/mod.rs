//! Pattern detection: gap scanning and the Trident validator.

pub mod gap_detector;
pub mod trident;

pub use gap_detector::{find_gaps, find_latest_gap};
pub use trident::{Rejection, TridentValidator};

/// Shared candle fixtures for pattern and simulation tests. Downstream crates
/// reach them through the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
pub mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::domain::Candle;

    /// First bar of [`long_setup`] when the gap should print inside the default
    /// New York sessions in January: the impulse lands on 08:00 UTC (03:00 EST)
    /// and the confirmation on 09:30 UTC (04:30 EST).
    pub fn session_base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 9, 16, 30, 0).unwrap()
    }

    /// Thirty steadily rising bars, then an up gap (bars 30..=32), a doji
    /// probing the gap midpoint (33) and a controlled confirmation (34).
    ///
    /// Gap: bottom 130.5, top 131.0, midpoint 130.75; impulse low 129.8.
    pub fn long_setup(base: DateTime<Utc>) -> Vec<Candle> {
        let mut rows: Vec<(f64, f64, f64, f64)> = (0..30)
            .map(|i| {
                let close = 100.0 + i as f64;
                let open = if i == 0 { close } else { close - 1.0 };
                (open, close + 0.5, open - 0.5, close)
            })
            .collect();
        rows.extend([
            (129.0, 130.5, 128.5, 130.0),
            (130.0, 134.5, 129.8, 134.0),
            (134.0, 135.5, 131.0, 135.0),
            (135.0, 135.6, 130.7, 135.05),
            (135.05, 135.5, 134.8, 135.3),
        ]);
        build(base, &rows)
    }

    /// Append `n` quiet bars drifting by `step` per bar. Ranges overlap, so
    /// no new gaps form.
    pub fn drift(mut candles: Vec<Candle>, n: usize, step: f64) -> Vec<Candle> {
        for _ in 0..n {
            let prev = candles[candles.len() - 1];
            let open = prev.close;
            let close = open + step;
            candles.push(Candle::new(
                prev.timestamp + Duration::minutes(30),
                open,
                open.max(close) + 0.3,
                open.min(close) - 0.3,
                close,
            ));
        }
        candles
    }

    /// Append another copy of the five-bar gap/doji/confirmation tail of
    /// [`long_setup`], shifted to start from the current last close.
    pub fn append_long_setup(mut candles: Vec<Candle>) -> Vec<Candle> {
        let last = candles[candles.len() - 1];
        let d = last.close - 129.0;
        let rows = [
            (129.0, 130.5, 128.5, 130.0),
            (130.0, 134.5, 129.8, 134.0),
            (134.0, 135.5, 131.0, 135.0),
            (135.0, 135.6, 130.7, 135.05),
            (135.05, 135.5, 134.8, 135.3),
        ];
        for (i, (o, h, l, c)) in rows.into_iter().enumerate() {
            candles.push(Candle::new(
                last.timestamp + Duration::minutes(30 * (i as i64 + 1)),
                o + d,
                h + d,
                l + d,
                c + d,
            ));
        }
        candles
    }

    /// Mirror of [`long_setup`] around 300: a short setup with stop 170.2.
    pub fn short_setup(base: DateTime<Utc>) -> Vec<Candle> {
        mirror(&long_setup(base), 300.0)
    }

    pub fn mirror(candles: &[Candle], axis: f64) -> Vec<Candle> {
        candles
            .iter()
            .map(|c| {
                Candle::new(
                    c.timestamp,
                    axis - c.open,
                    axis - c.low,
                    axis - c.high,
                    axis - c.close,
                )
            })
            .collect()
    }

    /// Build half-hourly candles from (open, high, low, close) rows.
    pub fn build(base: DateTime<Utc>, rows: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
        rows.iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| {
                Candle::new(base + Duration::minutes(30 * i as i64), o, h, l, c)
            })
            .collect()
    }
}
