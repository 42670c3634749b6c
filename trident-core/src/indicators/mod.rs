//! Indicator Engine.
//!
//! Moving averages are computed once over a candle sequence into an
//! [`IndicatorSet`] keyed by bar index, parallel to the candle array. Predicates
//! (stacking, bias, doji) read from it and never touch raw OHLC.

pub mod doji;
pub mod ema;
pub mod trend;

use std::collections::BTreeMap;
use std::ops::Range;

use crate::domain::Candle;
use crate::params::EmaPeriods;

pub use doji::is_doji;
pub use ema::ema_of_series;
pub use trend::{is_stacked, trend_bias};

/// Per-bar moving averages for one candle sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    closes: Vec<f64>,
    fast_periods: Vec<usize>,
    trend_period: Option<usize>,
    series: BTreeMap<usize, Vec<f64>>,
}

/// Compute one EMA series per configured period.
pub fn compute_moving_averages(candles: &[Candle], periods: &EmaPeriods) -> IndicatorSet {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let series = periods
        .all()
        .into_iter()
        .map(|p| (p, ema_of_series(&closes, p)))
        .collect();

    IndicatorSet {
        closes,
        fast_periods: periods.fast.clone(),
        trend_period: (periods.trend > 0).then_some(periods.trend),
        series,
    }
}

impl IndicatorSet {
    /// Number of bars covered.
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn fast_periods(&self) -> &[usize] {
        &self.fast_periods
    }

    pub fn trend_period(&self) -> Option<usize> {
        self.trend_period
    }

    /// EMA value for `period` at `bar_index`.
    pub fn get(&self, period: usize, bar_index: usize) -> Option<f64> {
        self.series.get(&period).and_then(|v| v.get(bar_index).copied())
    }

    pub fn get_series(&self, period: usize) -> Option<&[f64]> {
        self.series.get(&period).map(|v| v.as_slice())
    }

    pub fn close(&self, bar_index: usize) -> Option<f64> {
        self.closes.get(bar_index).copied()
    }

    /// Resolve a possibly negative index (counting from the end) to a position.
    pub fn resolve(&self, index: isize) -> Option<usize> {
        let len = self.len() as isize;
        let pos = if index < 0 { len + index } else { index };
        (0..len).contains(&pos).then_some(pos as usize)
    }

    /// Restrict to `range`, re-basing indices at zero. Values are carried over,
    /// not recomputed, so averages keep their full-history warmup.
    pub fn window(&self, range: Range<usize>) -> IndicatorSet {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        IndicatorSet {
            closes: self.closes[start..end].to_vec(),
            fast_periods: self.fast_periods.clone(),
            trend_period: self.trend_period,
            series: self
                .series
                .iter()
                .map(|(&p, v)| (p, v[start..end].to_vec()))
                .collect(),
        }
    }
}

/// Build candles from close prices for tests.
///
/// open = previous close, high/low = body extremes widened by 0.5,
/// half-hour spacing from 2024-01-02 00:00 UTC.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle::new(
                base + Duration::minutes(30 * i as i64),
                open,
                open.max(close) + 0.5,
                open.min(close) - 0.5,
                close,
            )
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
