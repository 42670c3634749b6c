//! Stacking and trend-bias predicates.
//!
//! Both take an index that may be negative (counting from the end). Out-of-range
//! lookups fail closed: `false` for stacking, `Neutral` for bias.

use super::IndicatorSet;
use crate::domain::{Bias, Direction};

/// True iff, at `index`, every faster average is strictly beyond the next slower
/// one in the trade direction (greater-than chain for long, less-than for short).
/// Any tie or inversion invalidates the stack.
pub fn is_stacked(indicators: &IndicatorSet, direction: Direction, index: isize) -> bool {
    let Some(pos) = indicators.resolve(index) else {
        return false;
    };

    let values: Option<Vec<f64>> = indicators
        .fast_periods()
        .iter()
        .map(|&p| indicators.get(p, pos))
        .collect();
    let Some(values) = values else {
        return false;
    };
    if values.len() < 2 || values.iter().any(|v| v.is_nan()) {
        return false;
    }

    values.windows(2).all(|pair| match direction {
        Direction::Long => pair[0] > pair[1],
        Direction::Short => pair[0] < pair[1],
    })
}

/// Close versus the slow trend average at `index`.
pub fn trend_bias(indicators: &IndicatorSet, index: isize) -> Bias {
    let Some(pos) = indicators.resolve(index) else {
        return Bias::Neutral;
    };
    let Some(period) = indicators.trend_period() else {
        return Bias::Neutral;
    };
    match (indicators.close(pos), indicators.get(period, pos)) {
        (Some(close), Some(ema)) if close > ema => Bias::Long,
        (Some(close), Some(ema)) if close < ema => Bias::Short,
        _ => Bias::Neutral,
    }
}
