//! Higher-granularity (daily) trend context.
//!
//! [`DailySeries`] answers "did the daily stack just break?" as of a calendar
//! date; [`DayClock`] turns an intraday timestamp stream into day-boundary
//! events; [`daily_exit_signal`] is the live-mode position monitor.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::domain::{Candle, Direction, ExitReason};
use crate::indicators::{compute_moving_averages, is_stacked, IndicatorSet};
use crate::params::EmaPeriods;

/// Body/range ratio above which a daily candle counts as a strong move.
pub const OPPOSING_BODY_RATIO: f64 = 0.7;

/// Daily candles plus their fast moving averages.
///
/// EMAs are causal, so slicing the full-series averages to a prefix gives the
/// same values as recomputing over that prefix.
#[derive(Debug, Clone, Default)]
pub struct DailySeries {
    candles: Vec<Candle>,
    indicators: IndicatorSet,
}

impl DailySeries {
    pub fn new(candles: Vec<Candle>, ema: &EmaPeriods) -> Self {
        let indicators = compute_moving_averages(&candles, &ema.fast_only());
        Self { candles, indicators }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Number of daily bars dated on or before `date`.
    pub fn bars_through(&self, date: NaiveDate) -> usize {
        self.candles.partition_point(|c| c.date() <= date)
    }

    /// `Some(true)` when the fast averages were stacked in `direction` on the
    /// second-to-last bar through `date` but not on the last one. `None` when
    /// fewer than `min_bars` daily bars are available.
    pub fn stack_broke(&self, direction: Direction, date: NaiveDate, min_bars: usize) -> Option<bool> {
        let available = self.bars_through(date);
        if available < min_bars.max(2) {
            return None;
        }
        let view = self.indicators.window(0..available);
        Some(is_stacked(&view, direction, -2) && !is_stacked(&view, direction, -1))
    }
}

/// Emits an event every `every` calendar-date changes of the intraday stream.
#[derive(Debug, Clone)]
pub struct DayClock {
    current: NaiveDate,
    crossings: usize,
    every: usize,
}

impl DayClock {
    pub fn starting_at(ts: DateTime<Utc>, every: usize) -> Self {
        Self {
            current: ts.date_naive(),
            crossings: 0,
            every: every.max(1),
        }
    }

    /// Advance to `ts`; true when this bar opens a day on which a re-evaluation is due.
    pub fn tick(&mut self, ts: DateTime<Utc>) -> bool {
        let date = ts.date_naive();
        if date == self.current {
            return false;
        }
        self.current = date;
        self.crossings += 1;
        self.crossings % self.every == 0
    }

    pub fn crossings(&self) -> usize {
        self.crossings
    }
}

/// Live-mode daily exit check on the latest daily bars.
///
/// Fires on a fresh break of the daily stack, or on a strong opposing candle
/// that closes beyond the previous bar's extreme. Needs at least three bars.
pub fn daily_exit_signal(
    daily: &[Candle],
    indicators: &IndicatorSet,
    direction: Direction,
) -> Option<ExitReason> {
    if daily.len() < 3 || indicators.len() != daily.len() {
        return None;
    }

    if !is_stacked(indicators, direction, -1) && is_stacked(indicators, direction, -2) {
        debug!(%direction, "daily averages left the stack");
        return Some(ExitReason::TrendUnstack);
    }

    let last = &daily[daily.len() - 1];
    let prev = &daily[daily.len() - 2];
    let range = last.range();
    if range <= 0.0 || last.body() / range <= OPPOSING_BODY_RATIO {
        return None;
    }
    let broke_extreme = match direction {
        Direction::Long => last.close < prev.low,
        Direction::Short => last.close > prev.high,
    };
    if last.direction().opposes(direction) && broke_extreme {
        debug!(%direction, close = last.close, "strong opposing daily candle");
        return Some(ExitReason::OpposingDailyCandle);
    }
    None
}
