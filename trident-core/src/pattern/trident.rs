//! Pattern Validator: chains gap, doji, confirmation, trend and time gates.
//!
//! Candidate gaps are tried most recent first. Each one walks the gate
//! sequence below and the first to clear every gate becomes the signal:
//!
//! 1. the candle after the gap is a doji,
//! 2. the doji wicks into the gap midpoint,
//! 3. the next candle closes without escaping the doji,
//! 4. fast averages are stacked in the trade direction,
//! 5. close sits on the trade side of the trend average,
//! 6. the confirmation prints inside the kill zone (when time checks are on).
//!
//! A candidate whose impulse extreme would put the stop on the wrong side of
//! the entry is discarded as well.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::trace;

use crate::domain::{Candle, Direction, Gap, GapDirection, Instrument, TradeSignal};
use crate::indicators::{compute_moving_averages, is_doji, is_stacked, trend_bias, IndicatorSet};
use crate::params::PatternParams;
use crate::time_filter::SessionCalendar;

use super::gap_detector::find_gaps;

/// Why a candidate gap was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("doji or confirmation candle not yet printed")]
    Incomplete,
    #[error("candle after the gap is not a doji")]
    NotDoji,
    #[error("doji did not reach the gap midpoint")]
    ShallowWick,
    #[error("confirmation closed beyond the doji")]
    ConfirmationEscaped,
    #[error("moving averages not stacked")]
    NotStacked,
    #[error("trend bias disagrees with the trade")]
    BiasMismatch,
    #[error("confirmation outside the kill zone")]
    OutsideKillZone,
    #[error("stop is not on the losing side of the entry")]
    StopBeyondEntry,
}

/// Stateless validator; parameters are fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct TridentValidator {
    params: PatternParams,
    calendar: SessionCalendar,
}

impl TridentValidator {
    pub fn new(params: PatternParams, calendar: SessionCalendar) -> Self {
        Self { params, calendar }
    }

    pub fn params(&self) -> &PatternParams {
        &self.params
    }

    pub fn calendar(&self) -> &SessionCalendar {
        &self.calendar
    }

    /// Compute the configured averages for `candles` and validate.
    pub fn scan(&self, instrument: &Instrument, candles: &[Candle]) -> Option<TradeSignal> {
        let indicators = compute_moving_averages(candles, &self.params.ema);
        self.validate(instrument, candles, &indicators)
    }

    /// At most one signal per call. `indicators` must be parallel to `candles`.
    pub fn validate(
        &self,
        instrument: &Instrument,
        candles: &[Candle],
        indicators: &IndicatorSet,
    ) -> Option<TradeSignal> {
        if candles.len() < self.params.min_bars.max(3) || indicators.len() != candles.len() {
            return None;
        }

        let gaps = if self.params.check_time {
            let in_window = |t: DateTime<Utc>| self.calendar.in_gap_formation_window(t);
            find_gaps(candles, Some(&in_window))
        } else {
            find_gaps(candles, None)
        };

        gaps.iter().rev().find_map(|gap| {
            match self.evaluate_gap(instrument, candles, indicators, gap) {
                Ok(signal) => Some(signal),
                Err(reason) => {
                    trace!(
                        symbol = %instrument.symbol,
                        gap_end = gap.last_index,
                        %reason,
                        "gap rejected"
                    );
                    None
                }
            }
        })
    }

    /// Walk one gap through every gate.
    pub fn evaluate_gap(
        &self,
        instrument: &Instrument,
        candles: &[Candle],
        indicators: &IndicatorSet,
        gap: &Gap,
    ) -> Result<TradeSignal, Rejection> {
        let doji_index = gap.last_index + 1;
        let confirmation_index = gap.last_index + 2;
        let (Some(doji), Some(confirmation)) =
            (candles.get(doji_index), candles.get(confirmation_index))
        else {
            return Err(Rejection::Incomplete);
        };

        if !is_doji(doji, self.params.doji_body_ratio) {
            return Err(Rejection::NotDoji);
        }

        let direction = gap.direction.trade_direction();
        let (reached_midpoint, contained) = match gap.direction {
            GapDirection::Up => (
                doji.low <= gap.midpoint,
                confirmation.close <= doji.high,
            ),
            GapDirection::Down => (
                doji.high >= gap.midpoint,
                confirmation.close >= doji.low,
            ),
        };
        if !reached_midpoint {
            return Err(Rejection::ShallowWick);
        }
        if !contained {
            return Err(Rejection::ConfirmationEscaped);
        }

        let at = confirmation_index as isize;
        if !is_stacked(indicators, direction, at) {
            return Err(Rejection::NotStacked);
        }
        if !trend_bias(indicators, at).agrees_with(direction) {
            return Err(Rejection::BiasMismatch);
        }
        if self.params.check_time && !self.calendar.in_kill_zone(confirmation.timestamp) {
            return Err(Rejection::OutsideKillZone);
        }

        let stop_loss = gap.stop_anchor();
        let losing_side = match direction {
            Direction::Long => stop_loss < confirmation.close,
            Direction::Short => stop_loss > confirmation.close,
        };
        if !losing_side {
            return Err(Rejection::StopBeyondEntry);
        }

        Ok(TradeSignal {
            symbol: instrument.symbol.clone(),
            direction,
            entry_price: confirmation.close,
            stop_loss,
            gap: *gap,
            doji_index,
            confirmation_index,
            signal_time: confirmation.timestamp,
            use_hard_sl: !instrument.is_wick_prone() || self.params.wick_prone_hard_stop,
        })
    }
}
