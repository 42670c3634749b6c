//! Forward exit simulation for one accepted signal.
//!
//! Per bar, in order: the stop rule (hard stop or close filter), then the
//! daily stack re-evaluation when the day clock fires. If neither triggers
//! within the horizon the trade is force-closed at the last bar reached.

use tracing::debug;

use crate::domain::{Candle, Direction, ExitFill, ExitReason, Instrument, SimulatedTrade};
use crate::params::SimulationParams;

use super::daily::{DailySeries, DayClock};

/// Borrowed market context for forward simulation.
#[derive(Debug, Clone, Copy)]
pub struct ExitSimulator<'a> {
    candles: &'a [Candle],
    daily: &'a DailySeries,
    instrument: &'a Instrument,
    params: &'a SimulationParams,
}

impl<'a> ExitSimulator<'a> {
    pub fn new(
        candles: &'a [Candle],
        daily: &'a DailySeries,
        instrument: &'a Instrument,
        params: &'a SimulationParams,
    ) -> Self {
        Self {
            candles,
            daily,
            instrument,
            params,
        }
    }

    /// Step forward from `trade.entry_index` until an exit resolves.
    ///
    /// The returned trade is always closed with outcome win or loss.
    pub fn run(&self, trade: SimulatedTrade) -> SimulatedTrade {
        let fill = self.find_exit(&trade);
        debug!(
            symbol = %trade.symbol,
            direction = %trade.direction,
            entry = trade.entry_index,
            exit = fill.bar_index,
            reason = %fill.reason,
            "trade closed"
        );
        trade.close(fill, self.instrument)
    }

    fn find_exit(&self, trade: &SimulatedTrade) -> ExitFill {
        let entry = trade.entry_index;
        let Some(entry_bar) = self.candles.get(entry) else {
            return ExitFill {
                price: trade.entry_price,
                time: trade.entry_time,
                bar_index: entry,
                reason: ExitReason::MaxHold,
            };
        };

        let horizon = self
            .candles
            .len()
            .min(entry.saturating_add(self.params.max_hold_bars.max(1)));
        let mut clock = DayClock::starting_at(entry_bar.timestamp, self.params.reevaluate_every_days);

        for i in entry + 1..horizon {
            let bar = &self.candles[i];

            if let Some(fill) = stop_exit(trade, bar, i) {
                return fill;
            }

            if clock.tick(bar.timestamp) && !self.daily.is_empty() {
                let broke = self.daily.stack_broke(
                    trade.direction,
                    bar.date(),
                    self.params.min_daily_bars,
                );
                if broke == Some(true) {
                    return close_at(bar, i, ExitReason::TrendUnstack);
                }
            }
        }

        let last = horizon.saturating_sub(1).max(entry);
        close_at(&self.candles[last], last, ExitReason::MaxHold)
    }
}

/// Stop check for one bar. Hard stops fill at the stop price; the close
/// filter fills at the bar's close.
pub fn stop_exit(trade: &SimulatedTrade, bar: &Candle, index: usize) -> Option<ExitFill> {
    let stop = trade.stop_loss;
    if trade.use_hard_sl {
        let hit = match trade.direction {
            Direction::Long => bar.low <= stop,
            Direction::Short => bar.high >= stop,
        };
        hit.then(|| ExitFill {
            price: stop,
            time: bar.timestamp,
            bar_index: index,
            reason: ExitReason::StopLoss,
        })
    } else {
        let crossed = match trade.direction {
            Direction::Long => bar.close <= stop,
            Direction::Short => bar.close >= stop,
        };
        crossed.then(|| close_at(bar, index, ExitReason::CloseFilter))
    }
}

fn close_at(bar: &Candle, index: usize, reason: ExitReason) -> ExitFill {
    ExitFill {
        price: bar.close,
        time: bar.timestamp,
        bar_index: index,
        reason,
    }
}
