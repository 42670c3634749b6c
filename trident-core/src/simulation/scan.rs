//! Sliding-window backtest scan.
//!
//! Each window is validated as a standalone sequence against the full-series
//! averages sliced to it. Signals are mapped back to global indices, then
//! deduplicated by (time, price, direction) and thinned by the cool-down.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::domain::{Candle, Instrument, SignalKey, SimulatedTrade, TradeSignal};
use crate::indicators::compute_moving_averages;
use crate::params::SimulationParams;
use crate::pattern::TridentValidator;

use super::daily::DailySeries;
use super::exit::ExitSimulator;

/// Window start offsets: `0, step, 2·step, ...` while the window fits, plus a
/// final window flush with the end when the tail would otherwise be missed.
pub fn window_starts(len: usize, size: usize, step: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    if size == 0 || len <= size {
        return vec![0];
    }
    let step = step.max(1);
    let last = len - size;
    let mut starts: Vec<usize> = (0..=last).step_by(step).collect();
    if starts.last() != Some(&last) {
        starts.push(last);
    }
    starts
}

/// Run the sliding scan and forward-simulate every accepted signal.
pub struct Backtest<'a> {
    validator: &'a TridentValidator,
    params: &'a SimulationParams,
}

impl<'a> Backtest<'a> {
    pub fn new(validator: &'a TridentValidator, params: &'a SimulationParams) -> Self {
        Self { validator, params }
    }

    /// Unique signals in scan order, with global indices.
    pub fn collect_signals(&self, instrument: &Instrument, candles: &[Candle]) -> Vec<TradeSignal> {
        let indicators = compute_moving_averages(candles, &self.validator.params().ema);
        let size = self.params.window_size;
        let mut seen: HashSet<SignalKey> = HashSet::new();
        let mut last_accepted: Option<usize> = None;
        let mut signals = Vec::new();

        for start in window_starts(candles.len(), size, self.params.window_step) {
            let end = if size == 0 {
                candles.len()
            } else {
                (start + size).min(candles.len())
            };
            let window = &candles[start..end];
            let Some(local) = self
                .validator
                .validate(instrument, window, &indicators.window(start..end))
            else {
                continue;
            };

            let signal = local.shifted(start);
            if !seen.insert(signal.key()) {
                continue;
            }
            if let Some(prev) = last_accepted {
                if signal.confirmation_index.abs_diff(prev) < self.params.cooldown_bars {
                    debug!(
                        symbol = %instrument.symbol,
                        confirmation = signal.confirmation_index,
                        previous = prev,
                        "signal inside cool-down"
                    );
                    continue;
                }
            }
            last_accepted = Some(signal.confirmation_index);
            signals.push(signal);
        }
        signals
    }

    /// Scan `candles`, then simulate each unique signal to its exit.
    pub fn run(
        &self,
        instrument: &Instrument,
        candles: &[Candle],
        daily: &DailySeries,
    ) -> Vec<SimulatedTrade> {
        let signals = self.collect_signals(instrument, candles);
        let simulator = ExitSimulator::new(candles, daily, instrument, self.params);

        let trades: Vec<SimulatedTrade> = signals
            .iter()
            .map(|s| simulator.run(SimulatedTrade::open(s, s.confirmation_index)))
            .collect();

        for t in &trades {
            info!(
                symbol = %t.symbol,
                direction = %t.direction,
                entry = t.entry_price,
                exit = t.exit_price.unwrap_or(t.entry_price),
                pnl = format_args!("{:+.1}", t.pnl_pips),
                rr = format_args!("{:+.2}", t.rr_ratio),
                outcome = t.outcome.as_str(),
                reason = t.exit_reason.map(|r| r.as_str()).unwrap_or(""),
                "trade"
            );
        }
        trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, Outcome};
    use crate::params::PatternParams;
    use crate::pattern::fixtures::{append_long_setup, drift, long_setup, session_base};
    use crate::time_filter::SessionCalendar;

    fn untimed() -> TridentValidator {
        TridentValidator::new(
            PatternParams {
                check_time: false,
                ..PatternParams::default()
            },
            SessionCalendar::default(),
        )
    }

    #[test]
    fn window_starts_cover_the_tail() {
        assert_eq!(window_starts(100, 50, 25), vec![0, 25, 50]);
        assert_eq!(window_starts(110, 50, 25), vec![0, 25, 50, 60]);
        assert_eq!(window_starts(30, 50, 25), vec![0]);
        assert_eq!(window_starts(0, 50, 25), Vec::<usize>::new());
        assert_eq!(window_starts(45, 20, 10), vec![0, 10, 20, 25]);
    }

    #[test]
    fn overlapping_windows_yield_one_signal() {
        let candles = drift(long_setup(session_base()), 10, 0.2);
        assert_eq!(candles.len(), 45);
        let params = SimulationParams {
            window_size: 20,
            window_step: 10,
            ..Default::default()
        };
        let v = untimed();
        let bt = Backtest::new(&v, &params);

        // Windows [20, 40) and [25, 45) both contain the pattern.
        for start in [20, 25] {
            let ind = compute_moving_averages(&candles, &v.params().ema).window(start..start + 20);
            let hit = v.validate(&Instrument::classify("EURUSD"), &candles[start..start + 20], &ind);
            assert_eq!(hit.map(|s| s.confirmation_index + start), Some(34));
        }

        let signals = bt.collect_signals(&Instrument::classify("EURUSD"), &candles);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].confirmation_index, 34);
        assert_eq!(signals[0].gap.last_index, 32);
        assert_eq!(signals[0].direction, Direction::Long);
    }

    #[test]
    fn run_simulates_each_signal() {
        let candles = drift(long_setup(session_base()), 10, 0.2);
        let params = SimulationParams {
            window_size: 20,
            window_step: 10,
            ..Default::default()
        };
        let v = untimed();
        let trades = Backtest::new(&v, &params).run(
            &Instrument::classify("EURUSD"),
            &candles,
            &DailySeries::empty(),
        );
        assert_eq!(trades.len(), 1);
        let t = &trades[0];
        assert_eq!(t.entry_index, 34);
        assert_eq!(t.exit_index, Some(44));
        assert_eq!(t.exit_reason, Some(crate::domain::ExitReason::MaxHold));
        assert_eq!(t.outcome, Outcome::Win);
    }

    #[test]
    fn cool_down_suppresses_nearby_signals() {
        // Second setup confirms at bar 41, seven bars after the first.
        let candles = append_long_setup(drift(long_setup(session_base()), 2, 0.2));
        assert_eq!(candles.len(), 42);
        let v = untimed();
        let inst = Instrument::classify("EURUSD");
        let params = SimulationParams {
            window_size: 20,
            window_step: 10,
            ..Default::default()
        };

        let signals = Backtest::new(&v, &params).collect_signals(&inst, &candles);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].confirmation_index, 34);

        let no_cool_down = SimulationParams {
            cooldown_bars: 0,
            ..params
        };
        let signals = Backtest::new(&v, &no_cool_down).collect_signals(&inst, &candles);
        let confirmations: Vec<usize> = signals.iter().map(|s| s.confirmation_index).collect();
        assert_eq!(confirmations, vec![34, 41]);
    }

    #[test]
    fn no_pattern_no_trades() {
        let candles = drift(long_setup(session_base())[..20].to_vec(), 30, 0.2);
        let v = untimed();
        let trades = Backtest::new(&v, &SimulationParams::default()).run(
            &Instrument::classify("EURUSD"),
            &candles,
            &DailySeries::empty(),
        );
        assert!(trades.is_empty());
    }
}
