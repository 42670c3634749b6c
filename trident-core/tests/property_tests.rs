//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Stacking is exclusive: never long and short at the same bar
//! 2. Gap geometry: top > bottom, midpoint is the mean, one gap per position
//! 3. Signal geometry: stop sits on the losing side of the entry
//! 4. Forward simulation terminates inside the horizon with win or loss,
//!    daily stack re-evaluation included
//! 5. Drawdown is bounded by the sum of losing trades

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;
use trident_core::domain::{Candle, Direction, ExitReason, Instrument, Outcome, SimulatedTrade};
use trident_core::indicators::{compute_moving_averages, is_stacked};
use trident_core::pattern::find_gaps;
use trident_core::simulation::{max_drawdown, DailySeries, ExitSimulator};
use trident_core::{EmaPeriods, PatternParams, SessionCalendar, SimulationParams, TridentValidator};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random-walk candles; each bar is (move, upper wick, lower wick).
fn arb_candles(min: usize, max: usize) -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec((-2.0..2.0_f64, 0.0..1.5_f64, 0.0..1.5_f64), min..max).prop_map(
        |steps| {
            let base = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
            let mut price = 100.0;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (mv, up, down))| {
                    let open = price;
                    let close = (price + mv).max(1.0);
                    price = close;
                    Candle::new(
                        base + Duration::minutes(30 * i as i64),
                        open,
                        open.max(close) + up,
                        open.min(close) - down,
                        close,
                    )
                })
                .collect()
        },
    )
}

/// Daily random walk starting three weeks before [`arb_candles`], so the
/// intraday span sits inside (or just past) the daily history.
fn arb_daily(max: usize) -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec(-3.0..3.0_f64, 0..max).prop_map(|moves| {
        let base = Utc.with_ymd_and_hms(2024, 2, 12, 0, 0, 0).unwrap();
        let mut price = 100.0;
        moves
            .into_iter()
            .enumerate()
            .map(|(i, mv)| {
                let open = price;
                let close = (price + mv).max(1.0);
                price = close;
                Candle::new(
                    base + Duration::days(i as i64),
                    open,
                    open.max(close) + 0.5,
                    open.min(close) - 0.5,
                    close,
                )
            })
            .collect()
    })
}

fn arb_pnl() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-200.0..200.0_f64, 0..60)
}

// ── 1. Stacking exclusivity ──────────────────────────────────────────

proptest! {
    #[test]
    fn stacking_is_exclusive(candles in arb_candles(1, 120)) {
        let ind = compute_moving_averages(&candles, &EmaPeriods::default());
        for i in 0..candles.len() as isize {
            prop_assert!(!(is_stacked(&ind, Direction::Long, i) && is_stacked(&ind, Direction::Short, i)));
        }
    }
}

// ── 2. Gap geometry ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn gaps_are_well_formed(candles in arb_candles(0, 150)) {
        let gaps = find_gaps(&candles, None);
        let mut starts = HashSet::new();
        for g in &gaps {
            prop_assert!(g.top > g.bottom);
            prop_assert_eq!(g.midpoint, (g.top + g.bottom) / 2.0);
            prop_assert!(g.midpoint > g.bottom && g.midpoint < g.top);
            prop_assert_eq!(g.impulse_index, g.first_index + 1);
            prop_assert!(starts.insert(g.first_index), "two gaps at index {}", g.first_index);
        }
        prop_assert!(gaps.windows(2).all(|w| w[0].first_index < w[1].first_index));
    }
}

// ── 3. Signal geometry ───────────────────────────────────────────────

proptest! {
    #[test]
    fn signal_stop_on_losing_side(candles in arb_candles(6, 120), ratio in 0.1..0.9_f64) {
        let validator = TridentValidator::new(
            PatternParams { check_time: false, doji_body_ratio: ratio, ..PatternParams::default() },
            SessionCalendar::default(),
        );
        if let Some(sig) = validator.scan(&Instrument::classify("EURUSD"), &candles) {
            match sig.direction {
                Direction::Long => prop_assert!(sig.stop_loss < sig.entry_price),
                Direction::Short => prop_assert!(sig.stop_loss > sig.entry_price),
            }
            prop_assert_eq!(sig.entry_price, candles[sig.confirmation_index].close);
            prop_assert_eq!(sig.confirmation_index, sig.doji_index + 1);
            prop_assert_eq!(sig.doji_index, sig.gap.last_index + 1);
        }
    }
}

// ── 4. Forward simulation termination ────────────────────────────────

proptest! {
    #[test]
    fn simulation_always_resolves(
        candles in arb_candles(1, 200),
        daily_bars in arb_daily(30),
        min_daily in 0usize..8,
        every_days in 1usize..3,
        entry_frac in 0.0..1.0_f64,
        stop_dist in 0.1..5.0_f64,
        long in any::<bool>(),
        hard in any::<bool>(),
        max_hold in 1usize..100,
    ) {
        let entry_index = ((candles.len() - 1) as f64 * entry_frac) as usize;
        let entry = candles[entry_index].close;
        let direction = if long { Direction::Long } else { Direction::Short };
        let stop = entry - direction.sign() * stop_dist;

        let trade = SimulatedTrade {
            symbol: "EURUSD".into(),
            direction,
            entry_index,
            entry_time: candles[entry_index].timestamp,
            entry_price: entry,
            stop_loss: stop,
            use_hard_sl: hard,
            exit_index: None,
            exit_time: None,
            exit_price: None,
            pnl_pips: 0.0,
            rr_ratio: 0.0,
            outcome: Outcome::Open,
            exit_reason: None,
        };
        let params = SimulationParams {
            max_hold_bars: max_hold,
            min_daily_bars: min_daily,
            reevaluate_every_days: every_days,
            ..SimulationParams::default()
        };
        let inst = Instrument::classify("EURUSD");
        let daily = DailySeries::new(daily_bars, &EmaPeriods::default());
        let done = ExitSimulator::new(&candles, &daily, &inst, &params).run(trade);

        prop_assert!(matches!(done.outcome, Outcome::Win | Outcome::Loss));
        let exit = done.exit_index.unwrap();
        prop_assert!(exit >= entry_index);
        prop_assert!(exit < candles.len());
        prop_assert!(exit - entry_index < max_hold.max(1));
        prop_assert!(done.exit_reason.is_some());

        if done.exit_reason == Some(ExitReason::TrendUnstack) {
            let bar = &candles[exit];
            prop_assert!(exit > entry_index);
            prop_assert!(bar.date() > candles[entry_index].date());
            prop_assert!(daily.bars_through(bar.date()) >= min_daily.max(2));
            prop_assert_eq!(done.exit_price, Some(bar.close));
        }
    }
}

// ── 5. Drawdown bounds ───────────────────────────────────────────────

proptest! {
    #[test]
    fn drawdown_bounded_by_losses(pnl in arb_pnl()) {
        let dd = max_drawdown(&pnl);
        let losses: f64 = pnl.iter().filter(|p| **p < 0.0).map(|p| -p).sum();
        prop_assert!(dd >= 0.0);
        prop_assert!(dd <= losses + 1e-9);
    }
}
