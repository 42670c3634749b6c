//! One-shot live scan and position monitor.
//!
//! The scheduling loop and the broker connection stay outside this crate:
//! callers drive [`LiveScanner::scan_tick`] and [`LiveScanner::monitor_positions`]
//! at their own cadence and supply an [`OrderExecutor`]. [`DryRunExecutor`] is
//! an in-process executor that logs and confirms.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use trident_core::data::{CandleProvider, DataError};
use trident_core::domain::{
    Direction, ExitReason, Instrument, Outcome, SignalKey, SimulatedTrade, TradeSignal,
};
use trident_core::indicators::compute_moving_averages;
use trident_core::simulation::{daily_exit_signal, stop_exit};
use trident_core::TridentValidator;

use crate::config::BacktestConfig;

/// Failures reported by an order executor.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("max open trades ({max}) reached")]
    MaxOpenTrades { max: usize },
    #[error("order rejected: {0}")]
    Rejected(String),
    #[error("no open position with ticket {0}")]
    UnknownTicket(u64),
    #[error("executor unavailable: {0}")]
    Unavailable(String),
}

/// Collaborator failure during a live tick.
#[derive(Debug, Error)]
pub enum LiveError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Market order derived from a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub direction: Direction,
    pub lot_size: f64,
    pub entry_price: f64,
    /// Protective level from the signal, sent to the broker only when `hard_stop`.
    pub stop_loss: f64,
    pub hard_stop: bool,
    pub signal_time: DateTime<Utc>,
    pub comment: String,
}

impl OrderRequest {
    pub fn from_signal(signal: &TradeSignal, lot_size: f64) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            lot_size,
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
            hard_stop: signal.use_hard_sl,
            signal_time: signal.signal_time,
            comment: format!("Trident_{}", signal.direction),
        }
    }

    /// The stop the broker should hold; `None` for close-filter positions.
    pub fn broker_stop(&self) -> Option<f64> {
        self.hard_stop.then_some(self.stop_loss)
    }
}

/// A position held by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub ticket: u64,
    pub symbol: String,
    pub direction: Direction,
    pub lot_size: f64,
    pub open_price: f64,
    pub stop_loss: f64,
    pub hard_stop: bool,
    pub opened_at: DateTime<Utc>,
}

impl OpenPosition {
    /// View as an open trade so the backtest stop rule applies unchanged.
    fn as_trade(&self) -> SimulatedTrade {
        SimulatedTrade {
            symbol: self.symbol.clone(),
            direction: self.direction,
            entry_index: 0,
            entry_time: self.opened_at,
            entry_price: self.open_price,
            stop_loss: self.stop_loss,
            use_hard_sl: self.hard_stop,
            exit_index: None,
            exit_time: None,
            exit_price: None,
            pnl_pips: 0.0,
            rr_ratio: 0.0,
            outcome: Outcome::Open,
            exit_reason: None,
        }
    }
}

/// Order placement collaborator.
pub trait OrderExecutor: Send + Sync {
    fn name(&self) -> &str;

    fn open_positions(&self) -> Result<Vec<OpenPosition>, ExecutionError>;

    fn place(&self, request: &OrderRequest) -> Result<OpenPosition, ExecutionError>;

    fn close(&self, ticket: u64) -> Result<(), ExecutionError>;
}

/// Executor that never leaves the process. Enforces the open-trade cap.
#[derive(Debug)]
pub struct DryRunExecutor {
    max_open_trades: usize,
    next_ticket: AtomicU64,
    positions: Mutex<Vec<OpenPosition>>,
}

impl DryRunExecutor {
    pub fn new(max_open_trades: usize) -> Self {
        Self {
            max_open_trades,
            next_ticket: AtomicU64::new(1),
            positions: Mutex::new(Vec::new()),
        }
    }

    fn positions(&self) -> Result<std::sync::MutexGuard<'_, Vec<OpenPosition>>, ExecutionError> {
        self.positions
            .lock()
            .map_err(|_| ExecutionError::Unavailable("dry-run state poisoned".into()))
    }
}

impl OrderExecutor for DryRunExecutor {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn open_positions(&self) -> Result<Vec<OpenPosition>, ExecutionError> {
        Ok(self.positions()?.clone())
    }

    fn place(&self, request: &OrderRequest) -> Result<OpenPosition, ExecutionError> {
        if request.lot_size.is_nan() || request.lot_size <= 0.0 {
            return Err(ExecutionError::Rejected(format!(
                "invalid lot size {}",
                request.lot_size
            )));
        }
        let mut positions = self.positions()?;
        if positions.len() >= self.max_open_trades {
            return Err(ExecutionError::MaxOpenTrades {
                max: self.max_open_trades,
            });
        }

        let position = OpenPosition {
            ticket: self.next_ticket.fetch_add(1, Ordering::Relaxed),
            symbol: request.symbol.clone(),
            direction: request.direction,
            lot_size: request.lot_size,
            open_price: request.entry_price,
            stop_loss: request.stop_loss,
            hard_stop: request.hard_stop,
            opened_at: request.signal_time,
        };
        info!(
            ticket = position.ticket,
            symbol = %position.symbol,
            direction = %position.direction,
            lots = position.lot_size,
            entry = position.open_price,
            sl = ?request.broker_stop(),
            comment = %request.comment,
            "dry-run order"
        );
        positions.push(position.clone());
        Ok(position)
    }

    fn close(&self, ticket: u64) -> Result<(), ExecutionError> {
        let mut positions = self.positions()?;
        let idx = positions
            .iter()
            .position(|p| p.ticket == ticket)
            .ok_or(ExecutionError::UnknownTicket(ticket))?;
        let closed = positions.remove(idx);
        info!(ticket, symbol = %closed.symbol, "dry-run close");
        Ok(())
    }
}

/// Per-symbol result of one scan tick.
#[derive(Debug)]
pub enum TickOutcome {
    NoData { symbol: String },
    NoSignal { symbol: String },
    /// The signal was already placed on an earlier tick.
    AlreadySent { signal: TradeSignal },
    Placed { signal: TradeSignal, position: OpenPosition },
    /// Not placed; the same signal is offered again on the next tick.
    Rejected { signal: TradeSignal, error: ExecutionError },
    Failed { symbol: String, error: LiveError },
}

/// Per-position result of one monitor pass.
#[derive(Debug)]
pub enum MonitorOutcome {
    Hold { ticket: u64 },
    Closed { ticket: u64, reason: ExitReason },
    Failed { ticket: u64, error: LiveError },
}

/// Drives the validator against live candles and hands signals to an executor.
pub struct LiveScanner<'a> {
    config: &'a BacktestConfig,
    provider: &'a dyn CandleProvider,
    executor: &'a dyn OrderExecutor,
    validator: TridentValidator,
    sent: HashSet<(String, SignalKey)>,
}

impl<'a> LiveScanner<'a> {
    pub fn new(
        config: &'a BacktestConfig,
        provider: &'a dyn CandleProvider,
        executor: &'a dyn OrderExecutor,
    ) -> Self {
        Self {
            config,
            provider,
            executor,
            validator: TridentValidator::new(config.pattern.clone(), config.sessions.clone()),
            sent: HashSet::new(),
        }
    }

    /// Scan every configured symbol once. Nothing runs outside trading days.
    pub fn scan_tick(&mut self, now: DateTime<Utc>) -> Vec<TickOutcome> {
        if !self.validator.calendar().is_trading_day(now) {
            debug!(%now, "not a trading day, skipping scan");
            return Vec::new();
        }
        let symbols = self.config.backtest.symbols.clone();
        symbols.iter().map(|s| self.scan_symbol(s)).collect()
    }

    fn scan_symbol(&mut self, symbol: &str) -> TickOutcome {
        let candles = match self.provider.fetch_count(
            symbol,
            self.config.backtest.entry_timeframe,
            self.config.live.candle_count,
        ) {
            Ok(c) => c,
            Err(e) => {
                warn!(%symbol, error = %e, "candle fetch failed");
                return TickOutcome::Failed {
                    symbol: symbol.to_string(),
                    error: e.into(),
                };
            }
        };
        if candles.is_empty() {
            return TickOutcome::NoData {
                symbol: symbol.to_string(),
            };
        }

        let instrument = Instrument::classify(symbol);
        let Some(signal) = self.validator.scan(&instrument, &candles) else {
            return TickOutcome::NoSignal {
                symbol: symbol.to_string(),
            };
        };
        let key = (symbol.to_string(), signal.key());
        if self.sent.contains(&key) {
            return TickOutcome::AlreadySent { signal };
        }

        info!(
            %symbol,
            direction = %signal.direction,
            entry = signal.entry_price,
            sl = signal.stop_loss,
            hard_sl = signal.use_hard_sl,
            "trident signal"
        );
        let request = OrderRequest::from_signal(&signal, self.config.live.lot_size);
        // Only a filled order marks the signal as sent; rejections retry next tick.
        match self.executor.place(&request) {
            Ok(position) => {
                self.sent.insert(key);
                TickOutcome::Placed { signal, position }
            }
            Err(error) => {
                warn!(%symbol, %error, executor = self.executor.name(), "order not placed");
                TickOutcome::Rejected { signal, error }
            }
        }
    }

    /// Check each open position against the daily exit rules, then the
    /// close filter for positions without a broker stop.
    pub fn monitor_positions(&self) -> Result<Vec<MonitorOutcome>, ExecutionError> {
        let positions = self.executor.open_positions()?;
        Ok(positions
            .iter()
            .map(|p| match self.exit_reason(p) {
                Ok(None) => MonitorOutcome::Hold { ticket: p.ticket },
                Ok(Some(reason)) => match self.executor.close(p.ticket) {
                    Ok(()) => {
                        info!(ticket = p.ticket, symbol = %p.symbol, %reason, "position closed");
                        MonitorOutcome::Closed {
                            ticket: p.ticket,
                            reason,
                        }
                    }
                    Err(e) => MonitorOutcome::Failed {
                        ticket: p.ticket,
                        error: e.into(),
                    },
                },
                Err(error) => {
                    warn!(ticket = p.ticket, symbol = %p.symbol, %error, "monitor failed");
                    MonitorOutcome::Failed {
                        ticket: p.ticket,
                        error,
                    }
                }
            })
            .collect())
    }

    fn exit_reason(&self, position: &OpenPosition) -> Result<Option<ExitReason>, LiveError> {
        let daily = self.provider.fetch_count(
            &position.symbol,
            self.config.backtest.bias_timeframe,
            self.config.live.daily_count,
        )?;
        if !daily.is_empty() {
            let indicators = compute_moving_averages(&daily, &self.config.pattern.ema.fast_only());
            if let Some(reason) = daily_exit_signal(&daily, &indicators, position.direction) {
                return Ok(Some(reason));
            }
        }

        if position.hard_stop {
            return Ok(None);
        }
        let recent = self.provider.fetch_count(
            &position.symbol,
            self.config.backtest.entry_timeframe,
            1,
        )?;
        let trade = position.as_trade();
        Ok(recent
            .last()
            .and_then(|bar| stop_exit(&trade, bar, 0))
            .map(|fill| fill.reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::MemoryProvider;
    use chrono::{Duration, TimeZone};
    use trident_core::data::Timeframe;
    use trident_core::domain::Candle;
    use trident_core::pattern::fixtures::{long_setup, session_base};

    fn t0() -> DateTime<Utc> {
        session_base()
    }

    fn flat_daily(n: i64) -> Vec<Candle> {
        (0..n)
            .map(|i| Candle::new(t0() - Duration::days(n - i), 100.0, 100.5, 99.5, 100.0))
            .collect()
    }

    fn config(symbols: &[&str]) -> BacktestConfig {
        let mut c = BacktestConfig::default();
        c.backtest.symbols = symbols.iter().map(|s| s.to_string()).collect();
        c
    }

    fn provider_with(symbols: &[&str]) -> MemoryProvider {
        let mut p = MemoryProvider::new();
        for s in symbols {
            p.insert(s, Timeframe::M30, long_setup(t0())).unwrap();
            p.insert(s, Timeframe::D1, flat_daily(5)).unwrap();
        }
        p
    }

    #[test]
    fn tick_places_once_per_signal() {
        let cfg = config(&["EURUSD"]);
        let provider = provider_with(&["EURUSD"]);
        let executor = DryRunExecutor::new(3);
        let mut scanner = LiveScanner::new(&cfg, &provider, &executor);

        let first = scanner.scan_tick(t0());
        assert_eq!(first.len(), 1);
        match &first[0] {
            TickOutcome::Placed { signal, position } => {
                assert_eq!(signal.direction, Direction::Long);
                assert_eq!(position.ticket, 1);
                assert!(position.hard_stop);
                assert_eq!(position.lot_size, 0.01);
            }
            other => panic!("expected placement, got {other:?}"),
        }

        let second = scanner.scan_tick(t0());
        assert!(matches!(second[0], TickOutcome::AlreadySent { .. }));
        assert_eq!(executor.open_positions().unwrap().len(), 1);
    }

    #[test]
    fn wick_prone_orders_carry_no_broker_stop() {
        let cfg = config(&["XAUUSD"]);
        let provider = provider_with(&["XAUUSD"]);
        let executor = DryRunExecutor::new(3);
        let mut scanner = LiveScanner::new(&cfg, &provider, &executor);

        match &scanner.scan_tick(t0())[0] {
            TickOutcome::Placed { signal, position } => {
                assert!(!signal.use_hard_sl);
                assert!(!position.hard_stop);
                let req = OrderRequest::from_signal(signal, 0.01);
                assert_eq!(req.broker_stop(), None);
                assert_eq!(req.comment, "Trident_long");
            }
            other => panic!("expected placement, got {other:?}"),
        }
    }

    #[test]
    fn executor_cap_rejects_extra_orders() {
        let cfg = config(&["EURUSD", "GBPUSD"]);
        let provider = provider_with(&["EURUSD", "GBPUSD"]);
        let executor = DryRunExecutor::new(1);
        let mut scanner = LiveScanner::new(&cfg, &provider, &executor);

        let out = scanner.scan_tick(t0());
        assert!(matches!(out[0], TickOutcome::Placed { .. }));
        assert!(matches!(
            out[1],
            TickOutcome::Rejected {
                error: ExecutionError::MaxOpenTrades { max: 1 },
                ..
            }
        ));
    }

    #[test]
    fn rejected_signal_is_retried_once_a_slot_frees() {
        let cfg = config(&["EURUSD", "GBPUSD"]);
        let provider = provider_with(&["EURUSD", "GBPUSD"]);
        let executor = DryRunExecutor::new(1);
        let mut scanner = LiveScanner::new(&cfg, &provider, &executor);

        let first = scanner.scan_tick(t0());
        let TickOutcome::Placed { position, .. } = &first[0] else {
            panic!("expected placement, got {:?}", first[0]);
        };
        assert!(matches!(first[1], TickOutcome::Rejected { .. }));

        executor.close(position.ticket).unwrap();
        let second = scanner.scan_tick(t0());
        assert!(matches!(second[0], TickOutcome::AlreadySent { .. }));
        match &second[1] {
            TickOutcome::Placed { signal, position } => {
                assert_eq!(signal.symbol, "GBPUSD");
                assert_eq!(position.symbol, "GBPUSD");
            }
            other => panic!("expected GBPUSD placement, got {other:?}"),
        }
        assert_eq!(executor.open_positions().unwrap().len(), 1);

        let third = scanner.scan_tick(t0());
        assert!(third
            .iter()
            .all(|o| matches!(o, TickOutcome::AlreadySent { .. })));
    }

    #[test]
    fn tick_reports_missing_data_and_weekends() {
        let cfg = config(&["EURUSD"]);
        let provider = MemoryProvider::new();
        let executor = DryRunExecutor::new(3);
        let mut scanner = LiveScanner::new(&cfg, &provider, &executor);

        assert!(matches!(scanner.scan_tick(t0())[0], TickOutcome::NoData { .. }));

        let saturday = Utc.with_ymd_and_hms(2024, 1, 13, 12, 0, 0).unwrap();
        assert!(scanner.scan_tick(saturday).is_empty());
    }

    #[test]
    fn tick_without_pattern_reports_no_signal() {
        let cfg = config(&["EURUSD"]);
        let mut provider = MemoryProvider::new();
        provider
            .insert("EURUSD", Timeframe::M30, long_setup(t0())[..31].to_vec())
            .unwrap();
        let executor = DryRunExecutor::new(3);
        let mut scanner = LiveScanner::new(&cfg, &provider, &executor);
        assert!(matches!(scanner.scan_tick(t0())[0], TickOutcome::NoSignal { .. }));
    }

    fn open(executor: &DryRunExecutor, symbol: &str, hard_stop: bool) -> OpenPosition {
        executor
            .place(&OrderRequest {
                symbol: symbol.into(),
                direction: Direction::Long,
                lot_size: 0.01,
                entry_price: 135.3,
                stop_loss: 129.8,
                hard_stop,
                signal_time: t0(),
                comment: "test".into(),
            })
            .unwrap()
    }

    #[test]
    fn monitor_holds_healthy_position() {
        let cfg = config(&["EURUSD"]);
        let provider = provider_with(&["EURUSD"]);
        let executor = DryRunExecutor::new(3);
        let pos = open(&executor, "EURUSD", true);

        let scanner = LiveScanner::new(&cfg, &provider, &executor);
        let out = scanner.monitor_positions().unwrap();
        assert!(matches!(out[0], MonitorOutcome::Hold { ticket } if ticket == pos.ticket));
    }

    #[test]
    fn monitor_closes_on_daily_unstack() {
        let cfg = config(&["EURUSD"]);
        let mut closes: Vec<f64> = (0..12).map(|i| 100.0 + 2.0 * i as f64).collect();
        closes.push(90.0);
        let daily: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let o = if i == 0 { c } else { closes[i - 1] };
                Candle::new(
                    t0() + Duration::days(i as i64),
                    o,
                    o.max(c) + 0.5,
                    o.min(c) - 0.5,
                    c,
                )
            })
            .collect();
        let mut provider = MemoryProvider::new();
        provider.insert("EURUSD", Timeframe::D1, daily).unwrap();

        let executor = DryRunExecutor::new(3);
        let pos = open(&executor, "EURUSD", true);
        let scanner = LiveScanner::new(&cfg, &provider, &executor);

        let out = scanner.monitor_positions().unwrap();
        assert!(matches!(
            out[0],
            MonitorOutcome::Closed { ticket, reason: ExitReason::TrendUnstack } if ticket == pos.ticket
        ));
        assert!(executor.open_positions().unwrap().is_empty());
    }

    #[test]
    fn monitor_close_filter_only_without_broker_stop() {
        let cfg = config(&["XAUUSD"]);
        let mut bars = long_setup(t0());
        let last = *bars.last().unwrap();
        bars.push(Candle::new(
            last.timestamp + Duration::minutes(30),
            135.3,
            135.4,
            129.0,
            129.5,
        ));
        let mut provider = MemoryProvider::new();
        provider.insert("XAUUSD", Timeframe::M30, bars).unwrap();
        provider.insert("XAUUSD", Timeframe::D1, flat_daily(5)).unwrap();

        let executor = DryRunExecutor::new(3);
        let hard = open(&executor, "XAUUSD", true);
        let soft = open(&executor, "XAUUSD", false);
        let scanner = LiveScanner::new(&cfg, &provider, &executor);

        let out = scanner.monitor_positions().unwrap();
        assert!(matches!(out[0], MonitorOutcome::Hold { ticket } if ticket == hard.ticket));
        assert!(matches!(
            out[1],
            MonitorOutcome::Closed { ticket, reason: ExitReason::CloseFilter } if ticket == soft.ticket
        ));
    }

    #[test]
    fn dry_run_close_unknown_ticket() {
        let executor = DryRunExecutor::new(1);
        assert!(matches!(
            executor.close(42),
            Err(ExecutionError::UnknownTicket(42))
        ));
    }
}
