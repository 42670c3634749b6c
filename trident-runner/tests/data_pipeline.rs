//! End-to-end runner tests: candle files on disk through the backtest to the
//! artifact bundle, plus a synthetic offline run.

use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use trident_core::domain::{Candle, Direction};
use trident_core::pattern::fixtures::{drift, long_setup, session_base};
use trident_runner::config::BacktestConfig;
use trident_runner::data_loader::{CsvCandleProvider, SyntheticProvider};
use trident_runner::export::{load_artifacts, save_artifacts};
use trident_runner::runner::run_backtest;

// ── Fixtures ─────────────────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    session_base()
}

/// The shared long setup followed by ten bars drifting higher.
fn long_setup_candles() -> Vec<Candle> {
    drift(long_setup(t0()), 10, 0.2)
}

fn write_csv(path: &Path, candles: &[Candle]) {
    let mut out = String::from("time,open,high,low,close\n");
    for c in candles {
        out.push_str(&format!(
            "{},{},{},{},{}\n",
            c.timestamp.format("%Y-%m-%d %H:%M:%S"),
            c.open,
            c.high,
            c.low,
            c.close
        ));
    }
    std::fs::write(path, out).unwrap();
}

fn csv_config() -> BacktestConfig {
    BacktestConfig::from_toml(
        r#"
[backtest]
symbols = ["EURUSD"]
days = 5
end = "2024-01-10T16:30:00Z"

[simulation]
window_size = 20
window_step = 10
"#,
    )
    .unwrap()
}

// ── CSV pipeline ─────────────────────────────────────────────────────

#[test]
fn csv_files_to_artifacts() {
    let data = tempfile::tempdir().unwrap();
    let provider = CsvCandleProvider::new(data.path());
    let candles = long_setup_candles();
    write_csv(&data.path().join("EURUSD_M30.csv"), &candles);
    let daily_start = Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap();
    let daily: Vec<Candle> = (0..5)
        .map(|i| Candle::new(daily_start + Duration::days(i), 100.0, 100.5, 99.5, 100.0))
        .collect();
    write_csv(&data.path().join("EURUSD_D1.csv"), &daily);

    let result = run_backtest(&csv_config(), &provider, Utc::now()).unwrap();
    let r = &result.results[0];
    assert_eq!(r.intraday_bars, candles.len());
    assert_eq!(r.daily_bars, 5);
    assert_eq!(r.trades.len(), 1);

    let t = &r.trades[0];
    assert_eq!(t.direction, Direction::Long);
    assert_eq!(t.entry_time, t0() + Duration::minutes(30 * 34));
    assert_eq!(t.entry_price, 135.3);
    assert_eq!(t.stop_loss, 129.8);
    assert!(!t.is_open());
    assert!(t.pnl_pips > 0.0);
    assert!(!result.has_synthetic);

    let out = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&result, out.path()).unwrap();
    let trades_csv = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades_csv.lines().count(), 2);
    assert!(trades_csv.lines().nth(1).unwrap().starts_with("EURUSD,long,2024-01-10 09:30:00,"));

    let report = std::fs::read_to_string(run_dir.join("report.md")).unwrap();
    assert!(report.contains("## EURUSD"));
    assert!(report.contains("| Total Trades | 1 |"));

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.dataset_hash, result.dataset_hash);
    assert_eq!(loaded.results[0].trades, r.trades);
}

#[test]
fn dataset_hash_tracks_file_contents() {
    let data = tempfile::tempdir().unwrap();
    let provider = CsvCandleProvider::new(data.path());
    let path = data.path().join("EURUSD_M30.csv");
    let mut candles = long_setup_candles();
    write_csv(&path, &candles);

    let a = run_backtest(&csv_config(), &provider, Utc::now()).unwrap();

    candles[5].close += 0.25;
    candles[5].high += 0.25;
    write_csv(&path, &candles);
    let b = run_backtest(&csv_config(), &provider, Utc::now()).unwrap();

    assert_ne!(a.dataset_hash, b.dataset_hash);
}

#[test]
fn malformed_csv_is_a_data_error() {
    let data = tempfile::tempdir().unwrap();
    std::fs::write(
        data.path().join("EURUSD_M30.csv"),
        "time,open,high,low,close\nnot-a-time,1,2,0.5,1.5\n",
    )
    .unwrap();
    let provider = CsvCandleProvider::new(data.path());
    let err = run_backtest(&csv_config(), &provider, Utc::now()).unwrap_err();
    assert!(err.to_string().contains("not-a-time"));
}

// ── Synthetic ────────────────────────────────────────────────────────

#[test]
fn synthetic_offline_run() {
    let end = Utc.with_ymd_and_hms(2024, 6, 28, 21, 0, 0).unwrap();
    let mut config = BacktestConfig::default();
    config.backtest.days = 60;
    config.backtest.end = Some(end);
    let provider = SyntheticProvider::new(end, 60);

    let result = run_backtest(&config, &provider, Utc::now()).unwrap();
    assert_eq!(result.results.len(), 4);
    assert!(result.has_synthetic);
    for r in &result.results {
        assert!(r.intraday_bars > 1_500);
        assert!(r.daily_bars >= 40);
        for t in &r.trades {
            assert!(!t.is_open());
            assert!(t.exit_index.unwrap() >= t.entry_index);
        }
    }

    let out = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&result, out.path()).unwrap();
    assert!(run_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("trident_"));
    let trades_csv = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades_csv.lines().count(), result.overall.total_trades + 1);
    let report = std::fs::read_to_string(run_dir.join("report.md")).unwrap();
    assert!(report.contains("**SYNTHETIC**"));
}
