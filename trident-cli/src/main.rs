//! Trident CLI: backtest and live scan commands.
//!
//! Commands:
//! - `backtest`: run the sliding-window backtest over every configured symbol
//! - `scan`: one live scan tick (and optional position monitor) with a dry-run executor
//!
//! Logging goes through `tracing`; set `RUST_LOG` to adjust (default `info`).

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use trident_core::data::CandleProvider;
use trident_runner::live::{DryRunExecutor, LiveScanner, MonitorOutcome, TickOutcome};
use trident_runner::runner::run_backtest;
use trident_runner::{save_artifacts, BacktestConfig, CsvCandleProvider, RunResult, SyntheticProvider};

#[derive(Parser)]
#[command(name = "trident", about = "Trident pattern detector and backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest the pattern over historical candles.
    Backtest {
        #[command(flatten)]
        source: SourceArgs,

        /// Override the configured symbols (repeatable).
        #[arg(long = "symbol")]
        symbols: Vec<String>,

        /// Override the lookback in calendar days.
        #[arg(long)]
        days: Option<u32>,

        /// Last day of the window (YYYY-MM-DD, inclusive). Defaults to now.
        #[arg(long)]
        end: Option<String>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary without writing artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Run one live scan tick against a dry-run executor.
    Scan {
        #[command(flatten)]
        source: SourceArgs,

        /// Also run the open-position monitor after the scan.
        #[arg(long, default_value_t = false)]
        monitor: bool,
    },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding `{SYMBOL}_{TIMEFRAME}.csv` files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Use deterministic synthetic candles instead of CSV files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

impl SourceArgs {
    fn load_config(&self) -> Result<BacktestConfig> {
        match &self.config {
            Some(path) => {
                let config = BacktestConfig::from_file(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                info!(path = %path.display(), hash = %config.config_hash(), "config loaded");
                Ok(config)
            }
            None => Ok(BacktestConfig::default()),
        }
    }

    fn provider(&self, config: &BacktestConfig, now: DateTime<Utc>) -> Box<dyn CandleProvider> {
        if self.synthetic {
            Box::new(SyntheticProvider::new(config.end_or(now), config.backtest.days))
        } else {
            Box::new(CsvCandleProvider::new(&self.data_dir))
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest {
            source,
            symbols,
            days,
            end,
            output_dir,
            no_save,
        } => run_backtest_cmd(source, symbols, days, end, output_dir, no_save),
        Commands::Scan { source, monitor } => run_scan_cmd(source, monitor),
    }
}

fn run_backtest_cmd(
    source: SourceArgs,
    symbols: Vec<String>,
    days: Option<u32>,
    end: Option<String>,
    output_dir: PathBuf,
    no_save: bool,
) -> Result<()> {
    let mut config = source.load_config()?;
    if !symbols.is_empty() {
        config.backtest.symbols = symbols.iter().map(|s| s.to_uppercase()).collect();
    }
    if let Some(days) = days {
        config.backtest.days = days;
    }
    if let Some(end) = end.as_deref() {
        config.backtest.end = Some(parse_end_date(end)?);
    }

    let now = Utc::now();
    let provider = source.provider(&config, now);
    let result = run_backtest(&config, provider.as_ref(), now)?;

    print_summary(&result);

    if !no_save {
        let run_dir = save_artifacts(&result, &output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn run_scan_cmd(source: SourceArgs, monitor: bool) -> Result<()> {
    let config = source.load_config()?;
    config.validate()?;

    let now = Utc::now();
    let provider = source.provider(&config, now);
    let executor = DryRunExecutor::new(config.live.max_open_trades);
    let mut scanner = LiveScanner::new(&config, provider.as_ref(), &executor);

    let outcomes = scanner.scan_tick(now);
    if outcomes.is_empty() {
        println!("Market closed, nothing scanned.");
    }
    for outcome in &outcomes {
        match outcome {
            TickOutcome::NoData { symbol } => println!("{symbol:<8} no data"),
            TickOutcome::NoSignal { symbol } => println!("{symbol:<8} no signal"),
            TickOutcome::AlreadySent { signal } => {
                println!("{:<8} signal already sent", signal.symbol)
            }
            TickOutcome::Placed { signal, position } => println!(
                "{:<8} {} entry {:.5} sl {:.5}{} (ticket {})",
                signal.symbol,
                signal.direction,
                signal.entry_price,
                signal.stop_loss,
                if position.hard_stop { "" } else { " close-filter" },
                position.ticket
            ),
            TickOutcome::Rejected { signal, error } => {
                println!("{:<8} {} not placed: {error}", signal.symbol, signal.direction)
            }
            TickOutcome::Failed { symbol, error } => println!("{symbol:<8} failed: {error}"),
        }
    }

    if monitor {
        for outcome in scanner.monitor_positions()? {
            match outcome {
                MonitorOutcome::Hold { ticket } => println!("ticket {ticket}: hold"),
                MonitorOutcome::Closed { ticket, reason } => {
                    println!("ticket {ticket}: closed ({reason})")
                }
                MonitorOutcome::Failed { ticket, error } => {
                    println!("ticket {ticket}: check failed: {error}")
                }
            }
        }
    }
    Ok(())
}

fn parse_end_date(s: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid --end date '{s}', expected YYYY-MM-DD"))?;
    match date.and_hms_opt(23, 59, 59) {
        Some(dt) => Ok(dt.and_utc()),
        None => bail!("invalid --end date '{s}'"),
    }
}

fn print_summary(result: &RunResult) {
    println!();
    println!("=== Trident Backtest ===");
    println!(
        "Period:           {} to {}",
        result.start.format("%Y-%m-%d"),
        result.end.format("%Y-%m-%d")
    );
    for r in &result.results {
        let s = &r.summary;
        println!();
        println!("--- {} ---", r.symbol);
        if r.intraday_bars == 0 {
            println!("No data.");
            continue;
        }
        println!("Bars:             {} ({} daily)", r.intraday_bars, r.daily_bars);
        println!("Total Trades:     {}", s.total_trades);
        println!("Wins / Losses:    {} / {}", s.wins, s.losses);
        println!("Win Rate:         {:.1}%", s.win_rate_pct());
        println!("Total PnL (pips): {:+.1}", s.total_pnl_pips);
        println!("Avg R:R:          {:+.2}", s.avg_rr);
        println!("Best Trade:       {:+.1} pips", s.best_trade_pips);
        println!("Worst Trade:      {:+.1} pips", s.worst_trade_pips);
        println!("Max Drawdown:     {:.1} pips", s.max_drawdown_pips);
    }

    let o = &result.overall;
    println!();
    println!("=== Overall ===");
    println!("Total Trades:     {}", o.total_trades);
    println!("Win Rate:         {:.1}%", o.win_rate_pct());
    println!("Total PnL (pips): {:+.1}", o.total_pnl_pips);
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
