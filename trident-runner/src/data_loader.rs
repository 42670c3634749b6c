//! Candle loading for the runner.
//!
//! Three [`CandleProvider`] implementations:
//! - [`CsvCandleProvider`]: `{dir}/{SYMBOL}_{TIMEFRAME}.csv` files
//! - [`SyntheticProvider`]: deterministic random walk, seeded per symbol
//! - [`MemoryProvider`]: preloaded sequences, for tests and embedding
//!
//! [`load_symbols`] pulls the entry and bias timeframes for every configured
//! symbol and fingerprints the whole dataset with BLAKE3.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use trident_core::data::{check_ordering, CandleProvider, DataError, DataSource, Timeframe};
use trident_core::domain::{Candle, Instrument};

use crate::config::BacktestConfig;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to load {symbol} {timeframe}: {source}")]
    Provider {
        symbol: String,
        timeframe: Timeframe,
        #[source]
        source: DataError,
    },
}

/// Candles for one symbol at both granularities.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub symbol: String,
    pub instrument: Instrument,
    pub intraday: Vec<Candle>,
    pub daily: Vec<Candle>,
    pub source: DataSource,
}

/// Everything a run needs, plus provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub series: Vec<LoadedSeries>,
    /// BLAKE3 over every candle, in symbol order.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// Load entry and bias candles for every configured symbol over the lookback
/// window ending at `config.end_or(now)`.
///
/// A symbol with no data loads as empty sequences and a warning; only a
/// failing provider is an error.
pub fn load_symbols(
    provider: &dyn CandleProvider,
    config: &BacktestConfig,
    now: DateTime<Utc>,
) -> Result<LoadedData, LoadError> {
    let end = config.end_or(now);
    let from = end - Duration::days(i64::from(config.backtest.days));
    let entry_tf = config.backtest.entry_timeframe;
    let bias_tf = config.backtest.bias_timeframe;

    let mut series = Vec::with_capacity(config.backtest.symbols.len());
    for symbol in &config.backtest.symbols {
        let fetch = |tf: Timeframe| {
            provider
                .fetch_range(symbol, tf, from, end)
                .map_err(|source| LoadError::Provider {
                    symbol: symbol.clone(),
                    timeframe: tf,
                    source,
                })
        };
        let intraday = fetch(entry_tf)?;
        let daily = fetch(bias_tf)?;

        if intraday.is_empty() {
            warn!(%symbol, timeframe = %entry_tf, provider = provider.name(), "no intraday data");
        } else {
            info!(
                %symbol,
                intraday = intraday.len(),
                daily = daily.len(),
                provider = provider.name(),
                "loaded candles"
            );
        }

        series.push(LoadedSeries {
            symbol: symbol.clone(),
            instrument: Instrument::classify(symbol),
            intraday,
            daily,
            source: provider.source(),
        });
    }

    let dataset_hash = compute_dataset_hash(&series);
    let has_synthetic = series.iter().any(|s| s.source == DataSource::Synthetic);
    Ok(LoadedData {
        series,
        dataset_hash,
        has_synthetic,
    })
}

/// Deterministic dataset fingerprint.
///
/// Covers symbol names, timestamps and OHLC values in sorted symbol order.
pub fn compute_dataset_hash(series: &[LoadedSeries]) -> String {
    let mut hasher = blake3::Hasher::new();

    let mut ordered: Vec<&LoadedSeries> = series.iter().collect();
    ordered.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    for s in ordered {
        hasher.update(s.symbol.as_bytes());
        for c in s.intraday.iter().chain(s.daily.iter()) {
            hasher.update(&c.timestamp.timestamp().to_le_bytes());
            hasher.update(&c.open.to_le_bytes());
            hasher.update(&c.high.to_le_bytes());
            hasher.update(&c.low.to_le_bytes());
            hasher.update(&c.close.to_le_bytes());
        }
    }

    hasher.finalize().to_hex().to_string()
}

// ── CSV files ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CsvRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

/// Reads `{dir}/{SYMBOL}_{TIMEFRAME}.csv` with header
/// `time,open,high,low,close[,volume]`.
#[derive(Debug, Clone)]
pub struct CsvCandleProvider {
    dir: PathBuf,
}

impl CsvCandleProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir
            .join(format!("{}_{}.csv", symbol.to_ascii_uppercase(), timeframe))
    }

    fn read_all(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_candles_csv(&path)
    }
}

impl CandleProvider for CsvCandleProvider {
    fn name(&self) -> &str {
        "csv"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvFile
    }

    fn fetch_count(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        Ok(take_last(self.read_all(symbol, timeframe)?, count))
    }

    fn fetch_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError> {
        Ok(in_range(self.read_all(symbol, timeframe)?, from, to))
    }
}

/// Parse one candle file. Rows must be sane and strictly ascending in time.
pub fn read_candles_csv(path: &Path) -> Result<Vec<Candle>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::Malformed(format!("{}: {e}", path.display())))?;

    let mut candles = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| DataError::Malformed(format!("{}: {e}", path.display())))?;
        let timestamp = parse_time(&row.time).ok_or_else(|| {
            DataError::Malformed(format!(
                "{} row {}: unrecognised time '{}'",
                path.display(),
                i + 1,
                row.time
            ))
        })?;
        let mut candle = Candle::new(timestamp, row.open, row.high, row.low, row.close);
        candle.volume = row.volume;
        if !candle.is_sane() {
            return Err(DataError::Malformed(format!(
                "{} row {}: inconsistent OHLC",
                path.display(),
                i + 1
            )));
        }
        candles.push(candle);
    }
    check_ordering(&candles)?;
    Ok(candles)
}

/// RFC 3339, `YYYY-MM-DD HH:MM[:SS]` (UTC), `YYYY-MM-DD` or unix seconds.
pub fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(|secs| DateTime::from_timestamp(secs, 0));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// ── Synthetic ────────────────────────────────────────────────────────

/// Deterministic synthetic candles for offline runs.
///
/// Generates 30-minute weekday bars over `days` calendar days ending at `end`;
/// coarser timeframes (including daily) are aggregated from them. The walk is
/// seeded from BLAKE3 of the symbol, so the same symbol and window always
/// produce the same candles.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    end: DateTime<Utc>,
    days: i64,
}

impl SyntheticProvider {
    pub fn new(end: DateTime<Utc>, days: u32) -> Self {
        Self {
            end,
            days: i64::from(days),
        }
    }

    fn series(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        if timeframe.minutes() < Timeframe::M30.minutes() {
            return Err(DataError::Unavailable(format!(
                "synthetic data is generated at M30 or coarser, not {timeframe}"
            )));
        }
        let base = generate_synthetic_candles(symbol, self.end, self.days);
        Ok(if timeframe == Timeframe::M30 {
            base
        } else {
            aggregate(&base, timeframe)
        })
    }
}

impl CandleProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch_count(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        Ok(take_last(self.series(symbol, timeframe)?, count))
    }

    fn fetch_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError> {
        Ok(in_range(self.series(symbol, timeframe)?, from, to))
    }
}

/// Random walk with slowly changing drift and occasional impulse bars, so
/// gaps and trends both show up.
fn generate_synthetic_candles(symbol: &str, end: DateTime<Utc>, days: i64) -> Vec<Candle> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.to_ascii_uppercase().as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let step = Timeframe::M30.duration();
    let end_secs = end.timestamp() - end.timestamp().rem_euclid(step.num_seconds());
    let Some(end) = DateTime::from_timestamp(end_secs, 0) else {
        return Vec::new();
    };
    let mut current = end - Duration::days(days);

    let mut price = starting_price(symbol);
    let mut drift = 0.0_f64;
    let mut candles = Vec::new();

    while current <= end {
        if matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            current += step;
            continue;
        }
        if candles.len() % 96 == 0 {
            drift = rng.gen_range(-0.0003..0.0003);
        }
        let mut ret = drift + rng.gen_range(-0.0010..0.0010);
        if rng.gen_bool(0.03) {
            ret += drift.signum() * rng.gen_range(0.0015..0.0040);
        }

        let open = price;
        let close = open * (1.0 + ret);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.0006));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.0006));
        let volume = rng.gen_range(100.0..5_000.0_f64).round();
        candles.push(Candle::new(current, open, high, low, close).with_volume(volume));

        price = close;
        current += step;
    }
    candles
}

fn starting_price(symbol: &str) -> f64 {
    let upper = symbol.to_ascii_uppercase();
    if upper.contains("JPY") {
        150.0
    } else if upper.contains("XAU") || upper.contains("GOLD") {
        2000.0
    } else {
        1.1
    }
}

/// Fold candles into `timeframe` buckets aligned to the unix epoch (UTC).
pub fn aggregate(candles: &[Candle], timeframe: Timeframe) -> Vec<Candle> {
    let bucket_secs = timeframe.minutes() * 60;
    let mut out: Vec<Candle> = Vec::new();
    let mut current_bucket: Option<i64> = None;

    for c in candles {
        let bucket = c.timestamp.timestamp().div_euclid(bucket_secs);
        if current_bucket == Some(bucket) {
            if let Some(last) = out.last_mut() {
                last.high = last.high.max(c.high);
                last.low = last.low.min(c.low);
                last.close = c.close;
                last.volume = match (last.volume, c.volume) {
                    (Some(a), Some(b)) => Some(a + b),
                    (a, b) => a.or(b),
                };
                continue;
            }
        }
        let Some(start) = DateTime::from_timestamp(bucket * bucket_secs, 0) else {
            continue;
        };
        let mut bar = Candle::new(start, c.open, c.high, c.low, c.close);
        bar.volume = c.volume;
        out.push(bar);
        current_bucket = Some(bucket);
    }
    out
}

// ── In-memory ────────────────────────────────────────────────────────

/// Preloaded candle sequences keyed by (symbol, timeframe).
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    data: HashMap<(String, Timeframe), Vec<Candle>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sequence; it must be strictly ascending.
    pub fn insert(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        candles: Vec<Candle>,
    ) -> Result<(), DataError> {
        check_ordering(&candles)?;
        self.data
            .insert((symbol.to_ascii_uppercase(), timeframe), candles);
        Ok(())
    }

    fn get(&self, symbol: &str, timeframe: Timeframe) -> Vec<Candle> {
        self.data
            .get(&(symbol.to_ascii_uppercase(), timeframe))
            .cloned()
            .unwrap_or_default()
    }
}

impl CandleProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn source(&self) -> DataSource {
        DataSource::Memory
    }

    fn fetch_count(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Candle>, DataError> {
        Ok(take_last(self.get(symbol, timeframe), count))
    }

    fn fetch_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Candle>, DataError> {
        Ok(in_range(self.get(symbol, timeframe), from, to))
    }
}

fn take_last(mut candles: Vec<Candle>, count: usize) -> Vec<Candle> {
    let skip = candles.len().saturating_sub(count);
    candles.drain(..skip);
    candles
}

fn in_range(candles: Vec<Candle>, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Candle> {
    candles
        .into_iter()
        .filter(|c| c.timestamp >= from && c.timestamp <= to)
        .collect()
}
