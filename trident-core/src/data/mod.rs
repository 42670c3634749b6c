//! Candle provider interface.

pub mod provider;

pub use provider::{check_ordering, CandleProvider, DataError, DataSource, Timeframe};
