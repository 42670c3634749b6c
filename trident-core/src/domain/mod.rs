//! Domain types for the Trident engine.

pub mod candle;
pub mod direction;
pub mod gap;
pub mod instrument;
pub mod signal;
pub mod trade;

pub use candle::Candle;
pub use direction::{Bias, CandleDirection, Direction, GapDirection};
pub use gap::Gap;
pub use instrument::{Instrument, InstrumentClass};
pub use signal::{SignalKey, TradeSignal};
pub use trade::{ExitFill, ExitReason, Outcome, SimulatedTrade};

/// Symbol type alias
pub type Symbol = String;
