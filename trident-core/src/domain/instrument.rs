//! Instrument metadata: normalized price unit and stop behaviour class.

use serde::{Deserialize, Serialize};

use super::direction::Direction;

/// How stops are honoured for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentClass {
    /// Price-based hard stop.
    Standard,
    /// Prone to deep liquidity wicks (metals); a close-based stop filter is used
    /// unless the caller opts back into hard stops.
    WickProne,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    /// Minimum meaningful price increment ("pip").
    pub unit_size: f64,
    pub class: InstrumentClass,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, unit_size: f64, class: InstrumentClass) -> Self {
        Self {
            symbol: symbol.into(),
            unit_size,
            class,
        }
    }

    /// Classify a symbol by name: yen crosses trade in 0.01 units, gold in 0.1
    /// units and is wick-prone, everything else uses 0.0001.
    pub fn classify(symbol: &str) -> Self {
        let upper = symbol.to_uppercase();
        if upper.contains("JPY") {
            Self::new(symbol, 0.01, InstrumentClass::Standard)
        } else if upper.contains("XAU") || upper.contains("GOLD") {
            Self::new(symbol, 0.1, InstrumentClass::WickProne)
        } else {
            Self::new(symbol, 0.0001, InstrumentClass::Standard)
        }
    }

    pub fn is_wick_prone(&self) -> bool {
        self.class == InstrumentClass::WickProne
    }

    /// Signed P&L in normalized units for a move from `entry` to `exit`.
    pub fn pnl_units(&self, direction: Direction, entry: f64, exit: f64) -> f64 {
        direction.sign() * (exit - entry) / self.unit_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_by_symbol() {
        let jpy = Instrument::classify("USDJPY");
        assert_eq!(jpy.unit_size, 0.01);
        assert!(!jpy.is_wick_prone());

        let gold = Instrument::classify("xauusd");
        assert_eq!(gold.unit_size, 0.1);
        assert!(gold.is_wick_prone());

        let eur = Instrument::classify("EURUSD");
        assert_eq!(eur.unit_size, 0.0001);
        assert_eq!(eur.class, InstrumentClass::Standard);
    }

    #[test]
    fn pnl_units_signed_by_direction() {
        let eur = Instrument::classify("EURUSD");
        assert!((eur.pnl_units(Direction::Long, 1.1000, 1.1100) - 100.0).abs() < 1e-6);
        assert!((eur.pnl_units(Direction::Short, 1.1000, 1.1100) + 100.0).abs() < 1e-6);
    }
}
