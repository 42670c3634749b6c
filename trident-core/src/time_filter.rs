//! Time Window Filter.
//!
//! Pure predicates over UTC timestamps, evaluated in one trading-center
//! timezone. Windows are inclusive on both ends.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Inclusive wall-clock window, `start <= t <= end`.
///
/// Serialized as `"HH:MM"` strings so session files stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Build from hour/minute pairs. Returns `None` for an invalid clock time.
    pub fn from_hm(start: (u32, u32), end: (u32, u32)) -> Option<Self> {
        Some(Self {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0)?,
            end: NaiveTime::from_hms_opt(end.0, end.1, 0)?,
        })
    }

    pub fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

/// Named trading windows for one trading center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCalendar {
    pub timezone: Tz,
    /// Window in which confirmations may trigger entries.
    pub kill_zone: TimeWindow,
    /// Window in which the gap's impulse candle must print.
    pub gap_window: TimeWindow,
    /// Non-trading weekdays.
    pub weekend: Vec<Weekday>,
}

impl Default for SessionCalendar {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            kill_zone: TimeWindow {
                start: hm(3, 0),
                end: hm(6, 30),
            },
            gap_window: TimeWindow {
                start: hm(2, 30),
                end: hm(4, 0),
            },
            weekend: vec![Weekday::Sat, Weekday::Sun],
        }
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

impl SessionCalendar {
    fn local_time(&self, ts: DateTime<Utc>) -> NaiveTime {
        ts.with_timezone(&self.timezone).time()
    }

    pub fn in_kill_zone(&self, ts: DateTime<Utc>) -> bool {
        self.kill_zone.contains(self.local_time(ts))
    }

    pub fn in_gap_formation_window(&self, ts: DateTime<Utc>) -> bool {
        self.gap_window.contains(self.local_time(ts))
    }

    /// Weekday check in the trading-center timezone.
    pub fn is_trading_day(&self, ts: DateTime<Utc>) -> bool {
        let weekday = ts.with_timezone(&self.timezone).weekday();
        !self.weekend.contains(&weekday)
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|e| de::Error::custom(format!("invalid time '{raw}': {e}")))
    }
}
