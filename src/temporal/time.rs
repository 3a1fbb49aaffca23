use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Serialize, Serializer};

use super::date::is_digits;
use crate::error::{ConfigError, Result};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// A time of day with nanosecond resolution. Leap seconds are not representable.
#[derive(Debug, Clone, Copy)]
pub struct Time(NaiveTime);

impl Time {
    pub fn new(hour: u8, minute: u8, second: u8, nanosecond: u32) -> Result<Self> {
        if hour > 23 {
            return Err(ConfigError::value(format!("hour {hour} is out of range 0..=23")));
        }
        if minute > 59 {
            return Err(ConfigError::value(format!(
                "minute {minute} is out of range 0..=59"
            )));
        }
        if second == 60 {
            return Err(ConfigError::value("leap seconds are not supported"));
        }
        if second > 59 {
            return Err(ConfigError::value(format!(
                "second {second} is out of range 0..=59"
            )));
        }
        // chrono encodes leap seconds as nanoseconds past 10^9.
        if u64::from(nanosecond) >= NANOS_PER_SECOND {
            return Err(ConfigError::value(format!(
                "nanosecond {nanosecond} is out of range 0..=999999999"
            )));
        }
        NaiveTime::from_hms_nano_opt(
            u32::from(hour),
            u32::from(minute),
            u32::from(second),
            nanosecond,
        )
        .map(Self)
        .ok_or_else(|| {
            ConfigError::value(format!(
                "invalid time {hour:02}:{minute:02}:{second:02}.{nanosecond:09}"
            ))
        })
    }

    pub(crate) fn from_naive(time: NaiveTime) -> Result<Self> {
        Self::new(
            time.hour() as u8,
            time.minute() as u8,
            time.second() as u8,
            time.nanosecond(),
        )
    }

    pub(crate) fn naive(&self) -> NaiveTime {
        self.0
    }

    pub fn hour(&self) -> u8 {
        self.0.hour() as u8
    }

    pub fn minute(&self) -> u8 {
        self.0.minute() as u8
    }

    pub fn second(&self) -> u8 {
        self.0.second() as u8
    }

    pub fn nanosecond(&self) -> u32 {
        self.0.nanosecond()
    }

    /// Nanoseconds elapsed since 00:00:00.
    pub fn nanoseconds_since_midnight(&self) -> u64 {
        u64::from(self.0.num_seconds_from_midnight()) * NANOS_PER_SECOND
            + u64::from(self.0.nanosecond())
    }

    /// Parses `HH:MM[:SS[(.|,)fraction]]`.
    ///
    /// The fraction must have 1, 2, 3, 6 or 9 digits.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || ConfigError::parse(format!("invalid time '{text}'"));

        let (clock, fraction) = match text.find(|c: char| c == '.' || c == ',') {
            Some(pos) => (&text[..pos], Some(&text[pos + 1..])),
            None => (text, None),
        };

        let parts: Vec<&str> = clock.split(':').collect();
        if !(2..=3).contains(&parts.len())
            || !parts.iter().all(|p| is_digits(p) && p.len() <= 2)
            || (fraction.is_some() && parts.len() != 3)
        {
            return Err(invalid());
        }

        let nanosecond = match fraction {
            Some(digits) => parse_fraction(digits).ok_or_else(invalid)?,
            None => 0,
        };
        let hour: u8 = parts[0].parse().map_err(|_| invalid())?;
        let minute: u8 = parts[1].parse().map_err(|_| invalid())?;
        let second: u8 = match parts.get(2) {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };

        Self::new(hour, minute, second, nanosecond)
            .map_err(|e| ConfigError::parse(format!("invalid time '{text}': {e}")))
    }

    pub(crate) fn packed(&self) -> u64 {
        self.nanoseconds_since_midnight()
    }
}

/// Deci-, centi-, milli-, micro- or nanoseconds, scaled to nanoseconds.
fn parse_fraction(digits: &str) -> Option<u32> {
    if !is_digits(digits) || !matches!(digits.len(), 1 | 2 | 3 | 6 | 9) {
        return None;
    }
    let value: u32 = digits.parse().ok()?;
    Some(value * 10u32.pow(9 - digits.len() as u32))
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.packed() == other.packed()
    }
}

impl Eq for Time {}

impl Hash for Time {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.packed().hash(state);
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.packed().cmp(&other.packed())
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour(), self.minute(), self.second())?;
        let nanos = self.nanosecond();
        if nanos == 0 {
            Ok(())
        } else if nanos % 1_000_000 == 0 {
            write!(f, ".{:03}", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            write!(f, ".{:06}", nanos / 1_000)
        } else {
            write!(f, ".{nanos:09}")
        }
    }
}

impl FromStr for Time {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
