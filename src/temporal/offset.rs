use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::date::is_digits;
use crate::error::{ConfigError, Result};

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Offset from UTC in minutes, strictly between -24h and +24h.
#[derive(Debug, Clone, Copy)]
pub struct TimeOffset {
    minutes: i32,
}

impl TimeOffset {
    /// The zero offset, printed as `Z`.
    pub fn utc() -> Self {
        Self { minutes: 0 }
    }

    pub fn from_minutes(minutes: i32) -> Result<Self> {
        if minutes.unsigned_abs() >= MINUTES_PER_DAY.unsigned_abs() {
            return Err(ConfigError::value(format!(
                "offset of {minutes} minutes exceeds 24 hours"
            )));
        }
        Ok(Self { minutes })
    }

    /// Combines hours and minutes; the sign of a non-zero `hours` applies to the total.
    ///
    /// ```
    /// use dragon_cfg::TimeOffset;
    ///
    /// assert_eq!(TimeOffset::new(-1, 30).unwrap().minutes(), -90);
    /// assert_eq!(TimeOffset::new(0, -45).unwrap().minutes(), -45);
    /// ```
    pub fn new(hours: i32, minutes: i32) -> Result<Self> {
        if minutes.unsigned_abs() > 59 {
            return Err(ConfigError::value(format!(
                "minute part {minutes} is out of range -59..=59"
            )));
        }
        let hour_minutes = hours.checked_mul(60).ok_or_else(|| {
            ConfigError::value(format!("offset of {hours} hours exceeds 24 hours"))
        })?;
        let total = match hours.signum() {
            -1 => hour_minutes.saturating_sub(minutes.abs()),
            1 => hour_minutes.saturating_add(minutes.abs()),
            _ => minutes,
        };
        Self::from_minutes(total)
    }

    pub fn minutes(&self) -> i32 {
        self.minutes
    }

    pub fn is_utc(&self) -> bool {
        self.minutes == 0
    }

    /// Parses `Z`, `z` or `[+-]HH:MM`.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || ConfigError::parse(format!("invalid time offset '{text}'"));

        if text == "Z" || text == "z" {
            return Ok(Self::utc());
        }

        let (sign, rest) = if let Some(rest) = text.strip_prefix('+') {
            (1, rest)
        } else if let Some(rest) = text.strip_prefix('-') {
            (-1, rest)
        } else {
            return Err(invalid());
        };

        let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
        if hours.len() != 2 || minutes.len() != 2 || !is_digits(hours) || !is_digits(minutes) {
            return Err(invalid());
        }
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if minutes > 59 {
            return Err(invalid());
        }

        Self::from_minutes(sign * (hours * 60 + minutes))
            .map_err(|e| ConfigError::parse(format!("invalid time offset '{text}': {e}")))
    }

    pub(crate) fn packed(&self) -> u32 {
        // Shifted into 0..2*24h; the sum is never negative.
        (self.minutes + MINUTES_PER_DAY) as u32
    }
}

impl PartialEq for TimeOffset {
    fn eq(&self, other: &Self) -> bool {
        self.packed() == other.packed()
    }
}

impl Eq for TimeOffset {}

impl Hash for TimeOffset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.packed().hash(state);
    }
}

impl PartialOrd for TimeOffset {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeOffset {
    fn cmp(&self, other: &Self) -> Ordering {
        self.packed().cmp(&other.packed())
    }
}

impl fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minutes == 0 {
            return f.write_str("Z");
        }
        let sign = if self.minutes < 0 { '-' } else { '+' };
        let total = self.minutes.abs();
        write!(f, "{sign}{:02}:{:02}", total / 60, total % 60)
    }
}

impl FromStr for TimeOffset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TimeOffset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
