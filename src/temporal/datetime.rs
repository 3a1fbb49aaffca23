use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDateTime};
use serde::{Serialize, Serializer};

use super::{Date, Time, TimeOffset};
use crate::error::{ConfigError, Result};

/// A date and time of day, optionally anchored to a UTC offset.
///
/// Without an offset the value is *local*: it names a wall-clock reading in
/// an unspecified zone and never compares equal to an offset-bearing value,
/// not even one at `Z` with the same fields.
#[derive(Debug, Clone, Copy)]
pub struct DateTime {
    date: Date,
    time: Time,
    offset: Option<TimeOffset>,
}

impl DateTime {
    pub fn new(date: Date, time: Time, offset: Option<TimeOffset>) -> Self {
        Self { date, time, offset }
    }

    /// A date time without offset.
    pub fn local(date: Date, time: Time) -> Self {
        Self::new(date, time, None)
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn offset(&self) -> Option<TimeOffset> {
        self.offset
    }

    pub fn is_local(&self) -> bool {
        self.offset.is_none()
    }

    /// Converts to the same instant expressed at offset `Z`.
    ///
    /// Local values have no anchor and cannot be converted.
    pub fn to_utc(&self) -> Result<Self> {
        let offset = self.offset.ok_or_else(|| {
            ConfigError::value(format!("cannot convert local date time {self} to UTC"))
        })?;

        let fixed = FixedOffset::east_opt(offset.minutes() * 60)
            .ok_or_else(|| ConfigError::value(format!("offset {offset} is out of range")))?;
        let utc = NaiveDateTime::new(self.date.naive(), self.time.naive())
            .and_local_timezone(fixed)
            .single()
            .ok_or_else(|| ConfigError::value(format!("{self} is not a single instant")))?
            .naive_utc();
        Ok(Self {
            date: Date::from_naive(utc.date())?,
            time: Time::from_naive(utc.time())?,
            offset: Some(TimeOffset::utc()),
        })
    }

    /// Parses an RFC 3339 style date time.
    ///
    /// Date and time may be separated by `T`, `t`, a space or `_`; the date
    /// part also accepts `DD.MM.YYYY`. A trailing `Z`/`z`/`±HH:MM` offset is
    /// optional; without it the value is local.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || ConfigError::parse(format!("invalid date time '{text}'"));

        let (date, rest) = text
            .split_once(|c: char| matches!(c, 'T' | 't' | ' ' | '_'))
            .ok_or_else(invalid)?;
        let (time, offset) = match rest.find(|c: char| matches!(c, 'Z' | 'z' | '+' | '-')) {
            Some(pos) => (&rest[..pos], Some(&rest[pos..])),
            None => (rest, None),
        };

        let wrap = |e: ConfigError| ConfigError::parse(format!("invalid date time '{text}': {e}"));
        let date = Date::parse(date).map_err(wrap)?;
        let time = Time::parse(time).map_err(wrap)?;
        let offset = offset.map(TimeOffset::parse).transpose().map_err(wrap)?;
        Ok(Self::new(date, time, offset))
    }

    // Local values use offset code 0; offsets map to 1..2*24h, so they never collide.
    pub(crate) fn packed(&self) -> u128 {
        let offset_code = self.offset.map_or(0, |o| o.packed() + 1);
        (u128::from(self.date.packed()) << 80)
            | (u128::from(self.time.packed()) << 16)
            | u128::from(offset_code)
    }
}

impl PartialEq for DateTime {
    fn eq(&self, other: &Self) -> bool {
        self.packed() == other.packed()
    }
}

impl Eq for DateTime {}

impl Hash for DateTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.packed().hash(state);
    }
}

impl PartialOrd for DateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.packed().cmp(&other.packed())
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.date, self.time)?;
        match self.offset {
            Some(offset) => write!(f, "{offset}"),
            None => Ok(()),
        }
    }
}

impl FromStr for DateTime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
