use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Serialize, Serializer};

use crate::error::{ConfigError, Result};

const MAX_YEAR: u16 = 9999;
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// A calendar date without time-of-day or zone.
///
/// Only valid calendar dates in years 0 through 9999 can be constructed;
/// February 29th is accepted in leap years only.
#[derive(Debug, Clone, Copy)]
pub struct Date(NaiveDate);

impl Date {
    /// Creates a date, rejecting days that do not exist in the given month.
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self> {
        if year > MAX_YEAR {
            return Err(ConfigError::value(format!(
                "year {year} is out of range 0..={MAX_YEAR}"
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(ConfigError::value(format!(
                "month {month} is out of range 1..=12"
            )));
        }
        NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
            .map(Self)
            .ok_or_else(|| {
                let last = Self::days_in_month(year, month);
                ConfigError::value(format!(
                    "day {day} is out of range 1..={last} for {year:04}-{month:02}"
                ))
            })
    }

    pub(crate) fn from_naive(date: NaiveDate) -> Result<Self> {
        if !(0..=i32::from(MAX_YEAR)).contains(&date.year()) {
            return Err(ConfigError::value(format!(
                "year {} is outside the supported range",
                date.year()
            )));
        }
        Ok(Self(date))
    }

    pub(crate) fn naive(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> u16 {
        // 0..=9999 by construction.
        self.0.year() as u16
    }

    pub fn month(&self) -> u8 {
        self.0.month() as u8
    }

    pub fn day(&self) -> u8 {
        self.0.day() as u8
    }

    /// Gregorian leap year rule.
    pub fn is_leap_year(year: u16) -> bool {
        NaiveDate::from_ymd_opt(i32::from(year), 2, 29).is_some()
    }

    /// Number of days in `month` of `year`, or 0 for an invalid month.
    pub fn days_in_month(year: u16, month: u8) -> u8 {
        (28..=31)
            .rev()
            .find(|&day| NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), day).is_some())
            .map_or(0, |day| day as u8)
    }

    /// Days since 1970-01-01 (negative before the epoch).
    pub fn to_ordinal(&self) -> i64 {
        i64::from(self.0.num_days_from_ce()) - UNIX_EPOCH_DAYS_FROM_CE
    }

    /// Inverse of [`Date::to_ordinal`].
    pub fn from_ordinal(days: i64) -> Result<Self> {
        let out_of_range =
            || ConfigError::value(format!("day {days} is outside the supported range"));
        let from_ce = days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(|d| i32::try_from(d).ok())
            .ok_or_else(out_of_range)?;
        NaiveDate::from_num_days_from_ce_opt(from_ce)
            .ok_or_else(out_of_range)
            .and_then(Self::from_naive)
    }

    /// Returns the date `days` days later (or earlier, if negative).
    pub fn add_days(&self, days: i64) -> Result<Self> {
        let step = Days::new(days.unsigned_abs());
        let moved = if days < 0 {
            self.0.checked_sub_days(step)
        } else {
            self.0.checked_add_days(step)
        };
        moved
            .ok_or_else(|| ConfigError::value(format!("{self} plus {days} days is out of range")))
            .and_then(Self::from_naive)
    }

    pub(crate) fn packed(&self) -> u32 {
        (u32::from(self.year()) << 16) | (u32::from(self.month()) << 8) | u32::from(self.day())
    }

    /// Parses `YYYY-MM-DD` or `DD.MM.YYYY` with a four-digit year; a single
    /// trailing delimiter is ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || ConfigError::parse(format!("invalid date '{text}'"));

        let (delimiter, year_first) = if text.contains('-') {
            ('-', true)
        } else if text.contains('.') {
            ('.', false)
        } else {
            return Err(invalid());
        };

        let body = text.strip_suffix(delimiter).unwrap_or(text);
        let parts: Vec<&str> = body.split(delimiter).collect();
        if parts.len() != 3 || !parts.iter().all(|p| is_digits(p)) {
            return Err(invalid());
        }

        let (year, month, day) = if year_first {
            (parts[0], parts[1], parts[2])
        } else {
            (parts[2], parts[1], parts[0])
        };
        if year.len() != 4 || month.len() > 2 || day.len() > 2 {
            return Err(invalid());
        }

        let year: u16 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        let day: u8 = day.parse().map_err(|_| invalid())?;
        Self::new(year, month, day)
            .map_err(|e| ConfigError::parse(format!("invalid date '{text}': {e}")))
    }
}

pub(crate) fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

impl PartialEq for Date {
    fn eq(&self, other: &Self) -> bool {
        self.packed() == other.packed()
    }
}

impl Eq for Date {}

impl Hash for Date {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.packed().hash(state);
    }
}

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Date {
    fn cmp(&self, other: &Self) -> Ordering {
        self.packed().cmp(&other.packed())
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
    }
}

impl FromStr for Date {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_rejects_invalid_calendar_dates() {
        assert!(Date::new(2024, 2, 29).is_ok());
        assert_eq!(Date::new(2023, 2, 29).unwrap_err().kind(), ErrorKind::Value);
        assert_eq!(Date::new(2000, 2, 30).unwrap_err().kind(), ErrorKind::Value);
        assert_eq!(Date::new(1900, 2, 29).unwrap_err().kind(), ErrorKind::Value);
        assert_eq!(Date::new(2023, 13, 1).unwrap_err().kind(), ErrorKind::Value);
        assert_eq!(Date::new(2023, 4, 0).unwrap_err().kind(), ErrorKind::Value);
    }

    #[test]
    fn test_year_is_limited_to_four_digits() {
        assert!(Date::new(9999, 12, 31).is_ok());
        assert!(Date::new(0, 1, 1).is_ok());
        assert_eq!(Date::new(10000, 1, 1).unwrap_err().kind(), ErrorKind::Value);
        assert_eq!(Date::new(u16::MAX, 1, 1).unwrap_err().kind(), ErrorKind::Value);
        assert!(Date::new(9999, 12, 31).unwrap().add_days(1).is_err());
    }

    #[test]
    fn test_calendar_helpers() {
        assert!(Date::is_leap_year(2000));
        assert!(Date::is_leap_year(2024));
        assert!(!Date::is_leap_year(1900));
        assert_eq!(Date::days_in_month(2024, 2), 29);
        assert_eq!(Date::days_in_month(2023, 2), 28);
        assert_eq!(Date::days_in_month(2023, 4), 30);
        assert_eq!(Date::days_in_month(2023, 13), 0);
    }

    #[test]
    fn test_parse_both_layouts() {
        let expected = Date::new(2023, 2, 1).unwrap();
        assert_eq!(Date::parse("2023-02-01").unwrap(), expected);
        assert_eq!(Date::parse("01.02.2023").unwrap(), expected);
        assert_eq!(Date::parse("2023-02-01-").unwrap(), expected);
        assert_eq!(Date::parse("01.02.2023.").unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for text in [
            "",
            "2023",
            "2023-02",
            "2023-02-01--",
            "2023-0a-01",
            " 2023-02-01",
            "2023/02/01",
            "2023-02-30",
            "29.02.2023",
            "01.02-2023",
            "99999-01-01",
            "10000-01-01",
            "987-06-05",
        ] {
            let err = Date::parse(text).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse, "input: {text:?}");
        }
    }

    #[test]
    fn test_display_pads_fields() {
        assert_eq!(Date::new(987, 6, 5).unwrap().to_string(), "0987-06-05");
        assert_eq!(Date::parse("0987-06-05").unwrap().year(), 987);
    }

    #[test]
    fn test_ordering_is_chronological() {
        let a = Date::new(2022, 12, 31).unwrap();
        let b = Date::new(2023, 1, 1).unwrap();
        let c = Date::new(2023, 1, 2).unwrap();
        assert!(a < b && b < c);
        assert_eq!(b.max(c), c);
    }

    #[test]
    fn test_ordinal_conversion() {
        assert_eq!(Date::new(1970, 1, 1).unwrap().to_ordinal(), 0);
        assert_eq!(Date::new(2000, 3, 1).unwrap().to_ordinal(), 11_017);
        assert_eq!(Date::new(1969, 12, 31).unwrap().to_ordinal(), -1);

        let leap = Date::new(2024, 2, 28).unwrap();
        assert_eq!(leap.add_days(1).unwrap(), Date::new(2024, 2, 29).unwrap());
        assert_eq!(leap.add_days(2).unwrap(), Date::new(2024, 3, 1).unwrap());
        assert_eq!(
            Date::new(2023, 1, 1).unwrap().add_days(-1).unwrap(),
            Date::new(2022, 12, 31).unwrap()
        );
        assert!(Date::new(0, 1, 1).unwrap().add_days(-1).is_err());
        assert_eq!(
            Date::from_ordinal(Date::new(2024, 2, 29).unwrap().to_ordinal()).unwrap(),
            Date::new(2024, 2, 29).unwrap()
        );
        assert!(Date::add_days(&leap, i64::MIN).is_err());
    }
}
