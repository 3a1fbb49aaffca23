//! Calendar and clock value types stored in the configuration tree.
//!
//! All four types are small `Copy` values with validated fields, a canonical
//! string form that parses back to an equal value, and a total order derived
//! from a packed integer representation.

mod date;
mod datetime;
mod offset;
mod time;

pub use date::Date;
pub use datetime::DateTime;
pub use offset::TimeOffset;
pub use time::Time;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_date() -> impl Strategy<Value = Date> {
        (0u16..=9999, 1u8..=12, 1u8..=31).prop_filter_map("valid calendar date", |(y, m, d)| {
            Date::new(y, m, d).ok()
        })
    }

    fn any_time() -> impl Strategy<Value = Time> {
        (0u8..24, 0u8..60, 0u8..60, 0u32..1_000_000_000)
            .prop_map(|(h, m, s, ns)| Time::new(h, m, s, ns).unwrap())
    }

    fn any_offset() -> impl Strategy<Value = Option<TimeOffset>> {
        prop::option::of((-1439i32..1440).prop_map(|m| TimeOffset::from_minutes(m).unwrap()))
    }

    proptest! {
        #[test]
        fn prop_date_round_trip(date in any_date()) {
            prop_assert_eq!(Date::parse(&date.to_string()).unwrap(), date);
        }

        #[test]
        fn prop_time_round_trip(time in any_time()) {
            prop_assert_eq!(Time::parse(&time.to_string()).unwrap(), time);
        }

        #[test]
        fn prop_offset_round_trip(offset in any_offset()) {
            if let Some(offset) = offset {
                prop_assert_eq!(TimeOffset::parse(&offset.to_string()).unwrap(), offset);
            }
        }

        #[test]
        fn prop_date_time_round_trip(date in any_date(), time in any_time(), offset in any_offset()) {
            let value = DateTime::new(date, time, offset);
            let parsed = DateTime::parse(&value.to_string()).unwrap();
            prop_assert_eq!(parsed, value);
            prop_assert_eq!(parsed.is_local(), offset.is_none());
        }

        #[test]
        fn prop_date_order_matches_ordinal(a in any_date(), b in any_date()) {
            prop_assert_eq!(a.cmp(&b), a.to_ordinal().cmp(&b.to_ordinal()));
        }
    }
}
