//! Typed conversion between Rust values and tree nodes.

use super::path::key_for_list_element;
use super::value::{ConfigType, Value};
use crate::cast::checked_cast;
use crate::error::{ConfigError, Result};
use crate::temporal::{Date, DateTime, Time};

/// Types that can be read from a tree node.
///
/// A read succeeds if the node holds exactly this type. Narrower integer
/// types are range-checked, and floating point reads also accept integers
/// that convert without loss. Reading an `f32` from a floating point node is
/// range-checked only and rounds to the nearest `f32`.
pub trait FromValue: Sized {
    /// Human-readable name used in type errors.
    const TYPE_NAME: &'static str;

    fn from_value(value: &Value, fqn: &str) -> Result<Self>;
}

/// Types that can be stored in a tree node.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

fn mismatch(value: &Value, fqn: &str, expected: &str) -> ConfigError {
    ConfigError::type_mismatch(format!(
        "'{fqn}' holds a {}, which cannot be read as {expected}",
        value.config_type()
    ))
}

// Integer reads accept integer nodes only; a floating point node is a type
// mismatch even when its value happens to be integral.
macro_rules! integer_from_value {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl FromValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_value(value: &Value, fqn: &str) -> Result<Self> {
                    match value {
                        Value::Integer(i) => checked_cast::<$ty, i64>(*i).map_err(|e| {
                            ConfigError::cast(format!("cannot read '{fqn}' as {}", $name), e)
                        }),
                        other => Err(mismatch(other, fqn, $name)),
                    }
                }
            }
        )+
    };
}

integer_from_value!(
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
);

// f64 -> f32 rounds like `as`; only overflow is an error.
macro_rules! float_from_value {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl FromValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_value(value: &Value, fqn: &str) -> Result<Self> {
                    let converted = match value {
                        Value::Integer(i) => checked_cast::<$ty, i64>(*i),
                        Value::FloatingPoint(f) => checked_cast::<$ty, f64>(*f),
                        other => return Err(mismatch(other, fqn, $name)),
                    };
                    converted.map_err(|e| ConfigError::cast(format!("cannot read '{fqn}' as {}", $name), e))
                }
            }
        )+
    };
}

float_from_value!(f32 => "f32", f64 => "f64");

macro_rules! exact_from_value {
    ($($ty:ty => $variant:ident, $name:literal);+ $(;)?) => {
        $(
            impl FromValue for $ty {
                const TYPE_NAME: &'static str = $name;

                fn from_value(value: &Value, fqn: &str) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v.clone()),
                        other => Err(mismatch(other, fqn, $name)),
                    }
                }
            }
        )+
    };
}

exact_from_value!(
    bool => Boolean, "boolean";
    String => String, "string";
    Date => Date, "date";
    Time => Time, "time";
    DateTime => DateTime, "date_time";
);

/// Every element must be readable as `T`; the first failure decides the error.
impl<T: FromValue> FromValue for Vec<T> {
    const TYPE_NAME: &'static str = "list";

    fn from_value(value: &Value, fqn: &str) -> Result<Self> {
        let items = match value {
            Value::List(items) => items,
            other => return Err(mismatch(other, fqn, Self::TYPE_NAME)),
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                T::from_value(item, &key_for_list_element(fqn, index)).map_err(|e| match e {
                    ConfigError::Type { message, cast } => ConfigError::Type {
                        message: format!("list '{fqn}' is not a list of {}: {message}", T::TYPE_NAME),
                        cast,
                    },
                    other => other,
                })
            })
            .collect()
    }
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_value(value: &Value, _fqn: &str) -> Result<Self> {
        Ok(value.clone())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

macro_rules! lossless_integer_into_value {
    ($($ty:ty),+) => {
        $(
            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::Integer(i64::from(self))
                }
            }
        )+
    };
}

lossless_integer_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::FloatingPoint(f64::from(self))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::FloatingPoint(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_string())
    }
}

impl IntoValue for Date {
    fn into_value(self) -> Value {
        Value::Date(self)
    }
}

impl IntoValue for Time {
    fn into_value(self) -> Value {
        Value::Time(self)
    }
}

impl IntoValue for DateTime {
    fn into_value(self) -> Value {
        Value::DateTime(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

/// Replaces `slot` by `value`, converting numbers to the slot's existing type.
///
/// Any other change of type is refused.
pub(crate) fn assign(slot: &mut Value, value: Value, fqn: &str) -> Result<()> {
    let existing = slot.config_type();
    let incoming = value.config_type();
    let converted = match (existing, value) {
        (ConfigType::Integer, Value::FloatingPoint(f)) => checked_cast::<i64, f64>(f)
            .map(Value::Integer)
            .map_err(|e| ConfigError::cast(format!("cannot store {f} as integer at '{fqn}'"), e))?,
        (ConfigType::FloatingPoint, Value::Integer(i)) => checked_cast::<f64, i64>(i)
            .map(Value::FloatingPoint)
            .map_err(|e| {
                ConfigError::cast(format!("cannot store {i} as floating point at '{fqn}'"), e)
            })?,
        (existing, value) if existing == incoming => value,
        (existing, _) => {
            return Err(ConfigError::type_mismatch(format!(
                "cannot replace the {existing} at '{fqn}' by a {incoming}"
            )))
        }
    };
    *slot = converted;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::CastErrorKind;
    use crate::error::ErrorKind;

    #[test]
    fn test_f32_reads_round_but_check_range() {
        assert_eq!(f32::from_value(&Value::FloatingPoint(0.1), "x").unwrap(), 0.1f32);
        assert!(f32::from_value(&Value::FloatingPoint(f64::NAN), "x").unwrap().is_nan());
        let err = f32::from_value(&Value::FloatingPoint(1e300), "x").unwrap_err();
        assert_eq!(err.cast_error().unwrap().kind, CastErrorKind::Overflow);
        assert!(f32::from_value(&Value::Integer(16_777_217), "x").is_err());
    }

    #[test]
    fn test_numeric_reads_are_checked() {
        let value = Value::Integer(2_147_483_648);
        assert_eq!(i64::from_value(&value, "x").unwrap(), 2_147_483_648);
        let err = i32::from_value(&value, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.cast_error().unwrap().kind, CastErrorKind::Overflow);

        assert_eq!(f64::from_value(&Value::Integer(3), "x").unwrap(), 3.0);
        assert!(f64::from_value(&Value::Integer((1 << 53) + 1), "x").is_err());
        assert_eq!(f32::from_value(&Value::FloatingPoint(0.5), "x").unwrap(), 0.5);
        let err = i32::from_value(&Value::FloatingPoint(3.0), "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(err.cast_error().is_none());
        assert!(u8::from_value(&Value::Integer(-1), "x").is_err());
    }

    #[test]
    fn test_exact_reads_do_not_coerce() {
        assert!(bool::from_value(&Value::Integer(1), "x").is_err());
        assert!(String::from_value(&Value::Integer(1), "x").is_err());
        assert!(i64::from_value(&Value::Boolean(true), "x").is_err());
        assert!(i64::from_value(&Value::String("1".into()), "x").is_err());
    }

    #[test]
    fn test_list_reads_require_homogeneity() {
        let mixed = vec![1.into_value(), 2.into_value(), "x".into_value()].into_value();
        let err = Vec::<i32>::from_value(&mixed, "l").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert!(err.to_string().contains("l[2]"));

        let numbers = Value::List(vec![Value::Integer(1), Value::FloatingPoint(2.0)]);
        assert_eq!(Vec::<f64>::from_value(&numbers, "l").unwrap(), vec![1.0, 2.0]);
        let err = Vec::<i64>::from_value(&numbers, "l").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);

        let nested = Value::List(vec![vec![1, 2].into_value(), vec![3].into_value()]);
        assert_eq!(
            Vec::<Vec<i32>>::from_value(&nested, "m").unwrap(),
            vec![vec![1, 2], vec![3]]
        );
    }

    #[test]
    fn test_assign_converts_numbers_losslessly() {
        let mut slot = Value::FloatingPoint(0.5);
        assign(&mut slot, Value::Integer(4), "x").unwrap();
        assert_eq!(slot, Value::FloatingPoint(4.0));

        let mut slot = Value::Integer(1);
        assign(&mut slot, Value::FloatingPoint(8.0), "x").unwrap();
        assert_eq!(slot, Value::Integer(8));
        assert!(assign(&mut slot, Value::FloatingPoint(8.5), "x").is_err());

        let err = assign(&mut slot, Value::String("s".into()), "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(slot, Value::Integer(8));
    }
}
