//! Checked numeric and string conversions.
//!
//! [`checked_cast`] is the single entry point for every conversion the value
//! tree performs between its canonical storage types (`i64`, `f64`, `bool`)
//! and the narrower or wider types callers ask for. A conversion either
//! succeeds without losing information or fails with a [`CastError`] that
//! names the offending value and both types.

use std::any::type_name;
use std::fmt;

use thiserror::Error;

/// Why a checked conversion was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastErrorKind {
    /// The value is above the target type's maximum.
    Overflow,
    /// The value is below the target type's minimum.
    Underflow,
    /// NaN or infinity cannot become an integer.
    NotFinite,
    /// The target type cannot represent the value exactly.
    PrecisionLoss,
}

impl fmt::Display for CastErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Overflow => "overflow",
            Self::Underflow => "underflow",
            Self::NotFinite => "non-finite value",
            Self::PrecisionLoss => "loss of precision",
        };
        f.write_str(text)
    }
}

/// A refused conversion, carrying the source value and both type names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} when casting {value} from {source_type} to {target_type}")]
pub struct CastError {
    pub kind: CastErrorKind,
    pub value: String,
    pub source_type: &'static str,
    pub target_type: &'static str,
}

impl CastError {
    fn new<S: fmt::Display, T>(kind: CastErrorKind, value: S) -> Self {
        Self {
            kind,
            value: value.to_string(),
            source_type: type_name::<S>(),
            target_type: type_name::<T>(),
        }
    }
}

/// Conversion from `S` into `Self` that never silently wraps, truncates or rounds.
pub trait CheckedCast<S>: Sized {
    fn checked_cast(source: S) -> Result<Self, CastError>;
}

/// Converts `source` into `T`, failing instead of losing information.
///
/// ```
/// use dragon_cfg::cast::{checked_cast, CastErrorKind};
///
/// assert_eq!(checked_cast::<i32, i64>(42).unwrap(), 42);
/// let err = checked_cast::<i32, i64>(2_147_483_648).unwrap_err();
/// assert_eq!(err.kind, CastErrorKind::Overflow);
/// assert!(checked_cast::<i64, f64>(1.5).is_err());
/// ```
pub fn checked_cast<T, S>(source: S) -> Result<T, CastError>
where
    T: CheckedCast<S>,
{
    T::checked_cast(source)
}

// Every integer type fits into i128, so the range comparison itself cannot overflow.
macro_rules! int_to_int {
    ($src:ty => $($dst:ty),+) => {
        $(
            impl CheckedCast<$src> for $dst {
                #[allow(clippy::unnecessary_cast, unused_comparisons)]
                fn checked_cast(source: $src) -> Result<Self, CastError> {
                    let wide = source as i128;
                    if wide < <$dst>::MIN as i128 {
                        return Err(CastError::new::<$src, $dst>(CastErrorKind::Underflow, source));
                    }
                    if wide > <$dst>::MAX as i128 {
                        return Err(CastError::new::<$src, $dst>(CastErrorKind::Overflow, source));
                    }
                    Ok(source as $dst)
                }
            }
        )+
    };
}

int_to_int!(i8 => i8, i16, i32, i64, u8, u16, u32, u64);
int_to_int!(i16 => i8, i16, i32, i64, u8, u16, u32, u64);
int_to_int!(i32 => i8, i16, i32, i64, u8, u16, u32, u64);
int_to_int!(i64 => i8, i16, i32, i64, u8, u16, u32, u64);
int_to_int!(u8 => i8, i16, i32, i64, u8, u16, u32, u64);
int_to_int!(u16 => i8, i16, i32, i64, u8, u16, u32, u64);
int_to_int!(u32 => i8, i16, i32, i64, u8, u16, u32, u64);
int_to_int!(u64 => i8, i16, i32, i64, u8, u16, u32, u64);

// Exactness is verified by converting back; the round trip goes through i128
// because a saturating float-to-int cast would hide the rounding at the edges.
macro_rules! int_to_float {
    ($src:ty => $($dst:ty),+) => {
        $(
            impl CheckedCast<$src> for $dst {
                fn checked_cast(source: $src) -> Result<Self, CastError> {
                    let converted = source as $dst;
                    if converted as i128 != source as i128 {
                        return Err(CastError::new::<$src, $dst>(CastErrorKind::PrecisionLoss, source));
                    }
                    Ok(converted)
                }
            }
        )+
    };
}

int_to_float!(i8 => f32, f64);
int_to_float!(i16 => f32, f64);
int_to_float!(i32 => f32, f64);
int_to_float!(i64 => f32, f64);
int_to_float!(u8 => f32, f64);
int_to_float!(u16 => f32, f64);
int_to_float!(u32 => f32, f64);
int_to_float!(u64 => f32, f64);

// Valid inputs lie in [min, max) where both bounds are powers of two and
// therefore exact in either float type.
macro_rules! float_to_int {
    ($src:ty => $($dst:ty),+) => {
        $(
            impl CheckedCast<$src> for $dst {
                fn checked_cast(source: $src) -> Result<Self, CastError> {
                    if !source.is_finite() {
                        return Err(CastError::new::<$src, $dst>(CastErrorKind::NotFinite, source));
                    }
                    let bits = <$dst>::BITS as i32;
                    let (min, max) = if <$dst>::MIN == 0 {
                        (0.0, <$src>::powi(2.0, bits))
                    } else {
                        (-(<$src>::powi(2.0, bits - 1)), <$src>::powi(2.0, bits - 1))
                    };
                    if source < min {
                        return Err(CastError::new::<$src, $dst>(CastErrorKind::Underflow, source));
                    }
                    if source >= max {
                        return Err(CastError::new::<$src, $dst>(CastErrorKind::Overflow, source));
                    }
                    let converted = source as $dst;
                    if converted as $src != source {
                        return Err(CastError::new::<$src, $dst>(CastErrorKind::PrecisionLoss, source));
                    }
                    Ok(converted)
                }
            }
        )+
    };
}

float_to_int!(f32 => i8, i16, i32, i64, u8, u16, u32, u64);
float_to_int!(f64 => i8, i16, i32, i64, u8, u16, u32, u64);

impl CheckedCast<f32> for f32 {
    fn checked_cast(source: f32) -> Result<Self, CastError> {
        Ok(source)
    }
}

impl CheckedCast<f64> for f64 {
    fn checked_cast(source: f64) -> Result<Self, CastError> {
        Ok(source)
    }
}

impl CheckedCast<f32> for f64 {
    fn checked_cast(source: f32) -> Result<Self, CastError> {
        Ok(f64::from(source))
    }
}

impl CheckedCast<f64> for f32 {
    fn checked_cast(source: f64) -> Result<Self, CastError> {
        if source.is_nan() {
            return Ok(f32::NAN);
        }
        if source.is_infinite() {
            return Ok(if source > 0.0 {
                f32::INFINITY
            } else {
                f32::NEG_INFINITY
            });
        }
        if source > f64::from(f32::MAX) {
            return Err(CastError::new::<f64, f32>(CastErrorKind::Overflow, source));
        }
        if source < f64::from(f32::MIN) {
            return Err(CastError::new::<f64, f32>(CastErrorKind::Underflow, source));
        }
        Ok(source as f32)
    }
}

macro_rules! bool_numeric {
    ($($int:ty),+ ; $($float:ty),+) => {
        $(
            impl CheckedCast<bool> for $int {
                fn checked_cast(source: bool) -> Result<Self, CastError> {
                    Ok(<$int>::from(source))
                }
            }

            impl CheckedCast<$int> for bool {
                fn checked_cast(source: $int) -> Result<Self, CastError> {
                    Ok(source != 0)
                }
            }
        )+
        $(
            impl CheckedCast<bool> for $float {
                fn checked_cast(source: bool) -> Result<Self, CastError> {
                    Ok(if source { 1.0 } else { 0.0 })
                }
            }

            impl CheckedCast<$float> for bool {
                fn checked_cast(source: $float) -> Result<Self, CastError> {
                    Ok(source != 0.0)
                }
            }
        )+
    };
}

bool_numeric!(i8, i16, i32, i64, u8, u16, u32, u64; f32, f64);

impl CheckedCast<bool> for bool {
    fn checked_cast(source: bool) -> Result<Self, CastError> {
        Ok(source)
    }
}

macro_rules! to_string {
    ($($src:ty),+) => {
        $(
            impl CheckedCast<$src> for String {
                fn checked_cast(source: $src) -> Result<Self, CastError> {
                    Ok(source.to_string())
                }
            }
        )+
    };
}

to_string!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl CheckedCast<String> for String {
    fn checked_cast(source: String) -> Result<Self, CastError> {
        Ok(source)
    }
}
