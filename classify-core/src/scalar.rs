//! The shape-tagged union that carries simple payloads and dictionary keys.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// A dynamically typed simple value.
///
/// This is the only place untyped values cross the core; it exists to carry
/// simple-shape payloads and dictionary keys between the walkers and the
/// format drivers. Integers are normalized to `I64` unless they exceed
/// `i64::MAX`, in which case they are carried as `U64`. `f32` values are
/// widened exactly into `F64`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// A boolean.
    Bool(bool),
    /// A single character.
    Char(char),
    /// A signed integer, covering every value of the signed widths and all
    /// unsigned values up to `i64::MAX`.
    I64(i64),
    /// An unsigned integer above `i64::MAX`.
    U64(u64),
    /// A binary floating-point number.
    F64(f64),
    /// A 96-bit decimal number.
    Decimal(Decimal),
    /// A point in time, UTC.
    DateTime(DateTime<Utc>),
    /// A string.
    Str(String),
}

impl Scalar {
    /// Normalizing constructor for unsigned values: values representable as
    /// `i64` are carried as [`Scalar::I64`].
    pub fn from_u64(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(i) => Scalar::I64(i),
            Err(_) => Scalar::U64(v),
        }
    }

    /// A short label for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Char(_) => "char",
            Scalar::I64(_) => "integer",
            Scalar::U64(_) => "unsigned integer",
            Scalar::F64(_) => "float",
            Scalar::Decimal(_) => "decimal",
            Scalar::DateTime(_) => "datetime",
            Scalar::Str(_) => "string",
        }
    }
}

/// The category a simple-shaped type falls into.
///
/// Dictionary keys are admissible only for `String`, the integer kinds and
/// `Enum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleKind {
    /// `bool`.
    Bool,
    /// `char`.
    Char,
    /// Signed integers of any width.
    SignedInt,
    /// Unsigned integers of any width.
    UnsignedInt,
    /// `f32` or `f64`.
    Float,
    /// `rust_decimal::Decimal`.
    Decimal,
    /// `chrono::DateTime<Utc>`.
    DateTime,
    /// `String`.
    String,
    /// A unit-only enum.
    Enum,
}

impl SimpleKind {
    /// Whether a dictionary may be keyed by values of this kind.
    pub fn is_dictionary_key(self) -> bool {
        matches!(
            self,
            SimpleKind::String
                | SimpleKind::SignedInt
                | SimpleKind::UnsignedInt
                | SimpleKind::Enum
        )
    }
}
