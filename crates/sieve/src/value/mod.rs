mod float;


use crate::model::ScalarKind;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use float::Float64;

///
/// CONSTANTS
///

const F64_SAFE_I64: i64 = 1i64 << 53;
const F64_SAFE_U64: u64 = 1u64 << 53;

///
/// Value
///
/// Runtime literal carried by filter constants and supplied parameters.
/// `Eq` and `Hash` are total so constants can take part in canonical keys.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Value {
    Blob(Vec<u8>),
    Bool(bool),
    Float64(Float64),
    Int(i64),
    Null,
    Text(String),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Uint(u64),
}

impl Value {
    /// Short type label used in diagnostics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Blob(_) => "blob",
            Self::Bool(_) => "bool",
            Self::Float64(_) => "float64",
            Self::Int(_) => "int",
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Uint(_) => "uint",
        }
    }

    ///
    /// Convert this value to the declared type of a property.
    ///
    /// Rules:
    /// - identical kinds pass through
    /// - `Int` and `Uint` convert into each other when in range
    /// - integers widen to `Float64` only inside the exactly-representable range
    /// - `Null` is accepted only for nullable properties
    ///
    /// Returns `None` when no lossless conversion exists.
    ///
    #[must_use]
    pub fn coerce_to(self, kind: ScalarKind, nullable: bool) -> Option<Self> {
        match (self, kind) {
            (Self::Null, _) => nullable.then_some(Self::Null),

            (v @ Self::Blob(_), ScalarKind::Blob)
            | (v @ Self::Bool(_), ScalarKind::Bool)
            | (v @ Self::Float64(_), ScalarKind::Float64)
            | (v @ Self::Int(_), ScalarKind::Int)
            | (v @ Self::Text(_), ScalarKind::Text)
            | (v @ Self::Timestamp(_), ScalarKind::Timestamp)
            | (v @ Self::Uint(_), ScalarKind::Uint) => Some(v),

            (Self::Int(n), ScalarKind::Uint) => u64::try_from(n).ok().map(Self::Uint),
            (Self::Uint(n), ScalarKind::Int) => i64::try_from(n).ok().map(Self::Int),

            (Self::Int(n), ScalarKind::Float64) => int_to_f64(n).map(Self::Float64),
            (Self::Uint(n), ScalarKind::Float64) => uint_to_f64(n).map(Self::Float64),

            _ => None,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn int_to_f64(n: i64) -> Option<Float64> {
    if (-F64_SAFE_I64..=F64_SAFE_I64).contains(&n) {
        Float64::try_new(n as f64)
    } else {
        None
    }
}

#[allow(clippy::cast_precision_loss)]
fn uint_to_f64(n: u64) -> Option<Float64> {
    if n <= F64_SAFE_U64 {
        Float64::try_new(n as f64)
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blob(bytes) => {
                write!(f, "0x")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::Bool(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Int(v) | Self::Timestamp(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Uint(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! impl_from_for_value {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    String => Text,
    Vec<u8> => Blob,
    Float64 => Float64,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
