//! Decoded PLC values.
//!
//! [`PlcValue`] is the tagged result of decoding a variable's bytes; there is
//! one variant per decoded shape. Typed reads go through [`FromPlcValue`],
//! which extracts a Rust value from a `PlcValue` and allows lossless integer
//! widening.
//!
//! # Example
//!
//! ```
//! use plc_dbcache::{FromPlcValue, PlcValue};
//!
//! let value = PlcValue::Int(-3532);
//! assert_eq!(i16::from_plc_value(value.clone())?, -3532);
//! assert_eq!(i32::from_plc_value(value.clone())?, -3532);
//! assert!(u16::from_plc_value(value).is_err());
//! # Ok::<(), plc_dbcache::PlcError>(())
//! ```

use crate::error::{PlcError, Result};

/// A value decoded from a data block.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlcValue {
    /// Single bit.
    Bool(bool),
    /// Single byte.
    Byte(u8),
    /// Byte array.
    Bytes(Vec<u8>),
    /// 16-bit signed integer (`INT`).
    Int(i16),
    /// 16-bit unsigned integer (`UINT`).
    UInt(u16),
    /// 32-bit signed integer (`DINT`).
    DInt(i32),
    /// 32-bit unsigned integer (`UDINT`).
    UDInt(u32),
    /// 64-bit signed integer (`LINT`).
    LInt(i64),
    /// 64-bit unsigned integer (`ULINT`).
    ULInt(u64),
    /// 32-bit float (`REAL`).
    Real(f32),
    /// 64-bit float (`LREAL`).
    LReal(f64),
    /// Text decoded from a `STRING` or `WSTRING`.
    String(String),
}

impl PlcValue {
    /// Returns the name of this value's variant.
    pub fn kind(&self) -> &'static str {
        match self {
            PlcValue::Bool(_) => "Bool",
            PlcValue::Byte(_) => "Byte",
            PlcValue::Bytes(_) => "Bytes",
            PlcValue::Int(_) => "Int",
            PlcValue::UInt(_) => "UInt",
            PlcValue::DInt(_) => "DInt",
            PlcValue::UDInt(_) => "UDInt",
            PlcValue::LInt(_) => "LInt",
            PlcValue::ULInt(_) => "ULInt",
            PlcValue::Real(_) => "Real",
            PlcValue::LReal(_) => "LReal",
            PlcValue::String(_) => "String",
        }
    }

    /// Returns the value as a signed 128-bit integer if it is an integer
    /// variant. Every integer variant fits without loss.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            PlcValue::Byte(v) => Some(v.into()),
            PlcValue::Int(v) => Some(v.into()),
            PlcValue::UInt(v) => Some(v.into()),
            PlcValue::DInt(v) => Some(v.into()),
            PlcValue::UDInt(v) => Some(v.into()),
            PlcValue::LInt(v) => Some(v.into()),
            PlcValue::ULInt(v) => Some(v.into()),
            _ => None,
        }
    }

    fn unsupported(&self, to: &str) -> PlcError {
        PlcError::unsupported_conversion(self.kind(), to)
    }
}

impl std::fmt::Display for PlcValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlcValue::Bool(v) => write!(f, "{v}"),
            PlcValue::Byte(v) => write!(f, "0x{v:02X}"),
            PlcValue::Bytes(v) => write!(f, "{}", crate::utils::format_bytes(v)),
            PlcValue::Int(v) => write!(f, "{v}"),
            PlcValue::UInt(v) => write!(f, "{v}"),
            PlcValue::DInt(v) => write!(f, "{v}"),
            PlcValue::UDInt(v) => write!(f, "{v}"),
            PlcValue::LInt(v) => write!(f, "{v}"),
            PlcValue::ULInt(v) => write!(f, "{v}"),
            PlcValue::Real(v) => write!(f, "{v}"),
            PlcValue::LReal(v) => write!(f, "{v}"),
            PlcValue::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// Extraction of a typed Rust value from a [`PlcValue`].
pub trait FromPlcValue: Sized {
    /// Converts the decoded value into `Self`.
    ///
    /// # Errors
    ///
    /// Returns `PlcError::UnsupportedConversion` if the value's variant cannot
    /// be represented as `Self` without loss.
    fn from_plc_value(value: PlcValue) -> Result<Self>;
}

impl FromPlcValue for PlcValue {
    fn from_plc_value(value: PlcValue) -> Result<Self> {
        Ok(value)
    }
}

impl FromPlcValue for bool {
    fn from_plc_value(value: PlcValue) -> Result<Self> {
        match value {
            PlcValue::Bool(v) => Ok(v),
            other => Err(other.unsupported("bool")),
        }
    }
}

/// Integer targets accept any integer variant of a narrower or equal type
/// whose value range is contained in the target's.
macro_rules! impl_from_plc_value_int {
    ($ty:ty, [$($variant:ident),+]) => {
        impl FromPlcValue for $ty {
            fn from_plc_value(value: PlcValue) -> Result<Self> {
                match value {
                    $(PlcValue::$variant(v) => Ok(<$ty>::from(v)),)+
                    other => Err(other.unsupported(stringify!($ty))),
                }
            }
        }
    };
}

impl_from_plc_value_int!(u8, [Byte]);
impl_from_plc_value_int!(i16, [Int, Byte]);
impl_from_plc_value_int!(u16, [UInt, Byte]);
impl_from_plc_value_int!(i32, [DInt, Int, UInt, Byte]);
impl_from_plc_value_int!(u32, [UDInt, UInt, Byte]);
impl_from_plc_value_int!(i64, [LInt, DInt, UDInt, Int, UInt, Byte]);
impl_from_plc_value_int!(u64, [ULInt, UDInt, UInt, Byte]);

impl FromPlcValue for f32 {
    fn from_plc_value(value: PlcValue) -> Result<Self> {
        match value {
            PlcValue::Real(v) => Ok(v),
            other => Err(other.unsupported("f32")),
        }
    }
}

impl FromPlcValue for f64 {
    fn from_plc_value(value: PlcValue) -> Result<Self> {
        match value {
            PlcValue::LReal(v) => Ok(v),
            PlcValue::Real(v) => Ok(v.into()),
            other => Err(other.unsupported("f64")),
        }
    }
}

impl FromPlcValue for String {
    fn from_plc_value(value: PlcValue) -> Result<Self> {
        match value {
            PlcValue::String(v) => Ok(v),
            // Byte arrays are read as Latin-1 text.
            PlcValue::Bytes(v) => Ok(v.iter().map(|&b| char::from(b)).collect()),
            PlcValue::Byte(b) => Ok(char::from(b).to_string()),
            other => Err(other.unsupported("String")),
        }
    }
}

impl FromPlcValue for Vec<u8> {
    fn from_plc_value(value: PlcValue) -> Result<Self> {
        match value {
            PlcValue::Bytes(v) => Ok(v),
            PlcValue::Byte(b) => Ok(vec![b]),
            other => Err(other.unsupported("Vec<u8>")),
        }
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for PlcValue {
                fn from(value: $ty) -> Self {
                    PlcValue::$variant(value)
                }
            }
        )+
    };
}

impl_from_primitive!(
    bool => Bool,
    u8 => Byte,
    Vec<u8> => Bytes,
    i16 => Int,
    u16 => UInt,
    i32 => DInt,
    u32 => UDInt,
    i64 => LInt,
    u64 => ULInt,
    f32 => Real,
    f64 => LReal,
    String => String,
);

impl From<&str> for PlcValue {
    fn from(value: &str) -> Self {
        PlcValue::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_extraction() {
        assert!(bool::from_plc_value(PlcValue::Bool(true)).unwrap());
        assert_eq!(u8::from_plc_value(PlcValue::Byte(0x12)).unwrap(), 0x12);
        assert_eq!(i16::from_plc_value(PlcValue::Int(4660)).unwrap(), 4660);
        assert_eq!(u64::from_plc_value(PlcValue::ULInt(u64::MAX)).unwrap(), u64::MAX);
        assert_eq!(f32::from_plc_value(PlcValue::Real(0.25)).unwrap(), 0.25);
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(i32::from_plc_value(PlcValue::Int(-3532)).unwrap(), -3532);
        assert_eq!(i64::from_plc_value(PlcValue::UDInt(u32::MAX)).unwrap(), u32::MAX as i64);
        assert_eq!(u32::from_plc_value(PlcValue::Byte(7)).unwrap(), 7);
        assert_eq!(f64::from_plc_value(PlcValue::Real(0.5)).unwrap(), 0.5);
    }

    #[test]
    fn test_lossy_conversions_rejected() {
        assert!(u16::from_plc_value(PlcValue::Int(-1)).is_err());
        assert!(i16::from_plc_value(PlcValue::DInt(1)).is_err());
        assert!(u64::from_plc_value(PlcValue::LInt(1)).is_err());
        assert!(f32::from_plc_value(PlcValue::LReal(0.25)).is_err());
        assert!(f32::from_plc_value(PlcValue::Bool(true)).is_err());
        assert!(bool::from_plc_value(PlcValue::Byte(1)).is_err());
    }

    #[test]
    fn test_unsupported_conversion_message() {
        let err = f32::from_plc_value(PlcValue::Bool(true)).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported conversion from Bool to f32");
    }

    #[test]
    fn test_bytes_as_string() {
        let value = PlcValue::Bytes(b"ABCD".to_vec());
        assert_eq!(String::from_plc_value(value).unwrap(), "ABCD");
    }

    #[test]
    fn test_as_integer() {
        assert_eq!(PlcValue::ULInt(u64::MAX).as_integer(), Some(u64::MAX as i128));
        assert_eq!(PlcValue::Int(-5).as_integer(), Some(-5));
        assert_eq!(PlcValue::Real(1.0).as_integer(), None);
    }

    #[test]
    fn test_from_primitives() {
        assert_eq!(PlcValue::from(true), PlcValue::Bool(true));
        assert_eq!(PlcValue::from(-2i16), PlcValue::Int(-2));
        assert_eq!(PlcValue::from("ABCD"), PlcValue::String("ABCD".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(PlcValue::Byte(0x0A).to_string(), "0x0A");
        assert_eq!(PlcValue::String("hi".into()).to_string(), "\"hi\"");
        assert_eq!(PlcValue::Bytes(vec![0x12, 0x34]).to_string(), "12 34");
    }
}
