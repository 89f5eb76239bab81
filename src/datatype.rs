//! Declared PLC data types.
//!
//! This module defines the [`DataType`] enum, the closed set of type tags a
//! variable address can declare. Each tag knows how many bytes it occupies in
//! a data block, and which address keywords select it.
//!
//! # Data Types Overview
//!
//! | Type | Keywords | Size (bytes) |
//! |------|----------|:------------:|
//! | Bit | `bit`, `x`, `dbx` | 1 |
//! | Byte | `byte`, `b`, `dbb` | length |
//! | Int | `int`, `w`, `dbw` | 2 |
//! | UInt | `uint` | 2 |
//! | DInt | `dint`, `dbd` | 4 |
//! | UDInt | `udint` | 4 |
//! | LInt | `lint` | 8 |
//! | ULInt | `ulint`, `dul`, `dulint`, `dulong` | 8 |
//! | Real | `real`, `d` | 4 |
//! | LReal | `lreal` | 8 |
//! | String | `string`, `s` | length + 2 |
//! | WString | `wstring`, `ws` | length * 2 + 4 |
//!
//! # Example
//!
//! ```
//! use plc_dbcache::DataType;
//!
//! assert_eq!(DataType::from_keyword("DBW"), Some(DataType::Int));
//! assert_eq!(DataType::DInt.fixed_size(), Some(4));
//! assert_eq!(DataType::String.buffer_length(32), 34);
//! assert_eq!(DataType::Real.to_string(), "Real");
//! ```

/// Declared type of a PLC variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    /// Single bit inside a byte.
    Bit,
    /// One byte, or a byte array when a length is given.
    Byte,
    /// 16-bit signed integer.
    Int,
    /// 16-bit unsigned integer.
    UInt,
    /// 32-bit signed integer.
    DInt,
    /// 32-bit unsigned integer.
    UDInt,
    /// 64-bit signed integer.
    LInt,
    /// 64-bit unsigned integer.
    ULInt,
    /// 32-bit IEEE float.
    Real,
    /// 64-bit IEEE float.
    LReal,
    /// S7 string: max length byte, actual length byte, Latin-1 characters.
    String,
    /// S7 wide string: max length word, actual length word, UTF-16 characters.
    WString,
}

impl DataType {
    /// Resolves an address keyword (case-insensitive) to a data type.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let data_type = match keyword.to_ascii_lowercase().as_str() {
            "bit" | "x" | "dbx" => DataType::Bit,
            "byte" | "b" | "dbb" => DataType::Byte,
            "int" | "w" | "dbw" => DataType::Int,
            "uint" => DataType::UInt,
            "dint" | "dbd" => DataType::DInt,
            "udint" => DataType::UDInt,
            "lint" => DataType::LInt,
            "ulint" | "dul" | "dulint" | "dulong" => DataType::ULInt,
            "real" | "d" => DataType::Real,
            "lreal" => DataType::LReal,
            "string" | "s" => DataType::String,
            "wstring" | "ws" => DataType::WString,
            _ => return None,
        };
        Some(data_type)
    }

    /// Returns the size in bytes for types whose size does not depend on a
    /// declared length.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            DataType::Bit => Some(1),
            DataType::Int | DataType::UInt => Some(2),
            DataType::DInt | DataType::UDInt | DataType::Real => Some(4),
            DataType::LInt | DataType::ULInt | DataType::LReal => Some(8),
            DataType::Byte | DataType::String | DataType::WString => None,
        }
    }

    /// Returns the number of bytes a variable of this type occupies, given
    /// its declared length (bytes for `Byte`, characters for strings).
    ///
    /// The declared length is ignored for fixed-size types.
    pub fn buffer_length(self, length: usize) -> usize {
        match self {
            DataType::Byte => length,
            DataType::String => length + 2,
            DataType::WString => length * 2 + 4,
            fixed => fixed.fixed_size().unwrap_or(length),
        }
    }

    /// Returns whether the address suffix of this type is a length.
    pub fn takes_length(self) -> bool {
        matches!(self, DataType::Byte | DataType::String | DataType::WString)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataType::Bit => "Bit",
            DataType::Byte => "Byte",
            DataType::Int => "Int",
            DataType::UInt => "UInt",
            DataType::DInt => "DInt",
            DataType::UDInt => "UDInt",
            DataType::LInt => "LInt",
            DataType::ULInt => "ULInt",
            DataType::Real => "Real",
            DataType::LReal => "LReal",
            DataType::String => "String",
            DataType::WString => "WString",
        };
        f.write_str(name)
    }
}
