//! Variable addresses and the textual address parser.
//!
//! A [`VariableAddress`] is a resolved location inside a data block: block
//! number, byte offset, optional bit offset, declared length and declared
//! [`DataType`]. Addresses are produced from variable names by an
//! [`AddressParser`]; [`S7AddressParser`] implements the S7 notation.
//!
//! # Syntax
//!
//! ```text
//! DB<db>.<type><start>[.<bit-or-length>]
//! ```
//!
//! - Bit addresses require a bit position (0-7): `DB1.DBX10.3`
//! - Byte addresses take an optional length (default 1): `DB1.DBB20.5`
//! - String addresses require the declared character count: `DB1.STRING100.32`
//! - All other types are fixed size and reject a suffix: `DB1.DINT4`
//!
//! Keywords are case-insensitive; see [`DataType`] for the full list.
//!
//! # Example
//!
//! ```
//! use plc_dbcache::{AddressParser, DataType, S7AddressParser};
//!
//! let address = S7AddressParser.parse("DB257.DBX10.3")?;
//! assert_eq!(address.db, 257);
//! assert_eq!(address.start, 10);
//! assert_eq!(address.bit, Some(3));
//! assert_eq!(address.data_type, DataType::Bit);
//! assert_eq!(address.buffer_length(), 1);
//!
//! let text = S7AddressParser.parse("db257.s150.32")?;
//! assert_eq!(text.buffer_length(), 34);
//! # Ok::<(), plc_dbcache::PlcError>(())
//! ```

use std::str::FromStr;

use crate::datatype::DataType;
use crate::error::{PlcError, Result};

/// Size of the addressable range of a data block, in bytes.
pub const MAX_BLOCK_SIZE: usize = 65_536;

/// Maximum declared length of an S7 `String`.
pub const MAX_STRING_LENGTH: u16 = 254;

/// Maximum declared length of an S7 `WString`.
pub const MAX_WSTRING_LENGTH: u16 = 16_382;

/// A resolved variable location inside a data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableAddress {
    /// Data block number.
    pub db: u16,
    /// Byte offset of the variable inside the block.
    pub start: usize,
    /// Declared length: bytes for `Byte`, characters for strings, the fixed
    /// size otherwise.
    pub length: usize,
    /// Bit position (0-7) for `Bit` addresses.
    pub bit: Option<u8>,
    /// Declared type.
    pub data_type: DataType,
}

impl VariableAddress {
    /// Creates an address for a variable of the given type.
    ///
    /// For fixed-size types `length` is replaced by the type's size.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_dbcache::{DataType, VariableAddress};
    ///
    /// let address = VariableAddress::new(5, DataType::Int, 10, 0);
    /// assert_eq!(address.buffer_length(), 2);
    /// assert_eq!(address.offset_end(), 12);
    /// ```
    pub fn new(db: u16, data_type: DataType, start: usize, length: usize) -> Self {
        Self {
            db,
            start,
            length: data_type.fixed_size().unwrap_or(length),
            bit: None,
            data_type,
        }
    }

    /// Creates a bit address.
    ///
    /// # Errors
    ///
    /// Returns an error if `bit > 7`.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_dbcache::VariableAddress;
    ///
    /// let address = VariableAddress::bit(5, 10, 3).unwrap();
    /// assert_eq!(address.bit, Some(3));
    /// assert!(VariableAddress::bit(5, 10, 8).is_err());
    /// ```
    pub fn bit(db: u16, start: usize, bit: u8) -> Result<Self> {
        if bit > 7 {
            return Err(PlcError::malformed_address(
                format!("DB{db}.DBX{start}.{bit}"),
                format!("bit position must be 0-7, got {bit}"),
            ));
        }
        Ok(Self {
            bit: Some(bit),
            ..Self::new(db, DataType::Bit, start, 1)
        })
    }

    /// Returns the number of bytes this variable occupies in the block,
    /// including any string header.
    pub fn buffer_length(&self) -> usize {
        self.data_type.buffer_length(self.length)
    }

    /// Returns the exclusive end offset of this variable in the block.
    pub fn offset_end(&self) -> usize {
        self.start + self.buffer_length()
    }
}

impl std::fmt::Display for VariableAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keyword = self.data_type.to_string().to_ascii_uppercase();
        write!(f, "DB{}.{}{}", self.db, keyword, self.start)?;
        match (self.bit, self.data_type) {
            (Some(bit), _) => write!(f, ".{bit}"),
            (None, DataType::Byte) if self.length == 1 => Ok(()),
            (None, data_type) if data_type.takes_length() => write!(f, ".{}", self.length),
            _ => Ok(()),
        }
    }
}

impl FromStr for VariableAddress {
    type Err = PlcError;

    fn from_str(s: &str) -> Result<Self> {
        S7AddressParser.parse(s)
    }
}

/// Resolves variable names into addresses.
pub trait AddressParser: Send + Sync {
    /// Parses a variable name.
    ///
    /// # Errors
    ///
    /// Returns `PlcError::MalformedAddress` if the name cannot be resolved.
    fn parse(&self, name: &str) -> Result<VariableAddress>;
}

/// Parser for S7 style data block addresses such as `DB1.DBW4`.
#[derive(Debug, Clone, Copy, Default)]
pub struct S7AddressParser;

impl AddressParser for S7AddressParser {
    fn parse(&self, name: &str) -> Result<VariableAddress> {
        let malformed = |reason: String| PlcError::malformed_address(name, reason);

        let trimmed = name.trim();
        let rest = match trimmed.get(..2) {
            Some(prefix) if prefix.eq_ignore_ascii_case("db") => &trimmed[2..],
            _ => return Err(malformed("address must start with 'DB'".to_string())),
        };

        let (db_part, rest) = rest
            .split_once('.')
            .ok_or_else(|| malformed("missing '.' after data block number".to_string()))?;
        let db = parse_number(db_part)
            .ok_or_else(|| malformed(format!("invalid data block number '{db_part}'")))?;

        let (item, suffix) = match rest.split_once('.') {
            Some((item, suffix)) => (item, Some(suffix)),
            None => (rest, None),
        };

        let digits_at = item
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| malformed("missing start offset".to_string()))?;
        let (keyword, start_part) = item.split_at(digits_at);
        if keyword.is_empty() {
            return Err(malformed("missing type keyword".to_string()));
        }
        let data_type = DataType::from_keyword(keyword)
            .ok_or_else(|| malformed(format!("unknown type '{keyword}'")))?;
        let start = parse_number(start_part)
            .ok_or_else(|| malformed(format!("invalid start offset '{start_part}'")))?;

        let suffix = suffix
            .map(|s| parse_number(s).ok_or_else(|| malformed(format!("invalid suffix '{s}'"))))
            .transpose()?;

        let address = match data_type {
            DataType::Bit => {
                let bit = suffix.ok_or_else(|| malformed("bit address requires a bit position".to_string()))?;
                if bit > 7 {
                    return Err(malformed(format!("bit position must be 0-7, got {bit}")));
                }
                VariableAddress {
                    bit: Some(bit as u8),
                    ..VariableAddress::new(db, data_type, start as usize, 1)
                }
            }
            DataType::Byte => {
                let length = suffix.unwrap_or(1);
                if length == 0 {
                    return Err(malformed("byte length must be greater than 0".to_string()));
                }
                VariableAddress::new(db, data_type, start as usize, length as usize)
            }
            DataType::String | DataType::WString => {
                let max = if data_type == DataType::String {
                    MAX_STRING_LENGTH
                } else {
                    MAX_WSTRING_LENGTH
                };
                let length = suffix.ok_or_else(|| malformed(format!("{data_type} address requires a length")))?;
                if length == 0 || length > max {
                    return Err(malformed(format!(
                        "{data_type} length must be 1-{max}, got {length}"
                    )));
                }
                VariableAddress::new(db, data_type, start as usize, length as usize)
            }
            _ => {
                if suffix.is_some() {
                    return Err(malformed(format!("{data_type} address does not take a suffix")));
                }
                VariableAddress::new(db, data_type, start as usize, 0)
            }
        };

        if address.offset_end() > MAX_BLOCK_SIZE {
            return Err(malformed(format!(
                "address range ends at byte {}, past the {MAX_BLOCK_SIZE} byte block limit",
                address.offset_end()
            )));
        }

        Ok(address)
    }
}

/// Parses a non-empty run of ASCII digits into a `u16`.
fn parse_number(s: &str) -> Option<u16> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> Result<VariableAddress> {
        S7AddressParser.parse(name)
    }

    #[test]
    fn test_parse_bit() {
        let address = parse("DB5.DBX10.3").unwrap();
        assert_eq!(address.db, 5);
        assert_eq!(address.start, 10);
        assert_eq!(address.bit, Some(3));
        assert_eq!(address.data_type, DataType::Bit);
        assert_eq!(address.buffer_length(), 1);
    }

    #[test]
    fn test_parse_legacy_keywords() {
        assert_eq!(parse("DB0.x0.4").unwrap().bit, Some(4));
        assert_eq!(parse("DB0.D0").unwrap().data_type, DataType::Real);
        assert_eq!(parse("DB0.dul0").unwrap().buffer_length(), 8);
        assert_eq!(parse("DB257.W12").unwrap().data_type, DataType::Int);
    }

    #[test]
    fn test_parse_fixed_types() {
        let address = parse("DB7.DINT50").unwrap();
        assert_eq!(address.data_type, DataType::DInt);
        assert_eq!(address.offset_end(), 54);

        let address = parse("db6.real30").unwrap();
        assert_eq!(address.offset_end(), 34);

        let address = parse("  DB1.LREAL8  ").unwrap();
        assert_eq!(address.buffer_length(), 8);
    }

    #[test]
    fn test_parse_byte_default_and_explicit_length() {
        let single = parse("DB0.DBB0").unwrap();
        assert_eq!(single.length, 1);

        let array = parse("DB9.DBB20.5").unwrap();
        assert_eq!(array.length, 5);
        assert_eq!(array.offset_end(), 25);
    }

    #[test]
    fn test_parse_strings() {
        let string = parse("DB257.S150.32").unwrap();
        assert_eq!(string.data_type, DataType::String);
        assert_eq!(string.offset_end(), 184);

        let wstring = parse("DB9.WSTRING30.10").unwrap();
        assert_eq!(wstring.data_type, DataType::WString);
        assert_eq!(wstring.offset_end(), 54);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let cases = [
            "",
            "M0.0",
            "DB.DBX0.0",
            "DB1",
            "DB1.",
            "DB1.10",
            "DB1.DBX",
            "DB1.FOO4",
            "DB1.DBX0",
            "DB1.DBX0.8",
            "DB1.DBB0.0",
            "DB1.STRING0",
            "DB1.STRING0.255",
            "DB1.DINT0.4",
            "DB1.DBW-2",
            "DB70000.DBW0",
            "DB1.DBD65534",
        ];
        for case in cases {
            let err = parse(case).unwrap_err();
            assert!(
                matches!(err, PlcError::MalformedAddress { .. }),
                "expected malformed address for {case:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_bit_constructor() {
        let address = VariableAddress::bit(5, 10, 7).unwrap();
        assert_eq!(address.data_type, DataType::Bit);
        assert_eq!(address.length, 1);
        assert!(VariableAddress::bit(5, 10, 8).is_err());
    }

    #[test]
    fn test_display_reparses() {
        for name in ["DB5.DBX10.3", "DB1.DBB0", "DB1.DBB4.6", "DB2.DINT8", "DB3.S100.32", "DB4.WS0.5"] {
            let address = parse(name).unwrap();
            let reparsed: VariableAddress = address.to_string().parse().unwrap();
            assert_eq!(address, reparsed, "{name} displayed as {address}");
        }
    }
}
