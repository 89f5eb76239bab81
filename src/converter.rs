//! Conversion between raw block bytes and [`PlcValue`]s.
//!
//! The [`ValueConverter`] trait is the seam between the read path and the
//! byte encoding of the device. [`S7ValueConverter`] implements the S7
//! layout: all numbers are big-endian, strings carry a length header.
//!
//! Dispatch is driven by the address's declared [`DataType`]:
//!
//! | Type | Layout | Decoded as |
//! |------|--------|------------|
//! | Bit | 1 byte, bit `n` | `Bool` |
//! | Byte | `length` bytes | `Byte` (length 1) or `Bytes` |
//! | Int / UInt | 2 bytes | `Int` / `UInt` |
//! | DInt / UDInt | 4 bytes | `DInt` / `UDInt` |
//! | LInt / ULInt | 8 bytes | `LInt` / `ULInt` |
//! | Real / LReal | 4 / 8 bytes IEEE 754 | `Real` / `LReal` |
//! | String | max (1), actual (1), Latin-1 chars | `String` |
//! | WString | max (2), actual (2), UTF-16 units | `String` |
//!
//! # Example
//!
//! ```
//! use plc_dbcache::{PlcValue, S7ValueConverter, ValueConverter, VariableAddress};
//!
//! let converter = S7ValueConverter;
//! let address: VariableAddress = "DB0.INT0".parse()?;
//!
//! let value = converter.decode(&[0xF2, 0x34], &address)?;
//! assert_eq!(value, PlcValue::Int(-3532));
//!
//! let bytes = converter.encode(&PlcValue::DInt(-3532), &address)?;
//! assert_eq!(bytes, vec![0xF2, 0x34]);
//! # Ok::<(), plc_dbcache::PlcError>(())
//! ```

use crate::address::VariableAddress;
use crate::datatype::DataType;
use crate::error::{PlcError, Result};
use crate::utils::{get_bit, set_bit};
use crate::value::PlcValue;

/// Encodes and decodes variable values for a device's byte layout.
pub trait ValueConverter: Send + Sync {
    /// Decodes the bytes of one variable.
    ///
    /// `bytes` starts at the variable's first byte and must hold at least
    /// [`VariableAddress::buffer_length`] bytes.
    ///
    /// # Errors
    ///
    /// Returns `PlcError::BufferSize` if `bytes` is too short.
    fn decode(&self, bytes: &[u8], address: &VariableAddress) -> Result<PlcValue>;

    /// Encodes a value into exactly [`VariableAddress::buffer_length`] bytes.
    ///
    /// # Errors
    ///
    /// Returns `PlcError::UnsupportedConversion` if the value does not fit
    /// the declared type.
    fn encode(&self, value: &PlcValue, address: &VariableAddress) -> Result<Vec<u8>>;
}

/// Big-endian S7 value layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct S7ValueConverter;

impl ValueConverter for S7ValueConverter {
    fn decode(&self, bytes: &[u8], address: &VariableAddress) -> Result<PlcValue> {
        let length = address.buffer_length();
        if bytes.len() < length {
            return Err(PlcError::buffer_size(length, bytes.len()));
        }
        let bytes = &bytes[..length];

        let value = match address.data_type {
            DataType::Bit => PlcValue::Bool(get_bit(bytes[0], address.bit.unwrap_or(0))),
            DataType::Byte if length == 1 => PlcValue::Byte(bytes[0]),
            DataType::Byte => PlcValue::Bytes(bytes.to_vec()),
            DataType::Int => PlcValue::Int(i16::from_be_bytes(be(bytes))),
            DataType::UInt => PlcValue::UInt(u16::from_be_bytes(be(bytes))),
            DataType::DInt => PlcValue::DInt(i32::from_be_bytes(be(bytes))),
            DataType::UDInt => PlcValue::UDInt(u32::from_be_bytes(be(bytes))),
            DataType::LInt => PlcValue::LInt(i64::from_be_bytes(be(bytes))),
            DataType::ULInt => PlcValue::ULInt(u64::from_be_bytes(be(bytes))),
            DataType::Real => PlcValue::Real(f32::from_be_bytes(be(bytes))),
            DataType::LReal => PlcValue::LReal(f64::from_be_bytes(be(bytes))),
            DataType::String => {
                let max = bytes[0] as usize;
                let actual = (bytes[1] as usize).min(max).min(length - 2);
                PlcValue::String(bytes[2..2 + actual].iter().map(|&b| char::from(b)).collect())
            }
            DataType::WString => {
                let max = u16::from_be_bytes([bytes[0], bytes[1]]) as usize;
                let actual = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
                let actual = actual.min(max).min((length - 4) / 2);
                let units: Vec<u16> = bytes[4..4 + actual * 2]
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                PlcValue::String(String::from_utf16_lossy(&units))
            }
        };

        Ok(value)
    }

    fn encode(&self, value: &PlcValue, address: &VariableAddress) -> Result<Vec<u8>> {
        let unsupported = || PlcError::unsupported_conversion(value.kind(), address.data_type.to_string());
        let length = address.buffer_length();

        let bytes = match (address.data_type, value) {
            (DataType::Bit, PlcValue::Bool(state)) => {
                vec![set_bit(0, address.bit.unwrap_or(0), *state)]
            }
            (DataType::Byte, PlcValue::Byte(b)) => padded(vec![*b], length).ok_or_else(unsupported)?,
            (DataType::Byte, PlcValue::Bytes(bytes)) => padded(bytes.clone(), length).ok_or_else(unsupported)?,
            (DataType::Byte, PlcValue::String(text)) => {
                let bytes = latin1(text).ok_or_else(unsupported)?;
                padded(bytes, length).ok_or_else(unsupported)?
            }
            (DataType::Int, _) => integer::<i16>(value).ok_or_else(unsupported)?.to_be_bytes().to_vec(),
            (DataType::UInt, _) => integer::<u16>(value).ok_or_else(unsupported)?.to_be_bytes().to_vec(),
            (DataType::DInt, _) => integer::<i32>(value).ok_or_else(unsupported)?.to_be_bytes().to_vec(),
            (DataType::UDInt, _) => integer::<u32>(value).ok_or_else(unsupported)?.to_be_bytes().to_vec(),
            (DataType::LInt, _) => integer::<i64>(value).ok_or_else(unsupported)?.to_be_bytes().to_vec(),
            (DataType::ULInt, _) => integer::<u64>(value).ok_or_else(unsupported)?.to_be_bytes().to_vec(),
            (DataType::Real, PlcValue::Real(v)) => v.to_be_bytes().to_vec(),
            (DataType::LReal, PlcValue::LReal(v)) => v.to_be_bytes().to_vec(),
            (DataType::LReal, PlcValue::Real(v)) => f64::from(*v).to_be_bytes().to_vec(),
            (DataType::String, PlcValue::String(text)) => {
                let mut chars = latin1(text).ok_or_else(unsupported)?;
                chars.truncate(address.length);
                let mut bytes = Vec::with_capacity(length);
                bytes.push(address.length as u8);
                bytes.push(chars.len() as u8);
                bytes.extend_from_slice(&chars);
                bytes.resize(length, 0);
                bytes
            }
            (DataType::WString, PlcValue::String(text)) => {
                let units: Vec<u16> = text.encode_utf16().take(address.length).collect();
                let mut bytes = Vec::with_capacity(length);
                bytes.extend_from_slice(&(address.length as u16).to_be_bytes());
                bytes.extend_from_slice(&(units.len() as u16).to_be_bytes());
                for unit in units {
                    bytes.extend_from_slice(&unit.to_be_bytes());
                }
                bytes.resize(length, 0);
                bytes
            }
            _ => return Err(unsupported()),
        };

        Ok(bytes)
    }
}

/// Copies the first `N` bytes into an array. Callers check the length.
fn be<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Narrows an integer value to `T`, failing if it is not an integer or is
/// out of range.
fn integer<T: TryFrom<i128>>(value: &PlcValue) -> Option<T> {
    value.as_integer().and_then(|v| T::try_from(v).ok())
}

/// Encodes text as Latin-1, failing on characters above U+00FF.
fn latin1(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(c).ok()).collect()
}

/// Zero-pads `bytes` to `length`; `None` if it is already longer.
fn padded(mut bytes: Vec<u8>, length: usize) -> Option<Vec<u8>> {
    if bytes.len() > length {
        return None;
    }
    bytes.resize(length, 0);
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(name: &str) -> VariableAddress {
        name.parse().unwrap()
    }

    fn encode(value: impl Into<PlcValue>, name: &str) -> Result<Vec<u8>> {
        S7ValueConverter.encode(&value.into(), &address(name))
    }

    fn decode(bytes: &[u8], name: &str) -> Result<PlcValue> {
        S7ValueConverter.decode(bytes, &address(name))
    }

    #[test]
    fn test_encode_bits() {
        assert_eq!(encode(true, "DB0.DBx0.0").unwrap(), hex::decode("01").unwrap());
        assert_eq!(encode(false, "DB0.DBx0.0").unwrap(), hex::decode("00").unwrap());
        assert_eq!(encode(true, "DB0.DBx0.4").unwrap(), hex::decode("10").unwrap());
        assert_eq!(encode(false, "DB0.DBx0.4").unwrap(), hex::decode("00").unwrap());
    }

    #[test]
    fn test_encode_integers() {
        assert_eq!(encode(18u8, "DB0.DBB0").unwrap(), hex::decode("12").unwrap());
        assert_eq!(encode(4660i16, "DB0.INT0").unwrap(), hex::decode("1234").unwrap());
        assert_eq!(encode(-3532i16, "DB0.INT0").unwrap(), hex::decode("f234").unwrap());
        assert_eq!(encode(-3532i32, "DB0.INT0").unwrap(), hex::decode("f234").unwrap());
        assert_eq!(encode(305419879i32, "DB0.DINT0").unwrap(), hex::decode("12345667").unwrap());
        assert_eq!(encode(-231451033i32, "DB0.DINT0").unwrap(), hex::decode("f2345667").unwrap());
        assert_eq!(
            encode(1311768394163015151i64, "DB0.dul0").unwrap(),
            hex::decode("1234566789abcdef").unwrap()
        );
        assert_eq!(
            encode(17452669458658872815u64, "DB0.dul0").unwrap(),
            hex::decode("f234566789abcdef").unwrap()
        );
    }

    #[test]
    fn test_encode_out_of_range_integer() {
        assert!(matches!(
            encode(70000i32, "DB0.INT0"),
            Err(PlcError::UnsupportedConversion { .. })
        ));
        assert!(encode(-994074615050678801i64, "DB0.dul0").is_err());
        assert!(encode(-1i16, "DB0.UINT0").is_err());
    }

    #[test]
    fn test_encode_float() {
        assert_eq!(encode(0.25f32, "DB0.D0").unwrap(), hex::decode("3e800000").unwrap());
        assert!(encode(0.25f64, "DB0.D0").is_err());
        assert_eq!(
            encode(0.25f32, "DB0.LREAL0").unwrap(),
            0.25f64.to_be_bytes().to_vec()
        );
    }

    #[test]
    fn test_encode_bytes_and_text_into_byte_area() {
        assert_eq!(
            encode(vec![0x12, 0x34, 0x56, 0x67], "DB0.DBB0.4").unwrap(),
            hex::decode("12345667").unwrap()
        );
        assert_eq!(encode("ABCD", "DB0.DBB0.4").unwrap(), b"ABCD".to_vec());
        assert_eq!(encode("AB", "DB0.DBB0.4").unwrap(), hex::decode("41420000").unwrap());
        assert!(encode("ABCDE", "DB0.DBB0.4").is_err());
    }

    #[test]
    fn test_encode_strings() {
        assert_eq!(encode("ABCD", "DB0.string0.4").unwrap(), hex::decode("040441424344").unwrap());
        assert_eq!(
            encode("ABCD", "DB0.string0.8").unwrap(),
            hex::decode("08044142434400000000").unwrap()
        );
        assert_eq!(encode("ABCD", "DB0.string0.2").unwrap(), hex::decode("02024142").unwrap());
        assert_eq!(
            encode("AB", "DB0.wstring0.3").unwrap(),
            hex::decode("0003000200410042 0000".replace(' ', "")).unwrap()
        );
    }

    #[test]
    fn test_encode_rejects_mismatched_kinds() {
        assert!(encode(true, "DB0.INT0").is_err());
        assert!(encode(1i16, "DB0.DBX0.0").is_err());
        assert!(encode(1i16, "DB0.S0.4").is_err());
    }

    #[test]
    fn test_decode_fixed_types() {
        assert_eq!(decode(&[0x10], "DB0.DBX0.4").unwrap(), PlcValue::Bool(true));
        assert_eq!(decode(&[0x10], "DB0.DBX0.3").unwrap(), PlcValue::Bool(false));
        assert_eq!(decode(&[0x12], "DB0.DBB0").unwrap(), PlcValue::Byte(0x12));
        assert_eq!(decode(&[0xF2, 0x34], "DB0.INT0").unwrap(), PlcValue::Int(-3532));
        assert_eq!(decode(&[0xF2, 0x34], "DB0.UINT0").unwrap(), PlcValue::UInt(0xF234));
        assert_eq!(
            decode(&[0xF2, 0x34, 0x56, 0x67], "DB0.DINT0").unwrap(),
            PlcValue::DInt(-231451033)
        );
        assert_eq!(
            decode(&hex::decode("f234566789abcdef").unwrap(), "DB0.LINT0").unwrap(),
            PlcValue::LInt(-994074615050678801)
        );
        assert_eq!(decode(&[0x3E, 0x80, 0, 0], "DB0.REAL0").unwrap(), PlcValue::Real(0.25));
    }

    #[test]
    fn test_decode_uses_only_buffer_length() {
        let value = decode(&[0x12, 0x34, 0xFF, 0xFF], "DB0.INT0").unwrap();
        assert_eq!(value, PlcValue::Int(0x1234));
    }

    #[test]
    fn test_decode_short_buffer() {
        let err = decode(&[0x12], "DB0.DINT0").unwrap_err();
        assert!(matches!(err, PlcError::BufferSize { expected: 4, actual: 1 }));
    }

    #[test]
    fn test_decode_strings() {
        let value = decode(&hex::decode("08044142434400000000").unwrap(), "DB0.S0.8").unwrap();
        assert_eq!(value, PlcValue::String("ABCD".into()));

        // Actual length larger than max is clamped.
        let value = decode(&hex::decode("0209414243").unwrap(), "DB0.S0.3").unwrap();
        assert_eq!(value, PlcValue::String("AB".into()));

        let value = decode(&hex::decode("00030002004100420000").unwrap(), "DB0.WS0.3").unwrap();
        assert_eq!(value, PlcValue::String("AB".into()));
    }

    #[test]
    fn test_decode_byte_array() {
        let value = decode(b"ABCD", "DB0.DBB0.4").unwrap();
        assert_eq!(value, PlcValue::Bytes(b"ABCD".to_vec()));
    }
}
