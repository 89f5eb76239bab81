//! Utility functions for bit manipulation and byte formatting.
//!
//! Data blocks are addressed byte-wise, so the bit helpers here operate on
//! `u8` with bit 0 as the least significant bit.
//!
//! # Example
//!
//! ```
//! use plc_dbcache::utils::{format_bytes, get_bit, set_bit};
//!
//! let value: u8 = 0b0001_0100;
//! assert!(get_bit(value, 2));
//! assert!(!get_bit(value, 3));
//!
//! assert_eq!(set_bit(value, 0, true), 0b0001_0101);
//! assert_eq!(format_bytes(&[0x12, 0x34, 0xAB]), "12 34 AB");
//! ```

/// Gets a single bit from a byte.
///
/// # Arguments
///
/// * `value` - The byte to extract from
/// * `bit` - Bit position (0-7, where 0 is LSB)
///
/// # Example
///
/// ```
/// use plc_dbcache::utils::get_bit;
///
/// assert!(get_bit(0x10, 4));
/// assert!(!get_bit(0x10, 3));
/// ```
#[inline]
pub fn get_bit(value: u8, bit: u8) -> bool {
    (value & (1 << bit)) != 0
}

/// Sets or clears a single bit in a byte.
///
/// # Example
///
/// ```
/// use plc_dbcache::utils::set_bit;
///
/// assert_eq!(set_bit(0, 4, true), 0x10);
/// assert_eq!(set_bit(0xFF, 0, false), 0xFE);
/// ```
#[inline]
pub fn set_bit(value: u8, bit: u8, state: bool) -> u8 {
    if state {
        value | (1 << bit)
    } else {
        value & !(1 << bit)
    }
}

/// Formats bytes as space separated upper-case hex pairs.
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
