//! Error types for block-cached PLC reads.

use std::io;
use thiserror::Error;

/// Result type alias for PLC read operations.
pub type Result<T> = std::result::Result<T, PlcError>;

/// Errors that can occur while resolving, fetching, caching or converting
/// PLC variables.
#[derive(Debug, Error)]
pub enum PlcError {
    /// The variable name could not be parsed into an address.
    #[error("Malformed address '{address}': {reason}")]
    MalformedAddress {
        /// The textual address as given by the caller.
        address: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// No variable was ever tracked for the data block.
    #[error("DB{db} is not tracked")]
    NotTracked {
        /// Data block number.
        db: u16,
    },

    /// A registry exists for the data block but holds no variables.
    #[error("DB{db} has an empty access registry")]
    EmptyRegistry {
        /// Data block number.
        db: u16,
    },

    /// The transport failed to fetch bytes from the device.
    #[error("Transport error: {reason}")]
    Transport {
        /// Description of the transport failure.
        reason: String,
    },

    /// I/O error raised by a socket based transport.
    ///
    /// `Transport` implementations over TCP propagate socket failures into
    /// this variant with `?`; the reader returns it unchanged.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A refresh completed without leaving a usable cache entry.
    #[error("Cache refresh failed for DB{db}")]
    CacheRefreshFailed {
        /// Data block number.
        db: u16,
    },

    /// The value cannot be converted between the declared PLC type and the
    /// requested type.
    #[error("Unsupported conversion from {from} to {to}")]
    UnsupportedConversion {
        /// Source type (declared PLC type or value kind).
        from: String,
        /// Target type.
        to: String,
    },

    /// A byte buffer is shorter than the address requires.
    #[error("Buffer too short: expected {expected} bytes, got {actual}")]
    BufferSize {
        /// Number of bytes required.
        expected: usize,
        /// Number of bytes available.
        actual: usize,
    },

    /// The read was aborted through its cancellation token.
    #[error("Read cancelled")]
    Cancelled,
}

impl PlcError {
    /// Creates a new `MalformedAddress` error.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_dbcache::PlcError;
    ///
    /// let err = PlcError::malformed_address("DB1.FOO0", "unknown type 'foo'");
    /// ```
    pub fn malformed_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `Transport` error.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_dbcache::PlcError;
    ///
    /// let err = PlcError::transport("connection reset by peer");
    /// assert!(err.is_transport());
    /// ```
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Creates a new `UnsupportedConversion` error.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_dbcache::PlcError;
    ///
    /// let err = PlcError::unsupported_conversion("Bit", "f32");
    /// assert_eq!(err.to_string(), "Unsupported conversion from Bit to f32");
    /// ```
    pub fn unsupported_conversion(from: impl ToString, to: impl Into<String>) -> Self {
        Self::UnsupportedConversion {
            from: from.to_string(),
            to: to.into(),
        }
    }

    /// Creates a new `BufferSize` error.
    pub fn buffer_size(expected: usize, actual: usize) -> Self {
        Self::BufferSize { expected, actual }
    }

    /// Returns whether this error originated in the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Io(_))
    }
}
