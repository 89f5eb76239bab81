//! Transport seam for fetching data block bytes.
//!
//! The read path only knows the [`Transport`] trait: fetch `length` bytes of
//! a data block starting at a byte offset. Socket handling and wire protocol
//! live behind it.
//!
//! [`MemoryTransport`] is an in-memory device useful for tests, demos and
//! offline development. It keeps a request log, can delay reads and can be
//! switched into a disconnected state.
//!
//! # Example
//!
//! ```
//! use plc_dbcache::{MemoryTransport, Transport};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let device = MemoryTransport::new().with_block(1, vec![0x12, 0x34, 0x56]);
//!
//! let bytes = device.read_bytes(1, 1, 2, &CancellationToken::new()).await?;
//! assert_eq!(bytes, vec![0x34, 0x56]);
//! assert_eq!(device.read_count(), 1);
//! # Ok::<(), plc_dbcache::PlcError>(())
//! # }).unwrap();
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::address::VariableAddress;
use crate::converter::{S7ValueConverter, ValueConverter};
use crate::datatype::DataType;
use crate::error::{PlcError, Result};
use crate::utils::{get_bit, set_bit};
use crate::value::PlcValue;

/// Fetches raw bytes from a device's data blocks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Reads `length` bytes of block `db` starting at byte `start`.
    ///
    /// Implementations should stop waiting on the device once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns a transport-class error when the device cannot be reached or
    /// rejects the request, and `PlcError::Cancelled` when `cancel` fires
    /// first. Socket based implementations surface socket failures as
    /// `PlcError::Io` (`?` converts `std::io::Error`); protocol level
    /// rejections use `PlcError::Transport`.
    async fn read_bytes(
        &self,
        db: u16,
        start: usize,
        length: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>>;
}

/// One request received by a [`MemoryTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    /// Data block number.
    pub db: u16,
    /// First byte requested.
    pub start: usize,
    /// Number of bytes requested.
    pub length: usize,
}

/// In-memory device with one byte buffer per data block.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    blocks: Mutex<HashMap<u16, Vec<u8>>>,
    requests: Mutex<Vec<ReadRequest>>,
    latency: Option<Duration>,
    disconnected: AtomicBool,
}

impl MemoryTransport {
    /// Creates a device without data blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a data block.
    pub fn with_block(self, db: u16, bytes: Vec<u8>) -> Self {
        self.set_block(db, bytes);
        self
    }

    /// Delays every read by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Adds or replaces a data block.
    pub fn set_block(&self, db: u16, bytes: Vec<u8>) {
        self.blocks.lock().insert(db, bytes);
    }

    /// Overwrites bytes of an existing block starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the block does not exist or is too short.
    pub fn write_bytes(&self, db: u16, start: usize, bytes: &[u8]) -> Result<()> {
        let mut blocks = self.blocks.lock();
        let block = blocks
            .get_mut(&db)
            .ok_or_else(|| PlcError::transport(format!("DB{db} does not exist")))?;
        let target = start
            .checked_add(bytes.len())
            .and_then(|end| block.get_mut(start..end))
            .ok_or_else(|| {
                PlcError::transport(format!(
                    "write of {} bytes at offset {start} exceeds DB{db}",
                    bytes.len()
                ))
            })?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    /// Encodes `value` with the S7 layout and stores it at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value does not fit the address or the block is
    /// too short.
    ///
    /// Bit addresses update only their bit; the rest of the byte is kept.
    pub fn write_value(&self, address: &VariableAddress, value: impl Into<PlcValue>) -> Result<()> {
        let bytes = S7ValueConverter.encode(&value.into(), address)?;
        if address.data_type != DataType::Bit {
            return self.write_bytes(address.db, address.start, &bytes);
        }

        let bit = address.bit.unwrap_or(0);
        let state = bytes.first().is_some_and(|&byte| get_bit(byte, bit));
        let mut blocks = self.blocks.lock();
        let byte = blocks
            .get_mut(&address.db)
            .and_then(|block| block.get_mut(address.start))
            .ok_or_else(|| PlcError::transport(format!("{address} is outside the device memory")))?;
        *byte = set_bit(*byte, bit, state);
        Ok(())
    }

    /// Simulates losing (or regaining) the connection.
    pub fn set_disconnected(&self, disconnected: bool) {
        self.disconnected.store(disconnected, Ordering::SeqCst);
    }

    /// Number of read requests received, including failed ones.
    pub fn read_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Every read request received, oldest first.
    pub fn requests(&self) -> Vec<ReadRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn read_bytes(
        &self,
        db: u16,
        start: usize,
        length: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        self.requests.lock().push(ReadRequest { db, start, length });

        if let Some(latency) = self.latency {
            tokio::select! {
                _ = cancel.cancelled() => return Err(PlcError::Cancelled),
                _ = tokio::time::sleep(latency) => {}
            }
        }

        if self.disconnected.load(Ordering::SeqCst) {
            return Err(PlcError::transport("not connected"));
        }

        let blocks = self.blocks.lock();
        let block = blocks
            .get(&db)
            .ok_or_else(|| PlcError::transport(format!("DB{db} does not exist")))?;
        start
            .checked_add(length)
            .and_then(|end| block.get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                PlcError::transport(format!(
                    "read of {length} bytes at offset {start} exceeds DB{db} ({} bytes)",
                    block.len()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn test_read_range() {
        let device = MemoryTransport::new().with_block(3, (0..10).collect());
        let bytes = device.read_bytes(3, 0, 4, &token()).await.unwrap();
        assert_eq!(bytes, vec![0, 1, 2, 3]);
        assert_eq!(
            device.requests(),
            vec![ReadRequest { db: 3, start: 0, length: 4 }]
        );
    }

    #[tokio::test]
    async fn test_read_out_of_range() {
        let device = MemoryTransport::new().with_block(3, vec![0; 4]);
        let err = device.read_bytes(3, 2, 4, &token()).await.unwrap_err();
        assert!(err.is_transport());

        let err = device.read_bytes(4, 0, 1, &token()).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(device.read_count(), 2);
    }

    #[tokio::test]
    async fn test_disconnected() {
        let device = MemoryTransport::new().with_block(1, vec![0; 4]);
        device.set_disconnected(true);
        assert!(device.read_bytes(1, 0, 1, &token()).await.unwrap_err().is_transport());

        device.set_disconnected(false);
        assert!(device.read_bytes(1, 0, 1, &token()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_cancellable() {
        let device = MemoryTransport::new()
            .with_block(1, vec![0; 4])
            .with_latency(Duration::from_secs(1));
        let cancel = token();
        cancel.cancel();

        let err = device.read_bytes(1, 0, 1, &cancel).await.unwrap_err();
        assert!(matches!(err, PlcError::Cancelled));
    }

    #[test]
    fn test_write_value() {
        let device = MemoryTransport::new().with_block(1, vec![0; 8]);
        let address: VariableAddress = "DB1.INT2".parse().unwrap();
        device.write_value(&address, 0x1234i16).unwrap();

        let blocks = device.blocks.lock();
        assert_eq!(blocks[&1], vec![0, 0, 0x12, 0x34, 0, 0, 0, 0]);
    }

    #[test]
    fn test_write_bits_keep_neighbours() {
        let device = MemoryTransport::new().with_block(5, vec![0; 16]);
        device.write_value(&"DB5.DBX12.4".parse::<VariableAddress>().unwrap(), true).unwrap();
        device.write_value(&"DB5.DBX12.2".parse::<VariableAddress>().unwrap(), true).unwrap();
        assert_eq!(device.blocks.lock()[&5][12], 0x14);

        device.write_value(&"DB5.DBX12.4".parse::<VariableAddress>().unwrap(), false).unwrap();
        assert_eq!(device.blocks.lock()[&5][12], 0x04);

        assert!(device.write_value(&"DB6.DBX0.0".parse::<VariableAddress>().unwrap(), true).is_err());
    }

    #[test]
    fn test_write_past_end() {
        let device = MemoryTransport::new().with_block(1, vec![0; 2]);
        assert!(device.write_bytes(1, 1, &[1, 2]).is_err());
        assert!(device.write_bytes(2, 0, &[1]).is_err());
    }
}
