//! # PLC Data Block Cache
//!
//! A Rust library for reading Siemens S7 PLC variables through a short-lived
//! cache of whole data blocks.
//!
//! Industrial clients often poll many small variables that live in the same
//! data block (DB). Fetching each one separately costs a network round trip
//! per variable. This library remembers which variables of each block were
//! read and fetches every block once per validity window, serving the
//! individual variables from the cached bytes.
//!
//! ## Features
//!
//! - **Access tracking**: per block, the set of variables read so far and the
//!   highest byte offset they need
//! - **Block cache**: immutable snapshots that expire after a configurable
//!   window (5 seconds by default)
//! - **Read modes**: direct, cached, forced refresh and forced refresh of all
//!   tracked values
//! - **Pluggable seams**: [`Transport`], [`AddressParser`] and
//!   [`ValueConverter`] are traits; S7 implementations are included
//! - **Cancellation**: every read takes a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - **No panics**: all errors returned as `Result<T, PlcError>`
//!
//! ## Quick Start
//!
//! ```
//! use plc_dbcache::{MemoryTransport, PlcReader, ReadMode, ReaderConfig, VariableAddress};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! // An in-memory device with a 32 byte DB5
//! let device = MemoryTransport::new().with_block(5, vec![0; 32]);
//! device.write_value(&"DB5.DINT0".parse::<VariableAddress>()?, 123_456i32)?;
//! device.write_value(&"DB5.S10.8".parse::<VariableAddress>()?, "PUMP")?;
//!
//! let reader = PlcReader::new(device, ReaderConfig::default());
//! let cancel = CancellationToken::new();
//!
//! // First read fetches the block prefix, second read is a cache hit
//! let name: String = reader.read_value("DB5.S10.8", ReadMode::Cached, &cancel).await?;
//! let count: i32 = reader.read_value("DB5.DINT0", ReadMode::Cached, &cancel).await?;
//! assert_eq!((name.as_str(), count), ("PUMP", 123_456));
//! assert_eq!(reader.transport().read_count(), 1);
//!
//! // Read every tracked variable of DB5 in one round trip
//! let values = reader.refresh_all_tracked_values(5, &cancel).await?;
//! assert_eq!(values.len(), 2);
//! # Ok::<(), plc_dbcache::PlcError>(())
//! # }).unwrap();
//! ```
//!
//! ## Addresses
//!
//! Variables are named with S7 style addresses `DB<n>.<TYPE><start>[.<suffix>]`:
//!
//! | Address | Type | Bytes |
//! |---------|------|------:|
//! | `DB1.DBX4.3` | Bit 3 of byte 4 | 1 |
//! | `DB1.DBB4` / `DB1.B4.10` | Byte / 10 byte array | 1 / 10 |
//! | `DB1.INT4` / `DB1.DBW4` | 16-bit signed | 2 |
//! | `DB1.DINT4` / `DB1.DBD4` | 32-bit signed | 4 |
//! | `DB1.REAL4` | 32-bit float | 4 |
//! | `DB1.LREAL4` | 64-bit float | 8 |
//! | `DB1.S4.20` | String of max 20 characters | 22 |
//! | `DB1.WS4.20` | Wide string of max 20 characters | 44 |
//!
//! `UINT`, `UDINT`, `LINT` and `ULINT` are accepted as well.
//!
//! ## Read Modes
//!
//! | Mode | Device request | Cache |
//! |------|----------------|-------|
//! | [`ReadMode::Direct`] | The variable's bytes | Untouched |
//! | [`ReadMode::Cached`] | Block prefix on a miss | Read, refreshed on a miss |
//! | [`ReadMode::ForceRefresh`] | Block prefix | Replaced, then read |
//! | [`ReadMode::ForceRefreshAllTrackedValues`] | Block prefix | Replaced, every tracked variable decoded |
//!
//! ## Error Handling
//!
//! All operations return `Result<T, PlcError>`. Transport errors are passed
//! through unchanged:
//!
//! ```
//! use plc_dbcache::{MemoryTransport, PlcError, PlcReader, ReadMode, ReaderConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let reader = PlcReader::new(MemoryTransport::new(), ReaderConfig::default());
//! match reader.read_value::<i16>("DB9.INT0", ReadMode::Cached, &CancellationToken::new()).await {
//!     Ok(value) => println!("DB9.INT0 = {value}"),
//!     Err(PlcError::MalformedAddress { reason, .. }) => eprintln!("bad address: {reason}"),
//!     Err(e) if e.is_transport() => eprintln!("device unavailable: {e}"),
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! # });
//! ```
//!
//! ## Logging
//!
//! The library emits [`tracing`] events (cache hits, misses, refreshes and
//! cancellations) and installs no subscriber.
//!
//! ## Utility Functions
//!
//! The [`utils`] module provides bit helpers and byte formatting:
//!
//! ```
//! use plc_dbcache::utils::{format_bytes, get_bit, set_bit};
//!
//! assert!(get_bit(0b0000_1000, 3));
//! assert_eq!(set_bit(0, 7, true), 0x80);
//! assert_eq!(format_bytes(&[0x12, 0xAB]), "12 AB");
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod address;
mod cache;
mod converter;
mod datatype;
mod error;
mod reader;
mod tracker;
mod transport;
pub mod utils;
mod value;

// Public re-exports
pub use address::{
    AddressParser, S7AddressParser, VariableAddress, MAX_BLOCK_SIZE, MAX_STRING_LENGTH,
    MAX_WSTRING_LENGTH,
};
pub use cache::{BlockCache, CachedBlock, DEFAULT_CACHE_VALIDITY};
pub use converter::{S7ValueConverter, ValueConverter};
pub use datatype::DataType;
pub use error::{PlcError, Result};
pub use reader::{PlcReader, ReadMode, ReadPlan, ReadSource, ReadStep, ReaderConfig};
pub use tracker::{AccessTracker, BlockAccessRegistry, TrackedVariable};
pub use transport::{MemoryTransport, ReadRequest, Transport};
pub use value::{FromPlcValue, PlcValue};
