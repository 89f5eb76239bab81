//! Cached variable reads.
//!
//! This module provides [`PlcReader`], which reads typed variables from a
//! device while batching reads of the same data block through a short-lived
//! block cache.
//!
//! # Overview
//!
//! For every read the reader:
//! - resolves the variable name with its [`AddressParser`]
//! - records the access in its [`AccessTracker`]
//! - serves the bytes from the [`BlockCache`] or fetches the block prefix
//!   `[0, max tracked offset)` through the [`Transport`]
//! - decodes the variable's bytes with its [`ValueConverter`]
//!
//! The [`ReadMode`] chosen by the caller decides which of these steps run.
//!
//! # Example
//!
//! ```
//! use plc_dbcache::{MemoryTransport, PlcReader, ReadMode, ReaderConfig, VariableAddress};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let device = MemoryTransport::new().with_block(5, vec![0; 16]);
//! device.write_value(&"DB5.DINT0".parse::<VariableAddress>()?, 1234i32)?;
//! device.write_value(&"DB5.INT10".parse::<VariableAddress>()?, -7i16)?;
//!
//! let config = ReaderConfig::new().with_cache_validity(Duration::from_secs(2));
//! let reader = PlcReader::new(device, config);
//! let cancel = CancellationToken::new();
//!
//! let a: i32 = reader.read_value("DB5.DINT0", ReadMode::Cached, &cancel).await?;
//! let b: i16 = reader.read_value("DB5.INT10", ReadMode::Cached, &cancel).await?;
//! assert_eq!((a, b), (1234, -7));
//! assert_eq!(reader.tracker().max_offset_for(5)?, 12);
//! # Ok::<(), plc_dbcache::PlcError>(())
//! # }).unwrap();
//! ```
//!
//! # Freshness
//!
//! A cached block is served while it is younger than the configured validity
//! window and covers the requested byte range. A block fetched before a wider
//! variable was tracked does not cover it and is refreshed on demand.
//!
//! # Concurrency
//!
//! The reader can be shared between tasks. Two concurrent misses on the same
//! block may both fetch it; the later fetch simply replaces the cache entry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::address::{AddressParser, S7AddressParser, VariableAddress};
use crate::cache::{BlockCache, CachedBlock, DEFAULT_CACHE_VALIDITY};
use crate::converter::{S7ValueConverter, ValueConverter};
use crate::error::{PlcError, Result};
use crate::tracker::{AccessTracker, TrackedVariable};
use crate::transport::Transport;
use crate::value::{FromPlcValue, PlcValue};

/// Configuration for creating a [`PlcReader`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReaderConfig {
    /// How long a fetched block may be served from the cache.
    pub cache_validity: Duration,
}

impl ReaderConfig {
    /// Creates a configuration with the default validity window (5 seconds).
    pub fn new() -> Self {
        Self {
            cache_validity: DEFAULT_CACHE_VALIDITY,
        }
    }

    /// Sets a custom cache validity window.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_dbcache::ReaderConfig;
    /// use std::time::Duration;
    ///
    /// let config = ReaderConfig::new().with_cache_validity(Duration::from_millis(500));
    /// assert_eq!(config.cache_validity, Duration::from_millis(500));
    /// ```
    pub fn with_cache_validity(mut self, validity: Duration) -> Self {
        self.cache_validity = validity;
        self
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How a read uses the block cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReadMode {
    /// Read exactly the variable's bytes from the device. The cache is
    /// neither consulted nor updated.
    Direct,
    /// Serve from a fresh cache entry, fetching the block on a miss.
    #[default]
    Cached,
    /// Fetch the block, then read as [`ReadMode::Cached`].
    ForceRefresh,
    /// Fetch the block and decode every tracked variable of it, then read as
    /// [`ReadMode::Cached`].
    ForceRefreshAllTrackedValues,
}

/// A preparation step run before the value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStep {
    /// Fetch the block prefix covering every tracked variable and store it.
    Refresh,
    /// Decode every tracked variable of the block from the refreshed snapshot.
    DecodeAllTracked,
}

/// Where the requested value is finally read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// A point read of the variable's bytes.
    Device,
    /// The cached block, refreshed on a miss.
    Cache,
}

/// The steps a [`ReadMode`] runs, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPlan {
    /// Preparation steps.
    pub steps: &'static [ReadStep],
    /// Source of the returned value.
    pub source: ReadSource,
}

impl ReadMode {
    /// Returns the plan this mode executes.
    ///
    /// # Example
    ///
    /// ```
    /// use plc_dbcache::{ReadMode, ReadSource, ReadStep};
    ///
    /// let plan = ReadMode::ForceRefresh.plan();
    /// assert_eq!(plan.steps, &[ReadStep::Refresh]);
    /// assert_eq!(plan.source, ReadSource::Cache);
    /// ```
    pub fn plan(self) -> ReadPlan {
        match self {
            ReadMode::Direct => ReadPlan {
                steps: &[],
                source: ReadSource::Device,
            },
            ReadMode::Cached => ReadPlan {
                steps: &[],
                source: ReadSource::Cache,
            },
            ReadMode::ForceRefresh => ReadPlan {
                steps: &[ReadStep::Refresh],
                source: ReadSource::Cache,
            },
            ReadMode::ForceRefreshAllTrackedValues => ReadPlan {
                steps: &[ReadStep::Refresh, ReadStep::DecodeAllTracked],
                source: ReadSource::Cache,
            },
        }
    }
}

/// Reads PLC variables through an access tracker and a block cache.
///
/// The tracker and the cache are owned state; pass shared instances with
/// [`PlcReader::with_state`] to let several readers of the same device
/// cooperate.
pub struct PlcReader<T> {
    transport: T,
    parser: Box<dyn AddressParser>,
    converter: Box<dyn ValueConverter>,
    tracker: Arc<AccessTracker>,
    cache: Arc<BlockCache>,
}

impl<T: Transport> PlcReader<T> {
    /// Creates a reader with fresh tracking and cache state, the S7 address
    /// parser and the S7 value converter.
    pub fn new(transport: T, config: ReaderConfig) -> Self {
        Self::with_state(
            transport,
            Arc::new(AccessTracker::new()),
            Arc::new(BlockCache::new(config.cache_validity)),
        )
    }

    /// Creates a reader over existing tracking and cache state.
    pub fn with_state(transport: T, tracker: Arc<AccessTracker>, cache: Arc<BlockCache>) -> Self {
        Self {
            transport,
            parser: Box::new(S7AddressParser),
            converter: Box::new(S7ValueConverter),
            tracker,
            cache,
        }
    }

    /// Replaces the address parser.
    pub fn with_parser(mut self, parser: impl AddressParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    /// Replaces the value converter.
    pub fn with_converter(mut self, converter: impl ValueConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    /// Returns the access tracker.
    pub fn tracker(&self) -> &Arc<AccessTracker> {
        &self.tracker
    }

    /// Returns the block cache.
    pub fn cache(&self) -> &Arc<BlockCache> {
        &self.cache
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Reads a typed variable.
    ///
    /// # Arguments
    ///
    /// * `name` - Textual variable address, e.g. `DB5.DINT0`
    /// * `mode` - How the read uses the cache
    /// * `cancel` - Aborts the read; a cancelled read leaves tracking and
    ///   cache untouched
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is not a valid address (`MalformedAddress`)
    /// - The device read fails (transport errors are returned unchanged)
    /// - The read is cancelled (`Cancelled`)
    /// - A forced refresh leaves no usable cache entry (`CacheRefreshFailed`)
    /// - The value cannot be represented as `V` (`UnsupportedConversion`)
    pub async fn read_value<V: FromPlcValue>(
        &self,
        name: &str,
        mode: ReadMode,
        cancel: &CancellationToken,
    ) -> Result<V> {
        if cancel.is_cancelled() {
            return Err(PlcError::Cancelled);
        }

        let address = self.parser.parse(name)?;
        let variable = TrackedVariable::new(name, &address);

        let result = self.execute(mode.plan(), &variable, &address, cancel).await;
        if !matches!(result, Err(PlcError::Cancelled)) {
            self.tracker.track_variable(address.db, variable);
        }

        V::from_plc_value(result?)
    }

    /// Fetches every tracked byte of block `db` and stores it in the cache.
    ///
    /// # Errors
    ///
    /// Returns `NotTracked` if no variable of `db` was read yet, or the
    /// transport error of the fetch.
    pub async fn force_refresh(&self, db: u16, cancel: &CancellationToken) -> Result<Arc<CachedBlock>> {
        self.refresh_block(db, None, cancel).await
    }

    /// Refreshes block `db` and decodes every variable tracked for it.
    ///
    /// Returns an empty map, without contacting the device, if nothing was
    /// tracked for `db`. A single variable that fails to decode fails the
    /// whole call.
    pub async fn refresh_all_tracked_values(
        &self,
        db: u16,
        cancel: &CancellationToken,
    ) -> Result<HashMap<String, PlcValue>> {
        match self.tracker.registry(db) {
            Some(registry) if !registry.is_empty() => {}
            _ => return Ok(HashMap::new()),
        }

        let block = self.refresh_block(db, None, cancel).await?;
        self.decode_tracked(db, &block)
    }

    async fn execute(
        &self,
        plan: ReadPlan,
        variable: &TrackedVariable,
        address: &VariableAddress,
        cancel: &CancellationToken,
    ) -> Result<PlcValue> {
        let db = address.db;
        let mut refreshed: Option<Arc<CachedBlock>> = None;

        for step in plan.steps {
            match step {
                ReadStep::Refresh => {
                    refreshed = Some(self.refresh_block(db, Some(variable), cancel).await?);
                }
                ReadStep::DecodeAllTracked => {
                    let block = refreshed.as_deref().ok_or(PlcError::CacheRefreshFailed { db })?;
                    let values = self.decode_tracked(db, block)?;
                    tracing::debug!(db = db, decoded = values.len(), "reader: decoded tracked values");
                }
            }
        }

        match plan.source {
            ReadSource::Device => self.point_read(address, cancel).await,
            ReadSource::Cache => self.cached_read(variable, address, refreshed, cancel).await,
        }
    }

    async fn point_read(&self, address: &VariableAddress, cancel: &CancellationToken) -> Result<PlcValue> {
        let bytes = self
            .fetch(address.db, address.start, address.buffer_length(), cancel)
            .await?;
        self.converter.decode(&bytes, address)
    }

    /// Reads from `refreshed` when the plan already fetched the block,
    /// otherwise from a fresh cache entry, refreshing on a miss.
    async fn cached_read(
        &self,
        variable: &TrackedVariable,
        address: &VariableAddress,
        refreshed: Option<Arc<CachedBlock>>,
        cancel: &CancellationToken,
    ) -> Result<PlcValue> {
        let db = address.db;

        if let Some(block) = refreshed {
            return self.decode_from_refresh(&block, address);
        }

        if let Some(block) = self.cache.try_get(db) {
            if let Some(bytes) = block.slice(address.start, address.buffer_length()) {
                tracing::debug!(db = db, name = variable.name(), age = ?block.age(), "cache: hit");
                return self.converter.decode(bytes, address);
            }
            tracing::debug!(
                db = db,
                name = variable.name(),
                cached = block.len(),
                needed = address.offset_end(),
                "cache: entry does not cover variable"
            );
        }

        tracing::debug!(db = db, name = variable.name(), "cache: miss");
        let block = self.refresh_block(db, Some(variable), cancel).await?;
        self.decode_from_refresh(&block, address)
    }

    fn decode_from_refresh(&self, block: &CachedBlock, address: &VariableAddress) -> Result<PlcValue> {
        match block.slice(address.start, address.buffer_length()) {
            Some(bytes) => self.converter.decode(bytes, address),
            None => {
                tracing::warn!(
                    db = address.db,
                    cached = block.len(),
                    needed = address.offset_end(),
                    "cache: refresh left no usable entry"
                );
                Err(PlcError::CacheRefreshFailed { db: address.db })
            }
        }
    }

    /// Fetches `[0, n)` of block `db`, where `n` covers every tracked
    /// variable and `pending`, then commits `pending` to the tracker and the
    /// bytes to the cache.
    ///
    /// A device answering with fewer bytes than requested still replaces the
    /// entry; readers needing the missing range report `CacheRefreshFailed`.
    async fn refresh_block(
        &self,
        db: u16,
        pending: Option<&TrackedVariable>,
        cancel: &CancellationToken,
    ) -> Result<Arc<CachedBlock>> {
        let tracked_end = match self.tracker.max_offset_for(db) {
            Ok(end) => end,
            Err(PlcError::NotTracked { .. } | PlcError::EmptyRegistry { .. }) if pending.is_some() => 0,
            Err(err) => return Err(err),
        };
        let length = pending.map_or(tracked_end, |variable| tracked_end.max(variable.offset_end()));

        tracing::debug!(db = db, bytes = length, "reader: refreshing block");
        let bytes = self.fetch(db, 0, length, cancel).await?;
        if bytes.len() < length {
            tracing::warn!(db = db, requested = length, received = bytes.len(), "reader: short block");
        }

        if let Some(variable) = pending {
            self.tracker.track_variable(db, variable.clone());
        }
        Ok(self.cache.update(db, bytes))
    }

    /// Decodes every variable tracked for `db` from `block`.
    fn decode_tracked(&self, db: u16, block: &CachedBlock) -> Result<HashMap<String, PlcValue>> {
        let Some(registry) = self.tracker.registry(db) else {
            return Ok(HashMap::new());
        };

        let mut values = HashMap::with_capacity(registry.len());
        for variable in registry.variables() {
            let address = variable.address(db);
            let value = self.decode_from_refresh(block, &address)?;
            values.insert(variable.name().to_string(), value);
        }

        Ok(values)
    }

    async fn fetch(&self, db: u16, start: usize, length: usize, cancel: &CancellationToken) -> Result<Vec<u8>> {
        if cancel.is_cancelled() {
            return Err(PlcError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(db = db, "reader: read cancelled");
                Err(PlcError::Cancelled)
            }
            result = self.transport.read_bytes(db, start, length, cancel) => result,
        }
    }
}

impl<T> std::fmt::Debug for PlcReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlcReader")
            .field("tracked_blocks", &self.tracker.block_count())
            .field("cache_validity", &self.cache.validity())
            .finish()
    }
}
