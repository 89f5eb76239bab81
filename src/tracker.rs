//! Access tracking per data block.
//!
//! Every variable read is recorded in the [`AccessTracker`] as a
//! [`TrackedVariable`] in the [`BlockAccessRegistry`] of its data block. The
//! registry's [`max_offset_read`](BlockAccessRegistry::max_offset_read) tells
//! how many bytes of the block must be fetched so that every variable seen so
//! far can be served from a single block read.
//!
//! Registries are created lazily on first access and only ever grow.
//!
//! # Example
//!
//! ```
//! use plc_dbcache::{AccessTracker, DataType, VariableAddress};
//!
//! let tracker = AccessTracker::new();
//! tracker.track_access("A", &VariableAddress::new(5, DataType::DInt, 0, 0));
//! tracker.track_access("B", &VariableAddress::new(5, DataType::Int, 10, 0));
//!
//! assert_eq!(tracker.max_offset_for(5)?, 12);
//! assert!(tracker.max_offset_for(6).is_err());
//! # Ok::<(), plc_dbcache::PlcError>(())
//! ```

use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use parking_lot::RwLock;

use crate::address::VariableAddress;
use crate::datatype::DataType;
use crate::error::{PlcError, Result};

/// A variable that was read at least once.
///
/// Identity is the combination of name, start offset, length and declared
/// type: the same address read under another name or type is a separate
/// entry. The bit position is carried for decoding and is not part of the
/// identity: a name reused for another bit of the same byte keeps the bit
/// tracked first, and bulk decoding reads that bit.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackedVariable {
    name: String,
    start: usize,
    length: usize,
    data_type: DataType,
    bit: Option<u8>,
}

impl TrackedVariable {
    /// Creates a tracked variable from a name and its resolved address.
    ///
    /// `length` is the address's buffer length, so string headers are
    /// included.
    pub fn new(name: impl Into<String>, address: &VariableAddress) -> Self {
        Self {
            name: name.into(),
            start: address.start,
            length: address.buffer_length(),
            data_type: address.data_type,
            bit: address.bit,
        }
    }

    /// Variable name as requested.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Byte offset inside the block.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of bytes occupied in the block.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Declared type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Bit position for bit variables.
    pub fn bit(&self) -> Option<u8> {
        self.bit
    }

    /// Exclusive end offset, `start + length`.
    pub fn offset_end(&self) -> usize {
        self.start + self.length
    }

    /// Rebuilds the address of this variable in block `db`.
    pub fn address(&self, db: u16) -> VariableAddress {
        let length = match self.data_type {
            DataType::String => self.length.saturating_sub(2),
            DataType::WString => self.length.saturating_sub(4) / 2,
            _ => self.length,
        };
        VariableAddress {
            bit: self.bit,
            ..VariableAddress::new(db, self.data_type, self.start, length)
        }
    }
}

impl PartialEq for TrackedVariable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.start == other.start
            && self.length == other.length
            && self.data_type == other.data_type
    }
}

impl Eq for TrackedVariable {}

impl Hash for TrackedVariable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.start.hash(state);
        self.length.hash(state);
        self.data_type.hash(state);
    }
}

/// The set of distinct variables read from one data block.
#[derive(Debug, Clone)]
pub struct BlockAccessRegistry {
    db: u16,
    variables: HashSet<TrackedVariable>,
}

impl BlockAccessRegistry {
    /// Creates an empty registry for block `db`.
    pub fn new(db: u16) -> Self {
        Self {
            db,
            variables: HashSet::new(),
        }
    }

    /// Data block number.
    pub fn db(&self) -> u16 {
        self.db
    }

    /// Records a variable. Returns `true` if it was not tracked before.
    pub fn track(&mut self, variable: TrackedVariable) -> bool {
        self.variables.insert(variable)
    }

    /// Tracked variables, in no particular order.
    pub fn variables(&self) -> impl Iterator<Item = &TrackedVariable> {
        self.variables.iter()
    }

    /// Number of distinct tracked variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Returns whether no variable is tracked.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Highest end offset over all tracked variables.
    ///
    /// # Errors
    ///
    /// Returns `PlcError::EmptyRegistry` if no variable is tracked.
    pub fn max_offset_read(&self) -> Result<usize> {
        self.variables
            .iter()
            .map(TrackedVariable::offset_end)
            .max()
            .ok_or(PlcError::EmptyRegistry { db: self.db })
    }
}

/// Registry of variable accesses for all data blocks.
///
/// Safe to share between tasks; each insert happens under a write lock so
/// concurrent tracking never loses an entry.
#[derive(Debug, Default)]
pub struct AccessTracker {
    blocks: RwLock<HashMap<u16, BlockAccessRegistry>>,
}

impl AccessTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `name` was read at `address`.
    ///
    /// Tracking the same name, offset, length and type twice is a no-op.
    pub fn track_access(&self, name: &str, address: &VariableAddress) {
        self.track_variable(address.db, TrackedVariable::new(name, address));
    }

    /// Records an already built variable for block `db`.
    pub fn track_variable(&self, db: u16, variable: TrackedVariable) {
        let mut blocks = self.blocks.write();
        let registry = blocks.entry(db).or_insert_with(|| BlockAccessRegistry::new(db));
        let name = variable.name.clone();
        if registry.track(variable) {
            tracing::trace!(db = db, name = %name, tracked = registry.len(), "tracker: new variable");
        }
    }

    /// Snapshot of every block's registry, in no particular order.
    ///
    /// The returned vector can be iterated any number of times; later
    /// tracking does not affect it.
    pub fn all_accesses(&self) -> Vec<BlockAccessRegistry> {
        self.blocks.read().values().cloned().collect()
    }

    /// Snapshot of the registry for block `db`, if any variable of that block
    /// was tracked.
    pub fn registry(&self, db: u16) -> Option<BlockAccessRegistry> {
        self.blocks.read().get(&db).cloned()
    }

    /// Number of bytes from offset 0 needed to cover every tracked variable
    /// of block `db`.
    ///
    /// # Errors
    ///
    /// - `PlcError::NotTracked` if nothing was tracked for `db`
    /// - `PlcError::EmptyRegistry` if the registry holds no variables
    pub fn max_offset_for(&self, db: u16) -> Result<usize> {
        self.blocks
            .read()
            .get(&db)
            .ok_or(PlcError::NotTracked { db })?
            .max_offset_read()
    }

    /// Number of blocks with a registry.
    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }
}
