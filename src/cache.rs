//! Time-bounded cache of raw data block bytes.
//!
//! [`BlockCache`] keeps the most recent [`CachedBlock`] per data block. An
//! entry is served only while it is younger than the cache's validity window;
//! expired entries stay in place until the next [`update`](BlockCache::update)
//! replaces them.
//!
//! Entries are immutable and replaced whole, so a reader always observes a
//! complete buffer.
//!
//! # Example
//!
//! ```
//! use plc_dbcache::BlockCache;
//! use std::time::Duration;
//!
//! let cache = BlockCache::new(Duration::from_secs(5));
//! assert!(cache.try_get(5).is_none());
//!
//! cache.update(5, vec![0u8; 20]);
//! let block = cache.try_get(5).unwrap();
//! assert_eq!(block.len(), 20);
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;

/// Default validity window of a cached block.
pub const DEFAULT_CACHE_VALIDITY: Duration = Duration::from_secs(5);

/// Snapshot of a data block's bytes and the instant they were captured.
#[derive(Debug)]
pub struct CachedBlock {
    buffer: Vec<u8>,
    captured_at: Instant,
}

impl CachedBlock {
    /// Captures `buffer` at the current instant.
    pub fn new(buffer: Vec<u8>) -> Self {
        Self {
            buffer,
            captured_at: Instant::now(),
        }
    }

    /// Raw block bytes, starting at offset 0.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of cached bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Instant the buffer was captured.
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Time elapsed since capture.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    /// Returns whether the block is older than `validity`.
    pub fn is_expired(&self, validity: Duration) -> bool {
        self.age() > validity
    }

    /// Returns the bytes of `[start, start + length)` if the buffer covers
    /// that range.
    pub fn slice(&self, start: usize, length: usize) -> Option<&[u8]> {
        self.buffer.get(start..start.checked_add(length)?)
    }
}

/// Most recent [`CachedBlock`] per data block.
#[derive(Debug)]
pub struct BlockCache {
    blocks: RwLock<HashMap<u16, Arc<CachedBlock>>>,
    validity: Duration,
}

impl BlockCache {
    /// Creates an empty cache whose entries stay valid for `validity`.
    pub fn new(validity: Duration) -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            validity,
        }
    }

    /// Validity window of cached entries.
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Stores `buffer` as the current snapshot of block `db`, replacing any
    /// previous entry, and returns the stored entry.
    pub fn update(&self, db: u16, buffer: Vec<u8>) -> Arc<CachedBlock> {
        let block = Arc::new(CachedBlock::new(buffer));
        self.blocks.write().insert(db, block.clone());
        block
    }

    /// Returns the entry for `db` if one exists and has not expired.
    pub fn try_get(&self, db: u16) -> Option<Arc<CachedBlock>> {
        self.blocks
            .read()
            .get(&db)
            .filter(|block| !block.is_expired(self.validity))
            .cloned()
    }
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_VALIDITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[test]
    fn test_missing_entry() {
        let cache = BlockCache::default();
        assert!(cache.try_get(1).is_none());
        assert_eq!(cache.validity(), DEFAULT_CACHE_VALIDITY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_validity_window() {
        let cache = BlockCache::new(Duration::from_secs(5));
        cache.update(5, vec![0xAA; 20]);

        advance(Duration::from_secs(4)).await;
        let block = cache.try_get(5).expect("fresh at T0+4s");
        assert_eq!(block.len(), 20);

        advance(Duration::from_secs(2)).await;
        assert!(cache.try_get(5).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_at_exact_window_is_fresh() {
        let cache = BlockCache::new(Duration::from_secs(5));
        cache.update(1, vec![1]);

        advance(Duration::from_secs(5)).await;
        assert!(cache.try_get(1).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_replaces_expired_entry() {
        let cache = BlockCache::new(Duration::from_secs(5));
        cache.update(1, vec![1, 2]);
        advance(Duration::from_secs(10)).await;
        assert!(cache.try_get(1).is_none());

        cache.update(1, vec![3, 4, 5]);
        assert_eq!(cache.try_get(1).unwrap().buffer(), &[3, 4, 5]);
    }

    #[test]
    fn test_update_replaces_fresh_entry() {
        let cache = BlockCache::default();
        let first = cache.update(1, vec![1]);
        cache.update(1, vec![2]);

        assert_eq!(first.buffer(), &[1]);
        assert_eq!(cache.try_get(1).unwrap().buffer(), &[2]);
    }

    #[test]
    fn test_blocks_are_independent() {
        let cache = BlockCache::default();
        cache.update(1, vec![1]);
        assert!(cache.try_get(2).is_none());
    }

    #[test]
    fn test_slice() {
        let block = CachedBlock::new(vec![0, 1, 2, 3, 4]);
        assert_eq!(block.slice(1, 3), Some(&[1, 2, 3][..]));
        assert_eq!(block.slice(3, 2), Some(&[3, 4][..]));
        assert_eq!(block.slice(3, 3), None);
        assert_eq!(block.slice(usize::MAX, 2), None);
    }
}
