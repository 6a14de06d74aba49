//! Bounded cache of map-file index blocks.
//!
//! Index entries are five bytes each and grouped into index blocks of
//! [`INDEX_ENTRIES_PER_BLOCK`] entries. Whole index blocks are cached so that
//! neighbouring block lookups (the common case when rendering adjacent
//! tiles) hit memory instead of disk.
//!
//! # Concurrency
//!
//! The cache is backed by `moka::sync::Cache` with an LRU eviction policy.
//! Reads are lock-free. A miss goes through `try_get_with`, which lets only
//! one caller decode a given index block while concurrent callers for the
//! same key wait for its result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tracing::debug;

use super::error::{MapFileError, MapFileResult};
use super::key::IndexCacheKey;
use super::params::{SubFileParams, BYTES_PER_INDEX_ENTRY};
use super::source::BlockSource;
use crate::codec::read_u40;

/// Number of index entries stored in one index block.
pub const INDEX_ENTRIES_PER_BLOCK: i64 = 128;

/// Size of a full index block in bytes.
pub const SIZE_OF_INDEX_BLOCK: i64 = INDEX_ENTRIES_PER_BLOCK * BYTES_PER_INDEX_ENTRY;

/// Default number of index blocks kept in memory.
pub const DEFAULT_INDEX_CACHE_CAPACITY: u64 = 64;

/// Flag bit marking a block that is entirely water.
const WATER_FLAG: u64 = 0x80_0000_0000;

/// Bits holding the block offset.
const OFFSET_MASK: u64 = 0x7F_FFFF_FFFF;

/// A decoded index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry(u64);

impl IndexEntry {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// Offset of the block relative to the sub-file start.
    pub fn offset(&self) -> u64 {
        self.0 & OFFSET_MASK
    }

    /// True if the block is covered by water only.
    pub fn is_water(&self) -> bool {
        self.0 & WATER_FLAG != 0
    }
}

/// Cache statistics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexCacheStats {
    pub lookups: u64,
    pub misses: u64,
    pub entry_count: u64,
}

impl IndexCacheStats {
    pub fn hits(&self) -> u64 {
        self.lookups.saturating_sub(self.misses)
    }
}

/// Capacity-bounded LRU cache of index blocks shared by all workers.
pub struct IndexCache {
    cache: Cache<IndexCacheKey, Bytes>,
    capacity: u64,
    lookups: AtomicU64,
    misses: AtomicU64,
}

impl IndexCache {
    /// Creates a cache holding at most `capacity` index blocks.
    pub fn new(capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            cache,
            capacity,
            lookups: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Looks up the index entry of a block.
    ///
    /// # Errors
    ///
    /// - [`MapFileError::BlockNumberOutOfRange`] if the block is outside the
    ///   sub-file's grid
    /// - [`MapFileError::InvalidIndexRead`] if the index block lies outside
    ///   the index or is truncated
    /// - [`MapFileError::ReadPastEnd`] if the index runs past the end of the
    ///   source
    /// - [`MapFileError::Io`] if the source read fails
    pub fn index_entry(
        &self,
        source: &dyn BlockSource,
        params: &Arc<SubFileParams>,
        block_number: i64,
    ) -> MapFileResult<IndexEntry> {
        if block_number < 0 || block_number >= params.number_of_blocks() {
            return Err(MapFileError::BlockNumberOutOfRange {
                block: block_number,
                blocks: params.number_of_blocks(),
            });
        }

        let index_block_number = block_number / INDEX_ENTRIES_PER_BLOCK;
        let key = IndexCacheKey::new(Some(Arc::clone(params)), index_block_number);

        self.lookups.fetch_add(1, Ordering::Relaxed);
        let index_block = self
            .cache
            .try_get_with(key, || {
                self.misses.fetch_add(1, Ordering::Relaxed);
                read_index_block(source, params, index_block_number)
            })
            .map_err(|e| (*e).clone())?;

        let entry_position = ((block_number % INDEX_ENTRIES_PER_BLOCK) * BYTES_PER_INDEX_ENTRY) as usize;
        if entry_position + BYTES_PER_INDEX_ENTRY as usize > index_block.len() {
            return Err(MapFileError::InvalidIndexRead {
                position: entry_position as i64,
                size: index_block.len() as i64,
            });
        }

        Ok(IndexEntry::from_raw(read_u40(&index_block, entry_position)))
    }

    /// Drops every cached index block.
    pub fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    /// Returns a statistics snapshot.
    pub fn stats(&self) -> IndexCacheStats {
        self.cache.run_pending_tasks();
        IndexCacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.cache.entry_count(),
        }
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for IndexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache")
            .field("capacity", &self.capacity)
            .field("lookups", &self.lookups.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}

fn read_index_block(
    source: &dyn BlockSource,
    params: &SubFileParams,
    index_block_number: i64,
) -> MapFileResult<Bytes> {
    let position = params.index_start_address() as i64 + index_block_number * SIZE_OF_INDEX_BLOCK;
    let remaining = params.index_end_address() as i64 - position;
    if remaining <= 0 {
        return Err(MapFileError::InvalidIndexRead {
            position,
            size: remaining,
        });
    }
    let size = remaining.min(SIZE_OF_INDEX_BLOCK);

    debug!(
        index_block = index_block_number,
        position, size, "Reading index block"
    );
    source.read_at(position as u64, size as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapfile::params::TileBounds;
    use crate::mapfile::source::MemorySource;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    /// Index starting at offset 0 with `blocks` entries; entry `i` holds `i * 100`,
    /// odd entries carry the water flag.
    fn index_bytes(blocks: i64) -> Vec<u8> {
        let mut data = Vec::new();
        for i in 0..blocks {
            let mut raw = (i as u64) * 100;
            if i % 2 == 1 {
                raw |= WATER_FLAG;
            }
            data.extend_from_slice(&raw.to_be_bytes()[3..]);
        }
        data
    }

    fn params(blocks_wide: i64, blocks_high: i64) -> Arc<SubFileParams> {
        Arc::new(SubFileParams::new(
            10,
            8..=12,
            0,
            0,
            1 << 20,
            TileBounds {
                left: 0,
                top: 0,
                right: blocks_wide - 1,
                bottom: blocks_high - 1,
            },
        ))
    }

    /// Source wrapper counting reads, optionally slowed down.
    struct CountingSource {
        inner: MemorySource,
        reads: AtomicUsize,
        delay: Duration,
    }

    impl BlockSource for CountingSource {
        fn read_at(&self, position: u64, len: usize) -> MapFileResult<Bytes> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.inner.read_at(position, len)
        }

        fn len(&self) -> u64 {
            self.inner.len()
        }
    }

    #[test]
    fn test_entry_decoding() {
        let params = params(20, 20);
        let source = MemorySource::new(index_bytes(400));
        let cache = IndexCache::new(8);

        let entry = cache.index_entry(&source, &params, 0).unwrap();
        assert_eq!(entry.offset(), 0);
        assert!(!entry.is_water());

        let entry = cache.index_entry(&source, &params, 131).unwrap();
        assert_eq!(entry.offset(), 13_100);
        assert!(entry.is_water());

        // Last entry lives in a truncated index block
        let entry = cache.index_entry(&source, &params, 399).unwrap();
        assert_eq!(entry.offset(), 39_900);
    }

    #[test]
    fn test_block_number_out_of_range() {
        let params = params(2, 2);
        let source = MemorySource::new(index_bytes(4));
        let cache = IndexCache::new(8);

        assert!(matches!(
            cache.index_entry(&source, &params, 4),
            Err(MapFileError::BlockNumberOutOfRange { block: 4, blocks: 4 })
        ));
        assert!(matches!(
            cache.index_entry(&source, &params, -1),
            Err(MapFileError::BlockNumberOutOfRange { .. })
        ));
    }

    #[test]
    fn test_truncated_index_is_corrupt_data() {
        let params = params(4, 4);
        // Index claims 16 entries but only 3 are present
        let source = MemorySource::new(index_bytes(3));
        let cache = IndexCache::new(8);

        let err = cache.index_entry(&source, &params, 1).unwrap_err();
        assert!(matches!(err, MapFileError::ReadPastEnd { .. }));
        assert!(!err.is_io());
    }

    #[test]
    fn test_index_blocks_are_cached() {
        let params = params(20, 20);
        let source = CountingSource {
            inner: MemorySource::new(index_bytes(400)),
            reads: AtomicUsize::new(0),
            delay: Duration::ZERO,
        };
        let cache = IndexCache::new(8);

        for block in 0..128 {
            cache.index_entry(&source, &params, block).unwrap();
        }
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);

        cache.index_entry(&source, &params, 128).unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);

        let stats = cache.stats();
        assert_eq!(stats.lookups, 129);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits(), 127);
        assert_eq!(stats.entry_count, 2);
    }

    #[test]
    fn test_capacity_bounds_entries() {
        let params = params(40, 40);
        let source = MemorySource::new(index_bytes(1600));
        let cache = IndexCache::new(2);

        for index_block in 0..10 {
            cache
                .index_entry(&source, &params, index_block * INDEX_ENTRIES_PER_BLOCK)
                .unwrap();
        }
        assert!(cache.stats().entry_count <= 2);
    }

    #[test]
    fn test_concurrent_misses_read_once() {
        let params = params(20, 20);
        let source = Arc::new(CountingSource {
            inner: MemorySource::new(index_bytes(400)),
            reads: AtomicUsize::new(0),
            delay: Duration::from_millis(50),
        });
        let cache = Arc::new(IndexCache::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let source = Arc::clone(&source);
                let cache = Arc::clone(&cache);
                let params = Arc::clone(&params);
                thread::spawn(move || cache.index_entry(source.as_ref(), &params, i).unwrap())
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap().offset(), i as u64 * 100);
        }
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear() {
        let params = params(2, 2);
        let source = MemorySource::new(index_bytes(4));
        let cache = IndexCache::default();

        cache.index_entry(&source, &params, 0).unwrap();
        cache.clear();
        assert_eq!(cache.stats().entry_count, 0);
        assert_eq!(cache.capacity(), DEFAULT_INDEX_CACHE_CAPACITY);
    }
}
