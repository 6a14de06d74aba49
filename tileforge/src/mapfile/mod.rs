//! Map-data file access: index entries, blocks, and the index-block cache.
//!
//! This module does not parse the file header. It consumes the sub-file
//! layout the header parser produces ([`SubFileParams`]) and provides:
//!
//! - [`IndexCacheKey`] / [`IndexCache`]: bounded, single-flight cache of
//!   index blocks addressed by `(sub-file, index block number)`
//! - [`BlockRange`]: which blocks cover a requested tile
//! - [`MapFile::read_block`]: validated block reads and header decoding
//! - [`MapFileRegistry`]: resolves a job's source identity to an open file

mod block;
mod error;
mod index_cache;
mod key;
mod map_file;
mod params;
mod source;

pub use block::{BlockHeader, BlockRange, MapBlock, ZoomTableRow};
pub use error::{MapFileError, MapFileResult};
pub use index_cache::{
    IndexCache, IndexCacheStats, IndexEntry, DEFAULT_INDEX_CACHE_CAPACITY,
    INDEX_ENTRIES_PER_BLOCK, SIZE_OF_INDEX_BLOCK,
};
pub use key::IndexCacheKey;
pub use map_file::{MapFile, MapFileRegistry};
pub use params::{SubFileParams, TileBounds, BYTES_PER_INDEX_ENTRY};
pub use source::{BlockSource, FileSource, MemorySource};

#[cfg(test)]
pub(crate) use map_file::tests::sample_map_file;
