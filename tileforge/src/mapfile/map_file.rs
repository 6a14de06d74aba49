//! Opened map-data files and the registry that resolves job source identities.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use super::block::{BlockHeader, BlockRange, MapBlock};
use super::error::{MapFileError, MapFileResult};
use super::index_cache::{IndexCache, IndexEntry};
use super::params::SubFileParams;
use super::source::{BlockSource, FileSource};
use crate::codec::MAXIMUM_BUFFER_SIZE;
use crate::config::IndexCacheConfig;
use crate::coord::TileAddress;

/// An opened map-data file.
///
/// Holds the byte source, one parameter set per sub-file (as produced by the
/// header parser) and an index cache shared by every worker reading the file.
pub struct MapFile {
    source: Arc<dyn BlockSource>,
    sub_files: Vec<Arc<SubFileParams>>,
    index_cache: IndexCache,
}

impl MapFile {
    /// Creates a map file over an existing source.
    ///
    /// # Arguments
    ///
    /// * `source` - Byte source of the whole file
    /// * `sub_files` - Sub-file layout from the file header
    /// * `cache` - Index cache settings, usually the `[cache]` config section
    pub fn new(
        source: Arc<dyn BlockSource>,
        sub_files: Vec<SubFileParams>,
        cache: &IndexCacheConfig,
    ) -> Self {
        Self {
            source,
            sub_files: sub_files.into_iter().map(Arc::new).collect(),
            index_cache: IndexCache::new(cache.capacity),
        }
    }

    /// Opens a map file from disk.
    pub fn open(
        path: impl AsRef<Path>,
        sub_files: Vec<SubFileParams>,
        cache: &IndexCacheConfig,
    ) -> MapFileResult<Self> {
        let source = FileSource::open(path)?;
        Ok(Self::new(Arc::new(source), sub_files, cache))
    }

    pub fn index_cache(&self) -> &IndexCache {
        &self.index_cache
    }

    /// Selects the sub-file serving a zoom level.
    ///
    /// Zoom levels above every sub-file's range fall back to the sub-file with
    /// the highest maximum zoom; levels below every range have no sub-file.
    pub fn sub_file_for_zoom(&self, zoom: u8) -> Option<&Arc<SubFileParams>> {
        self.sub_files
            .iter()
            .find(|p| p.serves_zoom(zoom))
            .or_else(|| {
                self.sub_files
                    .iter()
                    .max_by_key(|p| p.zoom_max())
                    .filter(|p| zoom > p.zoom_max())
            })
    }

    /// Looks up a block's index entry through the index cache.
    pub fn index_entry(
        &self,
        params: &Arc<SubFileParams>,
        block_number: i64,
    ) -> MapFileResult<IndexEntry> {
        self.index_cache
            .index_entry(self.source.as_ref(), params, block_number)
    }

    /// Returns the blocks covering a tile, if any.
    pub fn covering_blocks(
        &self,
        tile: &TileAddress,
    ) -> Option<(Arc<SubFileParams>, BlockRange)> {
        let zoom = u8::try_from(tile.zoom()).ok()?;
        let params = self.sub_file_for_zoom(zoom)?;
        let range = BlockRange::covering(params, tile)?;
        Some((Arc::clone(params), range))
    }

    /// Reads and decodes one block.
    ///
    /// # Errors
    ///
    /// Fails on an index entry pointing outside the sub-file, a negative or
    /// oversized block size, or a corrupted block header.
    pub fn read_block(
        &self,
        params: &Arc<SubFileParams>,
        block_number: i64,
    ) -> MapFileResult<MapBlock> {
        let entry = self.index_entry(params, block_number)?;
        let pointer = entry.offset();
        if pointer < 1 || pointer > params.sub_file_size() {
            return Err(MapFileError::InvalidBlockPointer {
                block: block_number,
                pointer,
            });
        }

        let next_pointer = if block_number + 1 == params.number_of_blocks() {
            params.sub_file_size()
        } else {
            self.index_entry(params, block_number + 1)?.offset()
        };

        let size = next_pointer as i64 - pointer as i64;
        if size < 0
            || size as usize > MAXIMUM_BUFFER_SIZE
            || pointer + size as u64 > params.sub_file_size()
        {
            return Err(MapFileError::InvalidBlockSize {
                block: block_number,
                size,
            });
        }

        if size == 0 {
            return Ok(MapBlock {
                number: block_number,
                is_water: entry.is_water(),
                header: None,
            });
        }

        let data = self
            .source
            .read_at(params.start_address() + pointer, size as usize)?;
        let header = BlockHeader::decode(&data, params.zoom_min()..=params.zoom_max())?;

        Ok(MapBlock {
            number: block_number,
            is_water: entry.is_water(),
            header: Some(header),
        })
    }
}

impl std::fmt::Debug for MapFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapFile")
            .field("len", &self.source.len())
            .field("sub_files", &self.sub_files.len())
            .field("index_cache", &self.index_cache)
            .finish()
    }
}

/// Resolves job source identities to opened map files.
///
/// Shared by every local-render worker.
#[derive(Debug, Default)]
pub struct MapFileRegistry {
    files: DashMap<String, Arc<MapFile>>,
}

impl MapFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a map file under an identity, replacing any previous one.
    pub fn register(&self, id: impl Into<String>, file: MapFile) -> Arc<MapFile> {
        let id = id.into();
        let file = Arc::new(file);
        info!(source = %id, "Map file registered");
        self.files.insert(id, Arc::clone(&file));
        file
    }

    /// Resolves an identity.
    pub fn get(&self, id: &str) -> MapFileResult<Arc<MapFile>> {
        self.files
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| MapFileError::UnknownSource(id.to_string()))
    }

    /// Removes a map file. Workers holding it keep their reference until done.
    pub fn remove(&self, id: &str) -> Option<Arc<MapFile>> {
        let removed = self.files.remove(id).map(|(_, file)| file);
        if removed.is_some() {
            debug!(source = %id, "Map file removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
