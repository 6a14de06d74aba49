//! Sub-file parameters.
//!
//! A map file is split into sub-files, one per zoom interval. The header
//! parser produces one [`SubFileParams`] per sub-file; this crate only
//! consumes them to address index entries and blocks.

use std::ops::RangeInclusive;

/// Size of one index entry in bytes.
pub const BYTES_PER_INDEX_ENTRY: i64 = 5;

/// Inclusive tile rectangle at a sub-file's base zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileBounds {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

/// Layout of one sub-file of a map-data file.
///
/// Equality and hashing cover every field, so two descriptions of the same
/// sub-file are interchangeable as cache-key components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubFileParams {
    base_zoom: u8,
    zoom_min: u8,
    zoom_max: u8,
    start_address: u64,
    index_start_address: u64,
    index_end_address: u64,
    sub_file_size: u64,
    boundary: TileBounds,
    blocks_width: i64,
    blocks_height: i64,
    number_of_blocks: i64,
}

impl SubFileParams {
    /// Describes a sub-file.
    ///
    /// # Arguments
    ///
    /// * `base_zoom` - Zoom level at which blocks are tiled
    /// * `zoom_range` - Zoom levels served by this sub-file
    /// * `start_address` - Absolute file offset of the sub-file
    /// * `index_start_address` - Absolute file offset of the block index
    /// * `sub_file_size` - Size of the sub-file in bytes
    /// * `boundary` - Tiles covered at the base zoom
    pub fn new(
        base_zoom: u8,
        zoom_range: RangeInclusive<u8>,
        start_address: u64,
        index_start_address: u64,
        sub_file_size: u64,
        boundary: TileBounds,
    ) -> Self {
        let blocks_width = (boundary.right - boundary.left + 1).max(0);
        let blocks_height = (boundary.bottom - boundary.top + 1).max(0);
        let number_of_blocks = blocks_width * blocks_height;
        Self {
            base_zoom,
            zoom_min: *zoom_range.start(),
            zoom_max: *zoom_range.end(),
            start_address,
            index_start_address,
            index_end_address: index_start_address
                + (number_of_blocks * BYTES_PER_INDEX_ENTRY) as u64,
            sub_file_size,
            boundary,
            blocks_width,
            blocks_height,
            number_of_blocks,
        }
    }

    pub fn base_zoom(&self) -> u8 {
        self.base_zoom
    }

    pub fn zoom_min(&self) -> u8 {
        self.zoom_min
    }

    pub fn zoom_max(&self) -> u8 {
        self.zoom_max
    }

    /// Number of rows in each block's zoom table.
    pub fn zoom_levels(&self) -> usize {
        (self.zoom_max.saturating_sub(self.zoom_min)) as usize + 1
    }

    pub fn start_address(&self) -> u64 {
        self.start_address
    }

    pub fn index_start_address(&self) -> u64 {
        self.index_start_address
    }

    pub fn index_end_address(&self) -> u64 {
        self.index_end_address
    }

    pub fn sub_file_size(&self) -> u64 {
        self.sub_file_size
    }

    pub fn boundary(&self) -> TileBounds {
        self.boundary
    }

    pub fn blocks_width(&self) -> i64 {
        self.blocks_width
    }

    pub fn blocks_height(&self) -> i64 {
        self.blocks_height
    }

    pub fn number_of_blocks(&self) -> i64 {
        self.number_of_blocks
    }

    /// Returns true if this sub-file serves the given zoom level.
    pub fn serves_zoom(&self, zoom: u8) -> bool {
        (self.zoom_min..=self.zoom_max).contains(&zoom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_block_grid() {
        let params = SubFileParams::new(
            14,
            12..=21,
            1000,
            1000,
            50_000,
            TileBounds {
                left: 8800,
                top: 5370,
                right: 8803,
                bottom: 5372,
            },
        );

        assert_eq!(params.blocks_width(), 4);
        assert_eq!(params.blocks_height(), 3);
        assert_eq!(params.number_of_blocks(), 12);
        assert_eq!(params.index_end_address(), 1000 + 12 * 5);
        assert_eq!(params.zoom_levels(), 10);
        assert!(params.serves_zoom(12));
        assert!(params.serves_zoom(21));
        assert!(!params.serves_zoom(11));
    }

    #[test]
    fn test_inverted_boundary_has_no_blocks() {
        let params = SubFileParams::new(
            5,
            0..=7,
            0,
            0,
            0,
            TileBounds {
                left: 3,
                top: 3,
                right: 2,
                bottom: 2,
            },
        );
        assert_eq!(params.number_of_blocks(), 0);
    }
}
