//! Block coverage and block header decoding.

use std::ops::RangeInclusive;

use super::error::MapFileResult;
use super::params::SubFileParams;
use crate::codec::{DecodeError, ReadBuffer};
use crate::coord::TileAddress;

/// Rectangle of base-zoom tiles (one block each) covered by a requested tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from_x: i64,
    pub to_x: i64,
    pub from_y: i64,
    pub to_y: i64,
}

impl BlockRange {
    /// Computes the blocks of `params` that cover `tile`, clipped to the
    /// sub-file boundary.
    ///
    /// Returns `None` if the tile lies entirely outside the sub-file, or if
    /// its block coordinates do not fit in 64 bits.
    pub fn covering(params: &SubFileParams, tile: &TileAddress) -> Option<Self> {
        let base = params.base_zoom() as i32;
        let zoom = tile.zoom() as i32;

        let (from_x, to_x, from_y, to_y) = if zoom < base {
            let shift = (base - zoom) as u32;
            let factor = 1i64.checked_shl(shift).filter(|f| *f > 0)?;
            let from_x = tile.column().checked_mul(factor)?;
            let from_y = tile.row().checked_mul(factor)?;
            let span = factor - 1;
            (from_x, from_x.checked_add(span)?, from_y, from_y.checked_add(span)?)
        } else {
            // An arithmetic shift by 63 already yields 0 or -1.
            let shift = ((zoom - base) as u32).min(63);
            let x = tile.column() >> shift;
            let y = tile.row() >> shift;
            (x, x, y, y)
        };

        let boundary = params.boundary();
        let range = Self {
            from_x: from_x.max(boundary.left),
            to_x: to_x.min(boundary.right),
            from_y: from_y.max(boundary.top),
            to_y: to_y.min(boundary.bottom),
        };

        if range.from_x > range.to_x || range.from_y > range.to_y {
            None
        } else {
            Some(range)
        }
    }

    /// Number of blocks in the range.
    pub fn len(&self) -> usize {
        ((self.to_x - self.from_x + 1) * (self.to_y - self.from_y + 1)) as usize
    }

    /// Always false for a range returned by [`BlockRange::covering`].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block numbers in row-major order.
    pub fn block_numbers<'a>(
        &'a self,
        params: &'a SubFileParams,
    ) -> impl Iterator<Item = i64> + 'a {
        self.blocks(params).map(|(_, _, number)| number)
    }

    /// Base-zoom tile coordinates and block number of each block, in
    /// row-major order.
    pub fn blocks<'a>(
        &'a self,
        params: &'a SubFileParams,
    ) -> impl Iterator<Item = (i64, i64, i64)> + 'a {
        let boundary = params.boundary();
        let width = params.blocks_width();
        (self.from_y..=self.to_y).flat_map(move |y| {
            (self.from_x..=self.to_x)
                .map(move |x| (x, y, (y - boundary.top) * width + (x - boundary.left)))
        })
    }
}

/// Per-zoom element counts of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZoomTableRow {
    pub pois: u32,
    pub ways: u32,
}

/// Decoded header of a map block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    zoom_min: u8,
    zoom_table: Vec<ZoomTableRow>,
    first_way_offset: usize,
}

impl BlockHeader {
    /// Decodes the zoom table and first-way offset at the start of a block.
    ///
    /// The zoom table has one row per zoom level of the sub-file; each row
    /// holds the cumulative POI and way counts as variable-length integers.
    /// The first-way offset that follows is relative to the end of the
    /// header and must point inside the block.
    pub fn decode(data: &[u8], zoom_levels: RangeInclusive<u8>) -> MapFileResult<Self> {
        let mut buffer = ReadBuffer::new(data);
        let zoom_min = *zoom_levels.start();
        let rows = zoom_levels.len();

        let mut zoom_table = Vec::with_capacity(rows);
        for _ in 0..rows {
            let pois = buffer.read_var_u32()?;
            let ways = buffer.read_var_u32()?;
            zoom_table.push(ZoomTableRow { pois, ways });
        }

        let relative = buffer.read_var_u32()? as usize;
        let first_way_offset = buffer.position() + relative;
        if first_way_offset > data.len() {
            return Err(DecodeError::LengthExceedsRemaining {
                len: relative,
                remaining: buffer.remaining(),
            }
            .into());
        }

        Ok(Self {
            zoom_min,
            zoom_table,
            first_way_offset,
        })
    }

    /// Counts for a zoom level, clamped to the table's range.
    pub fn counts_at(&self, zoom: u8) -> ZoomTableRow {
        if self.zoom_table.is_empty() {
            return ZoomTableRow::default();
        }
        let row = (zoom.saturating_sub(self.zoom_min) as usize).min(self.zoom_table.len() - 1);
        self.zoom_table[row]
    }

    /// Offset of the first way record from the block start.
    pub fn first_way_offset(&self) -> usize {
        self.first_way_offset
    }
}

/// A block read from a map file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapBlock {
    pub number: i64,
    pub is_water: bool,
    /// `None` for an empty block.
    pub header: Option<BlockHeader>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapfile::error::MapFileError;
    use crate::mapfile::params::TileBounds;

    fn params() -> SubFileParams {
        SubFileParams::new(
            14,
            12..=14,
            0,
            0,
            0,
            TileBounds {
                left: 100,
                top: 200,
                right: 103,
                bottom: 203,
            },
        )
    }

    #[test]
    fn test_covering_at_base_zoom() {
        let range = BlockRange::covering(&params(), &TileAddress::new(101, 202, 14)).unwrap();
        assert_eq!(range.len(), 1);
        let blocks: Vec<_> = range.block_numbers(&params()).collect();
        assert_eq!(blocks, vec![2 * 4 + 1]);
    }

    #[test]
    fn test_covering_above_base_zoom() {
        // Zoom 16 tile (405, 810) lies inside base tile (101, 202)
        let range = BlockRange::covering(&params(), &TileAddress::new(405, 810, 16)).unwrap();
        assert_eq!((range.from_x, range.from_y), (101, 202));
        assert_eq!(range.len(), 1);
    }

    #[test]
    fn test_covering_below_base_zoom_is_clipped() {
        // Zoom 12 tile (25, 50) covers base tiles 100..=103 × 200..=203
        let params = params();
        let range = BlockRange::covering(&params, &TileAddress::new(25, 50, 12)).unwrap();
        assert_eq!(range.len(), 16);
        let blocks: Vec<_> = range.block_numbers(&params).collect();
        assert_eq!(blocks, (0..16).collect::<Vec<_>>());

        // Zoom 13 tile (51, 100) covers 102..=103 × 200..=201
        let range = BlockRange::covering(&params, &TileAddress::new(51, 100, 13)).unwrap();
        let blocks: Vec<_> = range.block_numbers(&params).collect();
        assert_eq!(blocks, vec![2, 3, 6, 7]);
    }

    #[test]
    fn test_covering_outside_boundary() {
        assert!(BlockRange::covering(&params(), &TileAddress::new(0, 0, 14)).is_none());
    }

    #[test]
    fn test_covering_far_above_base_zoom() {
        // Every zoom 127 tile with small coordinates maps to base tile (0, 0)
        assert!(BlockRange::covering(&params(), &TileAddress::new(0, 0, 127)).is_none());

        let wide = SubFileParams::new(
            14,
            12..=14,
            0,
            0,
            0,
            TileBounds {
                left: -1,
                top: -1,
                right: 0,
                bottom: 0,
            },
        );
        let range = BlockRange::covering(&wide, &TileAddress::new(0, 0, 100)).unwrap();
        assert_eq!((range.from_x, range.from_y), (0, 0));
        let range = BlockRange::covering(&wide, &TileAddress::new(i64::MAX, -5, 127)).unwrap();
        assert_eq!((range.from_x, range.from_y), (0, -1));
    }

    #[test]
    fn test_covering_far_below_base_zoom() {
        let deep = SubFileParams::new(
            100,
            99..=100,
            0,
            0,
            0,
            TileBounds {
                left: 0,
                top: 0,
                right: 3,
                bottom: 3,
            },
        );
        assert!(BlockRange::covering(&deep, &TileAddress::new(0, 0, 0)).is_none());
        assert!(BlockRange::covering(&deep, &TileAddress::new(1, 1, 40)).is_none());
    }

    #[test]
    fn test_header_decode() {
        // Three zoom rows, then first-way offset 2
        let data = [1, 0, 2, 1, 3, 4, 0x02, 0xAA, 0xBB];
        let header = BlockHeader::decode(&data, 12..=14).unwrap();

        assert_eq!(header.counts_at(12), ZoomTableRow { pois: 1, ways: 0 });
        assert_eq!(header.counts_at(14), ZoomTableRow { pois: 3, ways: 4 });
        assert_eq!(header.counts_at(20), ZoomTableRow { pois: 3, ways: 4 });
        assert_eq!(header.first_way_offset(), 9);
    }

    #[test]
    fn test_header_first_way_offset_outside_block() {
        let data = [1, 0, 2, 1, 3, 4, 0x10];
        let err = BlockHeader::decode(&data, 12..=14).unwrap_err();
        assert!(matches!(err, MapFileError::Decode(_)));
    }

    #[test]
    fn test_header_truncated_zoom_table() {
        let data = [1, 0, 2];
        assert!(BlockHeader::decode(&data, 12..=14).is_err());
    }
}
