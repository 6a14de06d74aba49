//! Local decode-and-render strategy.
//!
//! Resolves the job's map file, reads the blocks covering the tile through
//! the shared index cache, and paints a tile from the decoded block
//! headers: background, land where a block carries data at the tile's zoom,
//! and water where the index flags a block as all-water.

use std::sync::Arc;

use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::bitmap::{argb, TileBitmap, TILE_DIMENSION, TILE_PIXELS};
use super::{ProductionError, ProductionStrategy};
use crate::coord::{TileAddress, TILE_SIZE};
use crate::job::{ProductionMode, RenderJob};
use crate::mapfile::{MapBlock, MapFileRegistry};

/// Most blocks shown by the debug-frame block-count marker.
const MAX_MARKERS: usize = 16;

/// Colours used when painting a tile, as `0xAARRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTheme {
    pub background: u32,
    pub land: u32,
    pub water: u32,
    pub frame: u32,
}

impl Default for RenderTheme {
    fn default() -> Self {
        Self {
            background: 0xFFF8_F8F8,
            land: 0xFFF2_EFE9,
            water: 0xFFB5_D0D0,
            frame: 0xFFFF_0000,
        }
    }
}

/// A block read for the current job, with its base-zoom tile position.
#[derive(Debug)]
struct PlacedBlock {
    x: i64,
    y: i64,
    base_zoom: u8,
    block: MapBlock,
}

/// Renders tiles from local map files.
pub struct LocalRenderer {
    registry: Arc<MapFileRegistry>,
    theme: RenderTheme,
    blocks: Vec<PlacedBlock>,
    pixmap: Option<Pixmap>,
}

impl LocalRenderer {
    pub fn new(registry: Arc<MapFileRegistry>) -> Self {
        Self::with_theme(registry, RenderTheme::default())
    }

    pub fn with_theme(registry: Arc<MapFileRegistry>, theme: RenderTheme) -> Self {
        Self {
            registry,
            theme,
            blocks: Vec::new(),
            pixmap: None,
        }
    }

    /// True while a pixmap is held.
    pub fn holds_pixmap(&self) -> bool {
        self.pixmap.is_some()
    }

    fn read_blocks(
        &mut self,
        job: &RenderJob,
        cancel: &CancellationToken,
    ) -> Result<(), ProductionError> {
        let source = job.source_file().ok_or_else(|| {
            ProductionError::TransferFailure(format!("no source file for {}", job))
        })?;
        let file = self.registry.get(source)?;

        let Some((params, range)) = file.covering_blocks(job.tile()) else {
            debug!(tile = %job.tile(), source, "No blocks cover tile");
            return Ok(());
        };

        for (x, y, number) in range.blocks(&params) {
            let block = file.read_block(&params, number)?;
            self.blocks.push(PlacedBlock {
                x,
                y,
                base_zoom: params.base_zoom(),
                block,
            });

            if cancel.is_cancelled() {
                return Err(ProductionError::Cancelled);
            }
        }

        debug!(tile = %job.tile(), source, blocks = self.blocks.len(), "Blocks read");
        Ok(())
    }

    fn paint(&mut self, job: &RenderJob) -> Result<TileBitmap, ProductionError> {
        let mut pixmap = match self.pixmap.take() {
            Some(pixmap) => pixmap,
            None => Pixmap::new(TILE_DIMENSION, TILE_DIMENSION).ok_or_else(|| {
                ProductionError::MalformedPayload("cannot allocate tile pixmap".to_string())
            })?,
        };

        pixmap.fill(color(self.theme.background));

        let tile = job.tile();
        let zoom = u8::try_from(tile.zoom()).unwrap_or(0);
        for placed in &self.blocks {
            let fill = if placed.block.is_water {
                self.theme.water
            } else if has_features(&placed.block, zoom) {
                self.theme.land
            } else {
                continue;
            };
            if let Some(rect) = block_rect(tile, placed) {
                pixmap.fill_rect(rect, &paint(fill), Transform::identity(), None);
            }
        }

        if job.debug_frame() {
            self.paint_debug_frame(&mut pixmap);
        }

        let pixels: Vec<u32> = pixmap
            .pixels()
            .iter()
            .map(|p| {
                let c = p.demultiply();
                argb(c.red(), c.green(), c.blue(), c.alpha())
            })
            .collect();
        debug_assert_eq!(pixels.len(), TILE_PIXELS);

        self.pixmap = Some(pixmap);
        TileBitmap::from_pixels(pixels)
    }

    fn paint_debug_frame(&self, pixmap: &mut Pixmap) {
        let frame = paint(self.theme.frame);
        let size = TILE_SIZE as f32;

        if let Some(rect) = Rect::from_xywh(0.5, 0.5, size - 1.0, size - 1.0) {
            let path = PathBuilder::from_rect(rect);
            let stroke = Stroke {
                width: 1.0,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &frame, &stroke, Transform::identity(), None);
        }

        for i in 0..self.blocks.len().min(MAX_MARKERS) {
            if let Some(rect) = Rect::from_xywh(4.0 + 6.0 * i as f32, 4.0, 4.0, 4.0) {
                pixmap.fill_rect(rect, &frame, Transform::identity(), None);
            }
        }
    }
}

impl ProductionStrategy for LocalRenderer {
    fn mode(&self) -> ProductionMode {
        ProductionMode::LocalRender
    }

    fn prepare(&mut self, _job: &RenderJob) {
        self.blocks.clear();
    }

    fn produce(
        &mut self,
        job: &RenderJob,
        cancel: &CancellationToken,
    ) -> Result<TileBitmap, ProductionError> {
        self.read_blocks(job, cancel)?;
        self.paint(job)
    }

    fn cleanup(&mut self, _job: &RenderJob) {
        self.blocks.clear();
        self.pixmap = None;
    }
}

fn has_features(block: &MapBlock, zoom: u8) -> bool {
    block.header.as_ref().is_some_and(|header| {
        let counts = header.counts_at(zoom);
        counts.pois > 0 || counts.ways > 0
    })
}

/// Area of the tile covered by a block.
fn block_rect(tile: &TileAddress, placed: &PlacedBlock) -> Option<Rect> {
    let size = TILE_SIZE as f32;
    let zoom = tile.zoom() as i32;
    let base = placed.base_zoom as i32;
    if zoom >= base {
        return Rect::from_xywh(0.0, 0.0, size, size);
    }

    let shift = (base - zoom) as u32;
    let factor = 1i64.checked_shl(shift).filter(|f| *f > 0)?;
    let cell = size / factor as f32;
    let left = placed.x.checked_sub(tile.column().checked_mul(factor)?)? as f32 * cell;
    let top = placed.y.checked_sub(tile.row().checked_mul(factor)?)? as f32 * cell;
    Rect::from_xywh(left, top, cell, cell)
}

fn paint(argb: u32) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color(argb));
    paint.anti_alias = false;
    paint
}

fn color(argb: u32) -> Color {
    let [a, r, g, b] = argb.to_be_bytes();
    Color::from_rgba8(r, g, b, a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapfile::sample_map_file;
    use crate::strategy::FailureKind;

    fn renderer() -> LocalRenderer {
        let registry = Arc::new(MapFileRegistry::new());
        registry.register("sample.map", sample_map_file());
        LocalRenderer::new(registry)
    }

    fn render(renderer: &mut LocalRenderer, job: &RenderJob) -> Result<TileBitmap, ProductionError> {
        renderer.prepare(job);
        let result = renderer.produce(job, &CancellationToken::new());
        renderer.cleanup(job);
        result
    }

    #[test]
    fn test_low_zoom_tile_paints_each_block() {
        let theme = RenderTheme::default();
        let mut renderer = renderer();
        // Zoom 12 tile (25, 50) covers base-zoom blocks 100..=103 x 200..=203;
        // the sub-file holds the top-left 2x2, each 64 pixels wide.
        let job = RenderJob::local(TileAddress::new(25, 50, 12), "sample.map");

        let bitmap = render(&mut renderer, &job).unwrap();

        assert_eq!(bitmap.pixel(10, 10), theme.water);
        assert_eq!(bitmap.pixel(100, 10), theme.background);
        assert_eq!(bitmap.pixel(10, 100), theme.land);
        assert_eq!(bitmap.pixel(100, 100), theme.land);
        assert_eq!(bitmap.pixel(200, 200), theme.background);
        assert!(!renderer.holds_pixmap());
    }

    #[test]
    fn test_base_zoom_tile_fills_whole_tile() {
        let theme = RenderTheme::default();
        let mut renderer = renderer();
        let job = RenderJob::local(TileAddress::new(100, 200, 14), "sample.map");

        let bitmap = render(&mut renderer, &job).unwrap();
        assert!(bitmap.pixels().iter().all(|&p| p == theme.water));
    }

    #[test]
    fn test_tile_outside_file_renders_background() {
        let theme = RenderTheme::default();
        let mut renderer = renderer();

        for tile in [TileAddress::new(0, 0, 14), TileAddress::new(0, 0, 3)] {
            let job = RenderJob::local(tile, "sample.map");
            let bitmap = render(&mut renderer, &job).unwrap();
            assert!(bitmap.pixels().iter().all(|&p| p == theme.background));
        }
    }

    #[test]
    fn test_debug_frame() {
        let theme = RenderTheme::default();
        let mut renderer = renderer();
        let job = RenderJob::local(TileAddress::new(25, 50, 12), "sample.map").with_debug_frame(true);

        let bitmap = render(&mut renderer, &job).unwrap();

        assert_eq!(bitmap.pixel(0, 0), theme.frame);
        assert_eq!(bitmap.pixel(255, 128), theme.frame);
        assert_eq!(bitmap.pixel(128, 255), theme.frame);
        // One marker per block read.
        assert_eq!(bitmap.pixel(4 + 3 * 6 + 1, 5), theme.frame);
        assert_eq!(bitmap.pixel(4 + 4 * 6 + 1, 5), theme.water);
    }

    #[test]
    fn test_unknown_source_is_transfer_failure() {
        let mut renderer = renderer();
        let job = RenderJob::local(TileAddress::new(100, 200, 14), "missing.map");

        let err = render(&mut renderer, &job).unwrap_err();
        assert_eq!(err.kind(), Some(FailureKind::TransferFailure));
    }

    #[test]
    fn test_missing_source_identity() {
        let mut renderer = renderer();
        let job = RenderJob::new(TileAddress::new(100, 200, 14), ProductionMode::LocalRender);

        assert!(render(&mut renderer, &job).is_err());
    }

    #[test]
    fn test_cancel_checked_after_block() {
        let mut renderer = renderer();
        let job = RenderJob::local(TileAddress::new(25, 50, 12), "sample.map");
        let cancel = CancellationToken::new();
        cancel.cancel();

        renderer.prepare(&job);
        let err = renderer.produce(&job, &cancel).unwrap_err();
        assert!(err.is_cancelled());
        // Stopped after the first block.
        assert_eq!(renderer.blocks.len(), 1);
    }

    #[test]
    fn test_block_rect_geometry() {
        let placed = PlacedBlock {
            x: 101,
            y: 201,
            base_zoom: 14,
            block: MapBlock {
                number: 3,
                is_water: false,
                header: None,
            },
        };
        let rect = block_rect(&TileAddress::new(25, 50, 12), &placed).unwrap();
        assert_eq!((rect.x(), rect.y(), rect.width()), (64.0, 64.0, 64.0));
    }

    #[test]
    fn test_block_rect_unrepresentable_shift() {
        let placed = PlacedBlock {
            x: 0,
            y: 0,
            base_zoom: 127,
            block: MapBlock {
                number: 0,
                is_water: false,
                header: None,
            },
        };
        assert!(block_rect(&TileAddress::new(0, 0, 0), &placed).is_none());
    }

    #[test]
    fn test_zoom_far_above_file_renders() {
        let theme = RenderTheme::default();
        let mut renderer = renderer();

        // Served by the highest sub-file; the tile falls outside its blocks.
        let job = RenderJob::local(TileAddress::new(0, 0, 100), "sample.map");
        let bitmap = render(&mut renderer, &job).unwrap();
        assert!(bitmap.pixels().iter().all(|&p| p == theme.background));
    }
}
