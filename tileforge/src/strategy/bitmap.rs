//! Tile pixel buffers.

use image::RgbaImage;

use super::error::ProductionError;
use crate::coord::TILE_SIZE;

/// Edge length of a tile bitmap in pixels.
pub const TILE_DIMENSION: u32 = TILE_SIZE as u32;

/// Number of pixels in a tile bitmap.
pub const TILE_PIXELS: usize = (TILE_DIMENSION * TILE_DIMENSION) as usize;

/// A `TILE_SIZE × TILE_SIZE` tile as row-major `0xAARRGGBB` words.
#[derive(Clone, PartialEq, Eq)]
pub struct TileBitmap {
    pixels: Vec<u32>,
}

impl TileBitmap {
    /// Wraps a pixel buffer, rejecting any buffer that is not exactly one
    /// tile in size.
    pub fn from_pixels(pixels: Vec<u32>) -> Result<Self, ProductionError> {
        if pixels.len() != TILE_PIXELS {
            return Err(ProductionError::MalformedPayload(format!(
                "expected {} pixels, got {}",
                TILE_PIXELS,
                pixels.len()
            )));
        }
        Ok(Self { pixels })
    }

    /// A tile filled with one colour.
    pub fn filled(argb: u32) -> Self {
        Self {
            pixels: vec![argb; TILE_PIXELS],
        }
    }

    /// Pixel at `(x, y)`. Panics outside the tile.
    pub fn pixel(&self, x: u32, y: u32) -> u32 {
        assert!(x < TILE_DIMENSION && y < TILE_DIMENSION, "pixel out of range");
        self.pixels[(y * TILE_DIMENSION + x) as usize]
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u32> {
        self.pixels
    }

    /// Converts to an RGBA image, e.g. for PNG encoding.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(TILE_DIMENSION, TILE_DIMENSION, |x, y| {
            let [a, r, g, b] = self.pixel(x, y).to_be_bytes();
            image::Rgba([r, g, b, a])
        })
    }
}

impl std::fmt::Debug for TileBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileBitmap")
            .field("width", &TILE_DIMENSION)
            .field("height", &TILE_DIMENSION)
            .finish()
    }
}

/// Packs RGBA channels into an ARGB word.
pub(crate) fn argb(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_be_bytes([a, r, g, b])
}
