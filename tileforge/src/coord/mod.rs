//! Coordinate conversion module
//!
//! Provides tile addressing and conversions between geographic coordinates
//! (latitude/longitude) and Web Mercator pixel/tile coordinates.

mod types;

pub use types::{BoundingBox, EndpointPair, Point, TileAddress, TILE_SIZE};

use std::f64::consts::PI;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112877980659;
pub const MAX_LAT: f64 = 85.05112877980659;

/// Conversion factor between degrees and micro-degrees.
const MICRO_DEGREES: f64 = 1_000_000.0;

/// Side length of the whole world map in pixels at the given zoom level.
#[inline]
pub fn map_size(zoom: u8) -> f64 {
    TILE_SIZE as f64 * 2.0_f64.powi(zoom as i32)
}

/// Converts a pixel X coordinate to longitude in degrees.
#[inline]
pub fn pixel_x_to_longitude(pixel_x: f64, zoom: u8) -> f64 {
    360.0 * ((pixel_x / map_size(zoom)) - 0.5)
}

/// Converts a pixel Y coordinate to latitude in degrees using the inverse
/// Web Mercator projection.
#[inline]
pub fn pixel_y_to_latitude(pixel_y: f64, zoom: u8) -> f64 {
    let y = 0.5 - (pixel_y / map_size(zoom));
    90.0 - 360.0 * (-y * 2.0 * PI).exp().atan() / PI
}

/// Converts a longitude to the tile column containing it.
///
/// The result is clamped to the valid column range for the zoom level.
#[inline]
pub fn longitude_to_tile_x(longitude: f64, zoom: u8) -> i64 {
    let n = 2.0_f64.powi(zoom as i32);
    let x = ((longitude + 180.0) / 360.0 * n).floor() as i64;
    x.clamp(0, n as i64 - 1)
}

/// Converts a latitude to the tile row containing it.
///
/// The latitude is clamped to the Web Mercator range first.
#[inline]
pub fn latitude_to_tile_y(latitude: f64, zoom: u8) -> i64 {
    let n = 2.0_f64.powi(zoom as i32);
    let lat_rad = latitude.clamp(MIN_LAT, MAX_LAT) * PI / 180.0;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as i64;
    y.clamp(0, n as i64 - 1)
}

/// Converts degrees to integer micro-degrees.
#[inline]
pub fn degrees_to_micro(degrees: f64) -> i32 {
    (degrees * MICRO_DEGREES) as i32
}
