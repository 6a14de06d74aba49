//! Coordinate type definitions

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::{degrees_to_micro, pixel_x_to_longitude, pixel_y_to_latitude};

/// Edge length of a tile in pixels.
pub const TILE_SIZE: i64 = 256;

/// Tile address in the Web Mercator / Slippy Map system.
///
/// Equality, hashing and ordering depend only on `(column, row, zoom)`; the
/// pixel origin is derived from them at construction and carried along so it
/// does not have to be recomputed on every draw.
#[derive(Debug, Clone, Copy)]
pub struct TileAddress {
    column: i64,
    row: i64,
    zoom: i8,
    pixel_x: i64,
    pixel_y: i64,
}

impl TileAddress {
    /// Creates a tile address. Construction never fails; the pixel origin
    /// wraps for coordinates beyond the 64-bit pixel space.
    pub fn new(column: i64, row: i64, zoom: i8) -> Self {
        Self {
            column,
            row,
            zoom,
            pixel_x: column.wrapping_mul(TILE_SIZE),
            pixel_y: row.wrapping_mul(TILE_SIZE),
        }
    }

    /// X coordinate (east-west), 0 at west.
    #[inline]
    pub fn column(&self) -> i64 {
        self.column
    }

    /// Y coordinate (north-south), 0 at north.
    #[inline]
    pub fn row(&self) -> i64 {
        self.row
    }

    #[inline]
    pub fn zoom(&self) -> i8 {
        self.zoom
    }

    /// Pixel-space origin (top-left corner) of the tile at its zoom level.
    #[inline]
    pub fn pixel_origin(&self) -> (i64, i64) {
        (self.pixel_x, self.pixel_y)
    }

    /// Geographic bounding box of the tile in micro-degrees.
    ///
    /// The top-left pixel corner yields the north-west point and the
    /// bottom-right corner the south-east point.
    pub fn bounding_box(&self) -> BoundingBox {
        let zoom = self.zoom.max(0) as u8;
        let left = self.pixel_x as f64;
        let top = self.pixel_y as f64;
        let right = self.pixel_x.wrapping_add(TILE_SIZE) as f64;
        let bottom = self.pixel_y.wrapping_add(TILE_SIZE) as f64;

        BoundingBox {
            min_latitude: degrees_to_micro(pixel_y_to_latitude(bottom, zoom)),
            min_longitude: degrees_to_micro(pixel_x_to_longitude(left, zoom)),
            max_latitude: degrees_to_micro(pixel_y_to_latitude(top, zoom)),
            max_longitude: degrees_to_micro(pixel_x_to_longitude(right, zoom)),
        }
    }

    /// The tile one zoom level up that contains this one.
    ///
    /// Returns `None` at zoom 0.
    pub fn parent(&self) -> Option<TileAddress> {
        if self.zoom <= 0 {
            return None;
        }
        Some(TileAddress::new(
            self.column >> 1,
            self.row >> 1,
            self.zoom - 1,
        ))
    }

    /// The four tiles one zoom level down, in row-major order.
    pub fn children(&self) -> [TileAddress; 4] {
        let column = self.column.wrapping_shl(1);
        let row = self.row.wrapping_shl(1);
        let zoom = self.zoom.wrapping_add(1);
        [
            TileAddress::new(column, row, zoom),
            TileAddress::new(column.wrapping_add(1), row, zoom),
            TileAddress::new(column, row.wrapping_add(1), zoom),
            TileAddress::new(column.wrapping_add(1), row.wrapping_add(1), zoom),
        ]
    }

    fn identity(&self) -> (i8, i64, i64) {
        (self.zoom, self.row, self.column)
    }
}

impl PartialEq for TileAddress {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for TileAddress {}

impl Hash for TileAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for TileAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Zoom first, then row-major.
impl Ord for TileAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.column, self.row)
    }
}

/// Axis-aligned geographic rectangle in micro-degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub min_latitude: i32,
    pub min_longitude: i32,
    pub max_latitude: i32,
    pub max_longitude: i32,
}

impl BoundingBox {
    /// Returns true if the point (in micro-degrees) lies inside or on the edge.
    pub fn contains(&self, latitude: i32, longitude: i32) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&latitude)
            && (self.min_longitude..=self.max_longitude).contains(&longitude)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_latitude, self.min_longitude, self.max_latitude, self.max_longitude
        )
    }
}

/// A point in drawing space.
///
/// Equality is exact bit-pattern equality of both coordinates, so `NaN`
/// equals itself when the payloads match and `0.0` differs from `-0.0`.
/// Ordering is total: `x` first, then `y`, using IEEE total order.
#[derive(Debug, Clone, Copy)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn bits(&self) -> (u32, u32) {
        (self.x.to_bits(), self.y.to_bits())
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }
}

/// The two endpoints of a line segment, ignoring interior vertices.
///
/// Order matters: `(a, b)` and `(b, a)` are different pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointPair {
    pub start: Point,
    pub end: Point,
}

impl EndpointPair {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Builds the pair from a polyline's first and last vertex.
    ///
    /// Returns `None` for an empty polyline.
    pub fn of_polyline(points: &[Point]) -> Option<Self> {
        Some(Self::new(*points.first()?, *points.last()?))
    }
}
