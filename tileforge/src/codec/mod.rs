//! Binary decoding primitives for map-data files.
//!
//! Two layers are provided:
//!
//! - [`fixed`]: unchecked, fixed-offset big-endian decoders for the hot path
//!   (index entries, header fields). Out-of-range offsets panic.
//! - [`ReadBuffer`]: a checked cursor for block data, where every length comes
//!   from the file itself and must be validated before use.

mod error;
pub mod fixed;
mod read_buffer;

pub use error::DecodeError;
pub use fixed::{read_i24, read_i32, read_i64, read_u16, read_u32, read_u40};
pub use read_buffer::{ReadBuffer, MAXIMUM_BUFFER_SIZE};
