//! Error types for map-file index and block access.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::codec::DecodeError;

/// Result type for map-file operations.
pub type MapFileResult<T> = Result<T, MapFileError>;

/// Errors that can occur while reading index entries and blocks.
///
/// The type is `Clone` so that a single failed index read can be handed to
/// every caller that was waiting on the same cache entry.
#[derive(Debug, Clone, Error)]
pub enum MapFileError {
    /// Underlying read failed.
    #[error("I/O error: {0}")]
    Io(Arc<io::Error>),

    /// Header layout points past the end of the file.
    #[error("read of {len} bytes at {position} exceeds source length {source_len}")]
    ReadPastEnd {
        position: u64,
        len: usize,
        source_len: u64,
    },

    /// No map file is registered under the requested identity.
    #[error("unknown map file: {0}")]
    UnknownSource(String),

    /// Block number outside the sub-file's block grid.
    #[error("block number {block} out of range (sub-file has {blocks} blocks)")]
    BlockNumberOutOfRange { block: i64, blocks: i64 },

    /// Index block position or size is inconsistent with the sub-file.
    #[error("invalid index read at {position} ({size} bytes)")]
    InvalidIndexRead { position: i64, size: i64 },

    /// Index entry points outside the sub-file.
    #[error("invalid block pointer {pointer} for block {block}")]
    InvalidBlockPointer { block: i64, pointer: u64 },

    /// Block size is negative, oversized, or runs past the sub-file.
    #[error("invalid size {size} for block {block}")]
    InvalidBlockSize { block: i64, size: i64 },

    /// Block content could not be decoded.
    #[error("corrupted block data: {0}")]
    Decode(#[from] DecodeError),
}

impl MapFileError {
    /// Returns true for errors caused by the environment rather than by the
    /// content of the file.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::UnknownSource(_))
    }
}

impl From<io::Error> for MapFileError {
    fn from(e: io::Error) -> Self {
        MapFileError::Io(Arc::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_classification() {
        let err: MapFileError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(err.is_io());
        assert!(MapFileError::UnknownSource("x.map".into()).is_io());
        assert!(!MapFileError::InvalidBlockSize { block: 1, size: -4 }.is_io());
        assert!(!MapFileError::Decode(DecodeError::NegativeLength(-1)).is_io());
        assert!(!MapFileError::ReadPastEnd {
            position: 0,
            len: 10,
            source_len: 5
        }
        .is_io());
    }

    #[test]
    fn test_display() {
        let err = MapFileError::BlockNumberOutOfRange {
            block: 12,
            blocks: 10,
        };
        assert_eq!(
            err.to_string(),
            "block number 12 out of range (sub-file has 10 blocks)"
        );
    }
}
