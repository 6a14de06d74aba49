//! Production failure kinds.

use std::fmt;

use thiserror::Error;

use crate::codec::DecodeError;
use crate::mapfile::MapFileError;

/// Failure kind reported through the delivery channel.
///
/// Kept separate from connectivity so operators can tell network health
/// from data health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Host could not be resolved or connected to.
    UnreachableSource,
    /// I/O failed mid-transfer, or the server refused the request.
    TransferFailure,
    /// Data arrived but is missing, corrupt or of the wrong size.
    MalformedPayload,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::UnreachableSource => "unreachable source",
            FailureKind::TransferFailure => "transfer failure",
            FailureKind::MalformedPayload => "malformed payload",
        })
    }
}

/// Error raised by a strategy while producing a tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductionError {
    #[error("Source unreachable: {0}")]
    UnreachableSource(String),

    #[error("Transfer failed: {0}")]
    TransferFailure(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The job was cancelled at a checkpoint. Never delivered.
    #[error("Cancelled")]
    Cancelled,
}

impl ProductionError {
    /// The delivered failure kind, or `None` for cancellation.
    pub fn kind(&self) -> Option<FailureKind> {
        match self {
            ProductionError::UnreachableSource(_) => Some(FailureKind::UnreachableSource),
            ProductionError::TransferFailure(_) => Some(FailureKind::TransferFailure),
            ProductionError::MalformedPayload(_) => Some(FailureKind::MalformedPayload),
            ProductionError::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProductionError::Cancelled)
    }
}

impl From<MapFileError> for ProductionError {
    fn from(err: MapFileError) -> Self {
        if err.is_io() {
            ProductionError::TransferFailure(err.to_string())
        } else {
            ProductionError::MalformedPayload(err.to_string())
        }
    }
}

impl From<DecodeError> for ProductionError {
    fn from(err: DecodeError) -> Self {
        ProductionError::MalformedPayload(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_kind_projection() {
        assert_eq!(
            ProductionError::UnreachableSource("dns".into()).kind(),
            Some(FailureKind::UnreachableSource)
        );
        assert_eq!(
            ProductionError::TransferFailure("reset".into()).kind(),
            Some(FailureKind::TransferFailure)
        );
        assert_eq!(
            ProductionError::MalformedPayload("size".into()).kind(),
            Some(FailureKind::MalformedPayload)
        );
        assert_eq!(ProductionError::Cancelled.kind(), None);
    }

    #[test]
    fn test_map_file_io_is_transfer_failure() {
        let err: ProductionError =
            MapFileError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "eof")).into();
        assert_eq!(err.kind(), Some(FailureKind::TransferFailure));

        let err: ProductionError = MapFileError::UnknownSource("a.map".into()).into();
        assert_eq!(err.kind(), Some(FailureKind::TransferFailure));
    }

    #[test]
    fn test_map_file_corruption_is_malformed() {
        let err: ProductionError = MapFileError::InvalidBlockSize { block: 3, size: -4 }.into();
        assert_eq!(err.kind(), Some(FailureKind::MalformedPayload));

        let err: ProductionError = DecodeError::NegativeLength(-1).into();
        assert_eq!(err.kind(), Some(FailureKind::MalformedPayload));
    }
}
