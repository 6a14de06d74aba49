//! Error types for checked decoding.

use thiserror::Error;

/// Errors raised while decoding untrusted block data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A read would run past the end of the buffer.
    #[error("read of {needed} bytes at position {position} exceeds buffer length {len}")]
    OutOfBounds {
        position: usize,
        needed: usize,
        len: usize,
    },

    /// A variable-length integer used more bytes than its width allows.
    #[error("variable-length integer at position {position} is too long")]
    VarIntTooLong { position: usize },

    /// A decoded length was negative.
    #[error("negative length {0}")]
    NegativeLength(i64),

    /// A decoded length exceeds the allocation ceiling.
    #[error("length {len} exceeds maximum of {max} bytes")]
    LengthTooLarge { len: usize, max: usize },

    /// A decoded length exceeds the bytes left in the buffer.
    #[error("length {len} exceeds remaining {remaining} bytes")]
    LengthExceedsRemaining { len: usize, remaining: usize },

    /// String bytes were not valid UTF-8.
    #[error("invalid UTF-8 string at position {position}")]
    InvalidUtf8 { position: usize },
}
