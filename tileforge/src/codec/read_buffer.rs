//! Checked cursor over block data.
//!
//! Unlike the fixed-offset decoders, every read here is bounds-checked and
//! every decoded length is validated before anything is allocated, so a
//! corrupted map file surfaces as a [`DecodeError`] instead of a panic or an
//! unbounded allocation.

use super::error::DecodeError;
use super::fixed;

/// Largest buffer or string length accepted from decoded data (10 MB).
pub const MAXIMUM_BUFFER_SIZE: usize = 10_000_000;

/// Continuation flag of a variable-length byte.
const VARINT_CONTINUATION: u8 = 0x80;

/// Data bits of a variable-length continuation byte.
const VARINT_DATA_BITS: u8 = 0x7F;

/// Sign flag in the final byte of a signed variable-length value.
const VARINT_SIGN: u8 = 0x40;

/// Data bits in the final byte of a signed variable-length value.
const VARINT_SIGNED_DATA_BITS: u8 = 0x3F;

/// A 32-bit value never needs more than five 7-bit groups.
const VARINT_MAX_BYTES: usize = 5;

/// Cursor over a byte slice with checked big-endian reads.
#[derive(Debug, Clone)]
pub struct ReadBuffer<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ReadBuffer<'a> {
    /// Creates a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Moves the cursor to an absolute position.
    pub fn set_position(&mut self, position: usize) -> Result<(), DecodeError> {
        if position > self.data.len() {
            return Err(DecodeError::OutOfBounds {
                position,
                needed: 0,
                len: self.data.len(),
            });
        }
        self.position = position;
        Ok(())
    }

    /// Skips `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.take(count).map(|_| ())
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a big-endian `i16`.
    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        let bytes = self.take(2)?;
        Ok(fixed::read_u16(bytes, 0) as i16)
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        let bytes = self.take(4)?;
        Ok(fixed::read_i32(bytes, 0))
    }

    /// Reads a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let bytes = self.take(8)?;
        Ok(fixed::read_i64(bytes, 0))
    }

    /// Reads a variable-length unsigned integer.
    ///
    /// Each byte carries 7 data bits; a set high bit means another byte follows.
    pub fn read_var_u32(&mut self) -> Result<u32, DecodeError> {
        let start = self.position;
        let mut value: u32 = 0;
        for index in 0..VARINT_MAX_BYTES {
            let byte = self.read_u8()?;
            let shift = 7 * index as u32;
            if byte & VARINT_CONTINUATION == 0 {
                return Ok(value | (byte as u32) << shift);
            }
            value |= ((byte & VARINT_DATA_BITS) as u32) << shift;
        }
        Err(DecodeError::VarIntTooLong { position: start })
    }

    /// Reads a variable-length signed integer.
    ///
    /// Continuation bytes carry 7 data bits; the final byte carries 6 data
    /// bits and the sign in bit `0x40`.
    pub fn read_var_i32(&mut self) -> Result<i32, DecodeError> {
        let start = self.position;
        let mut magnitude: i64 = 0;
        for index in 0..VARINT_MAX_BYTES {
            let byte = self.read_u8()?;
            let shift = 7 * index as u32;
            if byte & VARINT_CONTINUATION == 0 {
                magnitude |= ((byte & VARINT_SIGNED_DATA_BITS) as i64) << shift;
                let value = if byte & VARINT_SIGN != 0 {
                    -magnitude
                } else {
                    magnitude
                };
                return i32::try_from(value)
                    .map_err(|_| DecodeError::VarIntTooLong { position: start });
            }
            magnitude |= ((byte & VARINT_DATA_BITS) as i64) << shift;
        }
        Err(DecodeError::VarIntTooLong { position: start })
    }

    /// Reads `len` bytes as UTF-8.
    pub fn read_utf8(&mut self, len: usize) -> Result<&'a str, DecodeError> {
        let position = self.position;
        check_length(len, self.remaining())?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { position })
    }

    /// Reads a UTF-8 string prefixed by its variable-length byte count.
    pub fn read_utf8_prefixed(&mut self) -> Result<&'a str, DecodeError> {
        let len = self.read_var_u32()? as usize;
        self.read_utf8(len)
    }

    /// Validates a length decoded from the data and returns it as `usize`.
    ///
    /// Negative values, values above [`MAXIMUM_BUFFER_SIZE`] and values larger
    /// than the unread remainder are rejected.
    pub fn checked_len(&self, raw: i64) -> Result<usize, DecodeError> {
        if raw < 0 {
            return Err(DecodeError::NegativeLength(raw));
        }
        let len = usize::try_from(raw).map_err(|_| DecodeError::LengthTooLarge {
            len: usize::MAX,
            max: MAXIMUM_BUFFER_SIZE,
        })?;
        check_length(len, self.remaining())?;
        Ok(len)
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError::OutOfBounds {
                position: self.position,
                needed: count,
                len: self.data.len(),
            })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }
}

fn check_length(len: usize, remaining: usize) -> Result<(), DecodeError> {
    if len > MAXIMUM_BUFFER_SIZE {
        return Err(DecodeError::LengthTooLarge {
            len,
            max: MAXIMUM_BUFFER_SIZE,
        });
    }
    if len > remaining {
        return Err(DecodeError::LengthExceedsRemaining { len, remaining });
    }
    Ok(())
}
