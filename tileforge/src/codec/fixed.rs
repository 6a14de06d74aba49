//! Fixed-offset big-endian decoders.
//!
//! These are the hot-path primitives used to pull fields out of index blocks
//! and block headers. The caller guarantees `offset + width <= buf.len()`; a
//! violation panics through slice indexing and is treated as a programming
//! error, never as a recoverable condition.

/// Sign bit of a 24-bit two's-complement value.
const I24_SIGN_BIT: u32 = 0x80_0000;

/// Lower 23 bits of a 24-bit value.
const I24_MAGNITUDE_MASK: u32 = 0x7F_FFFF;

/// Bits set when sign-extending a negative 24-bit value to 32 bits.
const I24_NEGATIVE_EXTENSION: u32 = 0xFF80_0000;

/// Decodes an unsigned 16-bit value.
#[inline]
pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([buf[offset], buf[offset + 1]])
}

/// Decodes a signed 24-bit value, sign-extended from bit 23.
#[inline]
pub fn read_i24(buf: &[u8], offset: usize) -> i32 {
    let raw = (buf[offset] as u32) << 16 | (buf[offset + 1] as u32) << 8 | buf[offset + 2] as u32;
    if raw & I24_SIGN_BIT == 0 {
        raw as i32
    } else {
        (I24_NEGATIVE_EXTENSION | (raw & I24_MAGNITUDE_MASK)) as i32
    }
}

/// Decodes an unsigned 32-bit value.
#[inline]
pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Decodes a signed 32-bit value.
#[inline]
pub fn read_i32(buf: &[u8], offset: usize) -> i32 {
    read_u32(buf, offset) as i32
}

/// Decodes a 40-bit unsigned value from five bytes, widened to 64 bits.
///
/// Map-file index entries are stored in this width.
#[inline]
pub fn read_u40(buf: &[u8], offset: usize) -> u64 {
    (buf[offset] as u64) << 32
        | (buf[offset + 1] as u64) << 24
        | (buf[offset + 2] as u64) << 16
        | (buf[offset + 3] as u64) << 8
        | buf[offset + 4] as u64
}

/// Decodes a signed 64-bit value.
#[inline]
pub fn read_i64(buf: &[u8], offset: usize) -> i64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[offset..offset + 8]);
    i64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode_i24(value: i32) -> [u8; 3] {
        let bytes = value.to_be_bytes();
        [bytes[1], bytes[2], bytes[3]]
    }

    #[test]
    fn test_i24_positive() {
        assert_eq!(read_i24(&[0x00, 0x01, 0x00], 0), 256);
    }

    #[test]
    fn test_i24_minus_one() {
        assert_eq!(read_i24(&[0xFF, 0xFF, 0xFF], 0), -1);
    }

    #[test]
    fn test_i24_extremes() {
        assert_eq!(read_i24(&[0x7F, 0xFF, 0xFF], 0), 8_388_607);
        assert_eq!(read_i24(&[0x80, 0x00, 0x00], 0), -8_388_608);
    }

    #[test]
    fn test_i24_at_offset() {
        let buf = [0xAA, 0xBB, 0xFF, 0xFF, 0xFE];
        assert_eq!(read_i24(&buf, 2), -2);
    }

    #[test]
    fn test_u16() {
        assert_eq!(read_u16(&[0x12, 0x34], 0), 0x1234);
        assert_eq!(read_u16(&[0x00, 0xFF, 0xFF], 1), 0xFFFF);
    }

    #[test]
    fn test_i32() {
        assert_eq!(read_i32(&[0x00, 0x00, 0x01, 0x00], 0), 256);
        assert_eq!(read_i32(&[0xFF, 0xFF, 0xFF, 0xFE], 0), -2);
        assert_eq!(read_u32(&[0xFF, 0xFF, 0xFF, 0xFE], 0), 0xFFFF_FFFE);
    }

    #[test]
    fn test_u40() {
        assert_eq!(read_u40(&[0x01, 0x00, 0x00, 0x00, 0x00], 0), 1 << 32);
        assert_eq!(read_u40(&[0xFF; 5], 0), 0xFF_FFFF_FFFF);
        assert_eq!(read_u40(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x2A], 1), 0x2A);
    }

    #[test]
    fn test_i64() {
        assert_eq!(read_i64(&(-5i64).to_be_bytes(), 0), -5);
        assert_eq!(read_i64(&i64::MAX.to_be_bytes(), 0), i64::MAX);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_panics() {
        let _ = read_i32(&[0x00, 0x01, 0x02], 0);
    }

    proptest! {
        #[test]
        fn prop_i24_roundtrip(value in -(1i32 << 23)..(1i32 << 23)) {
            prop_assert_eq!(read_i24(&encode_i24(value), 0), value);
        }

        #[test]
        fn prop_u40_matches_wide_decode(value in 0u64..(1u64 << 40)) {
            let bytes = value.to_be_bytes();
            prop_assert_eq!(read_u40(&bytes, 3), value);
        }
    }
}
