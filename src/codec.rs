//! Byte-order codec: bounds-checked big-endian/little-endian scalar
//! accessors over byte slices. Built on the `byteorder` crate's
//! `ByteOrder` trait for the per-width read/write primitives rather than
//! re-deriving endian-swap arithmetic by hand — the same dependency the
//! base crate already carries for its MAC-layer frame codecs.
//!
//! Every accessor is bounds-checked and returns a sentinel (`None`/`false`)
//! on a short slice instead of panicking, matching [`crate::buffer`]'s own
//! no-panic convention.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

macro_rules! scalar_pair {
    ($get_be:ident, $set_be:ident, $get_le:ident, $set_le:ident, $ty:ty, $width:literal, $read:ident, $write:ident) => {
        pub fn $get_be(data: &[u8]) -> Option<$ty> {
            (data.len() >= $width).then(|| BigEndian::$read(data))
        }
        pub fn $set_be(data: &mut [u8], v: $ty) -> bool {
            if data.len() < $width {
                return false;
            }
            BigEndian::$write(data, v);
            true
        }
        pub fn $get_le(data: &[u8]) -> Option<$ty> {
            (data.len() >= $width).then(|| LittleEndian::$read(data))
        }
        pub fn $set_le(data: &mut [u8], v: $ty) -> bool {
            if data.len() < $width {
                return false;
            }
            LittleEndian::$write(data, v);
            true
        }
    };
}

scalar_pair!(be_get_u16, be_set_u16, le_get_u16, le_set_u16, u16, 2, read_u16, write_u16);
scalar_pair!(be_get_u32, be_set_u32, le_get_u32, le_set_u32, u32, 4, read_u32, write_u32);
scalar_pair!(be_get_u64, be_set_u64, le_get_u64, le_set_u64, u64, 8, read_u64, write_u64);
scalar_pair!(be_get_i16, be_set_i16, le_get_i16, le_set_i16, i16, 2, read_i16, write_i16);
scalar_pair!(be_get_i32, be_set_i32, le_get_i32, le_set_i32, i32, 4, read_i32, write_i32);
scalar_pair!(be_get_i64, be_set_i64, le_get_i64, le_set_i64, i64, 8, read_i64, write_i64);

/// `u8`/`i8` have no endianness; these exist so width-generic callers don't
/// need to special-case the 1-byte accessors.
pub fn be_get_u8(data: &[u8]) -> Option<u8> {
    data.first().copied()
}
pub fn be_set_u8(data: &mut [u8], v: u8) -> bool {
    match data.first_mut() {
        Some(b) => {
            *b = v;
            true
        }
        None => false,
    }
}
pub fn be_get_i8(data: &[u8]) -> Option<i8> {
    be_get_u8(data).map(|v| v as i8)
}
pub fn be_set_i8(data: &mut [u8], v: i8) -> bool {
    be_set_u8(data, v as u8)
}
pub use be_get_i8 as le_get_i8;
pub use be_get_u8 as le_get_u8;
pub use be_set_i8 as le_set_i8;
pub use be_set_u8 as le_set_u8;

// "Network order" is big-endian; `hton`/`ntoh` are the same bounds-checked
// accessors under their BSD-socket names.
pub use be_get_u16 as ntoh_u16;
pub use be_get_u32 as ntoh_u32;
pub use be_get_u64 as ntoh_u64;
pub use be_set_u16 as hton_u16;
pub use be_set_u32 as hton_u32;
pub use be_set_u64 as hton_u64;

/// Copies `n` bytes from `src` to `dst`. Byte-for-byte, not an endian
/// conversion: the source format's `le_move_u*` family moves bytes between
/// buffers without reinterpreting them, so a plain copy satisfies it
/// regardless of which endianness reading of that name is intended.
pub fn move_bytes(dst: &mut [u8], src: &[u8], n: usize) -> bool {
    if dst.len() < n || src.len() < n {
        return false;
    }
    dst[..n].copy_from_slice(&src[..n]);
    true
}

pub fn le_move_u16(dst: &mut [u8], src: &[u8]) -> bool {
    move_bytes(dst, src, 2)
}
pub fn le_move_u32(dst: &mut [u8], src: &[u8]) -> bool {
    move_bytes(dst, src, 4)
}
pub fn le_move_u64(dst: &mut [u8], src: &[u8]) -> bool {
    move_bytes(dst, src, 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn be_round_trip() {
        let mut buf = [0u8; 4];
        assert!(be_set_u32(&mut buf, 0x0102_0304));
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(be_get_u32(&buf), Some(0x0102_0304));
    }

    #[test]
    fn le_round_trip() {
        let mut buf = [0u8; 2];
        assert!(le_set_u16(&mut buf, 0x0102));
        assert_eq!(buf, [0x02, 0x01]);
        assert_eq!(le_get_u16(&buf), Some(0x0102));
    }

    #[test]
    fn short_slice_is_sentinel_not_panic() {
        let short = [0u8; 1];
        assert_eq!(be_get_u16(&short), None);
        let mut out = [0u8; 1];
        assert!(!be_set_u16(&mut out, 1));
    }

    #[test]
    fn hton_ntoh_alias_big_endian() {
        let mut buf = [0u8; 4];
        assert!(hton_u32(&mut buf, 1));
        assert_eq!(buf, [0, 0, 0, 1]);
        assert_eq!(ntoh_u32(&buf), Some(1));
    }

    #[test]
    fn move_bytes_copies_without_reinterpreting() {
        let src = [0xAA, 0xBB, 0xCC, 0xDD];
        let mut dst = [0u8; 4];
        assert!(le_move_u32(&mut dst, &src));
        assert_eq!(dst, src);
    }
}
