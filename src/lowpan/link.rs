//! The minimal interface [`crate::lowpan::iphc`] needs from a link-layer
//! frame, decoupling the IPHC engine from `ieee802154` types directly.

use crate::buffer::Buffer;
use ieee802154::mac::Address as MacAddress;

/// A link-layer frame capable of carrying a 6LoWPAN payload.
pub trait LinkFrame<'f, 'd> {
    /// The frame's source link-layer address, if present.
    fn src_addr(&self) -> Option<&[u8]>;
    /// The frame's destination link-layer address, if present.
    fn dest_addr(&self) -> Option<&[u8]>;
    /// Length in bytes of the source address (0, 2, or 8).
    fn length_src_addr(&self) -> usize;
    /// Length in bytes of the destination address (0, 2, or 8).
    fn length_dest_addr(&self) -> usize;
    /// Remaining tailroom available for the 6LoWPAN payload.
    fn free(&self) -> usize;
    /// The frame's payload buffer, read/write cursors reset to its start.
    fn reset_buffer(&self) -> Buffer<'f, 'd>;
}

/// Adapts an `ieee802154::mac::Address` pair plus a payload [`Buffer`] to
/// the [`LinkFrame`] interface. The address bytes are extracted once at
/// construction (big-endian, right-justified in an 8-byte slot) so
/// `src_addr`/`dest_addr` can hand back plain slices.
pub struct Lowpan6Frame<'f, 'd> {
    src: Option<([u8; 8], usize)>,
    dest: Option<([u8; 8], usize)>,
    pub buffer: Buffer<'f, 'd>,
}

fn addr_bytes(addr: &MacAddress) -> Option<([u8; 8], usize)> {
    let mut b = [0u8; 8];
    match addr {
        MacAddress::Short(_, short) => {
            short.encode(&mut b[6..]);
            Some((b, 2))
        }
        MacAddress::Extended(_, ext) => {
            ext.encode(&mut b);
            Some((b, 8))
        }
        _ => None,
    }
}

impl<'f, 'd> Lowpan6Frame<'f, 'd> {
    pub fn new(src: Option<MacAddress>, dest: Option<MacAddress>, buffer: Buffer<'f, 'd>) -> Self {
        Lowpan6Frame {
            src: src.as_ref().and_then(addr_bytes),
            dest: dest.as_ref().and_then(addr_bytes),
            buffer,
        }
    }
}

impl<'f, 'd> LinkFrame<'f, 'd> for Lowpan6Frame<'f, 'd> {
    fn src_addr(&self) -> Option<&[u8]> {
        self.src.as_ref().map(|(b, n)| &b[8 - n..])
    }

    fn dest_addr(&self) -> Option<&[u8]> {
        self.dest.as_ref().map(|(b, n)| &b[8 - n..])
    }

    fn length_src_addr(&self) -> usize {
        self.src.map(|(_, n)| n).unwrap_or(0)
    }

    fn length_dest_addr(&self) -> usize {
        self.dest.map(|(_, n)| n).unwrap_or(0)
    }

    fn free(&self) -> usize {
        self.buffer.free()
    }

    fn reset_buffer(&self) -> Buffer<'f, 'd> {
        self.buffer.read_set(self.buffer.start());
        self.buffer.write_set(self.buffer.start());
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Frame;
    use ieee802154::mac::{ExtendedAddress, PanId, ShortAddress};

    #[test]
    fn short_address_reports_length_2() {
        let mut data = [0u8; 32];
        let frame = Frame::new(&mut data, 0).unwrap();
        let src = MacAddress::Short(PanId(1), ShortAddress(0x1234));
        let link = Lowpan6Frame::new(Some(src), None, frame.root());
        assert_eq!(link.length_src_addr(), 2);
        assert_eq!(link.src_addr(), Some(&[0x12, 0x34][..]));
        assert_eq!(link.length_dest_addr(), 0);
        assert_eq!(link.dest_addr(), None);
    }

    #[test]
    fn extended_address_reports_length_8() {
        let mut data = [0u8; 32];
        let frame = Frame::new(&mut data, 0).unwrap();
        let dest = MacAddress::Extended(PanId(1), ExtendedAddress(0x0011_2233_4455_6677));
        let link = Lowpan6Frame::new(None, Some(dest), frame.root());
        assert_eq!(link.length_dest_addr(), 8);
    }
}
