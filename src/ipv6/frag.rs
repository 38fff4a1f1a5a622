//! IPv6 Fragment extension header: 8-octet-aligned offset, more-fragments
//! bit, reassembly id.

use crate::error::Ipv6Error;
use crate::ipv6::{self, eh::Eh};
use crate::log::warn;

/// Inserts an 8-byte Fragment EH before `eh`, assumed to be placed
/// immediately after the packet's unfragmentable prefix. `byte_offset` is
/// relative to the start of the packet and must be a multiple of 8.
/// Requires [`finalize`] once the fragment's payload has been written.
pub fn prepend(eh: &mut Eh, id: u32, byte_offset: usize) -> bool {
    if byte_offset % 8 != 0 {
        warn!("fragment offset {} not 8-aligned: {:?}", byte_offset, Ipv6Error::WrongType);
        return false;
    }
    if !eh.prepend(ipv6::FRAG_HEADER, &[0u8; 8]) {
        return false;
    }
    // Offset is stored relative to the insertion point, in 8-octet units
    // (the low 3 bits are always 0, freeing them for the M bit/reserved).
    let offset = byte_offset - eh.pkt_buffer.offsetof(eh.buffer.start());
    eh.buffer.replace_offset(2, &(offset as u16).to_be_bytes());
    eh.buffer.replace_offset(4, &id.to_be_bytes());
    true
}

/// Inserts a Fragment EH after `eh` (equivalent to `next` then `prepend`).
pub fn append(eh: &mut Eh, id: u32, byte_offset: usize) -> bool {
    eh.next();
    prepend(eh, id, byte_offset)
}

/// Sets the more-fragments bit given the complete reassembled packet length.
pub fn finalize(eh: &Eh, total_length: usize) -> bool {
    if eh.r#type() != ipv6::FRAG_HEADER {
        return false;
    }
    let off = offset(eh);
    let available = eh.pkt_buffer.write() - eh.buffer.write();
    let is_last = available >= total_length || off + available >= total_length;
    let stored = (off as u16) | (!is_last as u16);
    eh.buffer.replace_offset(2, &stored.to_be_bytes());
    true
}

/// The fragment's byte offset within the original packet.
pub fn offset(eh: &Eh) -> usize {
    let mut b = [0u8; 2];
    eh.buffer.peek_offset_into(2, &mut b);
    (u16::from_be_bytes(b) & 0xFFF8) as usize
}

/// `true` if this is the final fragment (the M bit is clear).
pub fn is_last(eh: &Eh) -> bool {
    let mut b = [0u8; 2];
    eh.buffer.peek_offset_into(2, &mut b);
    u16::from_be_bytes(b) & 1 == 0
}

/// The fragment reassembly identification, read as a full 32-bit field at
/// byte offset 4 (the reference implementation reads only the first byte
/// here, which this crate treats as a bug rather than intended behavior).
pub fn id(eh: &Eh) -> u32 {
    eh.buffer.peek_u32_at(4).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Frame;
    use crate::ipv6::{eh as eh_mod, Packet};

    #[test]
    fn prepend_then_finalize_sets_more_fragments() {
        let mut data = [0u8; 256];
        let frame = Frame::new(&mut data, 0).unwrap();
        let mut pkt = Packet::new(&frame);
        pkt.clear();
        let mut eh = eh_mod::first(&pkt);
        assert!(prepend(&mut eh, 0x1234_5678, 40));
        assert_eq!(offset(&eh), 0);
        assert_eq!(id(&eh), 0x1234_5678);
        eh.buffer.push_mem(&[0u8; 16]);
        assert!(finalize(&eh, 200));
        assert!(!is_last(&eh));
    }

    #[test]
    fn rejects_unaligned_offset() {
        let mut data = [0u8; 256];
        let frame = Frame::new(&mut data, 0).unwrap();
        let mut pkt = Packet::new(&frame);
        pkt.clear();
        let mut eh = eh_mod::first(&pkt);
        assert!(!prepend(&mut eh, 1, 41));
    }
}
