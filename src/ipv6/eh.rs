//! Extension-header iterator: walks and mutates the heterogeneous EH chain
//! that follows the fixed 40-byte IPv6 header.

use crate::buffer::Buffer;
use crate::ipv6::{self, Packet};

/// Returns true if the header type can be fragmented (HBH and Routing must
/// stay in the unfragmentable prefix).
pub fn can_frag(t: u8) -> bool {
    t != ipv6::HBH && t != ipv6::ROUTING
}

/// Returns true if `t` is an upper-layer protocol (consumes the rest of the
/// buffer rather than carrying its own length field).
pub fn is_upper(t: u8) -> bool {
    !matches!(
        t,
        ipv6::HBH
            | ipv6::ROUTING
            | ipv6::FRAG_HEADER
            | ipv6::ENCAP_SEC_PROTOCOL
            | ipv6::AUTH_HEADER
            | ipv6::NO_NEXT_HEADER
            | ipv6::DEST_OPTS_HEADER
            | ipv6::MOBILITY
            | ipv6::HOST_IDENT_PROTOCOL
            | ipv6::SHIM6_PROTOCOL
            | ipv6::RES1
            | ipv6::RES2
    )
}

/// A view over one extension header in the chain.
pub struct Eh<'f, 'd> {
    pub pkt_buffer: Buffer<'f, 'd>,
    pub buffer: Buffer<'f, 'd>,
    /// Absolute position of the byte holding this header's type (the
    /// preceding header's next-header field).
    pub prev: usize,
}

fn read_next_hdr(pkt: &Buffer, prev: usize) -> u8 {
    let mut b = [ipv6::INVALID];
    if pkt.read_at(prev, &mut b) {
        b[0]
    } else {
        ipv6::INVALID
    }
}

fn read_length(pkt: &Buffer, start: usize, t: u8) -> usize {
    if t == ipv6::NO_NEXT_HEADER || t == ipv6::INVALID {
        0
    } else if is_upper(t) {
        pkt.write() - start
    } else if t == ipv6::FRAG_HEADER {
        8
    } else {
        let mut b = [0u8];
        pkt.read_at(start + 1, &mut b);
        8 + 8 * b[0] as usize
    }
}

/// Returns the first extension header in the packet (immediately following
/// the fixed 40-byte header).
pub fn first<'f, 'd>(pkt: &Packet<'f, 'd>) -> Eh<'f, 'd> {
    let prev = pkt.buffer.start() + 6;
    let start = pkt.buffer.start() + ipv6::IPV6_HDR_LENGTH;
    let t = read_next_hdr(&pkt.buffer, prev);
    let len = read_length(&pkt.buffer, start, t);
    let buffer = pkt.buffer.slice(start, len).expect("packet buffer always slices");
    if !is_upper(t) {
        buffer.read_seek(2);
    }
    Eh { pkt_buffer: pkt.buffer, buffer, prev }
}

impl<'f, 'd> Eh<'f, 'd> {
    pub fn is_valid(&self) -> bool {
        self.buffer.is_valid() && self.buffer.start() < self.buffer.write()
    }

    pub fn r#type(&self) -> u8 {
        read_next_hdr(&self.pkt_buffer, self.prev)
    }

    pub fn length(&self) -> usize {
        self.buffer.length()
    }

    /// Advances to the next extension header. Returns `false` (and collapses
    /// to a zero-length terminator slice) once the chain reaches an
    /// upper-layer header.
    pub fn next(&mut self) -> bool {
        if !self.is_valid() {
            return false;
        }
        if is_upper(self.r#type()) {
            self.prev = self.buffer.start();
            self.buffer.reslice_from(&self.pkt_buffer, self.buffer.write(), 0);
            return false;
        }
        let old_type = self.r#type();
        let old_len = read_length(&self.pkt_buffer, self.buffer.start(), old_type);
        let new_start = self.buffer.start() + old_len;
        let new_type = read_next_hdr(&self.pkt_buffer, self.buffer.start());
        let new_len = read_length(&self.pkt_buffer, new_start, new_type);
        self.prev = self.buffer.start();
        self.buffer.reslice_from(&self.pkt_buffer, new_start, new_len);
        self.buffer.read_seek(2);
        true
    }

    /// Positions the read cursor past this header's type/length prologue (or
    /// does nothing for upper-layer headers) so payload can be written after
    /// it.
    pub fn reset_buffer(&self) -> Buffer<'f, 'd> {
        if is_upper(self.r#type()) {
            self.buffer.read_set(self.buffer.start());
        } else {
            self.buffer.read_set(self.buffer.start() + 2);
        }
        self.buffer
    }

    fn set_type(&self, t: u8) {
        self.pkt_buffer.replace_at(self.prev, &[t]);
    }

    fn set_length(&self, len: usize) {
        let hlen = ((len + 7) / 8).saturating_sub(1) as u8;
        self.buffer.replace_offset(1, &[hlen]);
    }

    /// Inserts a new extension header of `new_type` carrying `data` before
    /// the header this view currently points at.
    pub fn prepend(&mut self, new_type: u8, data: &[u8]) -> bool {
        if !self.buffer.is_valid() {
            return false;
        }
        if is_upper(new_type) {
            if self.r#type() != ipv6::NO_NEXT_HEADER {
                return false;
            }
            if self.buffer.tailroom() < data.len() {
                return false;
            }
            self.set_type(new_type);
            self.buffer.reslice_from(&self.pkt_buffer, self.buffer.start(), 0);
            self.buffer.push_mem(data)
        } else {
            if self.buffer.tailroom() < data.len() + 2 {
                return false;
            }
            let next = self.r#type();
            self.set_type(new_type);
            self.buffer.reslice_from(&self.pkt_buffer, self.buffer.start(), 0);
            if !self.buffer.reserve(data.len() + 2) {
                return false;
            }
            self.buffer.replace_offset(0, &[next]);
            self.buffer.replace_offset(2, data);
            self.buffer.read_seek(2);
            true
        }
    }

    /// Inserts a new extension header of `new_type` after the header this
    /// view currently points at.
    pub fn append(&mut self, new_type: u8, data: &[u8]) -> bool {
        if is_upper(self.r#type()) {
            return false;
        }
        self.next();
        self.prepend(new_type, data)
    }

    /// Pads a non-upper-layer EH up to a multiple of 8 bytes and patches its
    /// `hdr-ext-len` field.
    pub fn finalize(&self) {
        if !is_upper(self.r#type()) {
            let end = self.buffer.length();
            let pad = (end + 7) / 8 * 8;
            if pad > end {
                self.buffer.reserve(pad - end);
            }
            self.set_length(self.buffer.length());
        }
    }
}

/// Walks the unfragmentable prefix (HBH, Routing) of `eh`, returning once the
/// current header can be fragmented (or the chain ends).
pub fn skip_unfragmentable(eh: &mut Eh) {
    while eh.is_valid() && !can_frag(eh.r#type()) {
        if !eh.next() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Frame;

    #[test]
    fn prepend_upper_layer_then_first_sees_it() {
        let mut data = [0u8; 256];
        let frame = Frame::new(&mut data, 0).unwrap();
        let mut pkt = Packet::new(&frame);
        pkt.clear();
        let mut eh = first(&pkt);
        assert!(eh.prepend(ipv6::ICMPV6, &[1, 2, 3, 4]));
        let eh2 = first(&pkt);
        assert_eq!(eh2.r#type(), ipv6::ICMPV6);
        assert_eq!(eh2.length(), 4);
    }

    #[test]
    fn append_on_upper_layer_fails() {
        let mut data = [0u8; 256];
        let frame = Frame::new(&mut data, 0).unwrap();
        let mut pkt = Packet::new(&frame);
        pkt.clear();
        let mut eh = first(&pkt);
        assert!(eh.prepend(ipv6::ICMPV6, &[0, 0]));
        let mut eh2 = first(&pkt);
        assert!(!eh2.append(ipv6::TCP, &[1, 2]));
    }

    #[test]
    fn finalize_non_upper_rounds_to_multiple_of_8() {
        let mut data = [0u8; 256];
        let frame = Frame::new(&mut data, 0).unwrap();
        let mut pkt = Packet::new(&frame);
        pkt.clear();
        let mut eh = first(&pkt);
        assert!(eh.prepend(ipv6::DEST_OPTS_HEADER, &[9, 9, 9]));
        // `eh` itself now views the freshly inserted header: its `.length()`
        // already reflects the real insert, unlike a `first(&pkt)` re-derivation,
        // which would read back the not-yet-patched `hdr-ext-len` byte as zero.
        eh.finalize();
        assert_eq!(eh.length() % 8, 0);
    }
}
