//! 6LoWPAN IPHC header compression (RFC 6282 §3.1). No NHC: extension
//! headers and the upper-layer payload are always carried inline after the
//! compressed IPv6 header.

use crate::ipv6::{self, eh, Addr, Packet};
use crate::lowpan::context::ContextTable;
use crate::lowpan::link::LinkFrame;

const DISPATCH: u8 = 0b0110_0000;
const DISPATCH_MASK: u8 = 0b1110_0000;

/// "Not A LoWPAN frame" dispatch pattern (RFC 4944 §5.1): the first two bits
/// of the first sub-header byte both zero.
const NALP_MASK: u8 = 0b1100_0000;
const NALP: u8 = 0b0000_0000;

const TF_MASK: u8 = 0b0001_1000;
const NH_BIT: u8 = 0b0000_0100;
const HLIM_MASK: u8 = 0b0000_0011;

const SAC_BIT: u8 = 0b0100_0000;
const SAM_MASK: u8 = 0b0011_0000;
const M_BIT: u8 = 0b0000_1000;
const DAC_BIT: u8 = 0b0000_0100;
const DAM_MASK: u8 = 0b0000_0011;

fn is_elided_iid(addr: &Addr, frame_addr: Option<&[u8]>, frame_len: usize) -> bool {
    match frame_addr {
        Some(bytes) if frame_len > 0 => addr.0[16 - frame_len..] == bytes[..frame_len],
        _ => false,
    }
}

fn has_embedded_mac_iid(addr: &Addr) -> bool {
    addr.0[8] == 0x00 && addr.0[9] == 0x00 && addr.0[10] == 0xff && addr.0[11] == 0xfe && addr.0[12] == 0x00
}

/// Compresses as much of `pkt` as fits in `frame`'s tailroom. Returns the
/// number of packet bytes now covered by `pkt.frags` (i.e. consumed).
pub fn compress<'f, 'd>(ctx: &ContextTable, pkt: &mut Packet, frame: &impl LinkFrame<'f, 'd>) -> usize {
    let len = pkt.length();
    if pkt.frags.next_zero(0) >= (len + 7) / 8 {
        return len;
    }

    let out = frame.reset_buffer();

    let tc = pkt.traffic_class();
    let fl = pkt.flow_label();
    let dscp = tc & 0x3F;
    let ecn = tc >> 6;

    let tf = match (dscp != 0, fl != 0) {
        (false, false) => 0b11,
        (false, true) => 0b01,
        (true, false) => 0b10,
        (true, true) => 0b00,
    };

    let mut b0 = DISPATCH | (tf << 3) | NH_BIT;
    let hlim = pkt.hop_limit();
    let hlim_mode = match hlim {
        1 => 0b01,
        64 => 0b10,
        255 => 0b11,
        _ => 0b00,
    };
    b0 |= hlim_mode;
    out.push_u8(b0);

    let src = pkt.src();
    let dest = pkt.dest();

    let (sac, sam, src_bytes): (bool, u8, &[u8]) = addressing_mode_unicast(ctx, &src, frame.src_addr(), frame.length_src_addr());
    let (dac, dam, dest_bytes): (bool, u8, &[u8]);
    let mut dest_multicast_bytes = [0u8; 16];
    if dest.is_multicast() {
        let (d, m, db) = addressing_mode_multicast(ctx, &dest, &mut dest_multicast_bytes);
        dac = d;
        dam = m;
        dest_bytes = db;
    } else {
        let (d, m, db) = addressing_mode_unicast(ctx, &dest, frame.dest_addr(), frame.length_dest_addr());
        dac = d;
        dam = m;
        dest_bytes = db;
    }

    let b1 = (if sac { SAC_BIT } else { 0 }) | (sam << 4) | (if dest.is_multicast() { M_BIT } else { 0 }) | (if dac { DAC_BIT } else { 0 }) | dam;
    out.push_u8(b1);

    if dscp != 0 || fl != 0 {
        let b = ((ecn & 0x3) << 6) | dscp;
        out.push_u8(b);
        if fl != 0 {
            let fl_bytes = fl.to_be_bytes();
            out.push_mem(&[fl_bytes[1] & 0x0F, fl_bytes[2], fl_bytes[3]]);
        }
    }
    out.push_u8(pkt.next_header());
    if hlim_mode == 0 {
        out.push_u8(hlim);
    }
    out.push_mem(src_bytes);
    out.push_mem(dest_bytes);

    pkt.frags.set_many(0, 5);

    let mut eh_cursor = eh::first(pkt);
    eh::skip_unfragmentable(&mut eh_cursor);

    let next_frag = pkt.frags.next_zero(0);
    let gap = pkt.frags.next_one(next_frag) < pkt.frags.end();
    let mut fragged = false;
    if next_frag * 8 < len || gap {
        if crate::ipv6::frag::prepend(&mut eh_cursor, pkt.frag_id, next_frag * 8) {
            fragged = true;
        }
    }

    // A prepended Fragment EH shifts every byte from `next_frag * 8` onward
    // to the right by its own 8-octet width.
    let shift = if fragged { 8 } else { 0 };
    let mut copied = 0usize;
    let mut group = next_frag;
    while group * 8 < len && out.free() >= 8 {
        let start = group * 8;
        let chunk = (len - start).min(8);
        let mut buf = [0u8; 8];
        pkt.buffer.peek_into(pkt.buffer.start() + start + shift, &mut buf[..chunk]);
        if !out.push_mem(&buf[..chunk]) {
            break;
        }
        pkt.frags.set(group);
        copied += chunk;
        group += 1;
    }

    if fragged {
        crate::ipv6::frag::finalize(&eh_cursor, len);
    }
    pkt.finalize();

    let ones = pkt.frags.count();
    let mut consumed = ones * 8;
    if len % 8 != 0 && pkt.frags.get((len - 1) / 8) {
        consumed -= 8 - (len % 8);
    }
    let _ = copied;
    consumed
}

fn addressing_mode_unicast<'a>(
    ctx: &ContextTable,
    addr: &'a Addr,
    frame_addr: Option<&[u8]>,
    frame_len: usize,
) -> (bool, u8, &'a [u8]) {
    if addr.is_unspecified() {
        return (true, 0b00, &[]);
    }
    let found = ctx.search_addr(addr, 0, 8);
    // Context id 0, the reserved link-local slot, is reported stateless even
    // though it came from a context match; no match at all means no IID
    // compression is possible either, so the address goes inline in full.
    let (sac, sam) = match found {
        None => (false, 0b00),
        Some(0) => (false, if has_embedded_mac_iid(addr) { 0b10 } else { 0b01 }),
        Some(_) => (true, if has_embedded_mac_iid(addr) { 0b10 } else { 0b01 }),
    };

    if is_elided_iid(addr, frame_addr, frame_len) {
        return (sac, 0b11, &[]);
    }
    match sam {
        0b10 => (sac, 0b10, &addr.0[14..16]),
        0b01 => (sac, 0b01, &addr.0[8..16]),
        _ => (sac, 0b00, &addr.0[..]),
    }
}

fn addressing_mode_multicast<'a>(ctx: &ContextTable, addr: &Addr, scratch: &'a mut [u8; 16]) -> (bool, u8, &'a [u8]) {
    let rest_zero = |range: core::ops::Range<usize>| addr.0[range].iter().all(|&b| b == 0);

    if rest_zero(1..14) {
        scratch[0] = addr.0[15];
        return (false, 0b11, &scratch[..1]);
    }
    if rest_zero(2..12) {
        scratch[..4].copy_from_slice(&addr.0[12..16]);
        return (false, 0b10, &scratch[..4]);
    }
    if rest_zero(2..10) {
        scratch[..6].copy_from_slice(&addr.0[10..16]);
        return (false, 0b01, &scratch[..6]);
    }
    if let Some(_id) = ctx.search_addr(addr, 3, 8) {
        scratch[0] = addr.0[1];
        scratch[1] = addr.0[2];
        scratch[2..6].copy_from_slice(&addr.0[11..15]);
        scratch[6..8].copy_from_slice(&addr.0[14..16]);
        return (true, 0b01, &scratch[..8]);
    }
    scratch.copy_from_slice(&addr.0);
    (false, 0b00, &scratch[..])
}

/// Walks `buf`'s chain of 6LoWPAN sub-headers looking for the IPHC dispatch
/// header, skipping any that precede it, and leaves the read cursor
/// positioned at it on success. Grounded on `lowpan_first`/`lowpan_next`/
/// `lowpan_is_iphc` (`original_source/net/lowpan.c`): that walk stops at a
/// header classified NALP (not a 6LoWPAN frame at all) and otherwise
/// remembers the last IPHC-typed header it passed. This crate implements
/// only the IPHC dispatch type — no Mesh Addressing, ESC, or RFC 4944
/// fragmentation headers — so, exactly as in the original (where only the
/// IPHC branch of its length function returns a nonzero value and every
/// other header type ends the walk on the next step), a header that is
/// neither NALP nor IPHC can't be skipped past here either.
fn find_iphc(buf: &crate::buffer::Buffer) -> bool {
    let mut b = [0u8; 1];
    if !buf.peek_into(buf.read(), &mut b) {
        return false;
    }
    if b[0] & NALP_MASK == NALP {
        return false;
    }
    b[0] & DISPATCH_MASK == DISPATCH
}

/// Reconstructs an IPv6 packet from a compressed IPHC header carried in
/// `frame`. Not incremental — reassembling fragmented packets across calls
/// is the caller's responsibility (see the fragment bitmap on `pkt`).
pub fn decompress<'f, 'd>(ctx: &ContextTable, pkt: &mut Packet, frame: &impl LinkFrame<'f, 'd>) -> bool {
    let inp = frame.reset_buffer();
    if !find_iphc(&inp) {
        return false;
    }
    let mut b = [0u8; 1];
    if !inp.pop(&mut b) {
        return false;
    }
    let b0 = b[0];
    let tf = (b0 & TF_MASK) >> 3;
    let nh_elided = b0 & NH_BIT != 0;
    let hlim_mode = b0 & HLIM_MASK;

    if !inp.pop(&mut b) {
        return false;
    }
    let b1 = b[0];
    let sac = b1 & SAC_BIT != 0;
    let sam = (b1 & SAM_MASK) >> 4;
    let multicast = b1 & M_BIT != 0;
    let dac = b1 & DAC_BIT != 0;
    let dam = b1 & DAM_MASK;

    pkt.clear();

    let (mut dscp, mut ecn, mut fl) = (0u8, 0u8, 0u32);
    match tf {
        0b00 => {
            let mut tb = [0u8; 4];
            if !inp.pop(&mut tb[..1]) || !inp.pop(&mut tb[1..3]) {
                return false;
            }
            ecn = tb[0] >> 6;
            dscp = tb[0] & 0x3F;
            fl = ((tb[1] as u32 & 0x0F) << 16) | ((tb[2] as u32) << 8) | tb[3] as u32;
        }
        0b01 => {
            let mut tb = [0u8; 3];
            if !inp.pop(&mut tb) {
                return false;
            }
            fl = ((tb[0] as u32 & 0x0F) << 16) | ((tb[1] as u32) << 8) | tb[2] as u32;
        }
        0b10 => {
            if !inp.pop(&mut b) {
                return false;
            }
            ecn = b[0] >> 6;
            dscp = b[0] & 0x3F;
        }
        _ => {}
    }
    pkt.set_traffic_class((ecn << 6) | dscp);
    pkt.set_flow_label(fl);

    let next_header = if nh_elided {
        if !inp.pop(&mut b) {
            return false;
        }
        b[0]
    } else {
        ipv6::NO_NEXT_HEADER
    };
    pkt.set_next_header(next_header);

    let hop_limit = match hlim_mode {
        0b01 => 1,
        0b10 => 64,
        0b11 => 255,
        _ => {
            if !inp.pop(&mut b) {
                return false;
            }
            b[0]
        }
    };
    pkt.set_hop_limit(hop_limit);

    let src = read_unicast(&inp, ctx, sac, sam, frame.src_addr(), frame.length_src_addr());
    pkt.set_src(&src);

    let dest = if multicast {
        read_multicast(&inp, ctx, dac, dam)
    } else {
        read_unicast(&inp, ctx, dac, dam, frame.dest_addr(), frame.length_dest_addr())
    };
    pkt.set_dest(&dest);

    let mut buf = [0u8; ipv6::IPV6_MTU];
    let mut n = 0;
    while n < buf.len() {
        if !inp.pop(&mut buf[n..n + 1]) {
            break;
        }
        n += 1;
    }
    pkt.buffer.push_mem(&buf[..n]);
    pkt.finalize();

    let words = 5 + (pkt.length() + 7) / 8;
    pkt.frags.set_many(0, words);
    true
}

fn read_unicast(inp: &crate::buffer::Buffer, ctx: &ContextTable, stateful: bool, mode: u8, frame_addr: Option<&[u8]>, frame_len: usize) -> Addr {
    match mode {
        0b00 => Addr::UNSPECIFIED,
        0b01 => {
            let mut a = [0u8; 16];
            inp.pop(&mut a[8..16]);
            fill_prefix(&mut a, ctx, stateful);
            Addr(a)
        }
        0b10 => {
            let mut a = [0u8; 16];
            a[11] = 0xff;
            a[12] = 0xfe;
            inp.pop(&mut a[14..16]);
            fill_prefix(&mut a, ctx, stateful);
            Addr(a)
        }
        _ => {
            let mut a = [0u8; 16];
            if let (Some(bytes), true) = (frame_addr, frame_len > 0) {
                a[16 - frame_len..].copy_from_slice(&bytes[..frame_len]);
            }
            fill_prefix(&mut a, ctx, stateful);
            Addr(a)
        }
    }
}

fn fill_prefix(a: &mut [u8; 16], ctx: &ContextTable, stateful: bool) {
    if stateful {
        if let Some(prefix) = ctx.get(0) {
            a[0..8].copy_from_slice(&prefix.0[0..8]);
            return;
        }
    }
    a[0] = 0xfe;
    a[1] = 0x80;
}

fn read_multicast(inp: &crate::buffer::Buffer, ctx: &ContextTable, stateful: bool, mode: u8) -> Addr {
    let mut a = [0u8; 16];
    a[0] = 0xff;
    match mode {
        0b11 => {
            a[1] = 0x02;
            inp.pop(&mut a[15..16]);
        }
        0b10 => {
            inp.pop(&mut a[12..16]);
        }
        0b01 if !stateful => {
            inp.pop(&mut a[10..16]);
        }
        0b01 => {
            let mut b = [0u8; 8];
            inp.pop(&mut b);
            a[1] = b[0];
            a[2] = b[1];
            a[11..15].copy_from_slice(&b[2..6]);
            a[14..16].copy_from_slice(&b[6..8]);
            if let Some(prefix) = ctx.get(0) {
                a[3] = prefix.0[8];
            }
        }
        _ => {
            inp.pop(&mut a);
        }
    }
    Addr(a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Frame;
    use crate::lowpan::link::Lowpan6Frame;

    #[test]
    fn compress_then_decompress_round_trips_simple_packet() {
        let mut pkt_data = [0u8; 256];
        let pkt_frame = Frame::new(&mut pkt_data, 0).unwrap();
        let mut pkt = Packet::new(&pkt_frame);
        pkt.clear();
        pkt.set_hop_limit(64);
        pkt.set_src(&Addr([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]));
        pkt.set_dest(&Addr([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]));
        pkt.buffer.push_mem(&[0xAA; 16]);
        pkt.finalize();

        let ctx = ContextTable::new();
        let mut link_data = [0u8; 128];
        let link_frame = Frame::new(&mut link_data, 0).unwrap();
        let link = Lowpan6Frame::new(None, None, link_frame.root());

        let consumed = compress(&ctx, &mut pkt, &link);
        assert!(consumed > 0);

        let mut out_data = [0u8; 256];
        let out_frame = Frame::new(&mut out_data, 0).unwrap();
        let mut out_pkt = Packet::new(&out_frame);
        assert!(decompress(&ctx, &mut out_pkt, &link));
        assert_eq!(out_pkt.hop_limit(), 64);
        assert_eq!(out_pkt.src(), pkt.src());
        assert_eq!(out_pkt.dest(), pkt.dest());
    }
}
