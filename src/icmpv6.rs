//! ICMPv6 (RFC 4443) messages built over an [`crate::ipv6::eh::Eh`] upper-layer
//! extension header: error reports and echo request/reply.

use crate::ipv6::{self, eh::Eh};

pub const DEST_UNREACH: u8 = 1;
pub const PACKET_TOO_BIG: u8 = 2;
pub const TIME_EXCEEDED: u8 = 3;
pub const PARAM_PROBLEM: u8 = 4;
pub const ERROR_PRIV1: u8 = 100;
pub const ERROR_PRIV2: u8 = 101;

pub const ECHO_REQUEST: u8 = 128;
pub const ECHO_REPLY: u8 = 129;
pub const RS: u8 = 133;
pub const RA: u8 = 134;
pub const NS: u8 = 135;
pub const NA: u8 = 136;
pub const REDIRECT: u8 = 137;
pub const INFO_PRIV1: u8 = 200;
pub const INFO_PRIV2: u8 = 201;

pub const DEST_UNREACH_NO_ROUTE: u8 = 0;
pub const DEST_UNREACH_ADMIN: u8 = 1;
pub const DEST_UNREACH_SCOPE: u8 = 2;
pub const DEST_UNREACH_NO_ADDR: u8 = 3;
pub const DEST_UNREACH_NO_PORT: u8 = 4;
pub const DEST_UNREACH_SRC_ADDR: u8 = 5;
pub const DEST_UNREACH_REJECT_ROUTE: u8 = 6;

pub const TE_HOP_LIMIT_EXCEEDED: u8 = 0;
pub const TE_FRAG_REASSEMBLY_EXCEEDED: u8 = 1;

pub const PARAM_PROBLEM_HEADER_FIELD: u8 = 0;
pub const PARAM_PROBLEM_NEXT_HEADER: u8 = 1;
pub const PARAM_PROBLEM_IPV6_OPT: u8 = 2;

pub const DEFAULT_CODE: u8 = 0;

pub fn is_icmpv6(eh: &Eh) -> bool {
    eh.r#type() == ipv6::ICMPV6
}

pub fn r#type(eh: &Eh) -> u8 {
    eh.buffer.peek_u8_at(0).unwrap_or(0)
}

pub fn code(eh: &Eh) -> u8 {
    eh.buffer.peek_u8_at(1).unwrap_or(0)
}

pub fn checksum(eh: &Eh) -> u16 {
    let mut b = [0u8; 2];
    eh.buffer.peek_offset_into(2, &mut b);
    u16::from_be_bytes(b)
}

/// Appends an ICMPv6 message (type/code/zero-checksum) after `eh`.
pub fn append(eh: &mut Eh, r#type: u8, code: u8) -> bool {
    eh.append(ipv6::ICMPV6, &[]) && eh.buffer.push_u8(r#type) && eh.buffer.push_u8(code) && eh.buffer.push_u16(0)
}

/// Appends an ICMPv6 error message (type/code/4-byte param/as much of the
/// invoking packet as fits in the remaining tailroom).
pub fn append_error(eh: &mut Eh, r#type: u8, code: u8, param: u32, data: &[u8]) -> bool {
    if !append(eh, r#type, code) {
        return false;
    }
    if !eh.buffer.push_u32(param) {
        return false;
    }
    let len = data.len().min(eh.buffer.free());
    eh.buffer.push_mem(&data[..len])
}

pub fn error_param(eh: &Eh) -> u32 {
    eh.buffer.peek_u32_at(4).unwrap_or(0)
}

/// Appends an ICMPv6 echo request after `eh`.
pub fn append_echo_req(eh: &mut Eh, id: u16, seqnum: u16, data: &[u8]) -> bool {
    append(eh, ECHO_REQUEST, 0)
        && eh.buffer.push_u16(id)
        && eh.buffer.push_u16(seqnum)
        && eh.buffer.push_mem(data)
}

/// Appends an ICMPv6 echo reply after `eh`, copying `orig`'s identifier,
/// sequence number, and entire data payload.
pub fn append_echo_resp(eh: &mut Eh, orig: &Eh) -> bool {
    const ECHO_HDR_LEN: usize = 8; // type + code + checksum + id + seqnum
    let mut data = [0u8; ipv6::IPV6_MTU];
    let len = orig.length().saturating_sub(ECHO_HDR_LEN).min(data.len());
    orig.buffer.peek_offset_into(ECHO_HDR_LEN, &mut data[..len]);
    append(eh, ECHO_REPLY, 0)
        && eh.buffer.push_u16(echo_id(orig))
        && eh.buffer.push_u16(echo_seqnum(orig))
        && eh.buffer.push_mem(&data[..len])
}

pub fn echo_id(eh: &Eh) -> u16 {
    let mut b = [0u8; 2];
    eh.buffer.peek_offset_into(4, &mut b);
    u16::from_be_bytes(b)
}

pub fn echo_seqnum(eh: &Eh) -> u16 {
    let mut b = [0u8; 2];
    eh.buffer.peek_offset_into(6, &mut b);
    u16::from_be_bytes(b)
}

/// Positions the read cursor at the start of an echo message's data.
pub fn echo_data(eh: &Eh) {
    eh.buffer.read_seek(8);
}

/// Computes the checksum over the pseudo-header and ICMPv6 message, assuming
/// the checksum field currently reads zero.
pub fn calc_checksum(eh: &Eh, pkt: &ipv6::Packet) -> u16 {
    let mut data = [0u8; ipv6::IPV6_MTU];
    let len = eh.length().min(data.len());
    eh.buffer.peek_into(eh.buffer.start(), &mut data[..len]);
    let sum = pkt.pseudo_checksum(len as u32, ipv6::ICMPV6, &data[..len]);
    let complement = !(sum as u16);
    if complement == 0 {
        0xFFFF
    } else {
        complement
    }
}

pub fn set_checksum(eh: &Eh, checksum: u16) {
    eh.buffer.replace_offset(2, &checksum.to_be_bytes());
}

/// Finalizes the enclosing packet and computes/writes this message's
/// checksum.
pub fn finalize(eh: &Eh, pkt: &ipv6::Packet) {
    pkt.finalize();
    set_checksum(eh, 0);
    set_checksum(eh, calc_checksum(eh, pkt));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Frame;
    use crate::ipv6::{eh as eh_mod, Packet};

    #[test]
    fn echo_request_round_trips_id_and_data() {
        let mut data = [0u8; 256];
        let frame = Frame::new(&mut data, 0).unwrap();
        let mut pkt = Packet::new(&frame);
        pkt.clear();
        let mut eh = eh_mod::first(&pkt);
        assert!(append_echo_req(&mut eh, 0xABCD, 7, &[1, 2, 3]));
        let eh2 = eh_mod::first(&pkt);
        assert_eq!(r#type(&eh2), ECHO_REQUEST);
        assert_eq!(echo_id(&eh2), 0xABCD);
        assert_eq!(echo_seqnum(&eh2), 7);
    }

    #[test]
    fn echo_reply_copies_id_seqnum_and_data_verbatim() {
        let mut req_data = [0u8; 256];
        let req_frame = Frame::new(&mut req_data, 0).unwrap();
        let mut req_pkt = Packet::new(&req_frame);
        req_pkt.clear();
        let mut req_eh = eh_mod::first(&req_pkt);
        assert!(append_echo_req(&mut req_eh, 0x1234, 42, &[7, 8, 9, 10]));
        let req_eh2 = eh_mod::first(&req_pkt);

        let mut resp_data = [0u8; 256];
        let resp_frame = Frame::new(&mut resp_data, 0).unwrap();
        let mut resp_pkt = Packet::new(&resp_frame);
        resp_pkt.clear();
        let mut resp_eh = eh_mod::first(&resp_pkt);
        assert!(append_echo_resp(&mut resp_eh, &req_eh2));

        let resp_eh2 = eh_mod::first(&resp_pkt);
        assert_eq!(r#type(&resp_eh2), ECHO_REPLY);
        assert_eq!(echo_id(&resp_eh2), 0x1234);
        assert_eq!(echo_seqnum(&resp_eh2), 42);

        echo_data(&req_eh2);
        let mut req_payload = [0u8; 4];
        req_eh2.buffer.pop(&mut req_payload);

        echo_data(&resp_eh2);
        let mut resp_payload = [0u8; 4];
        resp_eh2.buffer.pop(&mut resp_payload);

        assert_eq!(resp_payload, req_payload);
        assert_eq!(resp_payload, [7, 8, 9, 10]);
    }

    #[test]
    fn finalize_produces_nonzero_checksum_for_nonempty_message() {
        let mut data = [0u8; 256];
        let frame = Frame::new(&mut data, 0).unwrap();
        let mut pkt = Packet::new(&frame);
        pkt.clear();
        pkt.set_src(&ipv6::Addr([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]));
        pkt.set_dest(&ipv6::Addr([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]));
        let mut eh = eh_mod::first(&pkt);
        assert!(append_echo_req(&mut eh, 1, 1, &[9, 9]));
        let eh2 = eh_mod::first(&pkt);
        finalize(&eh2, &pkt);
        assert_ne!(checksum(&eh2), 0);
    }
}
