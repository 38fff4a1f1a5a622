//! Neighbor Discovery Protocol (RFC 4861): Router/Neighbor Solicitation and
//! Advertisement, Redirect, and their options, built over
//! [`crate::icmpv6`]'s upper-layer ICMPv6 extension header.

use crate::ipv6::opt::{self, Opt};
use crate::ipv6::{eh::Eh, Addr};
use crate::{icmpv6, ipv6};

pub const OPT_SLLAO: u8 = 1;
pub const OPT_TLLAO: u8 = 2;
pub const OPT_PREFIX_INFO: u8 = 3;
pub const OPT_REDIR_HDR: u8 = 4;
pub const OPT_MTU: u8 = 5;

bitflags::bitflags! {
    /// Router Advertisement flags (RFC 4861 §4.2).
    #[derive(Default)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct RaFlags: u8 {
        const MANAGED = 0b1000_0000;
        const OTHER   = 0b0100_0000;
    }
}

bitflags::bitflags! {
    /// Neighbor Advertisement flags (RFC 4861 §4.4).
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct NaFlags: u8 {
        const ROUTER    = 0b1000_0000;
        const SOLICITED = 0b0100_0000;
        const OVERRIDE  = 0b0010_0000;
    }
}

bitflags::bitflags! {
    /// Prefix Information option flags (RFC 4861 §4.6.2).
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct PrefixFlags: u8 {
        const ON_LINK    = 0b1000_0000;
        const AUTONOMOUS = 0b0100_0000;
    }
}

/// Fields of a Router Advertisement message (the fixed part, excluding
/// options).
#[derive(Clone, Copy, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ra {
    pub cur_hop_limit: u8,
    pub flags: RaFlags,
    pub router_lifetime: u16,
    pub reachable_time: u32,
    pub retrans_timer: u32,
}

/// Fields of a Prefix Information option.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Prefix {
    pub prefix_length: u8,
    pub flags: PrefixFlags,
    pub valid_lifetime: u32,
    pub preferred_lifetime: u32,
    pub prefix: Addr,
}

// --- Router Solicitation -----------------------------------------------

pub fn append_rs(eh: &mut Eh) -> bool {
    icmpv6::append(eh, icmpv6::RS, 0) && eh.buffer.push_u32(0)
}

pub fn rs_opt_first(eh: &Eh) -> Opt {
    opt::first_at(eh, 8)
}

// --- Router Advertisement -----------------------------------------------

pub fn append_ra(eh: &mut Eh, fields: &Ra) -> bool {
    icmpv6::append(eh, icmpv6::RA, 0)
        && eh.buffer.push_u8(fields.cur_hop_limit)
        && eh.buffer.push_u8(fields.flags.bits())
        && eh.buffer.push_u16(fields.router_lifetime)
        && eh.buffer.push_u32(fields.reachable_time)
        && eh.buffer.push_u32(fields.retrans_timer)
}

pub fn ra_hop_limit(eh: &Eh) -> u8 {
    eh.buffer.peek_u8_at(4).unwrap_or(0)
}

pub fn ra_flags(eh: &Eh) -> RaFlags {
    RaFlags::from_bits_truncate(eh.buffer.peek_u8_at(5).unwrap_or(0))
}

pub fn ra_router_life(eh: &Eh) -> u16 {
    eh.buffer.peek_u16_at(6).unwrap_or(0)
}

pub fn ra_reachable_time(eh: &Eh) -> u32 {
    eh.buffer.peek_u32_at(8).unwrap_or(0)
}

pub fn ra_retrans_time(eh: &Eh) -> u32 {
    eh.buffer.peek_u32_at(12).unwrap_or(0)
}

pub fn ra_opt_first(eh: &Eh) -> Opt {
    opt::first_at(eh, 16)
}

// --- Neighbor Solicitation -----------------------------------------------

pub fn append_ns(eh: &mut Eh, target: &Addr) -> bool {
    icmpv6::append(eh, icmpv6::NS, 0) && eh.buffer.push_u32(0) && eh.buffer.push_mem(&target.0)
}

pub fn ns_target(eh: &Eh) -> Addr {
    let mut a = [0u8; 16];
    eh.buffer.peek_offset_into(8, &mut a);
    Addr(a)
}

pub fn ns_opt_first(eh: &Eh) -> Opt {
    opt::first_at(eh, 24)
}

// --- Neighbor Advertisement -----------------------------------------------

pub fn append_na(eh: &mut Eh, flags: NaFlags, target: &Addr) -> bool {
    icmpv6::append(eh, icmpv6::NA, 0)
        && eh.buffer.push_u8(flags.bits())
        && eh.buffer.push_u8(0)
        && eh.buffer.push_u16(0)
        && eh.buffer.push_mem(&target.0)
}

pub fn na_flags(eh: &Eh) -> NaFlags {
    NaFlags::from_bits_truncate(eh.buffer.peek_u8_at(4).unwrap_or(0))
}

pub fn na_target(eh: &Eh) -> Addr {
    let mut a = [0u8; 16];
    eh.buffer.peek_offset_into(8, &mut a);
    Addr(a)
}

pub fn na_opt_first(eh: &Eh) -> Opt {
    opt::first_at(eh, 24)
}

// --- Redirect -----------------------------------------------

pub fn append_redir(eh: &mut Eh, target: &Addr, dest: &Addr) -> bool {
    icmpv6::append(eh, icmpv6::REDIRECT, 0)
        && eh.buffer.push_u32(0)
        && eh.buffer.push_mem(&target.0)
        && eh.buffer.push_mem(&dest.0)
}

pub fn redir_target(eh: &Eh) -> Addr {
    let mut a = [0u8; 16];
    eh.buffer.peek_offset_into(8, &mut a);
    Addr(a)
}

pub fn redir_dest(eh: &Eh) -> Addr {
    let mut a = [0u8; 16];
    eh.buffer.peek_offset_into(24, &mut a);
    Addr(a)
}

pub fn redir_opt_first(eh: &Eh) -> Opt {
    opt::first_at(eh, 40)
}

// --- Source/Target Link-Layer Address option -----------------------------------------------

pub fn opt_append_sllao(opt: &mut Opt, lladdr: &[u8]) -> bool {
    opt.append(OPT_SLLAO, lladdr, 4, 0)
}

pub fn opt_append_tllao(opt: &mut Opt, lladdr: &[u8]) -> bool {
    opt.append(OPT_TLLAO, lladdr, 4, 0)
}

/// Positions the read cursor at the start of a link-layer address option's
/// address bytes.
pub fn opt_llao(opt: &Opt) {
    opt.buffer.read_seek(2);
}

// --- Prefix Information option -----------------------------------------------

pub fn opt_append_prefix(opt: &mut Opt, fields: &Prefix) -> bool {
    opt.append(OPT_PREFIX_INFO, &[], 4, 0)
        && opt.buffer.push_u8(fields.prefix_length)
        && opt.buffer.push_u8(fields.flags.bits())
        && opt.buffer.push_u32(fields.valid_lifetime)
        && opt.buffer.push_u32(fields.preferred_lifetime)
        && opt.buffer.push_u32(0)
        && opt.buffer.push_mem(&fields.prefix.0)
}

pub fn opt_prefix_length(opt: &Opt) -> u8 {
    opt.buffer.peek_u8_at(2).unwrap_or(0)
}

pub fn opt_prefix_flags(opt: &Opt) -> PrefixFlags {
    PrefixFlags::from_bits_truncate(opt.buffer.peek_u8_at(3).unwrap_or(0))
}

pub fn opt_prefix_valid(opt: &Opt) -> u32 {
    opt.buffer.peek_u32_at(4).unwrap_or(0)
}

pub fn opt_prefix_preferred(opt: &Opt) -> u32 {
    opt.buffer.peek_u32_at(8).unwrap_or(0)
}

pub fn opt_prefix_addr(opt: &Opt) -> Addr {
    let mut a = [0u8; 16];
    opt.buffer.peek_offset_into(16, &mut a);
    Addr(a)
}

// --- Redirected Header option -----------------------------------------------

/// Appends a Redirected Header option, truncating `data` to the option
/// buffer's remaining tailroom.
pub fn opt_append_redir(opt: &mut Opt, data: &[u8]) -> bool {
    let len = data.len().min(opt.buffer.free());
    opt.append(OPT_REDIR_HDR, &[], 4, 0)
        && opt.buffer.push_u16(0)
        && opt.buffer.push_u32(0)
        && opt.buffer.push_mem(&data[..len])
}

pub fn opt_redir_data(opt: &Opt) {
    opt.buffer.read_seek(8);
}

// --- MTU option -----------------------------------------------

pub fn opt_append_mtu(opt: &mut Opt, mtu: u32) -> bool {
    opt.append(OPT_MTU, &[], 4, 0) && opt.buffer.push_u16(0) && opt.buffer.push_u32(mtu)
}

pub fn opt_mtu(opt: &Opt) -> u32 {
    opt.buffer.peek_u32_at(4).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Frame;
    use crate::ipv6::{eh as eh_mod, Packet};

    #[test]
    fn rs_round_trip() {
        let mut data = [0u8; 256];
        let frame = Frame::new(&mut data, 0).unwrap();
        let mut pkt = Packet::new(&frame);
        pkt.clear();
        let mut eh = eh_mod::first(&pkt);
        assert!(append_rs(&mut eh));
        let eh2 = eh_mod::first(&pkt);
        assert_eq!(icmpv6::r#type(&eh2), icmpv6::RS);
    }

    #[test]
    fn ra_with_prefix_option() {
        let mut data = [0u8; 256];
        let frame = Frame::new(&mut data, 0).unwrap();
        let mut pkt = Packet::new(&frame);
        pkt.clear();
        let mut eh = eh_mod::first(&pkt);
        let fields = Ra {
            cur_hop_limit: 64,
            flags: RaFlags::MANAGED,
            router_lifetime: 1800,
            reachable_time: 0,
            retrans_timer: 0,
        };
        assert!(append_ra(&mut eh, &fields));
        let eh2 = eh_mod::first(&pkt);
        assert_eq!(ra_hop_limit(&eh2), 64);
        assert_eq!(ra_router_life(&eh2), 1800);

        let mut opt = ra_opt_first(&eh2);
        let prefix = Prefix {
            prefix_length: 64,
            flags: PrefixFlags::ON_LINK | PrefixFlags::AUTONOMOUS,
            valid_lifetime: 0xFFFF_FFFF,
            preferred_lifetime: 0xFFFF_FFFF,
            prefix: Addr([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
        };
        assert!(opt_append_prefix(&mut opt, &prefix));
        opt.finalize();
        assert_eq!(opt.r#type(), OPT_PREFIX_INFO);
        assert_eq!(opt_prefix_length(&opt), 64);
    }

    #[test]
    fn ns_na_targets_round_trip() {
        let mut data = [0u8; 256];
        let frame = Frame::new(&mut data, 0).unwrap();
        let mut pkt = Packet::new(&frame);
        pkt.clear();
        let target = Addr([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        let mut eh = eh_mod::first(&pkt);
        assert!(append_ns(&mut eh, &target));
        let eh2 = eh_mod::first(&pkt);
        assert_eq!(ns_target(&eh2), target);
    }
}
