//! 6LoWPAN address context table (RFC 6282 §3.1): a mapping from small
//! context identifiers to IPv6 prefixes, shared by `iphc::compress`/
//! `decompress` for stateful address compression.
//!
//! An explicit value, not a process-wide singleton: callers that want
//! process-wide scope hold one behind a `&'static` or `Arc` themselves, with
//! their own external synchronization for `put`/`remove` (both take `&mut
//! self`, same as any other mutable field). `get`/`search_id`/`search_addr`
//! take `&self` and read the occupancy bitmask with a single atomic load, so
//! readers don't need that same synchronization to check what's already
//! there.

use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::Ipv6Error;
use crate::ipv6::Addr;
use crate::log::warn;

pub const MAX_CONTEXTS: usize = 16;

pub struct ContextTable {
    bitmask: AtomicU32,
    addrs: [Addr; MAX_CONTEXTS],
}

impl ContextTable {
    /// A table with slot 0 occupied by the link-local prefix `fe80::/10`.
    pub fn new() -> Self {
        let mut table = ContextTable {
            bitmask: AtomicU32::new(0),
            addrs: [Addr::UNSPECIFIED; MAX_CONTEXTS],
        };
        let mut link_local = [0u8; 16];
        link_local[0] = 0xfe;
        link_local[1] = 0x80;
        table.addrs[0] = Addr(link_local);
        table.bitmask = AtomicU32::new(1);
        table
    }

    fn occupied(&self, id: usize) -> bool {
        self.bitmask.load(Ordering::Acquire) & (1 << id) != 0
    }

    /// Inserts `addr` at `id`. Fails if `id` is out of range or already
    /// occupied.
    pub fn put(&mut self, id: usize, addr: Addr) -> bool {
        if id >= MAX_CONTEXTS || self.occupied(id) {
            warn!("context slot {} unavailable: {:?}", id, Ipv6Error::ContextFull);
            return false;
        }
        self.addrs[id] = addr;
        self.bitmask.fetch_or(1 << id, Ordering::Release);
        true
    }

    pub fn get(&self, id: usize) -> Option<Addr> {
        if id < MAX_CONTEXTS && self.occupied(id) {
            Some(self.addrs[id])
        } else {
            None
        }
    }

    /// Reverse lookup: the id whose stored address exactly equals `addr`.
    pub fn search_id(&self, addr: &Addr) -> Option<usize> {
        (0..MAX_CONTEXTS).find(|&id| self.occupied(id) && self.addrs[id] == *addr)
    }

    /// The id of the first occupied slot whose address matches `addr` over
    /// the byte range `[start, start+len)`.
    pub fn search_addr(&self, addr: &Addr, start: usize, len: usize) -> Option<usize> {
        (0..MAX_CONTEXTS).find(|&id| {
            self.occupied(id) && self.addrs[id].0[start..start + len] == addr.0[start..start + len]
        })
    }

    pub fn remove(&mut self, id: usize) {
        if id < MAX_CONTEXTS {
            self.bitmask.fetch_and(!(1 << id), Ordering::Release);
        }
    }

    pub fn clear(&mut self) {
        self.bitmask.store(0, Ordering::Release);
    }

    pub fn count(&self) -> usize {
        self.bitmask.load(Ordering::Acquire).count_ones() as usize
    }
}

impl Default for ContextTable {
    fn default() -> Self {
        ContextTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_has_link_local_slot_0() {
        let table = ContextTable::new();
        assert_eq!(table.count(), 1);
        assert_eq!(table.get(0), Some(Addr([0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0])));
    }

    #[test]
    fn put_rejects_occupied_slot() {
        let mut table = ContextTable::new();
        assert!(!table.put(0, Addr::UNSPECIFIED));
        assert!(table.put(1, Addr([0x20, 0x01, 0xd, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0])));
        assert_eq!(table.count(), 2);
    }

    #[test]
    fn remove_then_put_succeeds() {
        let mut table = ContextTable::new();
        table.remove(0);
        assert_eq!(table.count(), 0);
        assert!(table.put(0, Addr::UNSPECIFIED));
    }

    #[test]
    fn search_addr_matches_prefix_only() {
        let mut table = ContextTable::new();
        let prefix = Addr([0x20, 0x01, 0xd, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        table.put(1, prefix);
        let candidate = Addr([0x20, 0x01, 0xd, 0xb8, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(table.search_addr(&candidate, 0, 8), Some(1));
    }
}
