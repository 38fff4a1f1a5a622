#![no_std]

#[cfg(test)]
extern crate std;

pub mod bits;
pub mod buffer;
pub mod codec;
pub mod error;
pub mod icmpv6;
pub mod ipv6;
pub mod json;
pub mod log;
pub mod lowpan;
pub mod ndp;
