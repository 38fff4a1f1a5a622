//! Diagnostic-only error enums. Never threaded through the public
//! `bool`/`Option` sentinel API — they exist purely so `crate::log::warn!`
//! has something structured to format at the point of failure.

/// Protocol-level failures above [`crate::buffer::BufferError`]: wrong
/// extension-header/option type for the requested operation, or a full
/// [`crate::lowpan::context::ContextTable`] slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ipv6Error {
    WrongType,
    ContextFull,
}
