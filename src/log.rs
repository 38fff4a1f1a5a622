//! Logging facade. Re-exports the `log` crate's level macros by default;
//! building with the `defmt` feature instead derives `defmt::Format` on the
//! wire-level value types and routes through `defmt`'s macros. Call sites use
//! `crate::log::{debug, warn, ...}` so they don't need to know which backend
//! is active.

#[cfg(not(feature = "defmt"))]
pub use log::{debug, error, info, trace, warn};

#[cfg(feature = "defmt")]
pub use defmt::{debug, error, info, trace, warn};
