//! Internal diagnostic macros.
//!
//! With the `defmt` feature the crate logs through `defmt`; otherwise it goes
//! through the `log` facade so host builds and tests can attach any logger.
//! Diagnostics never touch the CLI output channel.

#![allow(unused_imports)]

#[cfg(feature = "defmt")]
pub(crate) use defmt::{debug, error, info, trace, warn};

#[cfg(not(feature = "defmt"))]
pub(crate) use log::{debug, error, info, trace, warn};
