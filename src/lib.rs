#![no_std]
#[cfg(any(feature = "std", test))]
extern crate std;

mod analog;
mod duty;
mod hal;
mod protocol;

pub use analog::*;
pub use duty::*;
pub use hal::*;
pub use protocol::*;

#[cfg(feature = "transmitter")]
pub mod transmitter;
#[cfg(feature = "receiver")]
pub mod receiver;
#[cfg(feature = "embedded")]
pub mod embedded;
#[cfg(feature = "host")]
pub mod host;

use thiserror::Error;

/**
    construction-time misconfiguration of a core component

    unlike protocol and transport failures, which the session loops absorb
    and count, this one surfaces to the caller
*/
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid configuration: {0}")]
pub struct InvalidConfig(pub &'static str);
