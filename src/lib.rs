//! Client side of the CAN multiplexing daemon.
//!
//! A process opens one [`CanChannel`] per device function it talks to. The
//! channel registers its (slot, fn_type, fn_count) triple with the daemon,
//! after which command responses and streaming data arrive on the channel's
//! own mailboxes while transmits funnel through one process-wide conduit to
//! the daemon. [`Reliability`] wraps a channel with the bounded-retry
//! request call the device HALs are built on.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

// re-export sub-crates
pub use ipc;
pub use wire;

pub mod channel;
pub mod conduit;
pub mod error;
pub mod reliability;

pub use channel::{CanChannel, DEFAULT_REQUEST_TIMEOUT};
pub use error::{Error, Result};
pub use reliability::{Reliability, MAX_NO_RETRIES};

#[macro_use]
extern crate lazy_static;

#[cfg(test)]
pub(crate) mod testutil;
