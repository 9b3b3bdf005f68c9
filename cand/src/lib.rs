//! The CAN multiplexing daemon.
//!
//! One process owns the CAN device; every other process on the host talks to
//! the bus through it. Clients register a device triple over the well-known
//! command mailbox, the daemon routes each inbound frame to the registered
//! sink for its address, acknowledges data frames on the wire, and writes
//! client-originated frames out to the driver.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod device;
pub mod error;
pub mod framelog;
pub mod router;
pub mod table;

pub use device::{CanDevice, RawCanDevice};
pub use error::{Error, Result};
pub use router::Router;
pub use table::RoutingTable;

#[cfg(test)]
pub(crate) mod testutil;
