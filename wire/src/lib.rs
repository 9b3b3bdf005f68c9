//! Wire-level codecs for the CAN multiplexing daemon and its clients.
//!
//! Everything on the shared CAN bus is addressed by a 16-bit header encoding
//! the (slot, function type, function count) triple plus the fragment and
//! data-type bits. Payloads larger than a single frame travel as a fragment
//! sequence with a trailing CRC-16. This crate holds those codecs, the
//! client/daemon record formats, and the protocol constants; it performs no
//! I/O of its own.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod addr;
pub mod crc16;
pub mod error;
pub mod fragment;
pub mod frame;
pub mod func;
pub mod record;

pub use addr::DeviceAddr;
pub use error::{Error, Result};
pub use fragment::{fragment_payload, Reassembler};
pub use record::{CandCmd, CandResp};
