//! Reliable record-oriented channels between the CAN daemon and its client
//! processes.
//!
//! A mailbox is named by a `(task_id, mailbox_id)` pair that both sides can
//! derive independently, and maps onto a Unix datagram socket bound under a
//! shared runtime directory. Datagrams give the channel its contract for
//! free: one `send` of n bytes arrives as exactly one record of n bytes, in
//! order, never split or merged.

#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod channel;
pub mod error;
pub mod mailbox;

pub use channel::{MailboxReceiver, MailboxSender, SendMode, MAX_RECORD_LEN};
pub use error::{Error, Result};
pub use mailbox::MailboxAddr;
