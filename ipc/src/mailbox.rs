#[cfg(test)]
mod mailbox_test;

use std::env;
use std::fmt;
use std::path::PathBuf;

/// Environment override for the directory holding the mailbox sockets. All
/// processes of one instrument must agree on it.
pub const IPC_DIR_ENV: &str = "CAND_IPC_DIR";

const DEFAULT_IPC_DIR: &str = "/tmp/cand";

/// Directory under which mailbox sockets live.
pub fn socket_dir() -> PathBuf {
    match env::var_os(IPC_DIR_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(DEFAULT_IPC_DIR),
    }
}

/// Address of one mailbox: a task id (owning endpoint) and a mailbox id
/// (role within that endpoint). The pair maps deterministically onto a
/// socket path, so a peer that knows the ids can always reach the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MailboxAddr {
    pub task_id: u32,
    pub mailbox_id: u32,
}

impl MailboxAddr {
    pub fn new(task_id: u32, mailbox_id: u32) -> Self {
        MailboxAddr {
            task_id,
            mailbox_id,
        }
    }

    pub fn socket_path(&self) -> PathBuf {
        socket_dir().join(format!("mb-{}.{}", self.task_id, self.mailbox_id))
    }
}

impl fmt::Display for MailboxAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.task_id, self.mailbox_id)
    }
}
