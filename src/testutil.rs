use std::path::PathBuf;
use std::sync::Mutex;

use ipc::{MailboxAddr, MailboxReceiver};
use wire::record::{CMD_TX_MAILBOX_ID, CMD_TX_TASK_ID};

lazy_static! {
    static ref TEST_DIR: PathBuf = {
        let dir = std::env::temp_dir().join(format!("canbus-test-{}", std::process::id()));
        std::env::set_var(ipc::mailbox::IPC_DIR_ENV, &dir);
        dir
    };
    // The daemon mailbox and the conduit are process-wide; tests touching
    // them must not interleave.
    static ref DAEMON_LOCK: Mutex<()> = Mutex::new(());
}

pub(crate) fn init_ipc_dir() {
    lazy_static::initialize(&TEST_DIR);
}

pub(crate) fn daemon_lock() -> std::sync::MutexGuard<'static, ()> {
    init_ipc_dir();
    DAEMON_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Claims the daemon's well-known command mailbox so a test can stand in
/// for the daemon and observe what clients send.
pub(crate) fn bind_daemon_mailbox() -> MailboxReceiver {
    init_ipc_dir();
    MailboxReceiver::bind(MailboxAddr::new(CMD_TX_TASK_ID, CMD_TX_MAILBOX_ID))
        .expect("binding fake daemon mailbox")
}
