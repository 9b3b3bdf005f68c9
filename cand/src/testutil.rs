use std::path::PathBuf;

use lazy_static::lazy_static;
use ipc::{MailboxAddr, MailboxReceiver, MailboxSender, SendMode};

use crate::table::SinkPair;

lazy_static! {
    static ref TEST_DIR: PathBuf = {
        let dir = std::env::temp_dir().join(format!("cand-test-{}", std::process::id()));
        std::env::set_var(ipc::mailbox::IPC_DIR_ENV, &dir);
        dir
    };
}

/// Points the mailbox directory at a per-process scratch location before any
/// socket is created.
pub(crate) fn init_ipc_dir() {
    lazy_static::initialize(&TEST_DIR);
}

/// A bound client-side mailbox.
pub(crate) fn bind_mailbox(task_id: u32, mailbox_id: u32) -> MailboxReceiver {
    init_ipc_dir();
    MailboxReceiver::bind(MailboxAddr::new(task_id, mailbox_id)).expect("binding test mailbox")
}

/// A bound client-side mailbox plus a connected daemon-side sink for it.
pub(crate) fn mailbox_pair(task_id: u32, mailbox_id: u32) -> (MailboxReceiver, MailboxSender) {
    init_ipc_dir();
    let rx = MailboxReceiver::bind(MailboxAddr::new(task_id, mailbox_id))
        .expect("binding test mailbox");
    let tx =
        MailboxSender::connect(rx.addr(), SendMode::Nonblocking).expect("connecting test sink");
    (rx, tx)
}

/// Sinks for a registration entry, returning the receive halves so a test
/// can observe what the daemon routes.
pub(crate) fn sink_pair(
    task_id: u32,
    with_stream: bool,
) -> (SinkPair, MailboxReceiver, Option<MailboxReceiver>) {
    let (cmd_rx, cmd_tx) = mailbox_pair(task_id, wire::record::CMD_RESP_MAILBOX_ID);
    let (stream_rx, stream_tx) = if with_stream {
        let (rx, tx) = mailbox_pair(task_id, wire::record::STREAM_MAILBOX_ID);
        (Some(rx), Some(tx))
    } else {
        (None, None)
    };

    (
        SinkPair {
            cmd: cmd_tx,
            stream: stream_tx,
        },
        cmd_rx,
        stream_rx,
    )
}
