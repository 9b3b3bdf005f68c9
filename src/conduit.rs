
use std::sync::Arc;
use std::sync::Mutex;

use ipc::{MailboxAddr, MailboxSender, SendMode};
use wire::record::{CMD_TX_MAILBOX_ID, CMD_TX_TASK_ID};

use crate::error::{Error, Result};

struct ConduitSlot {
    sender: Arc<MailboxSender>,
    refs: usize,
}

lazy_static! {
    // One outbound command pipe per process, shared by every channel. The
    // mutex also serialises a first open racing a last close.
    static ref CONDUIT: Mutex<Option<ConduitSlot>> = Mutex::new(None);
}

fn slot_guard() -> std::sync::MutexGuard<'static, Option<ConduitSlot>> {
    match CONDUIT.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// A refcounted handle on the process-wide command pipe to the daemon. The
/// first handle connects the pipe; dropping the last one tears it down.
#[derive(Debug)]
pub(crate) struct CmdConduit {
    sender: Arc<MailboxSender>,
}

impl CmdConduit {
    pub(crate) fn acquire() -> Result<CmdConduit> {
        let mut slot = slot_guard();

        if let Some(active) = slot.as_mut() {
            active.refs += 1;
            return Ok(CmdConduit {
                sender: Arc::clone(&active.sender),
            });
        }

        let sender = MailboxSender::connect(
            MailboxAddr::new(CMD_TX_TASK_ID, CMD_TX_MAILBOX_ID),
            SendMode::Blocking,
        )
        .map_err(|err| {
            log::warn!("cannot reach the CAN daemon: {err}");
            Error::ErrInternal
        })?;

        let sender = Arc::new(sender);
        *slot = Some(ConduitSlot {
            sender: Arc::clone(&sender),
            refs: 1,
        });
        Ok(CmdConduit { sender })
    }

    pub(crate) async fn send(&self, record: &[u8]) -> Result<usize> {
        Ok(self.sender.send(record).await?)
    }
}

impl Drop for CmdConduit {
    fn drop(&mut self) {
        let mut slot = slot_guard();
        if let Some(active) = slot.as_mut() {
            active.refs -= 1;
            if active.refs == 0 {
                *slot = None;
            }
        }
    }
}
