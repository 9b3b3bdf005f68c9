#[cfg(test)]
mod channel_test;

use std::os::unix::io::RawFd;

use bytes::{Bytes, BytesMut};
use tokio::time::{sleep, Duration};

use ipc::{MailboxAddr, MailboxReceiver, MAX_RECORD_LEN};
use wire::fragment::FRAGMENT_CRC_LEN;
use wire::func::INTER_FRAME_DELAY_FN_TYPE;
use wire::record::{
    client_task_id, CandCmd, CandResp, CMD_RESP_MAILBOX_ID, STREAM_MAILBOX_ID,
};
use wire::{fragment_payload, DeviceAddr, Reassembler};

use crate::conduit::CmdConduit;
use crate::error::{Error, Result};

/// Default budget for a single request/response exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(300);

/// Gap inserted between fragments addressed to the fieldbus status class;
/// the card misses back-to-back frames without it.
pub(crate) const INTER_FRAME_DELAY: Duration = Duration::from_millis(15);

/// A registered communication channel to one device function on the bus.
///
/// Opening the channel claims the per-triple receive mailboxes, registers
/// with the daemon, and (for the first channel in the process) connects the
/// shared command conduit. The channel owns one reassembler per receive
/// direction, so a fragmented response and a fragmented stream message can
/// interleave without disturbing each other.
#[derive(Debug)]
pub struct CanChannel {
    slot: u8,
    fn_type: u8,
    fn_count: u8,
    conduit: CmdConduit,
    cmd_rx: MailboxReceiver,
    stream_rx: Option<MailboxReceiver>,
    cmd_frag: Reassembler,
    stream_frag: Reassembler,
    remaining: Duration,
}

impl CanChannel {
    /// Opens a channel for the device triple and registers it with the
    /// daemon. With `streaming` set a second mailbox is claimed for
    /// unsolicited data and the daemon is told to route it there.
    pub async fn open(slot: u8, fn_type: u8, fn_count: u8, streaming: bool) -> Result<CanChannel> {
        // fn_count 0 is reserved on the bus and refused here, before any
        // resource is touched.
        DeviceAddr::new(slot, fn_type, fn_count)?;
        if fn_count == 0 {
            return Err(Error::ErrInvalidArgs);
        }

        let conduit = CmdConduit::acquire()?;

        let task_id = client_task_id(slot, fn_type, fn_count);
        let cmd_rx = MailboxReceiver::bind(MailboxAddr::new(task_id, CMD_RESP_MAILBOX_ID))
            .map_err(|err| {
                log::warn!("cannot claim response mailbox {task_id}: {err}");
                Error::ErrInternal
            })?;
        let stream_rx = if streaming {
            Some(
                MailboxReceiver::bind(MailboxAddr::new(task_id, STREAM_MAILBOX_ID)).map_err(
                    |err| {
                        log::warn!("cannot claim stream mailbox {task_id}: {err}");
                        Error::ErrInternal
                    },
                )?,
            )
        } else {
            None
        };

        let register = CandCmd::Register {
            slot,
            fn_type,
            fn_count,
            cmd_task_id: task_id,
            stream_task_id: streaming.then_some(task_id),
        };
        conduit.send(&register.marshal()?).await?;

        Ok(CanChannel {
            slot,
            fn_type,
            fn_count,
            conduit,
            cmd_rx,
            stream_rx,
            cmd_frag: Reassembler::new(),
            stream_frag: Reassembler::new(),
            remaining: Duration::ZERO,
        })
    }

    /// Deregisters from the daemon and releases the mailboxes. The last
    /// channel in the process also tears down the command conduit.
    pub async fn close(self) -> Result<()> {
        let unregister = CandCmd::Unregister {
            slot: self.slot,
            fn_type: self.fn_type,
            fn_count: self.fn_count,
        };
        self.conduit.send(&unregister.marshal()?).await?;
        Ok(())
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub fn fn_type(&self) -> u8 {
        self.fn_type
    }

    pub fn fn_count(&self) -> u8 {
        self.fn_count
    }

    /// Transmits `payload` to the device, fragmenting as needed. The whole
    /// message is batched into one record to the daemon so the fragments hit
    /// the driver back to back; the fieldbus status class instead gets one
    /// record per frame with a delay in between, which is a constraint of
    /// that card, not of the daemon.
    pub async fn tx(&self, payload: &[u8], streaming: bool) -> Result<()> {
        let addr =
            DeviceAddr::new(self.slot, self.fn_type, self.fn_count)?.with_datatype(streaming);
        let frames = fragment_payload(addr, payload)?;

        if self.fn_type == INTER_FRAME_DELAY_FN_TYPE {
            for frame in frames {
                let record = CandCmd::TxFrame {
                    can_id: self.slot,
                    frame,
                }
                .marshal()?;
                self.conduit.send(&record).await?;
                sleep(INTER_FRAME_DELAY).await;
            }
            return Ok(());
        }

        let mut batch = BytesMut::new();
        for frame in frames {
            CandCmd::TxFrame {
                can_id: self.slot,
                frame,
            }
            .marshal_to(&mut batch)?;
        }
        self.conduit.send(&batch).await?;
        Ok(())
    }

    /// Waits indefinitely for one complete command response.
    pub async fn recv_response(&mut self, out: &mut [u8]) -> Result<usize> {
        rx_message(
            &self.cmd_rx,
            &mut self.cmd_frag,
            out,
            None,
            &mut self.remaining,
        )
        .await
    }

    /// Waits up to `timeout` for one complete command response.
    pub async fn recv_response_timeout(&mut self, out: &mut [u8], timeout: Duration) -> Result<usize> {
        rx_message(
            &self.cmd_rx,
            &mut self.cmd_frag,
            out,
            Some(timeout),
            &mut self.remaining,
        )
        .await
    }

    /// Waits indefinitely for one complete streaming message.
    pub async fn stream_recv(&mut self, out: &mut [u8]) -> Result<usize> {
        let stream_rx = self.stream_rx.as_ref().ok_or(Error::ErrInvalidSequence)?;
        rx_message(
            stream_rx,
            &mut self.stream_frag,
            out,
            None,
            &mut self.remaining,
        )
        .await
    }

    /// Waits up to `timeout` for one complete streaming message.
    pub async fn stream_recv_timeout(&mut self, out: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream_rx = self.stream_rx.as_ref().ok_or(Error::ErrInvalidSequence)?;
        rx_message(
            stream_rx,
            &mut self.stream_frag,
            out,
            Some(timeout),
            &mut self.remaining,
        )
        .await
    }

    /// Discards queued response records and any half-assembled response.
    pub fn flush_responses(&mut self) -> Result<()> {
        self.cmd_rx.flush()?;
        self.cmd_frag.flush();
        Ok(())
    }

    /// Discards queued stream records and any half-assembled message.
    pub fn stream_flush(&mut self) -> Result<()> {
        let stream_rx = self.stream_rx.as_ref().ok_or(Error::ErrInvalidSequence)?;
        stream_rx.flush()?;
        self.stream_frag.flush();
        Ok(())
    }

    /// One command/response transaction: flush residue from any earlier
    /// timed-out exchange, transmit, then collect the response within
    /// `timeout`. Returns the response length written to `out`.
    pub async fn request(
        &mut self,
        cmd: &[u8],
        out: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        if cmd.is_empty() || out.is_empty() {
            return Err(Error::ErrInvalidArgs);
        }

        self.flush_responses()?;
        self.tx(cmd, false).await?;
        self.recv_response_timeout(out, timeout).await
    }

    /// The unused part of the budget of the last timed receive.
    pub fn remaining_timeout(&self) -> Duration {
        self.remaining
    }

    /// Raw descriptor of the streaming mailbox, for callers that multiplex
    /// several channels themselves.
    pub fn stream_fd(&self) -> Result<RawFd> {
        self.stream_rx
            .as_ref()
            .map(|rx| rx.fd())
            .ok_or(Error::ErrInvalidSequence)
    }
}

/// The shared receive pipeline: pull records off a mailbox, feed the frames
/// into the channel's reassembler, and hand back the first complete
/// message. A `timeout` of `None` waits forever; otherwise the budget is
/// carried across receives and its unused part reported via `remaining_out`.
async fn rx_message(
    rx: &MailboxReceiver,
    frag: &mut Reassembler,
    out: &mut [u8],
    timeout: Option<Duration>,
    remaining_out: &mut Duration,
) -> Result<usize> {
    let mut remaining = timeout.unwrap_or(Duration::ZERO);
    *remaining_out = Duration::ZERO;
    let mut record = [0u8; MAX_RECORD_LEN];

    loop {
        let n = match timeout {
            None => rx.recv(&mut record).await?,
            Some(_) => {
                let (n, left) = rx.recv_timeout(&mut record, remaining).await?;
                remaining = left;
                *remaining_out = left;
                n
            }
        };

        let mut raw = Bytes::copy_from_slice(&record[..n]);
        let resp = CandResp::unmarshal(&mut raw).map_err(|err| {
            log::warn!("unparseable record on receive mailbox: {err}");
            Error::ErrInternal
        })?;

        frag.push(resp.frame())?;
        match frag.get(out) {
            Ok(len) => {
                if len != out.len() {
                    log::debug!("expected {} response bytes, assembled {len}", out.len());
                }
                return Ok(len);
            }
            Err(wire::Error::ErrDataPending) => {
                // More than the expected payload plus the CRC pair can never
                // be a valid continuation of this response.
                if frag.count() > out.len() + FRAGMENT_CRC_LEN {
                    return Err(Error::ErrProtocol);
                }
                if timeout.is_none() || remaining > Duration::ZERO {
                    continue;
                }
                return Err(Error::ErrTimeout);
            }
            Err(err) => return Err(err.into()),
        }
    }
}
