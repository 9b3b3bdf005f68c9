
use std::sync::Arc;

use bytes::Bytes;
use tokio::signal::unix::{signal, SignalKind};

use ipc::{MailboxAddr, MailboxReceiver, MailboxSender, SendMode, MAX_RECORD_LEN};
use wire::addr::ADDR_LEN;
use wire::frame::{ack_frame, can_id_bytes, fmt_frame, CAN_ID_LEN, CAN_PKT_MAX_LEN};
use wire::func::ACK_EXEMPT_FN_TYPE;
use wire::record::{
    CandCmd, CandResp, CMD_RESP_MAILBOX_ID, CMD_TX_MAILBOX_ID, CMD_TX_TASK_ID, STREAM_MAILBOX_ID,
};
use wire::DeviceAddr;

use crate::device::CanDevice;
use crate::error::Result;
use crate::framelog::FrameLog;
use crate::table::{RoutingTable, SinkPair};

enum Wake {
    Can(Result<usize>),
    Cmd(ipc::Result<usize>),
    DumpTrace,
}

/// The daemon proper: owns the CAN device, the command mailbox and the
/// registration table, and multiplexes the two inbound directions in one
/// task. Nothing here blocks on a client; sink writes are non-blocking and a
/// sink that cannot be written to is dead.
pub struct Router {
    device: Arc<dyn CanDevice + Send + Sync>,
    cmd_rx: MailboxReceiver,
    table: RoutingTable,
    trace: FrameLog,
}

impl Router {
    /// Claims the well-known command mailbox and wraps `device`.
    pub fn new(device: Arc<dyn CanDevice + Send + Sync>) -> Result<Self> {
        let cmd_rx = MailboxReceiver::bind(MailboxAddr::new(CMD_TX_TASK_ID, CMD_TX_MAILBOX_ID))?;

        Ok(Router {
            device,
            cmd_rx,
            table: RoutingTable::new(),
            trace: FrameLog::default(),
        })
    }

    /// The event loop. Waits on the CAN receive side and the command mailbox
    /// at once; either becoming ready is the only progress condition. Runs
    /// until the surrounding task is dropped. Per-iteration errors are
    /// logged and survived, never propagated.
    pub async fn run(mut self) -> Result<()> {
        let device = Arc::clone(&self.device);
        let mut dump_signal = signal(SignalKind::user_defined1())?;
        let mut can_buf = [0u8; CAN_PKT_MAX_LEN];
        let mut cmd_buf = vec![0u8; MAX_RECORD_LEN];

        log::info!("cand: entering event loop");
        loop {
            let wake = tokio::select! {
                res = device.recv(&mut can_buf) => Wake::Can(res),
                res = self.cmd_rx.recv(&mut cmd_buf) => Wake::Cmd(res),
                _ = dump_signal.recv() => Wake::DumpTrace,
            };

            match wake {
                // A zero-length read means the driver had nothing after all.
                Wake::Can(Ok(0)) => {}
                Wake::Can(Ok(n)) => self.handle_can_receive(&can_buf[..n]).await,
                Wake::Can(Err(err)) => log::error!("CAN driver read failed: {err}"),
                Wake::Cmd(Ok(n)) => self.handle_client_cmd(&cmd_buf[..n]).await,
                Wake::Cmd(Err(err)) => log::error!("command mailbox read failed: {err}"),
                Wake::DumpTrace => match self.trace.dump() {
                    Ok(path) => log::info!("frame trace dumped to {}", path.display()),
                    Err(err) => log::warn!("frame trace dump failed: {err}"),
                },
            }
        }
    }

    /// One inbound frame: acknowledge it on the wire (fieldbus command
    /// frames excepted, the application answers those), then route it to
    /// the registered sink for its address.
    async fn handle_can_receive(&mut self, raw: &[u8]) {
        let addr = match DeviceAddr::unmarshal(raw) {
            Ok(addr) => addr,
            Err(err) => {
                log::warn!("dropping unparseable frame ({err}): {}", fmt_frame(raw));
                return;
            }
        };
        self.trace.record_rx(&addr, &raw[ADDR_LEN..]);

        if addr.fn_type() != ACK_EXEMPT_FN_TYPE {
            let ack = ack_frame(&addr);
            match self.device.send(&ack).await {
                Ok(n) if n == ack.len() => {}
                Ok(n) => log::error!("short ack write for {addr}: {n} of {} bytes", ack.len()),
                Err(err) => log::error!("ack write for {addr} failed: {err}"),
            }
        }

        let (slot, fn_type, fn_count) = (addr.slot(), addr.fn_type(), addr.fn_count());
        let mut sink_dead = false;
        match self.table.lookup(slot, fn_type, fn_count) {
            None => {
                log::debug!("no channel registered for {addr}; frame dropped");
                return;
            }
            Some(entry) => {
                let frame = Bytes::copy_from_slice(raw);
                if addr.is_stream() {
                    match &entry.stream {
                        Some(stream_sink) => match (CandResp::Stream { frame }).marshal() {
                            Ok(record) => {
                                if let Err(err) = stream_sink.try_send(&record) {
                                    log::warn!("stream sink for {addr} rejected a record: {err}");
                                    sink_dead = true;
                                }
                            }
                            Err(err) => log::warn!("cannot marshal stream record for {addr}: {err}"),
                        },
                        None => {
                            log::warn!("stream frame for {addr} but no stream sink registered");
                            sink_dead = true;
                        }
                    }
                } else {
                    match (CandResp::Response { frame }).marshal() {
                        Ok(record) => {
                            if let Err(err) = entry.cmd.try_send(&record) {
                                log::warn!("command sink for {addr} rejected a record: {err}");
                                sink_dead = true;
                            }
                        }
                        Err(err) => log::warn!("cannot marshal response record for {addr}: {err}"),
                    }
                }
            }
        }

        // A channel whose sink cannot take records any more is gone; drop
        // the registration so the table does not fill with corpses.
        if sink_dead {
            match self.table.deregister(slot, fn_type, fn_count) {
                Ok(_) => log::info!("deregistered dead channel {addr}"),
                Err(err) => log::warn!("failed to deregister {addr}: {err}"),
            }
        }
    }

    /// One datagram from a client. It may carry several concatenated
    /// records (a fragmented transmit arrives as one batch), so records are
    /// drained until the datagram is exhausted. No acknowledgement goes back
    /// either way.
    async fn handle_client_cmd(&mut self, datagram: &[u8]) {
        let mut reader = Bytes::copy_from_slice(datagram);
        while !reader.is_empty() {
            let cmd = match CandCmd::unmarshal(&mut reader) {
                Ok(cmd) => cmd,
                Err(err) => {
                    log::warn!("discarding malformed command record: {err}");
                    return;
                }
            };

            match cmd {
                CandCmd::Register {
                    slot,
                    fn_type,
                    fn_count,
                    cmd_task_id,
                    stream_task_id,
                } => self.register_channel(slot, fn_type, fn_count, cmd_task_id, stream_task_id),
                CandCmd::Unregister {
                    slot,
                    fn_type,
                    fn_count,
                } => match self.table.deregister(slot, fn_type, fn_count) {
                    Ok(_) => log::debug!("deregistered {slot}:{fn_type}:{fn_count}"),
                    Err(err) => {
                        log::warn!("deregister {slot}:{fn_type}:{fn_count} failed: {err}")
                    }
                },
                CandCmd::TxFrame { can_id, frame } => self.transmit_frame(can_id, &frame).await,
            }
        }
    }

    /// Opens the daemon-side sinks for a new channel and inserts the entry.
    /// Sinks are opened non-blocking: the daemon must never suspend on a
    /// client that stopped draining. A half-open registration is rolled back
    /// by dropping whatever was opened.
    fn register_channel(
        &mut self,
        slot: u8,
        fn_type: u8,
        fn_count: u8,
        cmd_task_id: u32,
        stream_task_id: Option<u32>,
    ) {
        let cmd = match MailboxSender::connect(
            MailboxAddr::new(cmd_task_id, CMD_RESP_MAILBOX_ID),
            SendMode::Nonblocking,
        ) {
            Ok(sink) => sink,
            Err(err) => {
                log::warn!(
                    "register {slot}:{fn_type}:{fn_count}: cannot open command sink {cmd_task_id}: {err}"
                );
                return;
            }
        };

        let stream = match stream_task_id {
            Some(task_id) => match MailboxSender::connect(
                MailboxAddr::new(task_id, STREAM_MAILBOX_ID),
                SendMode::Nonblocking,
            ) {
                Ok(sink) => Some(sink),
                Err(err) => {
                    log::warn!(
                        "register {slot}:{fn_type}:{fn_count}: cannot open stream sink {task_id}: {err}"
                    );
                    return;
                }
            },
            None => None,
        };

        match self.table.register(slot, fn_type, fn_count, SinkPair { cmd, stream }) {
            Ok(()) => log::debug!("registered {slot}:{fn_type}:{fn_count}"),
            Err(err) => log::warn!("register {slot}:{fn_type}:{fn_count} failed: {err}"),
        }
    }

    /// Prepends the CAN id and hands the frame to the driver in one write.
    /// A short write is a protocol failure: report it and drop the frame.
    async fn transmit_frame(&mut self, can_id: u8, frame: &Bytes) {
        let mut packet = [0u8; CAN_ID_LEN + CAN_PKT_MAX_LEN];
        let len = CAN_ID_LEN + frame.len();
        packet[..CAN_ID_LEN].copy_from_slice(&can_id_bytes(can_id));
        packet[CAN_ID_LEN..len].copy_from_slice(frame);

        if let Ok(addr) = DeviceAddr::unmarshal(frame) {
            self.trace.record_tx(&addr, &frame[ADDR_LEN..]);
        }

        match self.device.send(&packet[..len]).await {
            Ok(n) if n == len => {}
            Ok(n) => log::error!("short write to CAN driver: {n} of {len} bytes"),
            Err(err) => log::error!("CAN driver write failed: {err}"),
        }
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        let released = self.table.clear();
        if released > 0 {
            log::info!("cand: released {released} registered channels");
        }
    }
}
