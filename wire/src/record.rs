
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::addr::ADDR_LEN;
use crate::error::{Error, Result};
use crate::frame::CAN_PKT_MAX_LEN;

/// Task id of the daemon's well-known command mailbox. Every client process
/// sends [`CandCmd`] records here.
pub const CMD_TX_TASK_ID: u32 = 1;
/// Mailbox id of the daemon's command mailbox.
pub const CMD_TX_MAILBOX_ID: u32 = 0;

/// Mailbox id used for a client's command-response receive endpoint.
pub const CMD_RESP_MAILBOX_ID: u32 = 0;
/// Mailbox id used for a client's streaming receive endpoint.
pub const STREAM_MAILBOX_ID: u32 = 1;

/// Task ids for client receive mailboxes start past the maximum OS pid so
/// they can never collide with pid-derived channel names of other tasks.
pub const CLIENT_TASK_ID_BASE: u32 = 32768;

/// Derives the mailbox task id a client binds for a device triple. Distinct
/// triples map to distinct ids.
pub fn client_task_id(slot: u8, fn_type: u8, fn_count: u8) -> u32 {
    ((slot as u32) << 9) + ((fn_type as u32) << 4) + fn_count as u32 + CLIENT_TASK_ID_BASE
}

const CMD_REGISTER: u8 = 0;
const CMD_UNREGISTER: u8 = 1;
const CMD_TX_FRAME: u8 = 2;

const RESP_RESPONSE: u8 = 0;
const RESP_STREAM: u8 = 1;

/// A command record sent from a client process to the daemon. The daemon
/// never acknowledges these; failures are logged on its side only.
///
/// Several `TxFrame` records may be concatenated into a single datagram so a
/// whole fragmented message reaches the daemon in one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandCmd {
    /// Register a device channel: the daemon opens send endpoints onto the
    /// client's mailboxes and routes matching inbound frames there.
    Register {
        slot: u8,
        fn_type: u8,
        fn_count: u8,
        cmd_task_id: u32,
        stream_task_id: Option<u32>,
    },
    /// Drop the registration for a device triple.
    Unregister { slot: u8, fn_type: u8, fn_count: u8 },
    /// Transmit one frame. `frame` carries the 2-byte address header built by
    /// the client plus up to 6 data bytes; the daemon prepends the CAN id for
    /// `can_id` before the driver write.
    TxFrame { can_id: u8, frame: Bytes },
}

impl CandCmd {
    pub fn marshal_to(&self, writer: &mut BytesMut) -> Result<()> {
        match self {
            CandCmd::Register {
                slot,
                fn_type,
                fn_count,
                cmd_task_id,
                stream_task_id,
            } => {
                writer.put_u8(CMD_REGISTER);
                writer.put_u8(*slot);
                writer.put_u8(*fn_type);
                writer.put_u8(*fn_count);
                writer.put_u32(*cmd_task_id);
                writer.put_u32(stream_task_id.unwrap_or(0));
            }
            CandCmd::Unregister {
                slot,
                fn_type,
                fn_count,
            } => {
                writer.put_u8(CMD_UNREGISTER);
                writer.put_u8(*slot);
                writer.put_u8(*fn_type);
                writer.put_u8(*fn_count);
            }
            CandCmd::TxFrame { can_id, frame } => {
                if frame.len() < ADDR_LEN || frame.len() > CAN_PKT_MAX_LEN {
                    return Err(Error::ErrFrameLength);
                }
                writer.put_u8(CMD_TX_FRAME);
                writer.put_u8(*can_id);
                writer.put_u8(frame.len() as u8);
                writer.put_slice(frame);
            }
        }

        Ok(())
    }

    pub fn marshal(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.marshal_to(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Consumes exactly one record from the front of `reader`. Callers drain
    /// a datagram by looping until no bytes remain.
    pub fn unmarshal(reader: &mut Bytes) -> Result<Self> {
        if reader.is_empty() {
            return Err(Error::ErrRecordTooShort);
        }

        let tag = reader.get_u8();
        match tag {
            CMD_REGISTER => {
                if reader.remaining() < 11 {
                    return Err(Error::ErrRecordTooShort);
                }
                let slot = reader.get_u8();
                let fn_type = reader.get_u8();
                let fn_count = reader.get_u8();
                let cmd_task_id = reader.get_u32();
                let stream_task_id = match reader.get_u32() {
                    0 => None,
                    id => Some(id),
                };
                Ok(CandCmd::Register {
                    slot,
                    fn_type,
                    fn_count,
                    cmd_task_id,
                    stream_task_id,
                })
            }
            CMD_UNREGISTER => {
                if reader.remaining() < 3 {
                    return Err(Error::ErrRecordTooShort);
                }
                Ok(CandCmd::Unregister {
                    slot: reader.get_u8(),
                    fn_type: reader.get_u8(),
                    fn_count: reader.get_u8(),
                })
            }
            CMD_TX_FRAME => {
                if reader.remaining() < 2 {
                    return Err(Error::ErrRecordTooShort);
                }
                let can_id = reader.get_u8();
                let len = reader.get_u8() as usize;
                if len < ADDR_LEN || len > CAN_PKT_MAX_LEN {
                    return Err(Error::ErrFrameLength);
                }
                if reader.remaining() < len {
                    return Err(Error::ErrRecordLength);
                }
                let frame = reader.split_to(len);
                Ok(CandCmd::TxFrame { can_id, frame })
            }
            tag => Err(Error::ErrUnknownRecordType { tag }),
        }
    }
}

/// A record routed from the daemon into a registered client mailbox,
/// carrying one raw inbound frame, address header included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandResp {
    /// A command response (datatype bit clear), delivered on the
    /// command-response sink.
    Response { frame: Bytes },
    /// Streaming data (datatype bit set), delivered on the streaming sink.
    Stream { frame: Bytes },
}

impl CandResp {
    pub fn frame(&self) -> &Bytes {
        match self {
            CandResp::Response { frame } | CandResp::Stream { frame } => frame,
        }
    }

    pub fn marshal(&self) -> Result<Bytes> {
        let (tag, frame) = match self {
            CandResp::Response { frame } => (RESP_RESPONSE, frame),
            CandResp::Stream { frame } => (RESP_STREAM, frame),
        };
        if frame.len() < ADDR_LEN || frame.len() > CAN_PKT_MAX_LEN {
            return Err(Error::ErrFrameLength);
        }

        let mut buf = BytesMut::with_capacity(2 + frame.len());
        buf.put_u8(tag);
        buf.put_u8(frame.len() as u8);
        buf.put_slice(frame);
        Ok(buf.freeze())
    }

    pub fn unmarshal(reader: &mut Bytes) -> Result<Self> {
        if reader.remaining() < 2 {
            return Err(Error::ErrRecordTooShort);
        }

        let tag = reader.get_u8();
        let len = reader.get_u8() as usize;
        if len < ADDR_LEN || len > CAN_PKT_MAX_LEN {
            return Err(Error::ErrFrameLength);
        }
        if reader.remaining() < len {
            return Err(Error::ErrRecordLength);
        }
        let frame = reader.split_to(len);

        match tag {
            RESP_RESPONSE => Ok(CandResp::Response { frame }),
            RESP_STREAM => Ok(CandResp::Stream { frame }),
            tag => Err(Error::ErrUnknownRecordType { tag }),
        }
    }
}
