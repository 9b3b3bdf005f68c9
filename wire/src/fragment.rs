#[cfg(test)]
mod fragment_test;

use bytes::{BufMut, Bytes, BytesMut};

use crate::addr::{DeviceAddr, ADDR_LEN};
use crate::crc16::crc16;
use crate::error::{Error, Result};
use crate::frame::CAN_PKT_DATA_LEN;

/// Largest message the fragmentation layer will split or reassemble.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Trailing CRC bytes carried by a fragmented message.
pub const FRAGMENT_CRC_LEN: usize = 2;

/// Splits `payload` into a sequence of ready-to-send frames sharing `addr`.
///
/// A payload of up to 6 bytes becomes a single frame with Fragment=0 and no
/// CRC. Anything larger becomes ⌈(len+2)/6⌉ frames; every non-final frame
/// carries Fragment=1 and a full 6 data bytes, and the CRC-16 over the whole
/// payload trails the stream low byte first. The CRC may straddle the final
/// two frames: a non-final frame left with exactly 5 payload bytes takes the
/// low CRC byte, leaving the high byte for the final frame. The devices on
/// the bus depend on that exact placement.
pub fn fragment_payload(addr: DeviceAddr, payload: &[u8]) -> Result<Vec<Bytes>> {
    if payload.is_empty() {
        return Err(Error::ErrEmptyPayload);
    }
    if payload.len() > MAX_MESSAGE_LEN {
        return Err(Error::ErrPayloadTooLarge);
    }

    if payload.len() <= CAN_PKT_DATA_LEN {
        let mut frame = BytesMut::with_capacity(ADDR_LEN + payload.len());
        frame.put_slice(&addr.with_fragment(false).marshal());
        frame.put_slice(payload);
        return Ok(vec![frame.freeze()]);
    }

    let crc = crc16(payload).to_le_bytes();
    let total = payload.len() + FRAGMENT_CRC_LEN;
    let num_frames = (total + CAN_PKT_DATA_LEN - 1) / CAN_PKT_DATA_LEN;

    let mut frames = Vec::with_capacity(num_frames);
    let mut copied = 0;
    let mut crc_low_sent = false;

    for index in 0..num_frames {
        let last = index == num_frames - 1;
        let take = (payload.len() - copied).min(CAN_PKT_DATA_LEN);

        let mut frame = BytesMut::with_capacity(ADDR_LEN + CAN_PKT_DATA_LEN);
        frame.put_slice(&addr.with_fragment(!last).marshal());
        frame.put_slice(&payload[copied..copied + take]);
        copied += take;

        if last {
            if crc_low_sent {
                frame.put_u8(crc[1]);
            } else {
                frame.put_slice(&crc);
            }
        } else if take == CAN_PKT_DATA_LEN - 1 {
            frame.put_u8(crc[0]);
            crc_low_sent = true;
        }

        frames.push(frame.freeze());
    }

    Ok(frames)
}

/// Per-channel reassembly of inbound frames back into payloads.
///
/// The state machine mirrors the sender: a frame with Fragment=0 seen while
/// idle is a complete CRC-less message; a frame with Fragment=1 starts an
/// accumulation that ends at the next Fragment=0 frame, whose last two data
/// bytes are the CRC to validate. One message is buffered at a time and is
/// consumed by a single [`Reassembler::get`] call.
#[derive(Debug, Default)]
pub struct Reassembler {
    buf: BytesMut,
    processing: bool,
    crc_present: bool,
    crc_failed: bool,
    ready: bool,
}

impl Reassembler {
    pub fn new() -> Self {
        Reassembler::default()
    }

    /// Feeds one raw frame (address header included) into the assembly
    /// buffer.
    pub fn push(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() < ADDR_LEN || frame.len() > ADDR_LEN + CAN_PKT_DATA_LEN {
            return Err(Error::ErrFrameLength);
        }
        if self.buf.len() + frame.len() > MAX_MESSAGE_LEN + FRAGMENT_CRC_LEN {
            return Err(Error::ErrPayloadTooLarge);
        }

        let addr = DeviceAddr::unmarshal(frame)?;

        if !self.processing {
            self.buf.clear();
            if addr.is_fragment() {
                self.processing = true;
                self.ready = false;
            } else {
                self.ready = true;
                self.crc_present = false;
                self.crc_failed = false;
            }
        }

        self.buf.extend_from_slice(&frame[ADDR_LEN..]);

        if self.processing && !addr.is_fragment() {
            self.finish();
        }

        Ok(())
    }

    /// Validates the trailing CRC of a completed fragment sequence.
    fn finish(&mut self) {
        let len = self.buf.len();
        if len < FRAGMENT_CRC_LEN {
            self.crc_failed = true;
        } else {
            let received = u16::from_le_bytes([self.buf[len - 2], self.buf[len - 1]]);
            let computed = crc16(&self.buf[..len - FRAGMENT_CRC_LEN]);
            self.crc_failed = received != computed;
            if self.crc_failed {
                log::debug!("fragment crc mismatch: received 0x{received:04x}, computed 0x{computed:04x}");
            }
        }

        self.processing = false;
        self.crc_present = true;
        self.ready = true;
    }

    /// Reads the assembled message.
    ///
    /// On success the assembled payload length (CRC excluded) is returned and
    /// as much as fits is copied into `out`; the message is consumed either
    /// way. Mid-sequence this reports [`Error::ErrDataPending`]; a completed
    /// sequence whose CRC did not verify reports [`Error::ErrWrongCrc`]; with
    /// nothing assembled it reports [`Error::ErrInvalidSequence`].
    pub fn get(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Err(Error::ErrEmptyReadBuffer);
        }

        if self.ready {
            self.ready = false;
            if self.crc_failed {
                return Err(Error::ErrWrongCrc);
            }

            let len = self.count();
            let n = len.min(out.len());
            out[..n].copy_from_slice(&self.buf[..n]);
            Ok(len)
        } else if self.processing {
            Err(Error::ErrDataPending)
        } else {
            Err(Error::ErrInvalidSequence)
        }
    }

    /// Number of payload bytes accumulated so far, CRC excluded once the
    /// sequence has completed.
    pub fn count(&self) -> usize {
        if self.crc_present && !self.processing {
            self.buf.len().saturating_sub(FRAGMENT_CRC_LEN)
        } else {
            self.buf.len()
        }
    }

    /// Drops any buffered data and resets the state machine.
    pub fn flush(&mut self) {
        self.buf = BytesMut::new();
        self.processing = false;
        self.crc_present = false;
        self.crc_failed = false;
        self.ready = false;
    }
}
