
use std::fmt::Write;

use crate::addr::{DeviceAddr, ADDR_LEN};

/// Maximum frame payload handed to the CAN driver: 2 address-header bytes
/// plus up to 6 data bytes.
pub const CAN_PKT_MAX_LEN: usize = 8;

/// Data bytes left in a frame once the address header is in place.
pub const CAN_PKT_DATA_LEN: usize = CAN_PKT_MAX_LEN - ADDR_LEN;

/// Bytes of CAN message id prepended by the daemon before the driver write.
pub const CAN_ID_LEN: usize = 2;

/// An acknowledgement is CAN id plus a bare address header.
pub const CAN_ACK_PKT_LEN: usize = CAN_ID_LEN + ADDR_LEN;

/// CAN message id bytes for a slot. Byte 0 is always zero for in-range
/// slots; byte 1 carries the slot value.
pub fn can_id_bytes(slot: u8) -> [u8; CAN_ID_LEN] {
    [0, slot]
}

/// Builds the 4-byte acknowledgement written back to the bus after a data
/// frame is received: the sender's CAN id followed by its address triple
/// with Fragment=0 and the datatype bit marking an ack.
pub fn ack_frame(addr: &DeviceAddr) -> [u8; CAN_ACK_PKT_LEN] {
    let header = addr.with_fragment(false).with_datatype(true).marshal();
    let id = can_id_bytes(addr.slot());
    [id[0], id[1], header[0], header[1]]
}

/// Hex rendering of a raw frame for trace output.
pub fn fmt_frame(raw: &[u8]) -> String {
    let mut out = String::with_capacity(raw.len() * 5);
    for byte in raw {
        let _ = write!(out, "0x{byte:02x} ");
    }
    out.truncate(out.trim_end().len());
    out
}
