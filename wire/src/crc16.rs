
use crc::{Crc, CRC_16_ARC};

/// CRC used over the payload bytes of fragmented messages: the reflected
/// right-shifting table algorithm with initial value 0 (CRC-16/ARC). The
/// two CRC bytes trail the payload on the wire, low byte first.
pub const FRAGMENT_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);

/// Computes the fragment CRC over `data` without allocating.
pub fn crc16(data: &[u8]) -> u16 {
    FRAGMENT_CRC.checksum(data)
}
