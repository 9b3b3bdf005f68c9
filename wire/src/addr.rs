
use std::fmt;

use crate::error::{Error, Result};

/// Size of the marshalled address header in bytes.
pub const ADDR_LEN: usize = 2;

pub const MAX_SLOT_ID: u8 = 0x1F;
pub const MAX_FN_TYPE: u8 = 0x1F;
pub const MAX_FN_COUNT: u8 = 0x0F;

/// The 16-bit device-address header carried at offset 0 of every frame
/// payload.
///
/// Bit layout, MSB to LSB:
///
/// ```text
///  15          11 10           6 5         2   1        0
/// +--------------+--------------+-----------+----------+----------+
/// |   slot (5)   | fn_type (5)  | fn_count(4)| fragment | datatype |
/// +--------------+--------------+-----------+----------+----------+
/// ```
///
/// The two bytes travel in big-endian order on the bus regardless of host
/// endianness. The datatype bit is direction dependent: device-to-host it
/// distinguishes streaming data (1) from command responses (0); host-to-device
/// it distinguishes an acknowledgement (1) from a command (0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAddr {
    slot: u8,
    fn_type: u8,
    fn_count: u8,
    fragment: bool,
    datatype: bool,
}

impl fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{} frag={} dt={}",
            self.slot, self.fn_type, self.fn_count, self.fragment as u8, self.datatype as u8
        )
    }
}

impl DeviceAddr {
    /// Builds an address for the given device triple with the fragment and
    /// datatype bits cleared. Field values beyond their bit width are
    /// rejected; a `fn_count` of zero is representable (the registration
    /// layer is where zero is rejected as an invalid channel).
    pub fn new(slot: u8, fn_type: u8, fn_count: u8) -> Result<Self> {
        if slot > MAX_SLOT_ID {
            return Err(Error::ErrSlotOutOfRange);
        }
        if fn_type > MAX_FN_TYPE {
            return Err(Error::ErrFnTypeOutOfRange);
        }
        if fn_count > MAX_FN_COUNT {
            return Err(Error::ErrFnCountOutOfRange);
        }

        Ok(DeviceAddr {
            slot,
            fn_type,
            fn_count,
            fragment: false,
            datatype: false,
        })
    }

    pub fn with_fragment(mut self, fragment: bool) -> Self {
        self.fragment = fragment;
        self
    }

    pub fn with_datatype(mut self, datatype: bool) -> Self {
        self.datatype = datatype;
        self
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

    pub fn is_fragment(&self) -> bool {
        self.fragment
    }

    pub fn datatype(&self) -> bool {
        self.datatype
    }

    /// Device-to-host reading of the datatype bit.
    pub fn is_stream(&self) -> bool {
        self.datatype
    }

    /// Host-to-device reading of the datatype bit.
    pub fn is_ack(&self) -> bool {
        self.datatype
    }

    fn packed(&self) -> u16 {
        (self.slot as u16) << 11
            | (self.fn_type as u16) << 6
            | (self.fn_count as u16) << 2
            | (self.fragment as u16) << 1
            | self.datatype as u16
    }

    /// Serialises the header into its two wire bytes, most significant first.
    pub fn marshal(&self) -> [u8; ADDR_LEN] {
        self.packed().to_be_bytes()
    }

    /// Parses a header from the first two bytes of `raw`.
    pub fn unmarshal(raw: &[u8]) -> Result<Self> {
        if raw.len() < ADDR_LEN {
            return Err(Error::ErrAddrTooShort);
        }

        let packed = u16::from_be_bytes([raw[0], raw[1]]);
        Ok(DeviceAddr {
            slot: (packed >> 11) as u8 & MAX_SLOT_ID,
            fn_type: (packed >> 6) as u8 & MAX_FN_TYPE,
            fn_count: (packed >> 2) as u8 & MAX_FN_COUNT,
            fragment: packed & 0x2 != 0,
            datatype: packed & 0x1 != 0,
        })
    }
}
