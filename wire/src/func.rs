#[cfg(test)]
mod func_test;

use crate::error::{Error, Result};

// Function classes hosted by the plug-in boards. The bus carries the class
// in the fn_type field of every address header.
pub const FN_UNKNOWN: u8 = 0;
pub const FN_ANA_IN: u8 = 1;
pub const FN_ANA_OUT: u8 = 2;
pub const FN_DIGI_IN: u8 = 3;
pub const FN_DIGI_OUT: u8 = 4;
pub const FN_PREAMP_STR: u8 = 5;
pub const FN_PREAMP_CFG: u8 = 6;
pub const FN_RTD: u8 = 7;
pub const FN_HTR_CTRL: u8 = 8;
pub const FN_SOL: u8 = 9;
pub const FN_SERIAL: u8 = 10;
pub const FN_EPC: u8 = 11;
pub const FN_LTLOI: u8 = 12;
pub const FN_FFB_STATUS: u8 = 13;
pub const FN_FFB_COMMAND: u8 = 14;
pub const FN_GRAPHICAL_LOI: u8 = 15;
pub const FN_DIAGNOSTIC: u8 = 16;
pub const FN_FID: u8 = 17;
pub const FN_FPD: u8 = 18;
pub const FN_PRESSURE: u8 = 19;
pub const FN_CTRL: u8 = 20;
pub const FN_IMB_COMM: u8 = 21;
pub const FN_FPD_G2: u8 = 22;
pub const FN_CYCLE_CLOCK_SYNC: u8 = 29;
pub const FN_REBOOT: u8 = 30;
pub const FN_CAP: u8 = 31;

// Base CAN message ids of the boards that compute their own address from
// dip switches, kept for reference by discovery code sitting above.
pub const HOST_BASE_CAN_MSG_ID: u16 = 0x100;
pub const CYCLE_CLOCK_SYNC_CAN_MSG_ID: u8 = 0x01;
pub const LOI_CAN_MSG_ID: u8 = 0x03;
pub const FPD_G2_BASE_CAN_MSG_ID: u8 = 0x0E;
pub const PREAMP_BD_BASE_CAN_MSG_ID: u8 = 0x10;
pub const SOL_HTR_BD_BASE_CAN_MSG_ID: u8 = 0x14;
pub const FIELDBUS_BD_BASE_CAN_MSG_ID: u8 = 0x18;
pub const GRAPHICAL_LOI_BD_BASE_CAN_MSG_ID: u8 = 0x19;
pub const ANALYZER_BD_BASE_CAN_MSG_ID: u8 = 0x1A;
pub const IMB_BD_BASE_CAN_MSG_ID: u8 = 0x1B;
pub const BASE_IO_BD_BASE_CAN_MSG_ID: u8 = 0x1C;

/// The fieldbus card is the one board whose inbound command frames the
/// daemon must not acknowledge; the application answers them itself.
pub const ACK_EXEMPT_FN_TYPE: u8 = FN_FFB_COMMAND;

/// Fragments addressed to this class need an inter-frame gap on the wire or
/// the fieldbus card misses frames; see the client transmit path.
pub const INTER_FRAME_DELAY_FN_TYPE: u8 = FN_FFB_STATUS;

/// First data byte of a command frame and of the matching response: a 7-bit
/// command code plus an error bit the device sets when it NACKs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmdAck {
    pub command: u8,
    pub err: bool,
}

impl CmdAck {
    pub fn new(command: u8) -> Result<Self> {
        if command > 0x7F {
            return Err(Error::ErrCommandOutOfRange);
        }
        Ok(CmdAck {
            command,
            err: false,
        })
    }

    pub fn marshal(&self) -> u8 {
        (self.err as u8) << 7 | self.command
    }

    pub fn unmarshal(raw: u8) -> Self {
        CmdAck {
            command: raw & 0x7F,
            err: raw & 0x80 != 0,
        }
    }
}

/// Status codes a device returns in the byte following a NACKed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCode {
    NoErr,
    InvalidFnType,
    InvalidFnEnum,
    InvalidCmd,
    InternalErr,
    CmdFailed,
    Unknown(u8),
}

impl From<u8> for AckCode {
    fn from(raw: u8) -> Self {
        match raw {
            0 => AckCode::NoErr,
            1 => AckCode::InvalidFnType,
            2 => AckCode::InvalidFnEnum,
            3 => AckCode::InvalidCmd,
            4 => AckCode::InternalErr,
            5 => AckCode::CmdFailed,
            raw => AckCode::Unknown(raw),
        }
    }
}
