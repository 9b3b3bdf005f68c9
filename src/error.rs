
use thiserror::Error;

use wire::func::AckCode;

pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of errors the communication core surfaces to device HALs.
/// Lower layers fold into it: codec violations become [`Error::ErrProtocol`]
/// or [`Error::ErrInvalidArgs`], mailbox failures become
/// [`Error::ErrTimeout`] or [`Error::ErrInternal`].
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    #[error("invalid arguments")]
    ErrInvalidArgs,
    #[error("call out of sequence (channel not open, or nothing to read)")]
    ErrInvalidSequence,
    #[error("timed out waiting for a response")]
    ErrTimeout,
    #[error("wire packet violated the protocol")]
    ErrProtocol,
    #[error("response failed CRC validation")]
    ErrWrongCrc,
    #[error("fragment assembly in progress")]
    ErrDataPending,
    #[error("remote device reported an internal error")]
    ErrDeviceInternal,
    #[error("allocation failed")]
    ErrMemory,
    #[error("pipe or driver failure")]
    ErrInternal,
    #[error("remote device rejected the command")]
    ErrCommandFailed,
}

impl Error {
    /// Whether the retry supervisor re-attempts a request that failed this
    /// way. Caller mistakes and definitive verdicts (bad arguments, CRC
    /// corruption, explicit device answers) are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ErrTimeout | Error::ErrProtocol | Error::ErrInternal | Error::ErrMemory
        )
    }

    /// Maps a device NACK status to the error returned to the caller, or
    /// `None` for a plain ACK.
    pub fn from_nack(code: AckCode) -> Option<Error> {
        match code {
            AckCode::NoErr => None,
            AckCode::CmdFailed => Some(Error::ErrCommandFailed),
            AckCode::InvalidFnType
            | AckCode::InvalidFnEnum
            | AckCode::InvalidCmd
            | AckCode::InternalErr
            | AckCode::Unknown(_) => Some(Error::ErrDeviceInternal),
        }
    }
}

impl From<wire::Error> for Error {
    fn from(err: wire::Error) -> Self {
        match err {
            wire::Error::ErrDataPending => Error::ErrDataPending,
            wire::Error::ErrWrongCrc => Error::ErrWrongCrc,
            wire::Error::ErrInvalidSequence => Error::ErrInvalidSequence,
            wire::Error::ErrSlotOutOfRange
            | wire::Error::ErrFnTypeOutOfRange
            | wire::Error::ErrFnCountOutOfRange
            | wire::Error::ErrEmptyPayload
            | wire::Error::ErrPayloadTooLarge
            | wire::Error::ErrEmptyReadBuffer
            | wire::Error::ErrCommandOutOfRange => Error::ErrInvalidArgs,
            _ => Error::ErrProtocol,
        }
    }
}

impl From<ipc::Error> for Error {
    fn from(err: ipc::Error) -> Self {
        match err {
            ipc::Error::ErrTimeout => Error::ErrTimeout,
            _ => Error::ErrInternal,
        }
    }
}
