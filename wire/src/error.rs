use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("slot id out of range (max 31)")]
    ErrSlotOutOfRange,
    #[error("function type out of range (max 31)")]
    ErrFnTypeOutOfRange,
    #[error("function count out of range (max 15)")]
    ErrFnCountOutOfRange,

    #[error("raw is too small for an address header")]
    ErrAddrTooShort,
    #[error("frame length outside 2..=8 bytes")]
    ErrFrameLength,

    #[error("payload is empty")]
    ErrEmptyPayload,
    #[error("payload larger than the maximum message size")]
    ErrPayloadTooLarge,
    #[error("buffer to read into is empty")]
    ErrEmptyReadBuffer,

    #[error("fragment assembly in progress")]
    ErrDataPending,
    #[error("reassembled message failed CRC validation")]
    ErrWrongCrc,
    #[error("no assembled message to read")]
    ErrInvalidSequence,

    #[error("record is too small for its header")]
    ErrRecordTooShort,
    #[error("unknown record type `{tag}`")]
    ErrUnknownRecordType { tag: u8 },
    #[error("record self-reported length exceeds remaining data")]
    ErrRecordLength,

    #[error("command value does not fit in 7 bits")]
    ErrCommandOutOfRange,
}
