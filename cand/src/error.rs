use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("channel address out of range")]
    ErrChannelOutOfRange,
    #[error("channel is already registered")]
    ErrAlreadyRegistered,
    #[error("channel is not registered")]
    ErrNotRegistered,
    #[error("short write to the CAN driver: {written} of {expected} bytes")]
    ErrShortWrite { written: usize, expected: usize },

    #[error("wire: {0}")]
    Wire(#[from] wire::Error),
    #[error("ipc: {0}")]
    Ipc(#[from] ipc::Error),
    #[error("io: {0}")]
    Io(#[from] io::Error),
}
