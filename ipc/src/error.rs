use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("receive timed out")]
    ErrTimeout,
    #[error("peer mailbox is not draining")]
    ErrWouldBlock,
    #[error("peer mailbox is gone")]
    ErrPeerClosed,
    #[error("record exceeds the maximum record size")]
    ErrRecordTooLarge,
    #[error("io error: {0}")]
    ErrIo(#[from] io::Error),
}

impl Error {
    /// Folds the io error kinds that mean "nobody is listening any more"
    /// into [`Error::ErrPeerClosed`] and would-block into
    /// [`Error::ErrWouldBlock`].
    pub(crate) fn from_send_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock => Error::ErrWouldBlock,
            io::ErrorKind::NotFound
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe => Error::ErrPeerClosed,
            _ => Error::ErrIo(err),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ErrTimeout)
    }

    pub fn is_would_block(&self) -> bool {
        matches!(self, Error::ErrWouldBlock)
    }
}
