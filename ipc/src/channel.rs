
use std::fs;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::PathBuf;

use tokio::net::UnixDatagram;
use tokio::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::mailbox::MailboxAddr;

/// Upper bound on one record; buffers on the receive side are sized with
/// this so a datagram is never truncated.
pub const MAX_RECORD_LEN: usize = 8192;

/// Whether a sender suspends the caller when the peer's queue is full or
/// surfaces [`Error::ErrWouldBlock`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    Blocking,
    Nonblocking,
}

/// The receive half of a mailbox. Binding claims the mailbox address;
/// dropping the receiver releases it.
#[derive(Debug)]
pub struct MailboxReceiver {
    addr: MailboxAddr,
    path: PathBuf,
    sock: UnixDatagram,
}

impl MailboxReceiver {
    /// Claims `addr` for receiving. A stale socket file left behind by a
    /// crashed owner is replaced.
    pub fn bind(addr: MailboxAddr) -> Result<Self> {
        let path = addr.socket_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let sock = match UnixDatagram::bind(&path) {
            Ok(sock) => sock,
            Err(err) if err.kind() == io::ErrorKind::AddrInUse => {
                log::warn!("mailbox {addr}: replacing stale socket at {}", path.display());
                fs::remove_file(&path)?;
                UnixDatagram::bind(&path)?
            }
            Err(err) => return Err(err.into()),
        };

        Ok(MailboxReceiver { addr, path, sock })
    }

    pub fn addr(&self) -> MailboxAddr {
        self.addr
    }

    /// Waits for one record and copies it into `buf`, returning its length.
    pub async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.sock.recv(buf).await?)
    }

    /// Waits up to `timeout` for one record. On success returns the record
    /// length together with the unused part of the budget, so callers
    /// spreading one deadline over several receives can subtract accurately.
    pub async fn recv_timeout(
        &self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(usize, Duration)> {
        let start = Instant::now();
        match tokio::time::timeout(timeout, self.sock.recv(buf)).await {
            Ok(Ok(n)) => Ok((n, timeout.saturating_sub(start.elapsed()))),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(Error::ErrTimeout),
        }
    }

    /// Discards every queued record, returning how many were dropped.
    pub fn flush(&self) -> Result<usize> {
        let mut scratch = [0u8; MAX_RECORD_LEN];
        let mut dropped = 0;
        loop {
            match self.sock.try_recv(&mut scratch) {
                Ok(_) => dropped += 1,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(dropped),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Raw descriptor for callers multiplexing this mailbox externally.
    pub fn fd(&self) -> RawFd {
        self.sock.as_raw_fd()
    }
}

impl Drop for MailboxReceiver {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != io::ErrorKind::NotFound {
                log::warn!("mailbox {}: failed to unlink socket: {err}", self.addr);
            }
        }
    }
}

/// The send half of a mailbox, connected to a bound receiver.
#[derive(Debug)]
pub struct MailboxSender {
    addr: MailboxAddr,
    sock: UnixDatagram,
    mode: SendMode,
}

impl MailboxSender {
    /// Connects to the receiver currently bound at `addr`. Fails if the
    /// mailbox has not been claimed.
    pub fn connect(addr: MailboxAddr, mode: SendMode) -> Result<Self> {
        let sock = UnixDatagram::unbound()?;
        sock.connect(addr.socket_path())
            .map_err(Error::from_send_io)?;
        Ok(MailboxSender { addr, sock, mode })
    }

    pub fn addr(&self) -> MailboxAddr {
        self.addr
    }

    /// Transmits `record` as one unit. In nonblocking mode a full peer queue
    /// surfaces [`Error::ErrWouldBlock`] without suspending the caller.
    pub async fn send(&self, record: &[u8]) -> Result<usize> {
        if record.len() > MAX_RECORD_LEN {
            return Err(Error::ErrRecordTooLarge);
        }

        match self.mode {
            SendMode::Blocking => self.sock.send(record).await.map_err(Error::from_send_io),
            SendMode::Nonblocking => self.try_send(record),
        }
    }

    /// Single non-suspending transmission attempt, regardless of mode.
    pub fn try_send(&self, record: &[u8]) -> Result<usize> {
        if record.len() > MAX_RECORD_LEN {
            return Err(Error::ErrRecordTooLarge);
        }
        self.sock.try_send(record).map_err(Error::from_send_io)
    }

    pub fn fd(&self) -> RawFd {
        self.sock.as_raw_fd()
    }
}
