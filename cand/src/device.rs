use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use async_trait::async_trait;
use tokio::io::unix::AsyncFd;

use crate::error::Result;

/// Default character device of the CAN line driver.
pub const DEFAULT_CAN_DEV_PATH: &str = "/dev/can1";

/// The daemon's view of the CAN line driver: two byte streams with one full
/// raw frame per syscall.
#[async_trait]
pub trait CanDevice {
    /// Reads at most one complete raw frame into `buf`. A return of 0 means
    /// the driver had nothing after all.
    async fn recv(&self, buf: &mut [u8]) -> Result<usize>;

    /// Writes one frame (CAN id bytes included) in a single syscall,
    /// returning the byte count the driver accepted. May suspend the caller
    /// until the driver queues the frame.
    async fn send(&self, frame: &[u8]) -> Result<usize>;
}

/// The real driver, opened twice: the receive side read-only and
/// non-blocking so it can sit in the daemon's multiplexed wait, the transmit
/// side write-only and blocking so a write returns once the driver has the
/// frame queued.
#[derive(Debug)]
pub struct RawCanDevice {
    rx: AsyncFd<File>,
    tx: File,
}

impl RawCanDevice {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let rx = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)?;
        let tx = OpenOptions::new().write(true).open(path)?;

        Ok(RawCanDevice {
            rx: AsyncFd::new(rx)?,
            tx,
        })
    }
}

#[async_trait]
impl CanDevice for RawCanDevice {
    async fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let mut guard = self.rx.readable().await?;
            match guard.try_io(|inner| {
                let mut file = inner.get_ref();
                file.read(buf)
            }) {
                Ok(result) => return Ok(result?),
                Err(_would_block) => continue,
            }
        }
    }

    async fn send(&self, frame: &[u8]) -> Result<usize> {
        Ok((&self.tx).write(frame)?)
    }
}
