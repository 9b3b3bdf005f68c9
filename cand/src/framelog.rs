
use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use wire::frame::fmt_frame;
use wire::DeviceAddr;

/// How many frame summaries the trace ring keeps by default.
pub const DEFAULT_CAPACITY: usize = 512;

/// Where a SIGUSR1 dump lands.
pub const DUMP_PATH: &str = "/tmp/candlog.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rx => write!(f, "RX"),
            Direction::Tx => write!(f, "TX"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrameEntry {
    pub direction: Direction,
    pub slot: u8,
    pub fn_type: u8,
    pub fn_count: u8,
    pub data: Vec<u8>,
}

impl fmt::Display for FrameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{}:{} {}",
            self.direction,
            self.slot,
            self.fn_type,
            self.fn_count,
            fmt_frame(&self.data)
        )
    }
}

/// Bounded in-memory trace of recent traffic, dumped to a file on demand.
/// Keeping it off the hot logging path means tracing stays cheap enough to
/// leave enabled on a production instrument.
#[derive(Debug)]
pub struct FrameLog {
    entries: VecDeque<FrameEntry>,
    capacity: usize,
}

impl Default for FrameLog {
    fn default() -> Self {
        FrameLog::new(DEFAULT_CAPACITY)
    }
}

impl FrameLog {
    pub fn new(capacity: usize) -> Self {
        FrameLog {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record_rx(&mut self, addr: &DeviceAddr, data: &[u8]) {
        self.push(FrameEntry {
            direction: Direction::Rx,
            slot: addr.slot(),
            fn_type: addr.fn_type(),
            fn_count: addr.fn_count(),
            data: data.to_vec(),
        });
    }

    pub fn record_tx(&mut self, addr: &DeviceAddr, data: &[u8]) {
        self.push(FrameEntry {
            direction: Direction::Tx,
            slot: addr.slot(),
            fn_type: addr.fn_type(),
            fn_count: addr.fn_count(),
            data: data.to_vec(),
        });
    }

    fn push(&mut self, entry: FrameEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the ring, oldest first, to `path` and clears it.
    pub fn dump_to(&mut self, path: impl AsRef<Path>) -> io::Result<PathBuf> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::create(&path)?;
        for entry in &self.entries {
            writeln!(file, "{entry}")?;
        }
        self.entries.clear();
        Ok(path)
    }

    pub fn dump(&mut self) -> io::Result<PathBuf> {
        self.dump_to(DUMP_PATH)
    }
}
