
use ipc::MailboxSender;

use crate::error::{Error, Result};

const NUM_SLOTS: usize = 32;
const NUM_FN_TYPES: usize = 32;
const NUM_FN_COUNTS: usize = 15;

/// The sinks owned by the daemon for one registered channel. Dropping the
/// pair closes the underlying endpoints.
#[derive(Debug)]
pub struct SinkPair {
    pub cmd: MailboxSender,
    pub stream: Option<MailboxSender>,
}

/// Registration table mapping (slot, fn_type, fn_count) to the sinks of the
/// owning client.
///
/// A dense three-dimensional array rather than a list: the lookup sits on
/// the hot path of every inbound frame, and the three indices resolve an
/// entry without any search. Streaming boards deliver a frame every few
/// milliseconds, so the difference is measurable.
#[derive(Debug)]
pub struct RoutingTable {
    cells: Vec<Option<SinkPair>>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        RoutingTable::new()
    }
}

impl RoutingTable {
    pub fn new() -> Self {
        let mut cells = Vec::new();
        cells.resize_with(NUM_SLOTS * NUM_FN_TYPES * NUM_FN_COUNTS, || None);
        RoutingTable { cells }
    }

    /// Validates a channel triple and flattens it into a cell index.
    /// fn_count 0 is reserved and never a valid channel.
    fn index(slot: u8, fn_type: u8, fn_count: u8) -> Result<usize> {
        if slot as usize >= NUM_SLOTS
            || fn_type as usize >= NUM_FN_TYPES
            || fn_count == 0
            || fn_count as usize > NUM_FN_COUNTS
        {
            return Err(Error::ErrChannelOutOfRange);
        }

        Ok((slot as usize * NUM_FN_TYPES + fn_type as usize) * NUM_FN_COUNTS
            + (fn_count as usize - 1))
    }

    /// Moves `sinks` into the cell for the triple. Occupied cells are left
    /// untouched and reported as [`Error::ErrAlreadyRegistered`].
    pub fn register(&mut self, slot: u8, fn_type: u8, fn_count: u8, sinks: SinkPair) -> Result<()> {
        let ix = Self::index(slot, fn_type, fn_count)?;
        if self.cells[ix].is_some() {
            return Err(Error::ErrAlreadyRegistered);
        }

        self.cells[ix] = Some(sinks);
        Ok(())
    }

    /// Clears the cell for the triple, returning the sinks so the caller can
    /// observe them before they close.
    pub fn deregister(&mut self, slot: u8, fn_type: u8, fn_count: u8) -> Result<SinkPair> {
        let ix = Self::index(slot, fn_type, fn_count)?;
        self.cells[ix].take().ok_or(Error::ErrNotRegistered)
    }

    pub fn lookup(&self, slot: u8, fn_type: u8, fn_count: u8) -> Option<&SinkPair> {
        let ix = Self::index(slot, fn_type, fn_count).ok()?;
        self.cells[ix].as_ref()
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Deregisters everything, closing every sink. Returns how many entries
    /// were released.
    pub fn clear(&mut self) -> usize {
        let mut released = 0;
        for cell in &mut self.cells {
            if cell.take().is_some() {
                released += 1;
            }
        }
        released
    }
}
