//! Response store for blocking waits
//!
//! A blocking call reserves a record before it sends its command; the
//! dispatcher copies the raw reply frame into that record when the
//! command is serviced, and the waiting caller reads it once.
//!
//! Records are handed out in ring order. Each record remembers which
//! sequence index reserved it, so a late reply for an abandoned wait can
//! never land in a record that has since been handed to someone else.

use nexlink_protocol::MAX_FRAME_SIZE;

use crate::command::Seq;

/// Largest frame a record can hold
pub const RECORD_SIZE: usize = MAX_FRAME_SIZE;

/// Returned when the next record in ring order is still in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoreFull;

/// Reference from a pending command to its reserved record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotRef {
    index: usize,
    seq: Seq,
}

impl SlotRef {
    /// Sequence index of the command that reserved the record
    pub fn seq(&self) -> Seq {
        self.seq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordState {
    Free,
    Reserved,
    Filled,
}

/// Raw reply bytes captured for one command
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    bytes: [u8; RECORD_SIZE],
    len: usize,
    owner: Seq,
    state: RecordState,
}

impl ResponseRecord {
    const EMPTY: Self = Self {
        bytes: [0u8; RECORD_SIZE],
        len: 0,
        owner: Seq(0),
        state: RecordState::Free,
    };

    /// Captured frame bytes, terminator included
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    fn owned_by(&self, slot: SlotRef) -> bool {
        self.state != RecordState::Free && self.owner == slot.seq
    }
}

/// Fixed ring of response records
pub struct ResponseStore<const N: usize> {
    records: [ResponseRecord; N],
    write: usize,
}

impl<const N: usize> Default for ResponseStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ResponseStore<N> {
    /// Create a store with every record free
    pub const fn new() -> Self {
        Self {
            records: [ResponseRecord::EMPTY; N],
            write: 0,
        }
    }

    /// Reserve the next record in ring order for command `seq`
    ///
    /// Fails without side effects if that record has not been released.
    pub fn reserve(&mut self, seq: Seq) -> Result<SlotRef, StoreFull> {
        if N == 0 {
            return Err(StoreFull);
        }
        let index = self.write;
        let record = &mut self.records[index];
        if record.state != RecordState::Free {
            return Err(StoreFull);
        }

        record.state = RecordState::Reserved;
        record.owner = seq;
        record.len = 0;
        self.write = (index + 1) % N;
        Ok(SlotRef { index, seq })
    }

    /// Copy a reply frame into a reserved record
    ///
    /// Returns false if the record is no longer reserved for `slot`. Frames
    /// longer than [`RECORD_SIZE`] are truncated.
    pub fn store(&mut self, slot: SlotRef, frame: &[u8]) -> bool {
        let Some(record) = self.records.get_mut(slot.index) else {
            return false;
        };
        if record.state != RecordState::Reserved || record.owner != slot.seq {
            return false;
        }

        let len = frame.len().min(RECORD_SIZE);
        record.bytes[..len].copy_from_slice(&frame[..len]);
        record.len = len;
        record.state = RecordState::Filled;
        true
    }

    /// Captured reply for `slot`, if the dispatcher has filled it
    pub fn get(&self, slot: SlotRef) -> Option<&ResponseRecord> {
        self.records
            .get(slot.index)
            .filter(|r| r.state == RecordState::Filled && r.owner == slot.seq)
    }

    /// Give a record back to the ring
    pub fn release(&mut self, slot: SlotRef) {
        if let Some(record) = self.records.get_mut(slot.index) {
            if record.owned_by(slot) {
                record.state = RecordState::Free;
                record.len = 0;
            }
        }
    }

    /// Free every record
    pub fn clear(&mut self) {
        for record in self.records.iter_mut() {
            record.state = RecordState::Free;
            record.len = 0;
        }
        self.write = 0;
    }

    /// Number of records currently reserved or filled
    pub fn in_use(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.state != RecordState::Free)
            .count()
    }
}
