//! Scripted serial port and hand-driven clock for engine tests

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use nexlink_hal::{Clock, ErrorType, SerialRx, SerialTx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError;

/// In-memory serial port
///
/// Bytes pushed with [`push_rx`](Self::push_rx) are returned by reads.
/// Replies scripted with [`reply_with`](Self::reply_with) are moved into
/// the receive buffer one per write, the way a display answers each
/// instruction it receives.
#[derive(Debug, Default)]
pub struct MockSerial {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    script: VecDeque<Vec<u8>>,
    fail_writes: bool,
    writes: usize,
}

impl MockSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Queue the reply to the next write
    pub fn reply_with(&mut self, bytes: &[u8]) {
        self.script.push_back(bytes.to_vec());
    }

    /// Make the next write produce no reply
    pub fn reply_silently(&mut self) {
        self.script.push_back(Vec::new());
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn take_written(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.tx)
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ErrorType for MockSerial {
    type Error = MockError;
}

impl SerialRx for MockSerial {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, MockError> {
        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl SerialTx for MockSerial {
    fn write_all(&mut self, data: &[u8]) -> Result<(), MockError> {
        if self.fail_writes {
            return Err(MockError);
        }
        self.writes += 1;
        self.tx.extend_from_slice(data);
        if let Some(reply) = self.script.pop_front() {
            self.rx.extend(reply);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), MockError> {
        Ok(())
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a test keeps one handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u32>>,
    /// Added on every call to `relax`
    relax_step: Rc<Cell<u32>>,
    /// Added on every call to `now_ms`
    read_step: Rc<Cell<u32>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set_relax_step(&self, ms: u32) {
        self.relax_step.set(ms);
    }

    pub fn set_read_step(&self, ms: u32) {
        self.read_step.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.advance(self.read_step.get());
        now
    }

    fn relax(&self) {
        self.advance(self.relax_step.get());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_reply_per_write() {
        let mut serial = MockSerial::new();
        serial.reply_with(&[0x01, 0xFF, 0xFF, 0xFF]);
        serial.write_all(b"ref 0").unwrap();
        serial.write_all(b"ref 1").unwrap();

        let mut buf = [0u8; 8];
        assert_eq!(serial.read_available(&mut buf), Ok(4));
        assert_eq!(&buf[..4], &[0x01, 0xFF, 0xFF, 0xFF]);
        assert_eq!(serial.read_available(&mut buf), Ok(0));
        assert_eq!(serial.writes(), 2);
    }

    #[test]
    fn test_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(5);
        assert_eq!(other.now_ms(), 5);
        other.set_relax_step(3);
        other.relax();
        assert_eq!(clock.now_ms(), 8);
    }
}
