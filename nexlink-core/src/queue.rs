//! Command correlation queue
//!
//! The display answers instructions strictly in the order it receives
//! them, so the oldest outstanding command is always the one a reply
//! belongs to. The queue is a fixed-capacity ring; each entry is tagged
//! with a wrapping sequence index so blocking callers can tell when their
//! command has been consumed without inspecting slot contents.
//!
//! Overflow policy: an enqueue against a full queue is rejected and the
//! queue is left untouched.

use heapless::Deque;

use crate::command::{PendingCommand, Seq};

/// Returned when the queue already holds its capacity of commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QueueFull;

/// Fixed-capacity FIFO of outstanding commands
pub struct CommandQueue<C, const N: usize> {
    entries: Deque<PendingCommand<C>, N>,
    /// Sequence index of the entry at the front
    read: Seq,
    /// Sequence index the next enqueue receives
    write: Seq,
}

impl<C, const N: usize> Default for CommandQueue<C, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, const N: usize> CommandQueue<C, N> {
    /// Create an empty queue
    pub const fn new() -> Self {
        Self {
            entries: Deque::new(),
            read: Seq(0),
            write: Seq(0),
        }
    }

    /// Append a command, returning its sequence index
    pub fn enqueue(&mut self, command: PendingCommand<C>) -> Result<Seq, QueueFull> {
        self.entries.push_back(command).map_err(|_| QueueFull)?;
        let seq = self.write;
        self.write = self.write.next();
        Ok(seq)
    }

    /// Remove and return the oldest command
    pub fn dequeue(&mut self) -> Option<PendingCommand<C>> {
        let command = self.entries.pop_front()?;
        self.read = self.read.next();
        Some(command)
    }

    /// Oldest command, without removing it
    pub fn peek(&self) -> Option<&PendingCommand<C>> {
        self.entries.front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Sequence index the next enqueue will receive
    pub fn next_seq(&self) -> Seq {
        self.write
    }

    /// Whether the command issued as `seq` has left the queue
    ///
    /// True once the dequeue cursor has moved past `seq`, whether the
    /// command was serviced, expired or drained by a reset.
    pub fn passed_index(&self, seq: Seq) -> bool {
        self.read.is_after(seq)
    }

    /// Remove every command, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let mut drained = 0;
        while self.dequeue().is_some() {
            drained += 1;
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Request;
    use proptest::prelude::*;

    fn command(tag: u8) -> PendingCommand<u8> {
        Request::finished(tag).into_pending(100, None)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue: CommandQueue<u8, 4> = CommandQueue::new();
        assert!(queue.is_empty());
        queue.enqueue(command(1)).unwrap();
        queue.enqueue(command(2)).unwrap();
        queue.enqueue(command(3)).unwrap();

        assert_eq!(queue.peek().map(|c| c.context), Some(1));
        assert_eq!(queue.dequeue().map(|c| c.context), Some(1));
        assert_eq!(queue.dequeue().map(|c| c.context), Some(2));
        assert_eq!(queue.dequeue().map(|c| c.context), Some(3));
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn test_full_queue_rejects() {
        let mut queue: CommandQueue<u8, 2> = CommandQueue::new();
        assert_eq!(queue.enqueue(command(1)), Ok(Seq(0)));
        assert_eq!(queue.enqueue(command(2)), Ok(Seq(1)));
        assert!(queue.is_full());
        assert_eq!(queue.enqueue(command(3)), Err(QueueFull));

        // Rejected enqueue consumed no sequence index and left entries alone
        assert_eq!(queue.next_seq(), Seq(2));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dequeue().map(|c| c.context), Some(1));
        assert_eq!(queue.dequeue().map(|c| c.context), Some(2));
    }

    #[test]
    fn test_passed_index() {
        let mut queue: CommandQueue<u8, 4> = CommandQueue::new();
        let a = queue.enqueue(command(1)).unwrap();
        let b = queue.enqueue(command(2)).unwrap();
        assert!(!queue.passed_index(a));
        assert!(!queue.passed_index(b));

        queue.dequeue();
        assert!(queue.passed_index(a));
        assert!(!queue.passed_index(b));

        queue.dequeue();
        assert!(queue.passed_index(b));
    }

    #[test]
    fn test_passed_index_across_wrap() {
        let mut queue: CommandQueue<u8, 4> = CommandQueue::new();
        queue.read = Seq(u16::MAX - 1);
        queue.write = Seq(u16::MAX - 1);

        let a = queue.enqueue(command(1)).unwrap();
        let b = queue.enqueue(command(2)).unwrap();
        let c = queue.enqueue(command(3)).unwrap();
        assert_eq!(c, Seq(0));

        queue.dequeue();
        queue.dequeue();
        assert!(queue.passed_index(a));
        assert!(queue.passed_index(b));
        assert!(!queue.passed_index(c));

        queue.dequeue();
        assert!(queue.passed_index(c));
    }

    #[test]
    fn test_clear() {
        let mut queue: CommandQueue<u8, 4> = CommandQueue::new();
        let a = queue.enqueue(command(1)).unwrap();
        queue.enqueue(command(2)).unwrap();
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert!(queue.passed_index(a));
    }

    proptest! {
        #[test]
        fn prop_dequeue_preserves_issue_order(tags in proptest::collection::vec(any::<u8>(), 0..=8)) {
            let mut queue: CommandQueue<u8, 8> = CommandQueue::new();
            for &tag in &tags {
                prop_assert!(queue.enqueue(command(tag)).is_ok());
            }
            for &tag in &tags {
                prop_assert_eq!(queue.dequeue().map(|c| c.context), Some(tag));
            }
            prop_assert!(queue.is_empty());
        }
    }
}
