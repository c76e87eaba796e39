//! Blocking and async request/reply exchanges
//!
//! A wait reserves a response record, issues its command through the
//! same queue as non-blocking traffic, then keeps ticking the engine
//! until the queue's read cursor has moved past the command. Frames for
//! commands issued earlier are dispatched to their own handlers along
//! the way, so ordering is preserved.
//!
//! Handlers are plain `fn` pointers and the engine is borrowed mutably
//! for the whole wait, so no handler can start a second wait on the same
//! engine while one is in progress.

use embassy_futures::yield_now;
use nexlink_hal::{deadline_reached, Clock, Serial};
use nexlink_protocol::codes::{
    CMD_FINISHED_OK, TRANSPARENT_DATA_FINISHED, TRANSPARENT_DATA_READY,
};
use nexlink_protocol::Message;

use crate::command::{Request, Seq, TextFraming};
use crate::engine::{Engine, Outbound};
use crate::error::{EngineError, RequestError};
use crate::response::SlotRef;

/// A wait in progress
struct Wait {
    seq: Seq,
    slot: SlotRef,
    /// Wall-clock point after which the wait stops ticking
    give_up: u32,
}

impl<S, K, C, const Q: usize, const R: usize> Engine<S, K, C, Q, R>
where
    S: Serial,
    K: Clock,
    C: Copy + Default,
{
    /// Send `command` and wait for the return code `expected`
    pub fn request_ack(&mut self, command: &str, expected: u8) -> Result<(), RequestError<S::Error>> {
        let wait = self.begin(Outbound::Command(command), Request::ack(expected, C::default()))?;
        self.block(&wait)?;
        self.conclude(&wait, |message, len| expect_ack(message, len, expected))
    }

    /// Send `command` and wait for `0x01` (instruction finished)
    pub fn request_command_finished(&mut self, command: &str) -> Result<(), RequestError<S::Error>> {
        self.request_ack(command, CMD_FINISHED_OK)
    }

    /// Send `command` and wait for a numeric reply
    pub fn request_number(&mut self, command: &str) -> Result<i32, RequestError<S::Error>> {
        let wait = self.begin(Outbound::Command(command), Request::number(C::default()))?;
        self.block(&wait)?;
        self.conclude(&wait, expect_number)
    }

    /// Send `command` and copy the string reply into `out`
    ///
    /// Returns the number of bytes written.
    pub fn request_text(
        &mut self,
        command: &str,
        framing: TextFraming,
        out: &mut [u8],
    ) -> Result<usize, RequestError<S::Error>> {
        let wait = self.begin(Outbound::Command(command), Request::text(framing, C::default()))?;
        self.block(&wait)?;
        self.conclude(&wait, |message, len| expect_text(message, len, framing, out))
    }

    /// Send a transparent-mode command (`addt`, `wept`, ...) and wait for `0xFE`
    pub fn wait_transparent_ready(&mut self, command: &str) -> Result<(), RequestError<S::Error>> {
        let request = self.transparent_request(TRANSPARENT_DATA_READY);
        let wait = self.begin(Outbound::Command(command), request)?;
        self.block(&wait)?;
        self.conclude(&wait, |message, len| {
            expect_ack(message, len, TRANSPARENT_DATA_READY)
        })
    }

    /// Send the raw transparent data and wait for `0xFD`
    pub fn wait_transparent_finished(&mut self, data: &[u8]) -> Result<(), RequestError<S::Error>> {
        let request = self.transparent_request(TRANSPARENT_DATA_FINISHED);
        let wait = self.begin(Outbound::Raw(data), request)?;
        self.block(&wait)?;
        self.conclude(&wait, |message, len| {
            expect_ack(message, len, TRANSPARENT_DATA_FINISHED)
        })
    }

    /// Async [`request_ack`](Self::request_ack)
    pub async fn request_ack_async(
        &mut self,
        command: &str,
        expected: u8,
    ) -> Result<(), RequestError<S::Error>> {
        let wait = self.begin(Outbound::Command(command), Request::ack(expected, C::default()))?;
        self.yield_until(&wait).await?;
        self.conclude(&wait, |message, len| expect_ack(message, len, expected))
    }

    /// Async [`request_command_finished`](Self::request_command_finished)
    pub async fn request_command_finished_async(
        &mut self,
        command: &str,
    ) -> Result<(), RequestError<S::Error>> {
        self.request_ack_async(command, CMD_FINISHED_OK).await
    }

    /// Async [`request_number`](Self::request_number)
    pub async fn request_number_async(&mut self, command: &str) -> Result<i32, RequestError<S::Error>> {
        let wait = self.begin(Outbound::Command(command), Request::number(C::default()))?;
        self.yield_until(&wait).await?;
        self.conclude(&wait, expect_number)
    }

    /// Async [`request_text`](Self::request_text)
    pub async fn request_text_async(
        &mut self,
        command: &str,
        framing: TextFraming,
        out: &mut [u8],
    ) -> Result<usize, RequestError<S::Error>> {
        let wait = self.begin(Outbound::Command(command), Request::text(framing, C::default()))?;
        self.yield_until(&wait).await?;
        self.conclude(&wait, |message, len| expect_text(message, len, framing, out))
    }

    fn transparent_request(&self, expected: u8) -> Request<C> {
        Request::ack(expected, C::default()).timeout_ms(self.config.transparent_timeout_ms)
    }

    fn begin(&mut self, outbound: Outbound<'_>, request: Request<C>) -> Result<Wait, RequestError<S::Error>> {
        let issued = self.issue(outbound, request, true)?;
        let Some(slot) = issued.slot else {
            return Err(RequestError::Engine(EngineError::StoreFull));
        };
        Ok(Wait {
            seq: issued.seq,
            slot,
            give_up: issued.deadline.wrapping_add(self.config.blocking_grace_ms),
        })
    }

    /// Tick once; true when the wait's command has left the queue
    ///
    /// On error the wait's record is released.
    fn poll_wait(&mut self, wait: &Wait) -> Result<bool, RequestError<S::Error>> {
        if let Err(e) = self.tick() {
            self.store.release(wait.slot);
            return Err(RequestError::Engine(EngineError::Serial(e)));
        }
        if self.queue.passed_index(wait.seq) {
            return Ok(true);
        }
        if deadline_reached(self.clock.now_ms(), wait.give_up) {
            warn!("wait for seq {} abandoned", wait.seq.0);
            self.store.release(wait.slot);
            return Err(RequestError::Timeout);
        }
        Ok(false)
    }

    fn block(&mut self, wait: &Wait) -> Result<(), RequestError<S::Error>> {
        while !self.poll_wait(wait)? {
            self.clock.relax();
        }
        Ok(())
    }

    async fn yield_until(&mut self, wait: &Wait) -> Result<(), RequestError<S::Error>> {
        while !self.poll_wait(wait)? {
            yield_now().await;
        }
        Ok(())
    }

    /// Decode the captured reply and release its record
    ///
    /// A command that left the queue without a captured reply was
    /// reclaimed by the sweeper or drained by a reset.
    fn conclude<T>(
        &mut self,
        wait: &Wait,
        decode: impl FnOnce(Message<'_>, usize) -> Result<T, RequestError<S::Error>>,
    ) -> Result<T, RequestError<S::Error>> {
        let result = match self.store.get(wait.slot) {
            Some(record) => {
                let frame = record.bytes();
                decode(Message::classify(frame), frame.len())
            }
            None => Err(RequestError::Timeout),
        };
        self.store.release(wait.slot);
        result
    }
}

fn expect_ack<E>(message: Message<'_>, len: usize, expected: u8) -> Result<(), RequestError<E>> {
    match message {
        Message::Return(code) if code == expected => Ok(()),
        other => Err(RequestError::Unexpected {
            code: other.code(),
            len,
        }),
    }
}

fn expect_number<E>(message: Message<'_>, len: usize) -> Result<i32, RequestError<E>> {
    match message {
        Message::Number(value) => Ok(value),
        other => Err(RequestError::Unexpected {
            code: other.code(),
            len,
        }),
    }
}

fn expect_text<E>(
    message: Message<'_>,
    len: usize,
    framing: TextFraming,
    out: &mut [u8],
) -> Result<usize, RequestError<E>> {
    let text = match (message, framing) {
        (Message::Text(text), _) => text,
        (Message::Unclassified(text), TextFraming::Headless) => text,
        (other, _) => {
            return Err(RequestError::Unexpected {
                code: other.code(),
                len,
            })
        }
    };
    let dest = out
        .get_mut(..text.len())
        .ok_or(RequestError::BufferTooSmall)?;
    dest.copy_from_slice(text);
    Ok(text.len())
}
