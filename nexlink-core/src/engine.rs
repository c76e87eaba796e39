//! Display link engine
//!
//! Owns the serial port, the clock and every piece of correlation state.
//! The host calls [`Engine::tick`] from its main loop; each tick drains
//! whatever bytes the UART has buffered, dispatches complete frames and
//! reclaims at most one expired command.

use core::fmt::Write;

use heapless::String;
use nexlink_hal::{deadline_reached, Clock, Serial};
use nexlink_protocol::{
    encode_command_to_vec, Coordinate, FrameDecoder, FrameError, Touch, MAX_COMMAND_LEN,
};

use crate::command::{CommandKind, Failure, Request, Seq};
use crate::config::{EngineConfig, DEFAULT_QUEUE_DEPTH, DEFAULT_STORE_DEPTH};
use crate::dispatch::{dispatch, EventHandlers, Outcome};
use crate::error::EngineError;
use crate::queue::CommandQueue;
use crate::response::{ResponseStore, SlotRef};

/// Bytes pulled from the UART per read
const RX_CHUNK: usize = 32;

/// Running counters since the engine was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Complete frames dispatched
    pub frames: u32,
    /// Frames that matched no handler or command
    pub dropped: u32,
    /// Oversized frames discarded by the decoder
    pub overflows: u32,
    /// Commands reclaimed by the sweeper
    pub timeouts: u32,
}

/// What one [`Engine::tick`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Complete frames dispatched
    pub frames: usize,
    /// Commands reclaimed as timed out
    pub expired: usize,
}

/// What goes on the wire when a command is issued
#[derive(Debug, Clone, Copy)]
pub(crate) enum Outbound<'a> {
    /// Instruction text, terminator appended
    Command(&'a str),
    /// Bytes written as-is
    Raw(&'a [u8]),
}

/// Bookkeeping for a command that was written and queued
#[derive(Debug, Clone, Copy)]
pub(crate) struct Issued {
    pub seq: Seq,
    pub slot: Option<SlotRef>,
    pub deadline: u32,
}

/// Command/reply engine for one display link
///
/// `C` is the context value handed back to command handlers. `Q` and `R`
/// size the command queue and the response store. Name the type with its
/// defaults to pick them up:
///
/// ```ignore
/// let mut display: Engine<Uart, Timer> = Engine::new(uart, Timer, EngineConfig::default());
/// ```
pub struct Engine<
    S,
    K,
    C = (),
    const Q: usize = DEFAULT_QUEUE_DEPTH,
    const R: usize = DEFAULT_STORE_DEPTH,
> {
    pub(crate) serial: S,
    pub(crate) clock: K,
    pub(crate) config: EngineConfig,
    decoder: FrameDecoder,
    pub(crate) queue: CommandQueue<C, Q>,
    pub(crate) store: ResponseStore<R>,
    handlers: EventHandlers,
    stats: Stats,
}

impl<S, K, C, const Q: usize, const R: usize> Engine<S, K, C, Q, R>
where
    S: Serial,
    K: Clock,
    C: Copy,
{
    /// Create an engine with empty queue and store
    pub fn new(serial: S, clock: K, config: EngineConfig) -> Self {
        Self {
            serial,
            clock,
            config,
            decoder: FrameDecoder::new(),
            queue: CommandQueue::new(),
            store: ResponseStore::new(),
            handlers: EventHandlers::default(),
            stats: Stats::default(),
        }
    }

    /// Give back the serial port and clock
    pub fn into_parts(self) -> (S, K) {
        (self.serial, self.clock)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the timeouts used for commands issued from now on
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    // Outbound

    /// Write an instruction that expects no tracked reply
    pub fn send(&mut self, command: &str) -> Result<(), EngineError<S::Error>> {
        let frame = encode_command_to_vec(command)?;
        trace!("send {} bytes", frame.len());
        self.write(&frame)
    }

    /// Write raw bytes, as used for transparent data uploads
    pub fn send_raw(&mut self, data: &[u8]) -> Result<(), EngineError<S::Error>> {
        self.write(data)
    }

    /// Write an instruction and track its reply
    ///
    /// The request's handlers fire from a later [`tick`](Self::tick) once
    /// the reply arrives or the deadline passes. Nothing is written if the
    /// queue is full.
    pub fn submit(&mut self, command: &str, request: Request<C>) -> Result<Seq, EngineError<S::Error>> {
        self.issue(Outbound::Command(command), request, false)
            .map(|issued| issued.seq)
    }

    /// Assign a string attribute: `field="value"`
    pub fn set_text(
        &mut self,
        field: &str,
        value: &str,
        request: Request<C>,
    ) -> Result<Seq, EngineError<S::Error>> {
        let mut command: String<MAX_COMMAND_LEN> = String::new();
        write!(command, "{}=\"{}\"", field, value)
            .map_err(|_| EngineError::Frame(FrameError::CommandTooLong))?;
        self.submit(&command, request)
    }

    /// Assign a numeric attribute: `field=value`
    pub fn set_number(
        &mut self,
        field: &str,
        value: i32,
        request: Request<C>,
    ) -> Result<Seq, EngineError<S::Error>> {
        let mut command: String<MAX_COMMAND_LEN> = String::new();
        write!(command, "{}={}", field, value)
            .map_err(|_| EngineError::Frame(FrameError::CommandTooLong))?;
        self.submit(&command, request)
    }

    /// Read a string attribute
    ///
    /// `request` should be built with [`Request::text`].
    pub fn get_text(&mut self, field: &str, request: Request<C>) -> Result<Seq, EngineError<S::Error>> {
        self.submit_get(field, request)
    }

    /// Read a numeric attribute
    ///
    /// `request` should be built with [`Request::number`].
    pub fn get_number(&mut self, field: &str, request: Request<C>) -> Result<Seq, EngineError<S::Error>> {
        self.submit_get(field, request)
    }

    fn submit_get(&mut self, field: &str, request: Request<C>) -> Result<Seq, EngineError<S::Error>> {
        let mut command: String<MAX_COMMAND_LEN> = String::new();
        write!(command, "get {}", field)
            .map_err(|_| EngineError::Frame(FrameError::CommandTooLong))?;
        self.submit(&command, request)
    }

    /// Write `outbound` and queue `request` behind it
    ///
    /// With `capture` set a response record is reserved first so the raw
    /// reply can be read back by a blocking wait. Every check that can
    /// fail runs before anything is written.
    pub(crate) fn issue(
        &mut self,
        outbound: Outbound<'_>,
        request: Request<C>,
        capture: bool,
    ) -> Result<Issued, EngineError<S::Error>> {
        if self.queue.is_full() {
            warn!("command queue full, rejecting");
            return Err(EngineError::QueueFull);
        }

        let frame = match outbound {
            Outbound::Command(text) => Some(encode_command_to_vec(text)?),
            Outbound::Raw(_) => None,
        };

        let seq = self.queue.next_seq();
        let slot = if capture {
            match self.store.reserve(seq) {
                Ok(slot) => Some(slot),
                Err(_) => {
                    warn!("response store full, rejecting");
                    return Err(EngineError::StoreFull);
                }
            }
        } else {
            None
        };

        let written = match (&frame, outbound) {
            (Some(frame), _) => self.write(frame),
            (None, Outbound::Raw(data)) => self.write(data),
            (None, Outbound::Command(_)) => Ok(()),
        };
        if let Err(e) = written {
            if let Some(slot) = slot {
                self.store.release(slot);
            }
            return Err(e);
        }

        let timeout = request
            .timeout_ms
            .unwrap_or_else(|| self.default_timeout(request.kind()));
        let deadline = self.clock.now_ms().wrapping_add(timeout);
        let seq = self.queue.enqueue(request.into_pending(deadline, slot))?;
        debug!("queued seq {}, deadline {}", seq.0, deadline);

        Ok(Issued {
            seq,
            slot,
            deadline,
        })
    }

    fn default_timeout(&self, kind: CommandKind) -> u32 {
        match kind {
            CommandKind::Command => self.config.command_timeout_ms,
            CommandKind::Number | CommandKind::StringWithHeader | CommandKind::StringHeadless => {
                self.config.return_timeout_ms
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), EngineError<S::Error>> {
        self.serial.write_all(data).map_err(EngineError::Serial)?;
        self.serial.flush().map_err(EngineError::Serial)
    }

    // Inbound

    /// Drain the UART, dispatch complete frames, then reclaim one expired command
    pub fn tick(&mut self) -> Result<TickReport, S::Error> {
        let mut report = TickReport::default();
        let mut buf = [0u8; RX_CHUNK];

        loop {
            let n = self.serial.read_available(&mut buf)?;
            if n == 0 {
                break;
            }
            report.frames += self.ingest(&buf[..n]);
            if n < buf.len() {
                break;
            }
        }

        if self.sweep_expired() {
            report.expired = 1;
        }
        Ok(report)
    }

    /// Decode and dispatch bytes received outside [`tick`](Self::tick)
    ///
    /// Returns the number of complete frames dispatched.
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        self.ingest(bytes)
    }

    fn ingest(&mut self, bytes: &[u8]) -> usize {
        let mut frames = 0;
        for &byte in bytes {
            match self.decoder.feed(byte) {
                Ok(Some(frame)) => {
                    frames += 1;
                    self.stats.frames = self.stats.frames.wrapping_add(1);
                    let outcome = dispatch(frame, &mut self.queue, &mut self.store, &self.handlers);
                    if outcome == Outcome::Dropped {
                        self.stats.dropped = self.stats.dropped.wrapping_add(1);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("frame discarded: {}", e);
                    self.stats.overflows = self.stats.overflows.wrapping_add(1);
                }
            }
        }
        frames
    }

    /// Fail the oldest command if its deadline has passed
    ///
    /// Only the head is checked; the queue is in issue order, so a stale
    /// command further back is reclaimed on a later tick.
    pub fn sweep_expired(&mut self) -> bool {
        let now = self.clock.now_ms();
        let expired = matches!(
            self.queue.peek(),
            Some(command) if deadline_reached(now, command.deadline)
        );
        if !expired {
            return false;
        }
        let Some(command) = self.queue.dequeue() else {
            return false;
        };

        if let Some(slot) = command.slot {
            self.store.release(slot);
        }
        self.stats.timeouts = self.stats.timeouts.wrapping_add(1);
        warn!("command expecting {=u8:#x} timed out", command.expected);
        command.fail(Failure::Timeout);
        true
    }

    /// Drop all in-flight state to resynchronise with the display
    ///
    /// Pending commands are discarded without invoking their handlers.
    /// Returns how many were discarded.
    pub fn reset(&mut self) -> usize {
        self.decoder.reset();
        self.store.clear();
        let drained = self.queue.clear();
        info!("engine reset, {} commands discarded", drained);
        drained
    }

    // Event handlers

    /// Display finished booting (`00 00 00`)
    pub fn on_startup(&mut self, handler: fn()) {
        self.handlers.startup = Some(handler);
    }

    /// Display ready after power on (`0x88`)
    pub fn on_ready(&mut self, handler: fn()) {
        self.handlers.ready = Some(handler);
    }

    /// SD card firmware upgrade starting (`0x89`)
    pub fn on_sd_upgrade(&mut self, handler: fn()) {
        self.handlers.sd_upgrade = Some(handler);
    }

    /// Display entered sleep (`0x86`)
    pub fn on_sleep(&mut self, handler: fn()) {
        self.handlers.sleep = Some(handler);
    }

    /// Display woke up (`0x87`)
    pub fn on_wake(&mut self, handler: fn()) {
        self.handlers.wake = Some(handler);
    }

    /// Current page report (`0x66`)
    pub fn on_page(&mut self, handler: fn(u8)) {
        self.handlers.page = Some(handler);
    }

    /// Component press or release (`0x65`)
    pub fn on_touch(&mut self, handler: fn(Touch)) {
        self.handlers.touch = Some(handler);
    }

    /// Touch coordinate while awake (`0x67`)
    pub fn on_touch_coordinate(&mut self, handler: fn(Coordinate)) {
        self.handlers.touch_coordinate = Some(handler);
    }

    /// Touch coordinate while asleep (`0x68`)
    pub fn on_sleep_touch_coordinate(&mut self, handler: fn(Coordinate)) {
        self.handlers.sleep_touch_coordinate = Some(handler);
    }

    /// Remove every event handler
    pub fn clear_handlers(&mut self) {
        self.handlers = EventHandlers::default();
    }

    // Status

    /// Commands waiting for a reply
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// No commands waiting and no partial frame buffered
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.decoder.is_idle()
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }
}
