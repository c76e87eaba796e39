//! Frame encoding and decoding for the display link.
//!
//! Inbound frame format:
//! - TYPE (1 byte): leading type/return code
//! - PAYLOAD (0-n bytes): type-specific data
//! - TERMINATOR (3 bytes): 0xFF 0xFF 0xFF
//!
//! Outbound commands are ASCII text followed by the same terminator.

use heapless::Vec;

use crate::codes::fixed_frame_len;

/// Terminator byte value
pub const TERMINATOR: u8 = 0xFF;

/// Number of consecutive terminator bytes that end a frame
pub const TERMINATOR_LEN: usize = 3;

/// Complete terminator sequence
pub const TERMINATOR_SEQ: [u8; TERMINATOR_LEN] = [TERMINATOR; TERMINATOR_LEN];

/// Maximum inbound frame size, terminator included
pub const MAX_FRAME_SIZE: usize = 128;

/// Maximum outbound command text length
pub const MAX_COMMAND_LEN: usize = 253;

/// Maximum outbound frame size (command text + terminator)
pub const MAX_COMMAND_FRAME_SIZE: usize = MAX_COMMAND_LEN + TERMINATOR_LEN;

/// Errors that can occur during frame decoding or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Inbound frame did not fit the receive buffer and was dropped
    Overflow,
    /// Command text exceeds [`MAX_COMMAND_LEN`]
    CommandTooLong,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// Encode a command into `buffer`
///
/// Returns the number of bytes written. `&str` is UTF-8, which never
/// contains the terminator byte, so the text cannot end the frame early.
pub fn encode_command(command: &str, buffer: &mut [u8]) -> Result<usize, FrameError> {
    let text = command.as_bytes();
    if text.len() > MAX_COMMAND_LEN {
        return Err(FrameError::CommandTooLong);
    }

    let frame_len = text.len() + TERMINATOR_LEN;
    if buffer.len() < frame_len {
        return Err(FrameError::BufferTooSmall);
    }

    buffer[..text.len()].copy_from_slice(text);
    buffer[text.len()..frame_len].copy_from_slice(&TERMINATOR_SEQ);
    Ok(frame_len)
}

/// Encode a command into a heapless Vec
pub fn encode_command_to_vec(command: &str) -> Result<Vec<u8, MAX_COMMAND_FRAME_SIZE>, FrameError> {
    let mut buffer = [0u8; MAX_COMMAND_FRAME_SIZE];
    let len = encode_command(command, &mut buffer)?;
    let mut vec = Vec::new();
    vec.extend_from_slice(&buffer[..len])
        .map_err(|_| FrameError::BufferTooSmall)?;
    Ok(vec)
}

/// Byte-at-a-time decoder for inbound frames
///
/// Frames end at three consecutive terminator bytes. Two refinements:
///
/// - a terminator byte at the very start of a frame is stray line noise
///   and is discarded;
/// - frame types with a fixed layout (see [`fixed_frame_len`]) only
///   count terminator bytes in their last three positions, so a numeric
///   payload such as `FF 00 00 00` or `FF FF FF FF` is kept as data.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    buffer: [u8; MAX_FRAME_SIZE],
    /// Bytes seen in the current frame, including any beyond the buffer
    count: usize,
    /// Consecutive terminator bytes at the tail
    run: usize,
    overflowed: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a new frame decoder
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; MAX_FRAME_SIZE],
            count: 0,
            run: 0,
            overflowed: false,
        }
    }

    /// Discard any partial frame
    pub fn reset(&mut self) {
        self.count = 0;
        self.run = 0;
        self.overflowed = false;
    }

    /// Whether no partial frame is buffered
    pub fn is_idle(&self) -> bool {
        self.count == 0
    }

    /// Number of bytes of the partial frame seen so far
    pub fn pending_len(&self) -> usize {
        self.count
    }

    /// Feed a single byte to the decoder
    ///
    /// Returns `Ok(Some(frame))` when `byte` completes a frame (type byte,
    /// payload and terminator), `Ok(None)` when more bytes are needed, or
    /// `Err(FrameError::Overflow)` when an oversized frame has ended and
    /// been dropped. The decoder is ready for the next frame either way.
    pub fn feed(&mut self, byte: u8) -> Result<Option<&[u8]>, FrameError> {
        if self.count == 0 && byte == TERMINATOR {
            self.run = 0;
            return Ok(None);
        }

        let index = self.count;
        self.count += 1;
        if index < MAX_FRAME_SIZE {
            self.buffer[index] = byte;
        } else {
            self.overflowed = true;
        }

        if byte == TERMINATOR && self.in_terminator_region(index) {
            self.run += 1;
        } else {
            self.run = 0;
        }

        if self.run < TERMINATOR_LEN {
            return Ok(None);
        }

        let len = self.count;
        let overflowed = self.overflowed;
        self.reset();

        if overflowed {
            Err(FrameError::Overflow)
        } else {
            Ok(Some(&self.buffer[..len]))
        }
    }

    /// Whether a terminator byte at `index` may be part of the terminator
    fn in_terminator_region(&self, index: usize) -> bool {
        match fixed_frame_len(self.buffer[0]) {
            Some(total) => index + TERMINATOR_LEN >= total,
            None => index >= 1,
        }
    }
}
