//! Display Serial Link Protocol
//!
//! Wire format spoken by Nextion-class touch display controllers over a
//! half-duplex UART. Commands go out as ASCII text; everything coming
//! back is framed the same way:
//!
//! ```text
//! ┌──────┬─────────────────┬────────────────┐
//! │ TYPE │ PAYLOAD         │ FF FF FF       │
//! │ 1B   │ 0–n B           │ 3B terminator  │
//! └──────┴─────────────────┴────────────────┘
//! ```
//!
//! The type byte is either a return code for the last instruction, a data
//! reply header (`0x70` string, `0x71` number), or an unsolicited event.
//! This crate only decodes and classifies; matching replies to commands
//! lives in `nexlink-core`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod codes;
pub mod events;
pub mod frame;
pub mod message;

pub use codes::ReturnCode;
pub use events::{Coordinate, Touch, TouchEvent};
pub use frame::{
    encode_command, encode_command_to_vec, FrameDecoder, FrameError, MAX_COMMAND_LEN,
    MAX_FRAME_SIZE, TERMINATOR, TERMINATOR_LEN,
};
pub use message::Message;
