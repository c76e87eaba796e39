//! Classification of decoded frames
//!
//! A complete frame from [`FrameDecoder`](crate::frame::FrameDecoder) is
//! turned into a [`Message`] by looking at its leading byte and checking
//! the layout that type requires. Messages are split into:
//! - notifications the display sends on its own (touch, sleep, ready, ...)
//! - replies that answer the oldest outstanding command

use crate::codes::*;
use crate::events::{Coordinate, Touch, TouchEvent};
use crate::frame::{TERMINATOR_LEN, TERMINATOR_SEQ};

/// A classified inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Message<'a> {
    // Notifications
    /// Display powered on (`00 00 00`)
    Startup,
    /// Display finished initialisation
    Ready,
    /// Display is about to upgrade firmware from SD card
    StartSdUpgrade,
    /// Display entered automatic sleep
    AutomaticSleep,
    /// Display woke from automatic sleep
    AutomaticWakeUp,
    /// Current page id (`sendme` or page change)
    CurrentPage(u8),
    /// Component pressed or released
    Touch(Touch),
    /// Raw touch coordinate while awake
    TouchCoordinate(Coordinate),
    /// Raw touch coordinate while asleep
    SleepTouchCoordinate(Coordinate),

    // Replies
    /// Last instruction was not understood (`00` with no payload)
    InvalidInstruction,
    /// Command return code (`01` success, failures, transparent mode)
    Return(u8),
    /// String reply, header and terminator stripped
    Text(&'a [u8]),
    /// Numeric reply
    Number(i32),

    /// Known type byte with the wrong layout
    Malformed(u8),
    /// Unrecognised type byte, terminator stripped
    ///
    /// This is how replies to commands like `connect` arrive: plain text
    /// without a string header.
    Unclassified(&'a [u8]),
}

impl<'a> Message<'a> {
    /// Classify a complete frame
    ///
    /// `frame` must include the terminator, as returned by the decoder.
    pub fn classify(frame: &'a [u8]) -> Self {
        if frame.len() <= TERMINATOR_LEN || !frame.ends_with(&TERMINATOR_SEQ) {
            return Message::Malformed(frame.first().copied().unwrap_or(0));
        }

        let code = frame[0];
        let payload = &frame[1..frame.len() - TERMINATOR_LEN];

        match code {
            STARTUP => match payload {
                [] => Message::InvalidInstruction,
                [0x00, 0x00] => Message::Startup,
                _ => Message::Malformed(code),
            },
            READY => Self::bare(code, payload, Message::Ready),
            START_SD_UPGRADE => Self::bare(code, payload, Message::StartSdUpgrade),
            AUTOMATIC_SLEEP => Self::bare(code, payload, Message::AutomaticSleep),
            AUTOMATIC_WAKE_UP => Self::bare(code, payload, Message::AutomaticWakeUp),
            CURRENT_PAGE => match payload {
                [page] => Message::CurrentPage(*page),
                _ => Message::Malformed(code),
            },
            TOUCH_EVENT => match payload {
                [page, component, event] => match TouchEvent::from_byte(*event) {
                    Some(event) => Message::Touch(Touch {
                        page: *page,
                        component: *component,
                        event,
                    }),
                    None => Message::Malformed(code),
                },
                _ => Message::Malformed(code),
            },
            TOUCH_COORDINATE | SLEEP_TOUCH_COORDINATE => match Self::coordinate(payload) {
                Some(c) if code == TOUCH_COORDINATE => Message::TouchCoordinate(c),
                Some(c) => Message::SleepTouchCoordinate(c),
                None => Message::Malformed(code),
            },
            STRING_REPLY => Message::Text(payload),
            NUMBER_REPLY => match payload {
                [b0, b1, b2, b3] => Message::Number(i32::from_le_bytes([*b0, *b1, *b2, *b3])),
                _ => Message::Malformed(code),
            },
            _ if ReturnCode::from_byte(code).is_some() => {
                if payload.is_empty() {
                    Message::Return(code)
                } else {
                    Message::Unclassified(&frame[..frame.len() - TERMINATOR_LEN])
                }
            }
            _ => Message::Unclassified(&frame[..frame.len() - TERMINATOR_LEN]),
        }
    }

    /// Whether this message answers an outstanding command
    pub fn is_reply(&self) -> bool {
        matches!(
            self,
            Message::InvalidInstruction
                | Message::Return(_)
                | Message::Text(_)
                | Message::Number(_)
                | Message::Malformed(NUMBER_REPLY)
        )
    }

    /// Leading type byte this message was classified from
    pub fn code(&self) -> u8 {
        match self {
            Message::Startup => STARTUP,
            Message::Ready => READY,
            Message::StartSdUpgrade => START_SD_UPGRADE,
            Message::AutomaticSleep => AUTOMATIC_SLEEP,
            Message::AutomaticWakeUp => AUTOMATIC_WAKE_UP,
            Message::CurrentPage(_) => CURRENT_PAGE,
            Message::Touch(_) => TOUCH_EVENT,
            Message::TouchCoordinate(_) => TOUCH_COORDINATE,
            Message::SleepTouchCoordinate(_) => SLEEP_TOUCH_COORDINATE,
            Message::InvalidInstruction => INVALID_INSTRUCTION,
            Message::Return(code) | Message::Malformed(code) => *code,
            Message::Text(_) => STRING_REPLY,
            Message::Number(_) => NUMBER_REPLY,
            Message::Unclassified(bytes) => bytes.first().copied().unwrap_or(0),
        }
    }

    fn bare(code: u8, payload: &[u8], message: Self) -> Self {
        if payload.is_empty() {
            message
        } else {
            Message::Malformed(code)
        }
    }

    fn coordinate(payload: &[u8]) -> Option<Coordinate> {
        match payload {
            [x0, x1, y0, y1, event] => Some(Coordinate {
                x: i16::from_le_bytes([*x0, *x1]),
                y: i16::from_le_bytes([*y0, *y1]),
                event: TouchEvent::from_byte(*event)?,
            }),
            _ => None,
        }
    }
}

/// Build the frame a display sends for a numeric reply (for testing or simulation)
pub fn number_reply_frame(value: i32) -> [u8; 8] {
    let [b0, b1, b2, b3] = value.to_le_bytes();
    [NUMBER_REPLY, b0, b1, b2, b3, 0xFF, 0xFF, 0xFF]
}

/// Build the frame a display sends for a return code (for testing or simulation)
pub fn return_code_frame(code: u8) -> [u8; 4] {
    [code, 0xFF, 0xFF, 0xFF]
}
