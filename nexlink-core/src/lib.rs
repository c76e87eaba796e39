//! Command/reply correlation engine for Nextion-class display links
//!
//! The display answers instructions one at a time, in order, with no
//! request identifiers on the wire. This crate keeps the bookkeeping
//! that turns that stream back into per-command results:
//!
//! - Command queue matching each reply to the oldest outstanding command
//! - Dispatcher routing unsolicited events to registered handlers
//! - Response store and blocking/async waits built on the same queue
//! - Expiration sweeper reclaiming commands the display never answered
//!
//! Everything lives in one [`Engine`] value; there is no global state.
//!
//! # Re-entrancy
//!
//! Handlers are plain `fn` pointers, so they cannot capture the engine,
//! and a wait holds `&mut Engine` until it returns. A wait can follow a
//! submit:
//!
//! ```
//! use nexlink_core::{Engine, Request};
//! use nexlink_hal::{Clock, Serial};
//!
//! fn refresh<S: Serial, K: Clock>(display: &mut Engine<S, K>) {
//!     let request = Request::finished(()).on_success(|()| {});
//!     let _ = display.submit("ref 0", request);
//!     let _ = display.request_number("get n0.val");
//! }
//! ```
//!
//! but a handler can never start one while the engine is dispatching:
//!
//! ```compile_fail
//! use nexlink_core::{Engine, Request};
//! use nexlink_hal::{Clock, Serial};
//!
//! fn refresh<S: Serial, K: Clock>(display: &mut Engine<S, K>) {
//!     let request = Request::finished(()).on_success(|()| {
//!         let _ = display.request_number("get n0.val");
//!     });
//!     let _ = display.submit("ref 0", request);
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

mod blocking;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod queue;
pub mod response;

#[cfg(test)]
mod testing;

pub use command::{CommandKind, Failure, Request, Seq, TextFraming};
pub use config::{EngineConfig, DEFAULT_QUEUE_DEPTH, DEFAULT_STORE_DEPTH};
pub use dispatch::{EventHandlers, Outcome};
pub use engine::{Engine, Stats, TickReport};
pub use error::{EngineError, RequestError};
