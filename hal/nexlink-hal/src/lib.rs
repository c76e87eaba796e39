//! nexlink Hardware Abstraction Layer
//!
//! The correlation engine only needs three things from the board it runs
//! on: a way to pull whatever bytes the UART has buffered without
//! blocking, a way to write command bytes, and a millisecond clock.
//! This crate defines those seams so the engine can run against a real
//! UART on target and a scripted fake on the host.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  nexlink-core (engine, dispatcher)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  nexlink-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board UART   │       │  host mocks   │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::SerialRx`], [`uart::SerialTx`] - Serial communication,
//!   sharing one [`uart::ErrorType`]
//! - [`clock::Clock`] - Monotonic millisecond time source

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use clock::{deadline_reached, Clock};
#[cfg(feature = "embassy")]
pub use clock::EmbassyClock;
pub use uart::{ErrorType, Serial, SerialRx, SerialTx, UartConfig};
