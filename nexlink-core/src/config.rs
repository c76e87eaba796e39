//! Engine configuration
//!
//! Reply timeouts are what the display needs at its factory 9600 baud;
//! links running at 115200 or faster can use [`EngineConfig::fast`].

use nexlink_hal::UartConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default depth of the command queue
pub const DEFAULT_QUEUE_DEPTH: usize = 8;

/// Default depth of the response store
pub const DEFAULT_STORE_DEPTH: usize = 8;

/// Timeouts used by the engine, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Deadline for a command's return code
    pub command_timeout_ms: u32,
    /// Deadline for a `get` reply (string or number)
    pub return_timeout_ms: u32,
    /// Deadline for transparent data mode acknowledgements
    pub transparent_timeout_ms: u32,
    /// Extra time a blocking wait allows past its command's own deadline
    ///
    /// A command queued behind others with longer deadlines may not be
    /// reclaimed on time; the wait gives up after this grace regardless.
    pub blocking_grace_ms: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 200,
            return_timeout_ms: 100,
            transparent_timeout_ms: 400,
            blocking_grace_ms: 50,
        }
    }
}

impl EngineConfig {
    /// Short timeouts for links running at 115200 baud or faster
    pub fn fast() -> Self {
        Self {
            command_timeout_ms: 10,
            return_timeout_ms: 10,
            ..Self::default()
        }
    }

    /// Pick timeouts to suit the UART speed
    pub fn for_uart(uart: &UartConfig) -> Self {
        if uart.is_fast() {
            Self::fast()
        } else {
            Self::default()
        }
    }
}
