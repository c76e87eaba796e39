//! UART serial communication abstractions
//!
//! The display link is polled: the engine asks for whatever bytes the
//! peripheral has buffered and never parks waiting for more.

/// Error type shared by both halves of a serial port
pub trait ErrorType {
    /// Error type for transmit and receive operations
    type Error;
}

/// UART receiver
///
/// Non-blocking read side of the display link.
pub trait SerialRx: ErrorType {
    /// Copy buffered bytes into `buf`
    ///
    /// Returns the number of bytes written, `Ok(0)` when nothing is
    /// pending. Must not block.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// UART transmitter
pub trait SerialTx: ErrorType {
    /// Write all of `data` to the UART
    ///
    /// Blocks until the data has been queued for transmission.
    fn write_all(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Combined UART interface
///
/// The engine owns one value implementing both halves.
pub trait Serial: SerialRx + SerialTx {}

// Blanket implementation
impl<T: SerialRx + SerialTx> Serial for T {}

/// Factory default baud rate of the display
pub const DEFAULT_BAUD: u32 = 9600;

/// Slowest rate at which the display answers within the short timeouts
pub const FAST_BAUD: u32 = 115200;

/// UART link settings the engine cares about
///
/// The display always speaks 8N1; only the rate varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::with_baudrate(DEFAULT_BAUD)
    }
}

impl UartConfig {
    pub fn with_baudrate(baudrate: u32) -> Self {
        Self { baudrate }
    }

    /// Whether the link is fast enough for the short reply timeouts
    pub fn is_fast(&self) -> bool {
        self.baudrate >= FAST_BAUD
    }
}
