//! Error types

use nexlink_protocol::FrameError;

use crate::queue::QueueFull;
use crate::response::StoreFull;

/// Errors from issuing a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineError<E> {
    /// Command queue is at capacity; nothing was sent
    QueueFull,
    /// No free response record for a blocking wait; nothing was sent
    StoreFull,
    /// Command could not be framed
    Frame(FrameError),
    /// Serial transport failed
    Serial(E),
}

impl<E> From<QueueFull> for EngineError<E> {
    fn from(_: QueueFull) -> Self {
        EngineError::QueueFull
    }
}

impl<E> From<StoreFull> for EngineError<E> {
    fn from(_: StoreFull) -> Self {
        EngineError::StoreFull
    }
}

impl<E> From<FrameError> for EngineError<E> {
    fn from(e: FrameError) -> Self {
        EngineError::Frame(e)
    }
}

/// Errors from a blocking exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError<E> {
    /// The command could not be issued, or the link failed while waiting
    Engine(EngineError<E>),
    /// No reply arrived in time
    Timeout,
    /// A reply arrived but was not the one expected
    Unexpected { code: u8, len: usize },
    /// The caller's buffer cannot hold the reply
    BufferTooSmall,
}

impl<E> From<EngineError<E>> for RequestError<E> {
    fn from(e: EngineError<E>) -> Self {
        RequestError::Engine(e)
    }
}

impl<E> From<QueueFull> for RequestError<E> {
    fn from(e: QueueFull) -> Self {
        RequestError::Engine(e.into())
    }
}

impl<E> From<StoreFull> for RequestError<E> {
    fn from(e: StoreFull) -> Self {
        RequestError::Engine(e.into())
    }
}

impl<E> RequestError<E> {
    /// Return code carried by an unexpected reply
    pub fn code(&self) -> Option<u8> {
        match self {
            RequestError::Unexpected { code, .. } => Some(*code),
            _ => None,
        }
    }
}
