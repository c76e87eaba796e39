//! Outstanding commands and how their results are delivered
//!
//! Every command sent to the display that expects a reply becomes a
//! [`PendingCommand`]. Its [`Delivery`] says what shape of reply it
//! expects and which handler receives the decoded value; the failure
//! handler is shared by all shapes.

use core::fmt;

use nexlink_protocol::codes::{CMD_FINISHED_OK, NUMBER_REPLY, STRING_REPLY};

use crate::response::SlotRef;

/// Called when a command's return code matches
pub type SuccessFn<C> = fn(C);
/// Called with the decoded value of a numeric reply
pub type NumberFn<C> = fn(i32, C);
/// Called with the bytes of a string reply, header and terminator removed
pub type TextFn<C> = fn(&[u8], C);
/// Called when a command fails or times out
pub type FailureFn<C> = fn(Failure, C);

/// Position of a command in issue order
///
/// Wraps at `u16::MAX`; compare with [`Seq::is_after`], never by magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Seq(pub u16);

impl Seq {
    /// The sequence index issued after this one
    pub fn next(self) -> Self {
        Seq(self.0.wrapping_add(1))
    }

    /// Whether `self` comes strictly later than `other` in issue order
    ///
    /// Valid while the two are less than half the counter range apart.
    pub fn is_after(self, other: Seq) -> bool {
        let distance = self.0.wrapping_sub(other.0);
        distance != 0 && distance < 0x8000
    }
}

/// Why a command did not produce its expected result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Failure {
    /// The display replied with a different code than expected
    Code(u8),
    /// The reply had the expected code but a broken layout
    Malformed(u8),
    /// No reply arrived before the deadline
    Timeout,
}

impl Failure {
    /// Code received from the display, if any
    pub fn code(&self) -> Option<u8> {
        match self {
            Failure::Code(code) | Failure::Malformed(code) => Some(*code),
            Failure::Timeout => None,
        }
    }
}

/// Shape of reply a command expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandKind {
    /// Return code only
    Command,
    /// `0x71` numeric reply
    Number,
    /// `0x70` string reply
    StringWithHeader,
    /// String reply without a header byte
    StringHeadless,
}

/// Whether a string reply carries the `0x70` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TextFraming {
    WithHeader,
    Headless,
}

/// Where the decoded result of a command goes
pub enum Delivery<C> {
    Command { on_success: Option<SuccessFn<C>> },
    Number { on_number: Option<NumberFn<C>> },
    Text { framing: TextFraming, on_text: Option<TextFn<C>> },
}

impl<C> Clone for Delivery<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Delivery<C> {}

impl<C> Delivery<C> {
    /// Reply shape this delivery expects
    pub fn kind(&self) -> CommandKind {
        match self {
            Delivery::Command { .. } => CommandKind::Command,
            Delivery::Number { .. } => CommandKind::Number,
            Delivery::Text {
                framing: TextFraming::WithHeader,
                ..
            } => CommandKind::StringWithHeader,
            Delivery::Text {
                framing: TextFraming::Headless,
                ..
            } => CommandKind::StringHeadless,
        }
    }
}

/// A command awaiting its reply
pub struct PendingCommand<C> {
    /// Leading byte of the reply that counts as success
    pub expected: u8,
    pub delivery: Delivery<C>,
    pub on_failure: Option<FailureFn<C>>,
    /// Handed back to every handler
    pub context: C,
    /// Absolute clock time after which the command is abandoned
    pub deadline: u32,
    /// Response store slot that captures the raw reply
    pub slot: Option<SlotRef>,
}

impl<C: Copy> PendingCommand<C> {
    /// Reply shape this command expects
    pub fn kind(&self) -> CommandKind {
        self.delivery.kind()
    }

    /// Invoke the failure handler, if any
    pub fn fail(&self, failure: Failure) {
        if let Some(handler) = self.on_failure {
            handler(failure, self.context);
        }
    }

    /// Invoke the success handler of a return-code command
    pub fn succeed(&self) {
        if let Delivery::Command {
            on_success: Some(handler),
        } = self.delivery
        {
            handler(self.context);
        }
    }

    /// Invoke the number handler of a numeric command
    pub fn deliver_number(&self, value: i32) {
        if let Delivery::Number {
            on_number: Some(handler),
        } = self.delivery
        {
            handler(value, self.context);
        }
    }

    /// Invoke the text handler of a string command
    pub fn deliver_text(&self, text: &[u8]) {
        if let Delivery::Text {
            on_text: Some(handler),
            ..
        } = self.delivery
        {
            handler(text, self.context);
        }
    }
}

impl<C> fmt::Debug for PendingCommand<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCommand")
            .field("expected", &self.expected)
            .field("kind", &self.delivery.kind())
            .field("deadline", &self.deadline)
            .field("slot", &self.slot)
            .finish()
    }
}

/// A non-blocking command request
///
/// Built with one of the shape constructors, then handlers attached:
///
/// ```ignore
/// let request = Request::number(SLIDER_ID)
///     .on_number(|value, id| update_slider(id, value))
///     .on_failure(|failure, id| log_failure(id, failure));
/// engine.submit("get h0.val", request)?;
/// ```
pub struct Request<C> {
    pub(crate) expected: u8,
    pub(crate) delivery: Delivery<C>,
    pub(crate) on_failure: Option<FailureFn<C>>,
    pub(crate) context: C,
    pub(crate) timeout_ms: Option<u32>,
}

impl<C: Copy> Request<C> {
    /// Expect the return code `expected`
    pub fn ack(expected: u8, context: C) -> Self {
        Self::with_delivery(expected, Delivery::Command { on_success: None }, context)
    }

    /// Expect `0x01` (instruction finished)
    pub fn finished(context: C) -> Self {
        Self::ack(CMD_FINISHED_OK, context)
    }

    /// Expect a numeric reply
    pub fn number(context: C) -> Self {
        Self::with_delivery(NUMBER_REPLY, Delivery::Number { on_number: None }, context)
    }

    /// Expect a string reply
    pub fn text(framing: TextFraming, context: C) -> Self {
        Self::with_delivery(
            STRING_REPLY,
            Delivery::Text {
                framing,
                on_text: None,
            },
            context,
        )
    }

    fn with_delivery(expected: u8, delivery: Delivery<C>, context: C) -> Self {
        Self {
            expected,
            delivery,
            on_failure: None,
            context,
            timeout_ms: None,
        }
    }

    /// Handler for a matching return code (ack requests only)
    pub fn on_success(mut self, handler: SuccessFn<C>) -> Self {
        if let Delivery::Command { on_success } = &mut self.delivery {
            *on_success = Some(handler);
        }
        self
    }

    /// Handler for the decoded number (number requests only)
    pub fn on_number(mut self, handler: NumberFn<C>) -> Self {
        if let Delivery::Number { on_number } = &mut self.delivery {
            *on_number = Some(handler);
        }
        self
    }

    /// Handler for the string bytes (text requests only)
    pub fn on_text(mut self, handler: TextFn<C>) -> Self {
        if let Delivery::Text { on_text, .. } = &mut self.delivery {
            *on_text = Some(handler);
        }
        self
    }

    /// Handler for failures and timeouts
    pub fn on_failure(mut self, handler: FailureFn<C>) -> Self {
        self.on_failure = Some(handler);
        self
    }

    /// Override the configured timeout
    pub fn timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Reply shape this request expects
    pub fn kind(&self) -> CommandKind {
        self.delivery.kind()
    }

    pub(crate) fn into_pending(self, deadline: u32, slot: Option<SlotRef>) -> PendingCommand<C> {
        PendingCommand {
            expected: self.expected,
            delivery: self.delivery,
            on_failure: self.on_failure,
            context: self.context,
            deadline,
            slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    std::thread_local! {
        static HITS: Cell<u32> = const { Cell::new(0) };
    }

    fn count(_: ()) {
        HITS.with(|h| h.set(h.get() + 1));
    }

    #[test]
    fn test_seq_ordering_wraps() {
        assert!(Seq(1).is_after(Seq(0)));
        assert!(!Seq(0).is_after(Seq(0)));
        assert!(!Seq(0).is_after(Seq(1)));
        assert!(Seq(0).is_after(Seq(u16::MAX)));
        assert!(Seq(5).is_after(Seq(u16::MAX - 5)));
        assert_eq!(Seq(u16::MAX).next(), Seq(0));
    }

    #[test]
    fn test_request_kinds() {
        assert_eq!(Request::finished(()).kind(), CommandKind::Command);
        assert_eq!(Request::number(()).kind(), CommandKind::Number);
        assert_eq!(
            Request::text(TextFraming::WithHeader, ()).kind(),
            CommandKind::StringWithHeader
        );
        assert_eq!(
            Request::text(TextFraming::Headless, ()).kind(),
            CommandKind::StringHeadless
        );
        assert_eq!(Request::number(()).expected, NUMBER_REPLY);
        assert_eq!(Request::text(TextFraming::Headless, ()).expected, STRING_REPLY);
    }

    #[test]
    fn test_handler_only_attaches_to_matching_shape() {
        HITS.with(|h| h.set(0));
        let pending = Request::number(()).on_success(count).into_pending(0, None);
        pending.succeed();
        assert_eq!(HITS.with(|h| h.get()), 0);

        let pending = Request::finished(()).on_success(count).into_pending(0, None);
        pending.succeed();
        assert_eq!(HITS.with(|h| h.get()), 1);
    }

    #[test]
    fn test_failure_code() {
        assert_eq!(Failure::Code(0x1A).code(), Some(0x1A));
        assert_eq!(Failure::Malformed(0x71).code(), Some(0x71));
        assert_eq!(Failure::Timeout.code(), None);
    }
}
