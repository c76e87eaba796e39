//! Message dispatcher
//!
//! Routes one complete frame: notifications go to the registered event
//! handler, replies consume the oldest pending command. Nothing here
//! blocks or retries; a frame that fits nowhere is dropped.

use nexlink_protocol::{Coordinate, Message, Touch};

use crate::command::{CommandKind, Delivery, Failure, PendingCommand};
use crate::queue::CommandQueue;
use crate::response::ResponseStore;

/// Handlers for unsolicited device events
#[derive(Debug, Clone, Copy, Default)]
pub struct EventHandlers {
    pub startup: Option<fn()>,
    pub ready: Option<fn()>,
    pub sd_upgrade: Option<fn()>,
    pub sleep: Option<fn()>,
    pub wake: Option<fn()>,
    pub page: Option<fn(u8)>,
    pub touch: Option<fn(Touch)>,
    pub touch_coordinate: Option<fn(Coordinate)>,
    pub sleep_touch_coordinate: Option<fn(Coordinate)>,
}

/// What became of a dispatched frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// Notification routed to the event handlers
    Notified,
    /// Oldest pending command consumed
    Serviced,
    /// Frame matched nothing and was discarded
    Dropped,
}

/// Dispatch one complete frame
pub fn dispatch<C: Copy, const Q: usize, const R: usize>(
    frame: &[u8],
    queue: &mut CommandQueue<C, Q>,
    store: &mut ResponseStore<R>,
    handlers: &EventHandlers,
) -> Outcome {
    let message = Message::classify(frame);
    trace!("dispatch type {=u8:#x}, {} bytes", message.code(), frame.len());

    match message {
        Message::Startup => notify(handlers.startup),
        Message::Ready => notify(handlers.ready),
        Message::StartSdUpgrade => notify(handlers.sd_upgrade),
        Message::AutomaticSleep => notify(handlers.sleep),
        Message::AutomaticWakeUp => notify(handlers.wake),
        Message::CurrentPage(page) => {
            if let Some(handler) = handlers.page {
                handler(page);
            }
            Outcome::Notified
        }
        Message::Touch(touch) => {
            if let Some(handler) = handlers.touch {
                handler(touch);
            }
            Outcome::Notified
        }
        Message::TouchCoordinate(coordinate) => {
            if let Some(handler) = handlers.touch_coordinate {
                handler(coordinate);
            }
            Outcome::Notified
        }
        Message::SleepTouchCoordinate(coordinate) => {
            if let Some(handler) = handlers.sleep_touch_coordinate {
                handler(coordinate);
            }
            Outcome::Notified
        }
        Message::Unclassified(text) => {
            let headless = matches!(
                queue.peek(),
                Some(command) if command.kind() == CommandKind::StringHeadless
            );
            if !headless {
                warn!("dropping unclassified frame, type {=u8:#x}", message.code());
                return Outcome::Dropped;
            }
            match queue.dequeue() {
                Some(command) => {
                    capture(&command, frame, store);
                    command.deliver_text(text);
                    Outcome::Serviced
                }
                None => Outcome::Dropped,
            }
        }
        Message::Malformed(code) if !message.is_reply() => {
            warn!("dropping malformed frame, type {=u8:#x}", code);
            Outcome::Dropped
        }
        reply => {
            let Some(command) = queue.dequeue() else {
                warn!("reply {=u8:#x} with no pending command", reply.code());
                return Outcome::Dropped;
            };
            capture(&command, frame, store);
            service(&command, reply);
            Outcome::Serviced
        }
    }
}

fn notify(handler: Option<fn()>) -> Outcome {
    if let Some(handler) = handler {
        handler();
    }
    Outcome::Notified
}

/// Copy the raw frame into the command's response record, if it has one
fn capture<C: Copy, const R: usize>(
    command: &PendingCommand<C>,
    frame: &[u8],
    store: &mut ResponseStore<R>,
) {
    if let Some(slot) = command.slot {
        if !store.store(slot, frame) {
            debug!("response slot for seq {} no longer reserved", slot.seq().0);
        }
    }
}

/// Deliver a correlated reply to the command it answers
fn service<C: Copy>(command: &PendingCommand<C>, reply: Message<'_>) {
    let code = reply.code();
    if code != command.expected {
        debug!(
            "reply {=u8:#x} does not match expected {=u8:#x}",
            code, command.expected
        );
        command.fail(Failure::Code(code));
        return;
    }

    match (reply, command.delivery) {
        (Message::Malformed(code), _) => command.fail(Failure::Malformed(code)),
        (_, Delivery::Command { .. }) => command.succeed(),
        (Message::Number(value), Delivery::Number { .. }) => command.deliver_number(value),
        (Message::Text(text), Delivery::Text { .. }) => command.deliver_text(text),
        _ => command.fail(Failure::Code(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Request, TextFraming};
    use core::cell::RefCell;
    use nexlink_protocol::TouchEvent;
    use std::vec::Vec;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Seen {
        Success(u8),
        Failure(Failure, u8),
        Number(i32, u8),
        Text(Vec<u8>, u8),
        Startup,
        Page(u8),
        Touch(Touch),
    }

    std::thread_local! {
        static SEEN: RefCell<Vec<Seen>> = const { RefCell::new(Vec::new()) };
    }

    fn record(seen: Seen) {
        SEEN.with(|s| s.borrow_mut().push(seen));
    }

    fn take_seen() -> Vec<Seen> {
        SEEN.with(|s| core::mem::take(&mut *s.borrow_mut()))
    }

    fn on_success(ctx: u8) {
        record(Seen::Success(ctx));
    }
    fn on_failure(failure: Failure, ctx: u8) {
        record(Seen::Failure(failure, ctx));
    }
    fn on_number(value: i32, ctx: u8) {
        record(Seen::Number(value, ctx));
    }
    fn on_text(text: &[u8], ctx: u8) {
        record(Seen::Text(text.to_vec(), ctx));
    }
    fn on_startup() {
        record(Seen::Startup);
    }
    fn on_page(page: u8) {
        record(Seen::Page(page));
    }
    fn on_touch(touch: Touch) {
        record(Seen::Touch(touch));
    }

    struct Fixture {
        queue: CommandQueue<u8, 4>,
        store: ResponseStore<4>,
        handlers: EventHandlers,
    }

    impl Fixture {
        fn new() -> Self {
            take_seen();
            Self {
                queue: CommandQueue::new(),
                store: ResponseStore::new(),
                handlers: EventHandlers {
                    startup: Some(on_startup),
                    page: Some(on_page),
                    touch: Some(on_touch),
                    ..EventHandlers::default()
                },
            }
        }

        fn push(&mut self, request: Request<u8>) {
            let request = request.on_failure(on_failure);
            self.queue.enqueue(request.into_pending(1000, None)).unwrap();
        }

        fn dispatch(&mut self, frame: &[u8]) -> Outcome {
            dispatch(frame, &mut self.queue, &mut self.store, &self.handlers)
        }
    }

    #[test]
    fn test_ack_success() {
        let mut fx = Fixture::new();
        fx.push(Request::finished(1).on_success(on_success));
        assert_eq!(fx.dispatch(&[0x01, 0xFF, 0xFF, 0xFF]), Outcome::Serviced);
        assert_eq!(take_seen(), [Seen::Success(1)]);
        assert!(fx.queue.is_empty());
    }

    #[test]
    fn test_mismatch_reports_actual_code() {
        let mut fx = Fixture::new();
        fx.push(Request::finished(1).on_success(on_success));
        assert_eq!(fx.dispatch(&[0x1A, 0xFF, 0xFF, 0xFF]), Outcome::Serviced);
        assert_eq!(take_seen(), [Seen::Failure(Failure::Code(0x1A), 1)]);
    }

    #[test]
    fn test_number_reply() {
        let mut fx = Fixture::new();
        fx.push(Request::number(2).on_number(on_number));
        fx.dispatch(&[0x71, 0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(take_seen(), [Seen::Number(-2, 2)]);
    }

    #[test]
    fn test_malformed_number_fails() {
        let mut fx = Fixture::new();
        fx.push(Request::number(2).on_number(on_number));
        assert_eq!(fx.dispatch(&[0x71, 0x01, 0xFF, 0xFF, 0xFF]), Outcome::Serviced);
        assert_eq!(take_seen(), [Seen::Failure(Failure::Malformed(0x71), 2)]);
    }

    #[test]
    fn test_text_with_header() {
        let mut fx = Fixture::new();
        fx.push(Request::text(TextFraming::WithHeader, 3).on_text(on_text));
        fx.dispatch(b"\x70hello\xFF\xFF\xFF");
        assert_eq!(take_seen(), [Seen::Text(b"hello".to_vec(), 3)]);
    }

    #[test]
    fn test_headless_text() {
        let mut fx = Fixture::new();
        fx.push(Request::text(TextFraming::Headless, 4).on_text(on_text));
        assert_eq!(fx.dispatch(b"comok 1\xFF\xFF\xFF"), Outcome::Serviced);
        assert_eq!(take_seen(), [Seen::Text(b"comok 1".to_vec(), 4)]);
    }

    #[test]
    fn test_headless_command_strips_string_header() {
        let mut fx = Fixture::new();
        fx.push(Request::text(TextFraming::Headless, 5).on_text(on_text));
        assert_eq!(fx.dispatch(b"\x70abc\xFF\xFF\xFF"), Outcome::Serviced);
        assert_eq!(take_seen(), [Seen::Text(b"abc".to_vec(), 5)]);
        assert!(fx.queue.is_empty());
    }

    #[test]
    fn test_unclassified_dropped_without_headless_command() {
        let mut fx = Fixture::new();
        fx.push(Request::finished(5).on_success(on_success));
        assert_eq!(fx.dispatch(b"garbage\xFF\xFF\xFF"), Outcome::Dropped);
        assert!(take_seen().is_empty());
        // The ack command is still waiting for its own reply
        assert_eq!(fx.queue.len(), 1);
    }

    #[test]
    fn test_number_reply_to_ack_command_fails() {
        let mut fx = Fixture::new();
        fx.push(Request::finished(6).on_success(on_success));
        fx.dispatch(&[0x71, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF]);
        assert_eq!(take_seen(), [Seen::Failure(Failure::Code(0x71), 6)]);
    }

    #[test]
    fn test_notifications_leave_queue_alone() {
        let mut fx = Fixture::new();
        fx.push(Request::finished(7).on_success(on_success));
        assert_eq!(
            fx.dispatch(&[0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF]),
            Outcome::Notified
        );
        assert_eq!(fx.dispatch(&[0x66, 0x02, 0xFF, 0xFF, 0xFF]), Outcome::Notified);
        assert_eq!(
            fx.dispatch(&[0x65, 0x00, 0x03, 0x01, 0xFF, 0xFF, 0xFF]),
            Outcome::Notified
        );
        // No handler registered for sleep
        assert_eq!(fx.dispatch(&[0x86, 0xFF, 0xFF, 0xFF]), Outcome::Notified);

        assert_eq!(
            take_seen(),
            [
                Seen::Startup,
                Seen::Page(2),
                Seen::Touch(Touch {
                    page: 0,
                    component: 3,
                    event: TouchEvent::Press
                }),
            ]
        );
        assert_eq!(fx.queue.len(), 1);
    }

    #[test]
    fn test_invalid_instruction_fails_oldest() {
        let mut fx = Fixture::new();
        fx.push(Request::finished(8).on_success(on_success));
        fx.push(Request::finished(9).on_success(on_success));
        assert_eq!(fx.dispatch(&[0x00, 0xFF, 0xFF, 0xFF]), Outcome::Serviced);
        assert_eq!(take_seen(), [Seen::Failure(Failure::Code(0x00), 8)]);
        assert_eq!(fx.queue.len(), 1);
    }

    #[test]
    fn test_reply_with_empty_queue_dropped() {
        let mut fx = Fixture::new();
        assert_eq!(fx.dispatch(&[0x01, 0xFF, 0xFF, 0xFF]), Outcome::Dropped);
        assert_eq!(fx.dispatch(&[0x00, 0xFF, 0xFF, 0xFF]), Outcome::Dropped);
    }

    #[test]
    fn test_reply_captured_into_slot() {
        let mut fx = Fixture::new();
        let seq = fx.queue.next_seq();
        let slot = fx.store.reserve(seq).unwrap();
        let pending = Request::number(0u8).into_pending(1000, Some(slot));
        fx.queue.enqueue(pending).unwrap();

        let frame = [0x71, 0x05, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF];
        fx.dispatch(&frame);
        assert_eq!(fx.store.get(slot).map(|r| r.bytes()), Some(&frame[..]));
    }

    #[test]
    fn test_mismatched_reply_still_captured() {
        let mut fx = Fixture::new();
        let seq = fx.queue.next_seq();
        let slot = fx.store.reserve(seq).unwrap();
        fx.queue
            .enqueue(Request::number(0u8).into_pending(1000, Some(slot)))
            .unwrap();

        fx.dispatch(&[0x1A, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            fx.store.get(slot).map(|r| r.bytes()),
            Some(&[0x1A, 0xFF, 0xFF, 0xFF][..])
        );
    }
}
