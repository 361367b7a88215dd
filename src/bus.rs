//! Named, typed point-to-multipoint messages between plugins
//! (spec.md §4.6).

use std::any::Any;
use std::collections::VecDeque;

/// A queued bus message awaiting delivery to every plugin's
/// `on_bus_message`. Delivery is synchronous from the sender's
/// perspective within this crate (the single-threaded dispatcher owns
/// the whole loop); an out-of-thread sender would queue into the same
/// structure via the main-thread message channel described in spec.md §5.
pub struct BusMessage {
    pub header: &'static str,
    pub payload: Box<dyn Any>,
}

/// The connection-wide bus. Held once by the dispatcher and handed to
/// every plugin's `on_bus_message` in arrival order (spec.md §4.6
/// "Order is preserved per sender").
#[derive(Default)]
pub struct Bus {
    queue: VecDeque<BusMessage>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// `sendBus`: broadcasts a named message to all plugins.
    pub fn send(&mut self, header: &'static str, payload: Box<dyn Any>) {
        self.queue.push_back(BusMessage { header, payload });
    }

    /// Drains all queued messages in FIFO order, handing each to `deliver`.
    /// Called by the dispatcher once per main-loop tick after handler
    /// invocation, so a handler that calls `send` during this event's
    /// processing is delivered before the next event is dispatched.
    pub fn drain(&mut self, mut deliver: impl FnMut(BusMessage)) {
        while let Some(msg) = self.queue.pop_front() {
            deliver(msg);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
