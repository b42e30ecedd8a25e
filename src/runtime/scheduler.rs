//! Discrete-event queue.
//!
//! Events are ordered by (logical time, priority, enqueue sequence): within
//! one instant INPUT runs before PROPAGATION before SELECTION, and events of
//! equal priority run FIFO. Once enqueued an event always executes.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Fixed priority classes, applied in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Input,
    Propagation,
    Selection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// A cue arrived on the input channel.
    InputReceived,
    /// A compile changed the store.
    StoreUpdated,
    /// Bottom-up scores are in the pool.
    PropagationDone,
    /// Choice produced a winner (or nil).
    SelectionMade,
}

impl EventKind {
    pub fn priority(&self) -> Priority {
        match self {
            EventKind::InputReceived => Priority::Input,
            EventKind::StoreUpdated | EventKind::PropagationDone => Priority::Propagation,
            EventKind::SelectionMade => Priority::Selection,
        }
    }
}

/// A scheduled event. Field order is the queue order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Event {
    pub time: u64,
    pub priority: Priority,
    pub seq: u64,
    pub kind: EventKind,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Event>>,
    now: u64,
    next_seq: u64,
    executed: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `kind` at its default priority, `delay` ticks from now.
    pub fn schedule(&mut self, kind: EventKind, delay: u64) -> Event {
        self.schedule_with(kind, kind.priority(), delay)
    }

    pub fn schedule_with(&mut self, kind: EventKind, priority: Priority, delay: u64) -> Event {
        let event = Event {
            time: self.now + delay,
            priority,
            seq: self.next_seq,
            kind,
        };
        self.next_seq += 1;
        self.queue.push(Reverse(event));
        tracing::trace!(?kind, ?priority, time = event.time, seq = event.seq, "scheduled");
        event
    }

    /// Remove the next event and move the clock to its time.
    pub fn pop(&mut self) -> Option<Event> {
        let Reverse(event) = self.queue.pop()?;
        self.now = event.time;
        self.executed += 1;
        Some(event)
    }

    pub fn peek(&self) -> Option<&Event> {
        self.queue.peek().map(|Reverse(e)| e)
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Current logical time.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Events popped so far.
    pub fn executed(&self) -> u64 {
        self.executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order_within_instant() {
        let mut s = Scheduler::new();
        s.schedule(EventKind::SelectionMade, 0);
        s.schedule(EventKind::PropagationDone, 0);
        s.schedule(EventKind::InputReceived, 0);
        let order: Vec<EventKind> = std::iter::from_fn(|| s.pop()).map(|e| e.kind).collect();
        assert_eq!(
            order,
            vec![
                EventKind::InputReceived,
                EventKind::PropagationDone,
                EventKind::SelectionMade
            ]
        );
    }

    #[test]
    fn test_fifo_within_priority() {
        let mut s = Scheduler::new();
        let first = s.schedule(EventKind::StoreUpdated, 0);
        let second = s.schedule(EventKind::PropagationDone, 0);
        assert_eq!(s.pop().unwrap().seq, first.seq);
        assert_eq!(s.pop().unwrap().seq, second.seq);
        assert!(s.pop().is_none());
    }

    #[test]
    fn test_time_before_priority() {
        let mut s = Scheduler::new();
        s.schedule(EventKind::InputReceived, 5);
        s.schedule(EventKind::SelectionMade, 1);
        let e = s.pop().unwrap();
        assert_eq!(e.kind, EventKind::SelectionMade);
        assert_eq!(s.now(), 1);
        let e = s.pop().unwrap();
        assert_eq!(e.kind, EventKind::InputReceived);
        assert_eq!(s.now(), 5);
        assert_eq!(s.executed(), 2);
    }

    #[test]
    fn test_delay_is_relative_to_now() {
        let mut s = Scheduler::new();
        s.schedule(EventKind::InputReceived, 3);
        s.pop();
        let e = s.schedule(EventKind::PropagationDone, 2);
        assert_eq!(e.time, 5);
        assert!(s.has_pending());
        assert_eq!(s.peek().unwrap().kind, EventKind::PropagationDone);
    }
}
