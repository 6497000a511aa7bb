use std::collections::VecDeque;

use foundation::time::Time;

/// Retained events per bus when no explicit capacity is given.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A recorded event with its production order.
#[derive(Debug, Clone, PartialEq)]
pub struct Event<E> {
    pub seq: u64,
    pub at: Time,
    pub payload: E,
}

/// Ordered, bounded, in-memory event log.
///
/// Components emit into their own bus; readers drain it to observe
/// transitions exactly in the order they were produced. When nobody drains,
/// the oldest events are dropped once `capacity` is reached; sequence
/// numbers keep counting so readers can see the gap.
#[derive(Debug)]
pub struct EventBus<E> {
    next_seq: u64,
    capacity: usize,
    dropped: u64,
    events: VecDeque<Event<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            next_seq: 0,
            capacity: capacity.max(1),
            dropped: 0,
            events: VecDeque::new(),
        }
    }

    pub fn emit(&mut self, at: Time, payload: E) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(Event { seq, at, payload });
    }

    pub fn events(&self) -> impl Iterator<Item = &Event<E>> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events discarded because the bus was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        self.events.drain(..).collect()
    }

    /// Drains events and keeps only their payloads.
    pub fn drain_payloads(&mut self) -> Vec<E> {
        self.events.drain(..).map(|e| e.payload).collect()
    }
}
