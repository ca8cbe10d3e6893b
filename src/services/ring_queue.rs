use crate::models::Event;
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bounded, overwrite-oldest queue of [`Event`]s.
///
/// The UI-owning thread pushes, caller threads drain with [`pop_batch`](Self::pop_batch).
/// A push never blocks and never fails: when every slot is occupied the oldest
/// unread event is discarded and the overflow counter is bumped. Slots are
/// published with release ordering and consumed with acquire ordering by the
/// underlying `ArrayQueue`, so a consumer never observes a partially written event.
pub struct RingEventQueue {
    slots: ArrayQueue<Event>,
    overflow: AtomicU64,
}

impl RingEventQueue {
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Create a queue with `capacity` slots (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: ArrayQueue::new(capacity.max(1)),
            overflow: AtomicU64::new(0),
        }
    }

    /// Append `event`, overwriting the oldest unread event if the ring is full.
    pub fn push(&self, event: Event) {
        if let Some(dropped) = self.slots.force_push(event) {
            let total = self.overflow.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::trace!(?dropped, total, "event ring full, oldest event overwritten");
        }
    }

    /// Copy out up to `max` events, oldest first.
    ///
    /// Returns the events and whether unread events remain after the batch.
    pub fn pop_batch(&self, max: usize) -> (Vec<Event>, bool) {
        if max == 0 {
            return (Vec::new(), !self.slots.is_empty());
        }
        let mut events = Vec::with_capacity(max.min(self.slots.len()));
        while events.len() < max {
            match self.slots.pop() {
                Some(event) => events.push(event),
                None => break,
            }
        }
        (events, !self.slots.is_empty())
    }

    /// Total number of events lost to overwrite since creation. Monotonic.
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Discard every unread event. The overflow counter is left untouched.
    pub fn clear(&self) {
        while self.slots.pop().is_some() {}
    }
}

impl Default for RingEventQueue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, Event};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_push_pop_in_order() {
        let queue = RingEventQueue::default();
        queue.push(Event::key(0x41, Action::Down));
        queue.push(Event::key(0x41, Action::Up));

        let (events, more) = queue.pop_batch(10);
        assert_eq!(events, vec![Event::key(0x41, Action::Down), Event::key(0x41, Action::Up)]);
        assert!(!more);
    }

    #[test]
    fn test_pop_batch_reports_more() {
        let queue = RingEventQueue::new(8);
        for _ in 0..5 {
            queue.push(Event::Closed);
        }
        let (events, more) = queue.pop_batch(3);
        assert_eq!(events.len(), 3);
        assert!(more);

        let (events, more) = queue.pop_batch(3);
        assert_eq!(events.len(), 2);
        assert!(!more);
    }

    #[test]
    fn test_pop_batch_zero() {
        let queue = RingEventQueue::new(4);
        queue.push(Event::Created);
        let (events, more) = queue.pop_batch(0);
        assert!(events.is_empty());
        assert!(more);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let queue = RingEventQueue::new(2);
        queue.push(Event::key(1, Action::Down));
        queue.push(Event::key(2, Action::Down));
        queue.push(Event::key(3, Action::Down));

        assert_eq!(queue.overflow_count(), 1);
        let (events, _) = queue.pop_batch(10);
        assert_eq!(events, vec![Event::key(2, Action::Down), Event::key(3, Action::Down)]);
    }

    #[test]
    fn test_clear_keeps_overflow_counter() {
        let queue = RingEventQueue::new(1);
        queue.push(Event::Created);
        queue.push(Event::Closed);
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.overflow_count(), 1);
    }

    #[test]
    fn test_concurrent_producer_consumer_preserves_order() {
        let queue = Arc::new(RingEventQueue::new(1024));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for code in 0..500u16 {
                    queue.push(Event::key(code, Action::Down));
                }
            })
        };

        let mut seen = Vec::new();
        while seen.len() < 500 {
            let (events, _) = queue.pop_batch(32);
            for event in events {
                if let Event::Key { code, .. } = event {
                    seen.push(code);
                }
            }
            thread::yield_now();
        }
        producer.join().unwrap();

        let expected: Vec<u16> = (0..500).collect();
        assert_eq!(seen, expected);
        assert_eq!(queue.overflow_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_bounded_overwrite_keeps_most_recent(capacity in 1usize..64, extra in 0usize..200) {
            let queue = RingEventQueue::new(capacity);
            let total = capacity + extra;
            for code in 0..total {
                queue.push(Event::key(code as u16, Action::Down));
            }

            prop_assert_eq!(queue.overflow_count(), extra as u64);
            let (events, more) = queue.pop_batch(total);
            prop_assert!(!more);
            let codes: Vec<usize> = events
                .iter()
                .filter_map(|e| match e {
                    Event::Key { code, .. } => Some(*code as usize),
                    _ => None,
                })
                .collect();
            let expected: Vec<usize> = (extra..total).collect();
            prop_assert_eq!(codes, expected);
        }
    }
}
