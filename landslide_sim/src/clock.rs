//! Deterministic event queue implementing the `Scheduler` trait.

use landslide_env::{EnvError, ScheduledEvent, Scheduler};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// Heap entry ordered so that `BinaryHeap` (a max-heap) pops the event
/// with the smallest `(fire_time, seq)` first.
struct QueuedEvent<A>(ScheduledEvent<A>);

impl<A> PartialEq for QueuedEvent<A> {
    fn eq(&self, other: &Self) -> bool {
        self.0.key() == other.0.key()
    }
}

impl<A> Eq for QueuedEvent<A> {}

impl<A> PartialOrd for QueuedEvent<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> Ord for QueuedEvent<A> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.key().cmp(&self.0.key())
    }
}

/// Virtual clock plus pending-event queue.
///
/// Time only moves when an event is popped or the queue is advanced
/// explicitly; nothing here reads the wall clock. Single-threaded by
/// construction: actions run one at a time from [`Scheduler::run`].
pub struct EventQueue<A> {
    /// Current virtual time
    now: Duration,

    /// Sequence number for the next insertion (FIFO tie-break)
    next_seq: u64,

    heap: BinaryHeap<QueuedEvent<A>>,

    /// Events delivered so far
    fired: u64,
}

impl<A> EventQueue<A> {
    /// Creates an empty queue at virtual time zero.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            heap: BinaryHeap::new(),
            fired: 0,
        }
    }

    /// Fire time of the next pending event, if any.
    pub fn peek_time(&self) -> Option<Duration> {
        self.heap.peek().map(|e| e.0.fire_time)
    }

    /// Total number of events delivered since creation.
    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    /// Current virtual time in seconds.
    pub fn now_secs(&self) -> f64 {
        self.now.as_secs_f64()
    }
}

impl<A> Default for EventQueue<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Scheduler for EventQueue<A> {
    type Action = A;

    fn now(&self) -> Duration {
        self.now
    }

    fn schedule(&mut self, at: Duration, action: A) -> Result<u64, EnvError> {
        if at < self.now {
            return Err(EnvError::past(at, self.now));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedEvent(ScheduledEvent::new(at, seq, action)));
        Ok(seq)
    }

    fn pop_due(&mut self, until: Duration) -> Option<ScheduledEvent<A>> {
        if self.peek_time()? > until {
            return None;
        }
        let QueuedEvent(event) = self.heap.pop()?;
        self.now = event.fire_time;
        self.fired += 1;
        Some(event)
    }

    fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    fn pending(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_queue_starts_at_zero() {
        let queue: EventQueue<()> = EventQueue::new();
        assert_eq!(queue.now(), Duration::ZERO);
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.peek_time(), None);
    }

    #[test]
    fn test_equal_times_fire_fifo() {
        let mut queue = EventQueue::new();
        for i in 0..10 {
            queue.schedule(Duration::from_secs(5), i).unwrap();
        }
        queue.schedule(Duration::from_secs(1), 99).unwrap();

        let mut order = Vec::new();
        queue.run(Duration::from_secs(5), |_, e| order.push(e.action));

        assert_eq!(order, vec![99, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(queue.fired_count(), 11);
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let mut queue = EventQueue::new();
        queue.schedule(Duration::from_secs(3), "a").unwrap();
        queue.run(Duration::from_secs(10), |_, _| {});
        assert_eq!(queue.now(), Duration::from_secs(10));

        queue.advance_to(Duration::from_secs(2));
        assert_eq!(queue.now(), Duration::from_secs(10));

        assert!(queue.schedule(Duration::from_secs(9), "stale").is_err());
        assert!(queue.schedule(Duration::from_secs(10), "now").is_ok());
    }

    #[test]
    fn test_events_at_until_are_delivered() {
        let mut queue = EventQueue::new();
        queue.schedule(Duration::from_secs(8), "edge").unwrap();
        queue.schedule(Duration::from_nanos(8_000_000_001), "after").unwrap();

        let fired = queue.run(Duration::from_secs(8), |_, _| {});

        assert_eq!(fired, 1);
        assert_eq!(queue.pending(), 1);
    }

    proptest! {
        #[test]
        fn prop_delivery_is_sorted_by_time_then_seq(times in proptest::collection::vec(0u64..50, 1..64)) {
            let mut queue = EventQueue::new();
            for t in &times {
                queue.schedule(Duration::from_millis(*t), ()).unwrap();
            }

            let mut keys = Vec::new();
            queue.run(Duration::from_secs(1), |_, e| keys.push(e.key()));

            prop_assert_eq!(keys.len(), times.len());
            prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
