//! Discrete-event scheduler trait.

use crate::error::EnvError;
use crate::types::ScheduledEvent;
use std::time::Duration;

/// The virtual clock and its pending-event queue.
///
/// This trait abstracts the simulator's global clock so that the landslide
/// controller can be driven by any event loop: the deterministic harness,
/// a recording stub in tests, or an embedding simulator.
///
/// # Ordering
///
/// Implementations must deliver events in `(fire_time, seq)` order. `seq`
/// increases with every call to [`Scheduler::schedule`], so events that
/// share a `fire_time` fire first-in first-out.
///
/// # Monotonicity
///
/// `now()` never decreases. Scheduling an event before `now()` fails with
/// [`EnvError::PastEvent`]; an event scheduled exactly at `now()` is allowed
/// and fires before the clock moves on.
pub trait Scheduler {
    /// The action payload carried by queued events.
    type Action;

    /// Returns the current virtual time.
    fn now(&self) -> Duration;

    /// Queues `action` to fire at virtual time `at`.
    ///
    /// # Returns
    /// * `Ok(seq)` - The insertion sequence number of the new event
    /// * `Err(EnvError::PastEvent)` - `at` is earlier than `now()`
    fn schedule(&mut self, at: Duration, action: Self::Action) -> Result<u64, EnvError>;

    /// Removes and returns the next event due at or before `until`,
    /// advancing the clock to its `fire_time`.
    fn pop_due(&mut self, until: Duration) -> Option<ScheduledEvent<Self::Action>>;

    /// Moves the clock forward to `until` (no-op if already past it).
    fn advance_to(&mut self, until: Duration);

    /// Number of events still queued.
    fn pending(&self) -> usize;

    /// Queues `action` to fire `delay` after the current time.
    fn schedule_in(&mut self, delay: Duration, action: Self::Action) -> Result<u64, EnvError> {
        let at = self.now() + delay;
        self.schedule(at, action)
    }

    /// Fires every event due at or before `until`, then parks the clock at
    /// `until`.
    ///
    /// Each action runs to completion inside `handler` before the next one
    /// is popped. The handler receives the scheduler back so it can queue
    /// follow-up events, which are delivered in the same run if they fall
    /// inside the window.
    ///
    /// Returns the number of events fired.
    fn run<F>(&mut self, until: Duration, mut handler: F) -> usize
    where
        Self: Sized,
        F: FnMut(&mut Self, ScheduledEvent<Self::Action>),
    {
        let mut fired = 0;
        while let Some(event) = self.pop_due(until) {
            handler(self, event);
            fired += 1;
        }
        self.advance_to(until);
        fired
    }
}
