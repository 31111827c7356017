//! Common types for the landslide environment abstraction.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stable identifier for a simulated node.
///
/// Ids are dense indices handed out by the registry in creation order, so
/// the same configuration always yields the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Creates an id from a registry index.
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }

    /// Returns the registry index.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// An action bound to the virtual instant at which it fires.
///
/// `seq` is assigned by the scheduler on insertion and breaks ties between
/// events with the same `fire_time` (lower fires first).
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent<A> {
    /// Virtual time at which the action runs
    pub fire_time: Duration,

    /// Insertion sequence number
    pub seq: u64,

    /// The action itself
    pub action: A,
}

impl<A> ScheduledEvent<A> {
    /// Creates a new event.
    pub fn new(fire_time: Duration, seq: u64, action: A) -> Self {
        Self {
            fire_time,
            seq,
            action,
        }
    }

    /// Ordering key used by schedulers: time first, then insertion order.
    pub fn key(&self) -> (Duration, u64) {
        (self.fire_time, self.seq)
    }
}

/// Converts seconds into a virtual-clock instant.
///
/// Rejects negative, NaN and infinite values.
pub fn virtual_time(secs: f64) -> Result<Duration, EnvError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| EnvError::invalid_time(format!("{} s is not a valid virtual time", secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_display() {
        assert_eq!(EntityId::from_index(3).to_string(), "node-3");
        assert_eq!(EntityId(7).index(), 7);
    }

    #[test]
    fn test_event_key_orders_by_time_then_seq() {
        let early = ScheduledEvent::new(Duration::from_secs(1), 9, ());
        let late = ScheduledEvent::new(Duration::from_secs(2), 0, ());
        let tie = ScheduledEvent::new(Duration::from_secs(1), 10, ());

        assert!(early.key() < late.key());
        assert!(early.key() < tie.key());
    }

    #[test]
    fn test_virtual_time_rejects_bad_values() {
        assert_eq!(virtual_time(1.5).unwrap(), Duration::from_millis(1500));
        assert!(virtual_time(-1.0).is_err());
        assert!(virtual_time(f64::NAN).is_err());
        assert!(virtual_time(f64::INFINITY).is_err());
    }
}
