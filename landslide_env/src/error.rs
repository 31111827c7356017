//! Error types for the landslide environment abstraction.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    /// An event was scheduled before the current virtual time.
    #[error("Cannot schedule event at {at:?}: clock is already at {now:?}")]
    PastEvent { at: Duration, now: Duration },

    /// A time value could not be represented on the virtual clock.
    #[error("Invalid time value: {0}")]
    InvalidTime(String),
}

impl EnvError {
    /// Creates a past-event error.
    pub fn past(at: Duration, now: Duration) -> Self {
        Self::PastEvent { at, now }
    }

    /// Creates an invalid-time error.
    pub fn invalid_time(msg: impl Into<String>) -> Self {
        Self::InvalidTime(msg.into())
    }
}
