//! Error types for the landslide controller.

use landslide_env::{EntityId, EnvError};
use thiserror::Error;

/// Errors raised while planning or scheduling a landslide.
///
/// Per-entity errors (`MissingCapability`, `UnknownEntity`, `Disposed`) are
/// recovered by the controller: the entity is skipped and the batch goes on.
/// Parameter errors reject the whole `trigger` call before anything is
/// scheduled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LandslideError {
    #[error("{0} does not have a constant-velocity mobility model")]
    MissingCapability(EntityId),

    #[error("{0} is not known to the registry")]
    UnknownEntity(EntityId),

    #[error("{0} has already been disposed")]
    Disposed(EntityId),

    #[error("Invalid landslide duration: {0} s (must be positive and finite)")]
    InvalidDuration(f64),

    #[error("Invalid landslide target height: {0} (must be finite)")]
    InvalidTarget(f64),

    #[error("Invalid landslide boundary height: {0} (must be finite)")]
    InvalidBoundary(f64),

    #[error("Invalid landslide start time: {0} s")]
    InvalidStartTime(f64),

    #[error("Landslide start {start:?} is before the current time {now:?}")]
    StartInPast {
        start: std::time::Duration,
        now: std::time::Duration,
    },

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] EnvError),
}

impl LandslideError {
    /// Returns true for errors that only affect a single entity.
    pub fn is_per_entity(&self) -> bool {
        matches!(
            self,
            Self::MissingCapability(_) | Self::UnknownEntity(_) | Self::Disposed(_)
        )
    }
}
