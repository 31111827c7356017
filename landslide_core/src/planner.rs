//! Displacement planning: start position + target height + duration → velocity.

use landslide_env::EntityId;
use nalgebra::Vector3;
use std::time::Duration;

use crate::error::LandslideError;

/// Computes the constant velocity that carries `start` to `target_y` in
/// `duration_secs`.
///
/// Only the vertical axis is driven; x and z components are zero.
///
/// # Errors
/// `InvalidDuration` when `duration_secs` is not a positive finite number.
///
/// # Examples
///
/// ```
/// use landslide_core::compute_velocity;
/// use nalgebra::Vector3;
///
/// let v = compute_velocity(&Vector3::new(0.0, 10.0, 0.0), 20.0, 2.0).unwrap();
/// assert_eq!(v, Vector3::new(0.0, 5.0, 0.0));
/// ```
pub fn compute_velocity(
    start: &Vector3<f64>,
    target_y: f64,
    duration_secs: f64,
) -> Result<Vector3<f64>, LandslideError> {
    if !(duration_secs > 0.0 && duration_secs.is_finite()) {
        return Err(LandslideError::InvalidDuration(duration_secs));
    }
    Ok(Vector3::new(0.0, (target_y - start.y) / duration_secs, 0.0))
}

/// Motion of one entity during one landslide wave.
///
/// Lives only while the controller schedules the entity's events.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPlan {
    pub entity: EntityId,
    pub start_time: Duration,
    pub duration: Duration,
    pub target_y: f64,
}

impl MotionPlan {
    /// Instant at which the entity is expected to reach `target_y`.
    pub fn check_time(&self) -> Result<Duration, LandslideError> {
        self.start_time
            .checked_add(self.duration)
            .ok_or(LandslideError::InvalidDuration(self.duration.as_secs_f64()))
    }

    /// Velocity for an entity currently at `start`.
    pub fn velocity(&self, start: &Vector3<f64>) -> Result<Vector3<f64>, LandslideError> {
        compute_velocity(start, self.target_y, self.duration.as_secs_f64())
    }
}
