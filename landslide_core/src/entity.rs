//! Kinematic entities driven by the landslide controller.
//!
//! An entity follows a constant-velocity model evaluated lazily: it stores
//! the position it had at its last update (the anchor) and extrapolates
//! from there whenever it is asked for its position. Changing the velocity
//! re-anchors the entity at the current instant, so motion stays exact no
//! matter how far apart events are.

use landslide_env::EntityId;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LandslideError;

/// Lifecycle of a simulated entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Participating in the simulation
    Active,

    /// Removed; terminal
    Disposed,
}

/// An entity with a constant-velocity mobility model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinematicEntity {
    id: EntityId,

    /// Position at `anchor_time`
    anchor_position: Vector3<f64>,

    /// Virtual time of the last position/velocity update
    anchor_time: Duration,

    /// Velocity [vx, vy, vz] in m/s
    velocity: Vector3<f64>,

    state: LifecycleState,
}

impl KinematicEntity {
    /// Creates a resting entity at `position`.
    pub fn new(id: EntityId, position: Vector3<f64>) -> Self {
        Self::with_velocity(id, position, Vector3::zeros())
    }

    /// Creates an entity already moving with `velocity` from time zero.
    pub fn with_velocity(id: EntityId, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self {
            id,
            anchor_position: position,
            anchor_time: Duration::ZERO,
            velocity,
            state: LifecycleState::Active,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    pub fn velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    /// Returns the position at virtual time `now`.
    ///
    /// A disposed entity stays where it was when it was disposed.
    pub fn position(&self, now: Duration) -> Vector3<f64> {
        if !self.is_active() {
            return self.anchor_position;
        }
        let elapsed = now.saturating_sub(self.anchor_time).as_secs_f64();
        self.anchor_position + self.velocity * elapsed
    }

    /// Teleports the entity to `position` at time `now`.
    pub fn set_position(&mut self, now: Duration, position: Vector3<f64>) -> Result<(), LandslideError> {
        self.ensure_active()?;
        self.anchor_position = position;
        self.anchor_time = now;
        Ok(())
    }

    /// Changes the velocity from time `now` onwards.
    pub fn set_velocity(&mut self, now: Duration, velocity: Vector3<f64>) -> Result<(), LandslideError> {
        self.ensure_active()?;
        self.anchor_position = self.position(now);
        self.anchor_time = now;
        self.velocity = velocity;
        Ok(())
    }

    /// Moves the entity to `Disposed`, freezing its position at `now`.
    ///
    /// Returns `false` if it was already disposed; nothing changes then.
    pub fn dispose(&mut self, now: Duration) -> bool {
        if !self.is_active() {
            return false;
        }
        self.anchor_position = self.position(now);
        self.anchor_time = now;
        self.state = LifecycleState::Disposed;
        true
    }

    fn ensure_active(&self) -> Result<(), LandslideError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(LandslideError::Disposed(self.id))
        }
    }
}
