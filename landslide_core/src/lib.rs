//! Landslide Core - Event-Driven Kinematic Controller
//!
//! Models a landslide hitting part of a simulated network:
//! 1. **Planning**: every affected node gets a velocity that carries it from
//!    its own position to a target height over the landslide duration
//! 2. **Scheduling**: one onset and one boundary-check event per node,
//!    installed on an injected [`landslide_env::Scheduler`]
//! 3. **Disposal**: at check time, nodes at or past the boundary are removed

pub mod boundary;
pub mod controller;
pub mod entity;
pub mod error;
pub mod planner;
pub mod registry;

// Re-export key types for convenience
pub use boundary::{AtOrAbove, BoundaryOutcome, BoundaryPolicy};
pub use controller::{ActionOutcome, LandslideAction, LandslideController, LandslideParams, TriggerReport};
pub use entity::{KinematicEntity, LifecycleState};
pub use error::LandslideError;
pub use planner::{compute_velocity, MotionPlan};
pub use registry::EntityRegistry;
