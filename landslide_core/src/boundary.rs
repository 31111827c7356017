//! Boundary policy: the single-instant check that decides disposal.
//!
//! The check samples the entity's live position once, at the end of the
//! motion interval. A trajectory that crosses the boundary and comes back
//! before that instant, or crosses it afterwards, is not detected.

use landslide_env::EntityId;
use nalgebra::Vector3;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::LandslideError;
use crate::registry::EntityRegistry;

/// Result of one boundary evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryOutcome {
    /// Boundary reached; the entity was disposed
    Disposed { y: f64 },

    /// Boundary not reached; the entity stays active
    Retained { y: f64 },

    /// The entity had been disposed earlier; nothing happened
    AlreadyDisposed,
}

/// Predicate + action evaluated when an `EvaluateBoundary` event fires.
pub trait BoundaryPolicy {
    /// Returns true when `position` lies past `boundary_y`.
    fn crossed(&self, position: &Vector3<f64>, boundary_y: f64) -> bool;

    /// Checks the live position of `id` against `boundary_y` at `now` and
    /// disposes the entity if it crossed.
    fn evaluate<R: EntityRegistry + ?Sized>(
        &self,
        registry: &mut R,
        id: EntityId,
        boundary_y: f64,
        now: Duration,
    ) -> Result<BoundaryOutcome, LandslideError> {
        let entity = registry.kinematic(id)?;
        if !entity.is_active() {
            debug!("{} already disposed, skipping boundary check", id);
            return Ok(BoundaryOutcome::AlreadyDisposed);
        }

        let position = entity.position(now);
        if !self.crossed(&position, boundary_y) {
            debug!("{} at y={:.3} stays below boundary {:.3}", id, position.y, boundary_y);
            return Ok(BoundaryOutcome::Retained { y: position.y });
        }

        info!("Destroying {} as it reached the boundary (y={:.3})", id, position.y);
        registry.dispose(id, now)?;
        Ok(BoundaryOutcome::Disposed { y: position.y })
    }
}

/// Disposes entities whose height is at or above the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtOrAbove;

impl BoundaryPolicy for AtOrAbove {
    fn crossed(&self, position: &Vector3<f64>, boundary_y: f64) -> bool {
        position.y >= boundary_y
    }
}
