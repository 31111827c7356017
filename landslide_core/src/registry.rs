//! The seam between the controller and whoever owns entity storage.

use landslide_env::EntityId;
use std::time::Duration;

use crate::entity::KinematicEntity;
use crate::error::LandslideError;

/// Owner of entity storage.
///
/// The controller only ever holds [`EntityId`]s. Every access goes through
/// this trait, which decides whether an entity exposes the kinematic
/// capability at all: entities without a constant-velocity model answer
/// `Err(LandslideError::MissingCapability)`.
pub trait EntityRegistry {
    /// Read access to the kinematic model of `id`.
    fn kinematic(&self, id: EntityId) -> Result<&KinematicEntity, LandslideError>;

    /// Write access to the kinematic model of `id`.
    fn kinematic_mut(&mut self, id: EntityId) -> Result<&mut KinematicEntity, LandslideError>;

    /// Tears down everything the simulation attached to `id`.
    ///
    /// Called exactly once, right after the entity became `Disposed`.
    fn release(&mut self, id: EntityId, now: Duration);

    /// Disposes `id` and releases its resources.
    ///
    /// Returns `Ok(false)` without side effects when the entity was already
    /// disposed.
    fn dispose(&mut self, id: EntityId, now: Duration) -> Result<bool, LandslideError> {
        let newly_disposed = self.kinematic_mut(id)?.dispose(now);
        if newly_disposed {
            self.release(id, now);
        }
        Ok(newly_disposed)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use nalgebra::Vector3;
    use std::collections::HashMap;

    /// In-memory registry: `Some` slots are kinematic, `None` slots are
    /// entities without a mobility model.
    #[derive(Default)]
    pub struct MemoryRegistry {
        pub slots: HashMap<EntityId, Option<KinematicEntity>>,
        pub released: Vec<EntityId>,
    }

    impl MemoryRegistry {
        pub fn with_heights(heights: &[f64]) -> Self {
            let mut registry = Self::default();
            for (i, y) in heights.iter().enumerate() {
                let id = EntityId(i as u32);
                registry
                    .slots
                    .insert(id, Some(KinematicEntity::new(id, Vector3::new(20.0 * i as f64, *y, 0.0))));
            }
            registry
        }

        pub fn add_static(&mut self, id: EntityId) {
            self.slots.insert(id, None);
        }
    }

    impl EntityRegistry for MemoryRegistry {
        fn kinematic(&self, id: EntityId) -> Result<&KinematicEntity, LandslideError> {
            match self.slots.get(&id) {
                Some(Some(entity)) => Ok(entity),
                Some(None) => Err(LandslideError::MissingCapability(id)),
                None => Err(LandslideError::UnknownEntity(id)),
            }
        }

        fn kinematic_mut(&mut self, id: EntityId) -> Result<&mut KinematicEntity, LandslideError> {
            match self.slots.get_mut(&id) {
                Some(Some(entity)) => Ok(entity),
                Some(None) => Err(LandslideError::MissingCapability(id)),
                None => Err(LandslideError::UnknownEntity(id)),
            }
        }

        fn release(&mut self, id: EntityId, _now: Duration) {
            self.released.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::MemoryRegistry;
    use super::*;

    #[test]
    fn test_dispose_releases_once() {
        let mut registry = MemoryRegistry::with_heights(&[10.0]);
        let id = EntityId(0);

        assert_eq!(registry.dispose(id, Duration::from_secs(1)), Ok(true));
        assert_eq!(registry.dispose(id, Duration::from_secs(2)), Ok(false));
        assert_eq!(registry.released, vec![id]);
    }

    #[test]
    fn test_dispose_without_capability_fails() {
        let mut registry = MemoryRegistry::default();
        registry.add_static(EntityId(4));

        assert_eq!(
            registry.dispose(EntityId(4), Duration::ZERO),
            Err(LandslideError::MissingCapability(EntityId(4)))
        );
        assert!(registry.released.is_empty());
    }
}
