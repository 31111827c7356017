//! Node registry: the sole owner of simulated nodes.
//!
//! Every node has a mobility model. Constant-velocity nodes expose the
//! kinematic capability the landslide controller needs; constant-position
//! nodes (the city) do not, and the controller skips them.

use landslide_core::{EntityRegistry, KinematicEntity, LandslideError, LifecycleState};
use landslide_env::EntityId;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

/// Where a node sits in the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Backbone end inside the city LAN
    CityGateway,

    /// Backbone end acting as the mountain Wi-Fi access point
    MountainAccessPoint,

    /// City LAN host
    City,

    /// Mountain Wi-Fi station
    Mountain,
}

impl NodeRole {
    pub fn is_mountain(&self) -> bool {
        matches!(self, NodeRole::MountainAccessPoint | NodeRole::Mountain)
    }
}

/// Mobility model installed on a node.
#[derive(Debug, Clone)]
pub enum Mobility {
    ConstantVelocity(KinematicEntity),
    ConstantPosition(Vector3<f64>),
}

/// A node in the simulated network.
#[derive(Debug, Clone)]
pub struct SimNode {
    pub id: EntityId,
    pub name: String,
    pub role: NodeRole,
    pub mobility: Mobility,

    /// Time at which the node's resources were released, if disposed
    pub released_at: Option<Duration>,
}

impl SimNode {
    pub fn position(&self, now: Duration) -> Vector3<f64> {
        match &self.mobility {
            Mobility::ConstantVelocity(entity) => entity.position(now),
            Mobility::ConstantPosition(position) => *position,
        }
    }

    pub fn state(&self) -> LifecycleState {
        match &self.mobility {
            Mobility::ConstantVelocity(entity) => entity.state(),
            Mobility::ConstantPosition(_) => LifecycleState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }
}

/// Owns all nodes; ids are indices into `nodes`.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<SimNode>,

    /// Disposals in the order they happened
    disposals: Vec<(EntityId, Duration)>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constant-velocity node resting at `position`.
    pub fn add_mobile(&mut self, name: &str, role: NodeRole, position: Vector3<f64>) -> EntityId {
        let id = self.next_id();
        self.push(id, name, role, Mobility::ConstantVelocity(KinematicEntity::new(id, position)))
    }

    /// Adds a node pinned at `position`.
    pub fn add_static(&mut self, name: &str, role: NodeRole, position: Vector3<f64>) -> EntityId {
        let id = self.next_id();
        self.push(id, name, role, Mobility::ConstantPosition(position))
    }

    fn next_id(&self) -> EntityId {
        EntityId::from_index(self.nodes.len() as u32)
    }

    fn push(&mut self, id: EntityId, name: &str, role: NodeRole, mobility: Mobility) -> EntityId {
        self.nodes.push(SimNode {
            id,
            name: name.to_string(),
            role,
            mobility,
            released_at: None,
        });
        id
    }

    pub fn node(&self, id: EntityId) -> Option<&SimNode> {
        self.nodes.get(id.index() as usize)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SimNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Live position of `id` at `now`.
    pub fn position(&self, id: EntityId, now: Duration) -> Option<Vector3<f64>> {
        self.node(id).map(|n| n.position(now))
    }

    /// True if `id` exists and has not been disposed.
    pub fn is_active(&self, id: EntityId) -> bool {
        self.node(id).is_some_and(|n| n.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_active()).count()
    }

    /// Ids of every node with `role`, in creation order.
    pub fn with_role(&self, role: NodeRole) -> Vec<EntityId> {
        self.nodes.iter().filter(|n| n.role == role).map(|n| n.id).collect()
    }

    pub fn disposals(&self) -> &[(EntityId, Duration)] {
        &self.disposals
    }
}

impl EntityRegistry for NodeRegistry {
    fn kinematic(&self, id: EntityId) -> Result<&KinematicEntity, LandslideError> {
        match self.node(id).map(|n| &n.mobility) {
            Some(Mobility::ConstantVelocity(entity)) => Ok(entity),
            Some(Mobility::ConstantPosition(_)) => Err(LandslideError::MissingCapability(id)),
            None => Err(LandslideError::UnknownEntity(id)),
        }
    }

    fn kinematic_mut(&mut self, id: EntityId) -> Result<&mut KinematicEntity, LandslideError> {
        match self.nodes.get_mut(id.index() as usize).map(|n| &mut n.mobility) {
            Some(Mobility::ConstantVelocity(entity)) => Ok(entity),
            Some(Mobility::ConstantPosition(_)) => Err(LandslideError::MissingCapability(id)),
            None => Err(LandslideError::UnknownEntity(id)),
        }
    }

    fn release(&mut self, id: EntityId, now: Duration) {
        if let Some(node) = self.nodes.get_mut(id.index() as usize) {
            if node.released_at.is_none() {
                node.released_at = Some(now);
                self.disposals.push((id, now));
                info!("Released {} ({}) at t={:.3}s", node.name, id, now.as_secs_f64());
            }
        }
    }
}
