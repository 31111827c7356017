//! JSON trace exporter.
//!
//! Records node positions at a fixed interval plus every landslide event,
//! for offline plotting of the run.

use landslide_core::{ActionOutcome, BoundaryOutcome, LandslideError};
use landslide_env::EntityId;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use crate::error::SimError;
use crate::registry::NodeRegistry;
use crate::traffic::TrafficStats;

/// Position and state of one node in a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSample {
    pub id: u32,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub active: bool,
}

/// Snapshot of every node at one instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceFrame {
    pub time_sec: f64,
    pub nodes: Vec<NodeSample>,
}

/// Kind of landslide event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEventKind {
    Skipped,
    VelocityApplied,
    VelocityIgnored,
    Retained,
    Disposed,
    AlreadyDisposed,
    CheckFailed,
}

/// A landslide event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub time_sec: f64,
    pub node: u32,
    pub kind: TraceEventKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Complete trace of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Time of the last frame in seconds
    pub duration_sec: f64,

    pub frames: Vec<TraceFrame>,
    pub events: Vec<TraceEvent>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic: Option<TrafficStats>,
}

impl TraceExport {
    /// Creates an empty trace.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            events: Vec::new(),
            passed: false,
            traffic: None,
        }
    }

    /// Samples every node at `now`.
    pub fn snapshot(&mut self, now: Duration, registry: &NodeRegistry) {
        let nodes = registry
            .nodes()
            .map(|node| {
                let p = node.position(now);
                NodeSample {
                    id: node.id.index(),
                    name: node.name.clone(),
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    active: node.is_active(),
                }
            })
            .collect();
        self.duration_sec = now.as_secs_f64();
        self.frames.push(TraceFrame {
            time_sec: self.duration_sec,
            nodes,
        });
    }

    /// Records an entity left out of a wave.
    pub fn record_skipped(&mut self, now: Duration, id: EntityId, reason: &LandslideError) {
        self.push(now, id, TraceEventKind::Skipped, Some(reason.to_string()));
    }

    /// Records the outcome of a fired landslide action.
    pub fn record_outcome(&mut self, now: Duration, outcome: &ActionOutcome) {
        let (id, kind, detail) = match outcome {
            ActionOutcome::VelocityApplied { entity, velocity } => (
                *entity,
                TraceEventKind::VelocityApplied,
                Some(format!("vy={:.3}", velocity.y)),
            ),
            ActionOutcome::VelocityIgnored { entity, reason } => {
                (*entity, TraceEventKind::VelocityIgnored, Some(reason.to_string()))
            }
            ActionOutcome::Boundary { entity, outcome } => match outcome {
                BoundaryOutcome::Retained { y } => {
                    (*entity, TraceEventKind::Retained, Some(format!("y={:.3}", y)))
                }
                BoundaryOutcome::Disposed { y } => {
                    (*entity, TraceEventKind::Disposed, Some(format!("y={:.3}", y)))
                }
                BoundaryOutcome::AlreadyDisposed => (*entity, TraceEventKind::AlreadyDisposed, None),
            },
            ActionOutcome::BoundaryFailed { entity, reason } => {
                (*entity, TraceEventKind::CheckFailed, Some(reason.to_string()))
            }
        };
        self.push(now, id, kind, detail);
    }

    fn push(&mut self, now: Duration, id: EntityId, kind: TraceEventKind, detail: Option<String>) {
        self.events.push(TraceEvent {
            time_sec: now.as_secs_f64(),
            node: id.index(),
            kind,
            detail,
        });
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, traffic: TrafficStats) {
        self.passed = passed;
        self.traffic = Some(traffic);
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
