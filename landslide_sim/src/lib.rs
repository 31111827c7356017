//! Landslide Deterministic Simulation Harness
//!
//! A single-threaded, seeded stand-in for the network simulator the
//! landslide controller was written against. Everything runs on one virtual
//! clock, so a seed and a configuration fully determine a run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ EventQueue (Virtual Clock, FIFO per instant)         │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                 │                     │             │
//! │  ┌────▼─────────┐  ┌────▼──────┐  ┌───────────▼──────────┐  │
//! │  │ Landslide    │  │ Echo      │  │ Trace snapshots      │  │
//! │  │ Controller   │  │ Traffic   │  │ (JSON export)        │  │
//! │  └────┬─────────┘  └────┬──────┘  └──────────────────────┘  │
//! │       │                 │                                   │
//! │  ┌────▼─────────────────▼───────────┐                       │
//! │  │ NodeRegistry + Topology           │                       │
//! │  │ (mountain Wi-Fi, backbone, city)  │                       │
//! │  └───────────────────────────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use landslide_sim::{ScenarioRunner, ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::Overrun)?;
//! assert_eq!(result.disposed, 4);
//! ```

mod clock;
mod error;
mod exporter;
mod layout;
mod registry;
mod runner;
pub mod scenarios;
mod topology;
mod traffic;
mod world;

pub use clock::EventQueue;
pub use error::SimError;
pub use exporter::{NodeSample, TraceEvent, TraceEventKind, TraceExport, TraceFrame};
pub use layout::{GridLayout, LayoutType};
pub use registry::{Mobility, NodeRegistry, NodeRole, SimNode};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::{Expectation, ScenarioId};
pub use topology::{Hop, LinkSpec, NetworkConfig, Segment, Topology};
pub use traffic::{EchoConfig, EchoTraffic, TrafficAction, TrafficStats};
pub use world::{AffectedSet, LandslideWave, SimAction, SimConfig, SimWorld};
