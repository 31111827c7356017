//! SimWorld - The simulation harness container.

use crate::clock::EventQueue;
use crate::error::SimError;
use crate::exporter::TraceExport;
use crate::layout::GridLayout;
use crate::registry::{NodeRegistry, NodeRole};
use crate::topology::{NetworkConfig, Topology};
use crate::traffic::{EchoConfig, EchoTraffic, TrafficAction, TrafficStats};

use landslide_core::{ActionOutcome, LandslideAction, LandslideController, LandslideParams, TriggerReport};
use landslide_env::{virtual_time, EntityId, Scheduler};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which nodes a landslide wave hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AffectedSet {
    /// Access point and mountain stations
    Mountain,

    /// Gateway and city hosts
    City,

    /// Every node, in id order
    All,
}

/// One landslide wave: parameters plus the nodes it hits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandslideWave {
    #[serde(default = "default_affected")]
    pub affected: AffectedSet,

    #[serde(flatten)]
    pub params: LandslideParams,
}

fn default_affected() -> AffectedSet {
    AffectedSet::Mountain
}

impl Default for LandslideWave {
    fn default() -> Self {
        Self {
            affected: AffectedSet::Mountain,
            params: LandslideParams::default(),
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for determinism (layout jitter)
    pub seed: u64,

    /// City hosts besides the gateway
    pub n_city: usize,

    /// Mountain stations besides the access point
    pub n_mountain: usize,

    /// Simulation end in seconds
    pub stop_time_secs: f64,

    pub mountain_grid: GridLayout,
    pub city_grid: GridLayout,
    pub network: NetworkConfig,

    /// Landslide waves, installed in order
    pub waves: Vec<LandslideWave>,

    pub echo: EchoConfig,

    /// Trace sampling period in seconds
    pub trace_interval_secs: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_city: 4,
            n_mountain: 3,
            stop_time_secs: 15.0,
            mountain_grid: GridLayout::mountain(),
            city_grid: GridLayout::city(),
            network: NetworkConfig::default(),
            waves: vec![LandslideWave::default()],
            echo: EchoConfig::default(),
            trace_interval_secs: 0.5,
        }
    }
}

impl SimConfig {
    /// Loads a configuration from JSON; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Simulation end as a virtual instant.
    pub fn stop_time(&self) -> Result<Duration, SimError> {
        Ok(virtual_time(self.stop_time_secs)?)
    }

    /// Checks everything that does not depend on the layout.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.n_city == 0 || self.n_mountain == 0 {
            return Err(SimError::config("need at least one city host and one mountain station"));
        }
        self.stop_time()?;
        let interval = virtual_time(self.trace_interval_secs)?;
        if interval.is_zero() {
            return Err(SimError::config("trace_interval_secs must be positive"));
        }
        Ok(())
    }
}

/// Everything queued on the simulation clock.
#[derive(Debug, Clone, PartialEq)]
pub enum SimAction {
    Landslide(LandslideAction),
    Traffic(TrafficAction),

    /// Take a trace frame
    Snapshot,
}

impl From<LandslideAction> for SimAction {
    fn from(action: LandslideAction) -> Self {
        SimAction::Landslide(action)
    }
}

impl From<TrafficAction> for SimAction {
    fn from(action: TrafficAction) -> Self {
        SimAction::Traffic(action)
    }
}

/// The SimWorld - container for the entire simulation.
pub struct SimWorld {
    /// Configuration
    config: SimConfig,

    /// Virtual clock and pending events
    clock: EventQueue<SimAction>,

    /// Node storage
    registry: NodeRegistry,

    topology: Topology,
    controller: LandslideController,
    traffic: EchoTraffic,

    /// Active trace, if enabled
    trace: Option<TraceExport>,

    /// Landslide action outcomes in firing order
    outcomes: Vec<(Duration, ActionOutcome)>,

    /// One report per installed wave
    reports: Vec<TriggerReport>,
}

impl SimWorld {
    /// Builds nodes, topology and traffic from `config`.
    ///
    /// Node ids: 0 city gateway, 1 mountain access point, then city hosts,
    /// then mountain stations. Landslide waves are not installed yet.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;

        // Separate stream from anything else seeded by the same master seed
        let layout_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let mut rng = ChaCha8Rng::seed_from_u64(layout_seed);
        let mountain_positions = config.mountain_grid.positions(config.n_mountain + 1, &mut rng)?;
        let city_positions = config.city_grid.positions(config.n_city + 1, &mut rng)?;

        let mut registry = NodeRegistry::new();
        let gateway = registry.add_static("city-gw", NodeRole::CityGateway, city_positions[0]);
        let access_point = registry.add_mobile("mountain-ap", NodeRole::MountainAccessPoint, mountain_positions[0]);
        let hosts: Vec<EntityId> = city_positions[1..]
            .iter()
            .enumerate()
            .map(|(i, p)| registry.add_static(&format!("city-{}", i + 1), NodeRole::City, *p))
            .collect();
        let stations: Vec<EntityId> = mountain_positions[1..]
            .iter()
            .enumerate()
            .map(|(i, p)| registry.add_mobile(&format!("mountain-{}", i + 1), NodeRole::Mountain, *p))
            .collect();

        let topology = Topology::new(config.network, gateway, access_point, &stations, &hosts)?;

        let client = topology.mountain()[config.n_mountain - 1];
        let server = topology.city()[config.n_city - 1];
        let traffic = EchoTraffic::new(config.echo, client, server)?;
        let mut clock = EventQueue::new();
        traffic.install(&mut clock)?;

        info!(
            "World built: {} nodes ({} city, {} mountain), echo {} -> {}",
            registry.len(),
            topology.city().len(),
            topology.mountain().len(),
            client,
            server
        );

        Ok(Self {
            config,
            clock,
            registry,
            topology,
            controller: LandslideController::new(),
            traffic,
            trace: None,
            outcomes: Vec::new(),
            reports: Vec::new(),
        })
    }

    /// Node ids in `set`.
    pub fn affected(&self, set: AffectedSet) -> Vec<EntityId> {
        match set {
            AffectedSet::Mountain => self.topology.mountain().to_vec(),
            AffectedSet::City => self.topology.city().to_vec(),
            AffectedSet::All => self.registry.nodes().map(|n| n.id).collect(),
        }
    }

    /// Installs one landslide wave on `affected`.
    pub fn trigger(&mut self, affected: &[EntityId], params: &LandslideParams) -> Result<TriggerReport, SimError> {
        let report = self.controller.trigger(&self.registry, &mut self.clock, affected, params)?;
        if let Some(trace) = self.trace.as_mut() {
            let now = self.clock.now();
            for (id, reason) in &report.skipped {
                trace.record_skipped(now, *id, reason);
            }
        }
        self.reports.push(report.clone());
        Ok(report)
    }

    /// Installs every wave from the configuration.
    pub fn install_waves(&mut self) -> Result<(), SimError> {
        for wave in self.config.waves.clone() {
            let affected = self.affected(wave.affected);
            self.trigger(&affected, &wave.params)?;
        }
        Ok(())
    }

    /// Starts recording a trace; the first frame is taken at the current time.
    pub fn enable_trace(&mut self, scenario: &str) -> Result<(), SimError> {
        self.trace = Some(TraceExport::new(scenario, self.config.seed));
        let now = self.clock.now();
        self.clock.schedule(now, SimAction::Snapshot)?;
        Ok(())
    }

    /// Runs until the configured stop time.
    pub fn run(&mut self) -> Result<usize, SimError> {
        let stop = self.config.stop_time()?;
        self.run_until(stop)
    }

    /// Fires every event due at or before `until`.
    pub fn run_until(&mut self, until: Duration) -> Result<usize, SimError> {
        let trace_interval = virtual_time(self.config.trace_interval_secs)?;
        let stop = self.config.stop_time()?;
        let Self {
            clock,
            registry,
            topology,
            controller,
            traffic,
            trace,
            outcomes,
            ..
        } = self;

        let mut failure: Option<SimError> = None;
        let fired = clock.run(until, |clock, event| {
            let now = event.fire_time;
            let result = match event.action {
                SimAction::Landslide(action) => {
                    let outcome = controller.fire(&mut *registry, now, &action);
                    if let Some(trace) = trace.as_mut() {
                        trace.record_outcome(now, &outcome);
                    }
                    outcomes.push((now, outcome));
                    Ok(())
                }
                SimAction::Traffic(action) => traffic.handle(action, now, registry, topology, clock),
                SimAction::Snapshot => match trace.as_mut() {
                    Some(trace) => {
                        trace.snapshot(now, registry);
                        let next = now + trace_interval;
                        if next <= stop {
                            clock.schedule(next, SimAction::Snapshot).map(|_| ()).map_err(SimError::from)
                        } else {
                            Ok(())
                        }
                    }
                    None => Ok(()),
                },
            };
            if let Err(err) = result {
                warn!("Event at {:?} failed: {}", now, err);
                failure.get_or_insert(err);
            }
        });

        debug!("Fired {} events up to {:?}", fired, until);
        match failure {
            Some(err) => Err(err),
            None => Ok(fired),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.clock.now_secs()
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn pending_events(&self) -> usize {
        self.clock.pending()
    }

    /// Landslide outcomes in firing order.
    pub fn outcomes(&self) -> &[(Duration, ActionOutcome)] {
        &self.outcomes
    }

    /// Trigger reports, one per installed wave.
    pub fn reports(&self) -> &[TriggerReport] {
        &self.reports
    }

    pub fn traffic_stats(&self) -> TrafficStats {
        self.traffic.stats()
    }

    pub fn echo_endpoints(&self) -> (EntityId, EntityId) {
        (self.traffic.client(), self.traffic.server())
    }

    pub fn trace(&self) -> Option<&TraceExport> {
        self.trace.as_ref()
    }

    pub fn take_trace(&mut self) -> Option<TraceExport> {
        self.trace.take()
    }
}
