//! Scenario runner - executes landslide scenarios and checks their outcome.

use crate::error::SimError;
use crate::exporter::TraceExport;
use crate::scenarios::ScenarioId;
use crate::traffic::TrafficStats;
use crate::world::{SimConfig, SimWorld};

use landslide_core::{ActionOutcome, BoundaryOutcome};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Tolerance for the end-of-interval height check.
const PROJECTION_TOLERANCE: f64 = 1e-6;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total events fired
    pub events_fired: usize,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Nodes still active at the end
    pub active_nodes: usize,

    /// Nodes disposed during the run
    pub disposed: usize,

    /// Nodes skipped by `trigger`, summed over waves
    pub skipped: usize,

    /// Echo counters
    pub traffic: TrafficStats,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// Runs landslide scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Base configuration each scenario is applied to
    config: SimConfig,

    /// Overrides the configured stop time
    stop_time_secs: Option<f64>,
}

impl ScenarioRunner {
    /// Creates a runner over the default configuration.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            config: SimConfig::default(),
            stop_time_secs: None,
        }
    }

    /// Sets the base configuration; the runner's seed still wins.
    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the stop time.
    pub fn with_stop_time(mut self, secs: f64) -> Self {
        self.stop_time_secs = Some(secs);
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        let (result, _) = self.execute(scenario, false)?;
        Ok(result)
    }

    /// Runs a scenario with tracing on and writes the trace to `path`.
    pub fn run_with_export(&self, scenario: ScenarioId, path: impl AsRef<Path>) -> Result<ScenarioResult, SimError> {
        let (result, trace) = self.execute(scenario, true)?;
        if let Some(mut trace) = trace {
            trace.finalize(result.passed, result.traffic);
            trace.write_to_file(path.as_ref())?;
            info!("Exported {} frames to {}", trace.frames.len(), path.as_ref().display());
        }
        Ok(result)
    }

    /// The configuration `scenario` runs with.
    pub fn config_for(&self, scenario: ScenarioId) -> SimConfig {
        let mut config = self.config.clone();
        config.seed = self.seed;
        if let Some(secs) = self.stop_time_secs {
            config.stop_time_secs = secs;
        }
        scenario.apply(&mut config);
        config
    }

    fn execute(&self, scenario: ScenarioId, trace: bool) -> Result<(ScenarioResult, Option<TraceExport>), SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let config = self.config_for(scenario);
        let mut world = SimWorld::new(config)?;
        if trace {
            world.enable_trace(scenario.name())?;
        }
        world.install_waves()?;
        let events_fired = world.run()?;

        let failure_reason = check(scenario, &world).err();
        if let Some(reason) = &failure_reason {
            warn!("Scenario {} failed: {}", scenario.name(), reason);
        }

        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure_reason.is_none(),
            events_fired,
            final_time_secs: world.time(),
            active_nodes: world.registry().active_count(),
            disposed: world.registry().disposals().len(),
            skipped: world.reports().iter().map(|r| r.skipped.len()).sum(),
            traffic: world.traffic_stats(),
            failure_reason,
        };
        Ok((result, world.take_trace()))
    }
}

/// Checks a finished world against what `scenario` promises.
fn check(scenario: ScenarioId, world: &SimWorld) -> Result<(), String> {
    let config = world.config();
    let disposals = world.registry().disposals();

    // Every release is backed by exactly one disposing check
    let disposed_outcomes = world
        .outcomes()
        .iter()
        .filter(|(_, o)| matches!(o, ActionOutcome::Boundary { outcome: BoundaryOutcome::Disposed { .. }, .. }))
        .count();
    if disposed_outcomes != disposals.len() {
        return Err(format!(
            "{} disposing checks but {} releases",
            disposed_outcomes,
            disposals.len()
        ));
    }
    if let Some((id, _)) = disposals.iter().find(|(id, _)| world.registry().is_active(*id)) {
        return Err(format!("{} released but still active", id));
    }

    if let Some(expected) = scenario.expected(config) {
        if disposals.len() != expected.disposals {
            return Err(format!(
                "expected {} disposals, got {}",
                expected.disposals,
                disposals.len()
            ));
        }
        let skipped: usize = world.reports().iter().map(|r| r.skipped.len()).sum();
        if skipped != expected.skipped {
            return Err(format!("expected {} skipped nodes, got {}", expected.skipped, skipped));
        }
    }

    // The first wave lands every node exactly on its target, unless a later
    // custom wave interferes
    if scenario != ScenarioId::Custom || config.waves.len() == 1 {
        if let Some(wave) = config.waves.first() {
            let (start, duration) = wave.params.window().map_err(|e| e.to_string())?;
            check_projection(world, start + duration, wave.params.target_y)?;
        }
    }

    Ok(())
}

fn check_projection(world: &SimWorld, check_time: Duration, target_y: f64) -> Result<(), String> {
    for (time, outcome) in world.outcomes() {
        if *time != check_time {
            continue;
        }
        let y = match outcome {
            ActionOutcome::Boundary {
                outcome: BoundaryOutcome::Disposed { y } | BoundaryOutcome::Retained { y },
                ..
            } => *y,
            _ => continue,
        };
        if (y - target_y).abs() > PROJECTION_TOLERANCE {
            return Err(format!(
                "node at y={:.6} at t={:.3}s, expected {:.6}",
                y,
                check_time.as_secs_f64(),
                target_y
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use landslide_env::EntityId;

    #[test]
    fn test_landslide_has_no_disposals() {
        let result = ScenarioRunner::new(42).run(ScenarioId::Landslide).unwrap();

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.disposed, 0);
        assert_eq!(result.active_nodes, 9);
        assert_eq!(result.final_time_secs, 15.0);
        assert_eq!(result.traffic.sent, 15);
        assert_eq!(result.traffic.echoed, 15);
    }

    #[test]
    fn test_overrun_disposes_mountain_at_check_time() {
        let runner = ScenarioRunner::new(42);
        let mut world = SimWorld::new(runner.config_for(ScenarioId::Overrun)).unwrap();
        world.install_waves().unwrap();
        world.run().unwrap();

        let disposals = world.registry().disposals();
        assert_eq!(disposals.len(), 4);
        assert!(disposals.iter().all(|(_, t)| *t == Duration::from_secs(8)));
        assert!(world.registry().is_active(EntityId(0)));

        // Client sits on a mountain node and stops sending once it is gone
        let stats = world.traffic_stats();
        assert!(stats.sent > 0 && stats.sent < 100);

        let result = runner.run(ScenarioId::Overrun).unwrap();
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.active_nodes, 5);
    }

    #[test]
    fn test_aftershock_second_wave_disposes() {
        let runner = ScenarioRunner::new(42);
        let mut world = SimWorld::new(runner.config_for(ScenarioId::Aftershock)).unwrap();
        world.install_waves().unwrap();
        world.run().unwrap();

        let disposals = world.registry().disposals();
        assert_eq!(disposals.len(), 4);
        assert!(disposals.iter().all(|(_, t)| *t == Duration::from_secs(11)));

        // Planned from y = 10 at install time, applied from y = 20 + 10/3
        let heights: Vec<f64> = world
            .outcomes()
            .iter()
            .filter_map(|(_, o)| match o {
                ActionOutcome::Boundary { outcome: BoundaryOutcome::Disposed { y }, .. } => Some(*y),
                _ => None,
            })
            .collect();
        assert!(heights.iter().all(|y| (y - 400.0 / 3.0).abs() < 1e-9));

        assert!(runner.run(ScenarioId::Aftershock).unwrap().passed);
    }

    #[test]
    fn test_mixed_skips_city() {
        let result = ScenarioRunner::new(42).run(ScenarioId::Mixed).unwrap();

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.skipped, 5);
        assert_eq!(result.disposed, 4);
    }

    #[test]
    fn test_all_scenarios_pass_across_seeds() {
        for seed in [1, 42, 1337] {
            let runner = ScenarioRunner::new(seed);
            for scenario in ScenarioId::all() {
                let result = runner.run(scenario).unwrap();
                assert!(result.passed, "{} seed={}: {:?}", scenario, seed, result.failure_reason);
            }
        }
    }

    #[test]
    fn test_stop_time_override() {
        let result = ScenarioRunner::new(42)
            .with_stop_time(6.0)
            .run(ScenarioId::Landslide)
            .unwrap();

        // Checks at t = 8 never fire, so there is nothing to contradict
        assert!(result.passed);
        assert_eq!(result.final_time_secs, 6.0);
    }

    #[test]
    fn test_runner_seed_overrides_config() {
        let config = SimConfig {
            seed: 7,
            ..SimConfig::default()
        };
        let runner = ScenarioRunner::new(99).with_config(config);
        assert_eq!(runner.config_for(ScenarioId::Custom).seed, 99);
    }

    #[test]
    fn test_custom_single_wave_is_projected() {
        let mut config = SimConfig::default();
        config.waves[0].params.start_time_secs = 4.0;
        let result = ScenarioRunner::new(42).with_config(config).run(ScenarioId::Custom).unwrap();

        // Single wave, so the projection still has to hold
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.disposed, 0);
    }

    #[test]
    fn test_past_start_is_an_error() {
        let mut config = SimConfig::default();
        config.waves[0].params.start_time_secs = -1.0;
        assert!(ScenarioRunner::new(42).with_config(config).run(ScenarioId::Custom).is_err());
    }

    #[test]
    fn test_export_writes_trace() {
        let path = std::env::temp_dir().join(format!("landslide-trace-{}.json", std::process::id()));
        let result = ScenarioRunner::new(42)
            .run_with_export(ScenarioId::Overrun, &path)
            .unwrap();
        assert!(result.passed);

        let text = std::fs::read_to_string(&path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["scenario"], "overrun");
        assert_eq!(json["passed"], true);
        assert!(json["events"].as_array().unwrap().iter().any(|e| e["kind"] == "disposed"));
        std::fs::remove_file(&path).ok();
    }
}
