//! Landslide Simulator CLI
//!
//! Runs landslide scenarios on the deterministic harness.

use clap::Parser;
use landslide_sim::{ScenarioId, ScenarioResult, ScenarioRunner, SimConfig, SimError};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Landslide simulation CLI
#[derive(Parser, Debug)]
#[command(name = "landslide-sim")]
#[command(about = "Run deterministic landslide scenarios", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (landslide, overrun, aftershock, mixed, custom, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// JSON configuration file; missing fields keep their defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Simulation stop time in seconds (overrides the configuration)
    #[arg(long)]
    stop_time: Option<f64>,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export the run trace to a JSON file
    #[arg(long)]
    export: Option<String>,
}

fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

/// Runs every requested scenario and seed. Returns whether all passed.
fn run(args: &Args) -> Result<bool, SimError> {
    if !args.json {
        info!("Landslide Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse::<ScenarioId>().map_err(SimError::Config)?]
    };

    let config = match &args.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let runner_for = |seed: u64| {
        let runner = ScenarioRunner::new(seed).with_config(config.clone());
        match args.stop_time {
            Some(secs) => runner.with_stop_time(secs),
            None => runner,
        }
    };

    // Single traced run
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 || args.seeds > 1 {
            return Err(SimError::config("--export only supports a single scenario and seed"));
        }
        let result = runner_for(base_seed).run_with_export(scenarios[0], export_path)?;
        report(args, &[result.clone()]);
        return Ok(result.passed);
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = runner_for(seed);

        for scenario in &scenarios {
            let result = runner.run(*scenario)?;
            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED: {} disposed, {} skipped, {}/{} echoes",
                        scenario, seed, result.disposed, result.skipped, result.traffic.echoed, result.traffic.sent
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario,
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            all_results.push(result);
        }
    }

    report(args, &all_results);
    Ok(all_results.iter().all(|r| r.passed))
}

/// Prints the summary, as JSON when requested.
fn report(args: &Args, results: &[ScenarioResult]) {
    let total = results.len();
    let failed: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed.len(),
            "failed": failed.len(),
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "events": r.events_fired,
                    "time_secs": r.final_time_secs,
                    "disposed": r.disposed,
                    "skipped": r.skipped,
                    "active_nodes": r.active_nodes,
                    "traffic": r.traffic,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
        return;
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if failed.is_empty() {
        info!("✅ All {} scenario runs passed!", total);
    } else {
        error!("❌ {}/{} scenario runs failed!", failed.len(), total);
        for result in failed {
            error!(
                "  - {} seed={}: {}",
                result.scenario.name(),
                result.seed,
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
    }
}
