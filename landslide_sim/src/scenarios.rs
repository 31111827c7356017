//! Landslide scenarios for the harness.

use crate::world::{AffectedSet, LandslideWave, SimConfig};
use landslide_core::LandslideParams;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Default constants: the slope slides to y = 20, far below the boundary
    Landslide,

    /// Boundary below the target, every sliding node is disposed
    Overrun,

    /// A second, stronger wave pushes the slope past the boundary
    Aftershock,

    /// City nodes in the affected set are skipped
    Mixed,

    /// Waves exactly as configured, no expectations beyond the generic ones
    Custom,
}

/// What a scenario must produce under its own configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectation {
    /// Nodes disposed by the end of the run
    pub disposals: usize,

    /// Nodes skipped by `trigger`, summed over waves
    pub skipped: usize,
}

impl ScenarioId {
    /// Returns the built-in scenarios (everything except `Custom`).
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Landslide,
            ScenarioId::Overrun,
            ScenarioId::Aftershock,
            ScenarioId::Mixed,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Landslide => "landslide",
            ScenarioId::Overrun => "overrun",
            ScenarioId::Aftershock => "aftershock",
            ScenarioId::Mixed => "mixed",
            ScenarioId::Custom => "custom",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Landslide => "Slope slides 10 m in 3 s, boundary at 100 m, nothing is destroyed",
            ScenarioId::Overrun => "Boundary at 19.5 m, every mountain node is destroyed at the check",
            ScenarioId::Aftershock => "Second wave at 9 s drives the slope to 120 m and past the boundary",
            ScenarioId::Mixed => "Whole network in the affected set, city nodes skipped",
            ScenarioId::Custom => "Waves taken from the configuration as-is",
        }
    }

    /// Rewrites the waves (and traffic where needed) of `config`.
    pub fn apply(&self, config: &mut SimConfig) {
        let base = LandslideParams::default();
        match self {
            ScenarioId::Landslide => {
                config.waves = vec![LandslideWave::default()];
            }
            ScenarioId::Overrun => {
                config.waves = vec![LandslideWave {
                    affected: AffectedSet::Mountain,
                    params: LandslideParams {
                        boundary_y: 19.5,
                        ..base
                    },
                }];
                // Keep the echo running across the disposal
                config.echo.max_packets = 100;
                config.echo.client_stop_secs = 12.0;
                config.echo.server_stop_secs = 12.0;
            }
            ScenarioId::Aftershock => {
                config.waves = vec![
                    LandslideWave::default(),
                    LandslideWave {
                        affected: AffectedSet::Mountain,
                        params: LandslideParams {
                            start_time_secs: 9.0,
                            duration_secs: 2.0,
                            target_y: 120.0,
                            ..base
                        },
                    },
                ];
            }
            ScenarioId::Mixed => {
                config.waves = vec![LandslideWave {
                    affected: AffectedSet::All,
                    params: LandslideParams {
                        boundary_y: 15.0,
                        ..base
                    },
                }];
            }
            ScenarioId::Custom => {}
        }
    }

    /// Expected counts for `config` after `apply`, `None` for `Custom`.
    pub fn expected(&self, config: &SimConfig) -> Option<Expectation> {
        let mountain = config.n_mountain + 1;
        let city = config.n_city + 1;
        match self {
            ScenarioId::Landslide => Some(Expectation { disposals: 0, skipped: 0 }),
            ScenarioId::Overrun | ScenarioId::Aftershock => Some(Expectation {
                disposals: mountain,
                skipped: 0,
            }),
            ScenarioId::Mixed => Some(Expectation {
                disposals: mountain,
                skipped: city,
            }),
            ScenarioId::Custom => None,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "landslide" | "baseline" => Ok(ScenarioId::Landslide),
            "overrun" => Ok(ScenarioId::Overrun),
            "aftershock" => Ok(ScenarioId::Aftershock),
            "mixed" => Ok(ScenarioId::Mixed),
            "custom" | "config" => Ok(ScenarioId::Custom),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
