//! Error types for the simulation harness.

use landslide_core::LandslideError;
use landslide_env::EnvError;
use thiserror::Error;

/// Errors raised while building or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Landslide error: {0}")]
    Landslide(#[from] LandslideError),

    #[error("Environment error: {0}")]
    Env(#[from] EnvError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
