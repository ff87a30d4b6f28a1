//! Particle-flow event simulation harness
//!
//! Drives the `pflow_core` track entity through whole simulated events,
//! with every source of randomness derived from a single 64-bit seed:
//! - **Oracle**: truth particles, decays, smeared track parameters
//! - **Field**: a two-region solenoid map from `pflow_env`
//! - **Scenarios**: event shapes that each stress one part of the track contract
//!
//! # Usage
//!
//! ```no_run
//! use pflow_sim::{ScenarioId, ScenarioRunner};
//!
//! let result = ScenarioRunner::new(42)
//!     .with_particles(100)
//!     .with_field(3.5)
//!     .run(ScenarioId::DecayChain);
//!
//! assert!(result.passed);
//! ```

mod exporter;
mod oracle;
mod runner;
pub mod scenarios;

pub use exporter::{SimExport, TrackSummary};
pub use oracle::{EventConfig, GeneratedTrack, Oracle, TruthParticle};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;

use pflow_core::TrackError;
use pflow_env::EnvError;
use thiserror::Error;

/// Errors raised while setting up or checking a simulated event.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Scenario check failed: {0}")]
    Assertion(String),

    #[error(transparent)]
    Track(#[from] TrackError),

    #[error(transparent)]
    Field(#[from] EnvError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
