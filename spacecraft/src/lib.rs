pub mod closed_loop;
pub mod control;
pub mod dynamics;
pub mod monte_carlo;
pub mod sample;
pub mod simulation;
pub mod state;

use diffeq::DiffEqErrors;
use mass_properties::MassPropertiesErrors;
use rotations::prelude::QuaternionErrors;
use thiserror::Error;

pub use closed_loop::{AttitudeCommand, ClosedLoop, CommandSegment};
pub use control::{PdController, PdGains};
pub use dynamics::{AttitudeDynamics, omega_matrix};
pub use monte_carlo::{MAX_RUNS, MonteCarlo, RunSummary};
pub use sample::{Sample, SimulationData, write_csv};
pub use simulation::{InitialAttitude, Simulation, SimulationConfig, run_simulation, sample_times};
pub use state::AttitudeState;

#[derive(Debug, Error)]
pub enum SimulationErrors {
    #[error("duration must be positive and finite, got {0}")]
    InvalidDuration(f64),
    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),
    #[error("{requested} samples requested but the limit is {limit}")]
    TooManySamples { requested: f64, limit: usize },
    #[error("{requested} monte carlo runs requested but the limit is {limit}")]
    TooManyRuns { requested: usize, limit: usize },
    #[error("timestep {timestep} is longer than the duration {duration}, nothing to sample")]
    NoSamples { duration: f64, timestep: f64 },
    #[error("{0}")]
    MassProperties(#[from] MassPropertiesErrors),
    #[error("{0}")]
    Quaternion(#[from] QuaternionErrors),
    #[error("controller gains must be finite and non-negative, got kp = {kp}, kd = {kd}")]
    InvalidGains { kp: f64, kd: f64 },
    #[error("invalid attitude command: {0}")]
    InvalidCommand(String),
    #[error("initial angular velocity must be finite")]
    InvalidAngularVelocity,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    DiffEq(#[from] DiffEqErrors),
}

impl SimulationErrors {
    /// True when the error was caused by the caller's input rather than by the integration.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, SimulationErrors::DiffEq(_))
    }
}
