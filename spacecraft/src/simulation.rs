use diffeq::{OdeProblem, saving::SaveTimes, solvers::Solver, stepping::AdaptiveStepControl};
use mass_properties::{Inertia, InertiaComponents};
use nalgebra::Vector3;
use rand::{SeedableRng, rngs::SmallRng};
use rotations::prelude::UnitQuaternion;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    SimulationErrors,
    closed_loop::{AttitudeCommand, ClosedLoop},
    control::{PdController, PdGains},
    dynamics::AttitudeDynamics,
    sample::Sample,
    state::AttitudeState,
};

/// Ratios of duration to timestep this close to an integer count as that integer.
const SNAP_TOL: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum InitialAttitude {
    /// Components drawn from [-0.5, 0.5) and normalized. This is not uniform
    /// over rotations. Unseeded draws use the thread rng.
    Random { seed: Option<u64> },
    Fixed(UnitQuaternion),
}

impl Default for InitialAttitude {
    fn default() -> Self {
        Self::Random { seed: None }
    }
}

/// Everything needed to set up a closed-loop attitude simulation.
/// Every field has a default, so a RON file only needs the ones it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub inertia: InertiaComponents,
    pub gains: PdGains,
    pub command: AttitudeCommand,
    pub initial_attitude: InitialAttitude,
    /// Body rates at t = 0 (rad/s).
    pub initial_angular_velocity: [f64; 3],
    pub renormalize: bool,
    pub solver: Solver,
    /// Tolerances, step method and step limits for adaptive integration.
    /// Fields left out of a config file take `AdaptiveStepControl::default()` values.
    pub step_control: AdaptiveStepControl,
    /// Integrate with this constant step instead of adaptively.
    pub fixed_dt: Option<f64>,
    pub max_samples: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            inertia: InertiaComponents {
                ixx: 1200.0,
                iyy: 1500.0,
                izz: 1000.0,
                ixy: 0.0,
                ixz: 0.0,
                iyz: 0.0,
            },
            gains: PdGains::default(),
            command: AttitudeCommand::default(),
            initial_attitude: InitialAttitude::default(),
            initial_angular_velocity: [0.1, 0.01, 0.5],
            renormalize: true,
            solver: Solver::DoPri45,
            step_control: AdaptiveStepControl::default()
                .with_rel_tol(1e-10)
                .with_abs_tol(1e-12),
            fixed_dt: None,
            max_samples: 1_000_000,
        }
    }
}

/// A validated simulation setup. Runs share nothing mutable, so one
/// `Simulation` can serve many runs, including from several threads.
#[derive(Clone, Debug)]
pub struct Simulation {
    config: SimulationConfig,
    model: ClosedLoop,
    initial_omega: Vector3<f64>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationErrors> {
        let inertia = Inertia::try_from(config.inertia)?;

        let gains = config.gains;
        if !gains.is_valid() {
            return Err(SimulationErrors::InvalidGains {
                kp: gains.kp,
                kd: gains.kd,
            });
        }

        config.command.validate()?;

        let initial_omega = Vector3::from(config.initial_angular_velocity);
        if !initial_omega.iter().all(|w| w.is_finite()) {
            return Err(SimulationErrors::InvalidAngularVelocity);
        }
        config
            .step_control
            .validate()
            .map_err(SimulationErrors::InvalidConfig)?;

        match config.fixed_dt {
            Some(dt) if !(dt.is_finite() && dt > 0.0) => {
                return Err(SimulationErrors::InvalidConfig(format!(
                    "fixed_dt must be positive and finite, got {dt}"
                )));
            }
            None if config.solver == Solver::Rk4 => {
                return Err(SimulationErrors::InvalidConfig(
                    "Rk4 has no error estimate, set fixed_dt to use it".into(),
                ));
            }
            _ => {}
        }

        let model = ClosedLoop {
            dynamics: AttitudeDynamics::new(inertia),
            controller: PdController::new(gains, inertia),
            command: config.command.clone(),
            renormalize: config.renormalize,
        };

        Ok(Self {
            config,
            model,
            initial_omega,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn model(&self) -> &ClosedLoop {
        &self.model
    }

    /// The initial state described by the configuration.
    pub fn initial_state(&self) -> AttitudeState {
        let q = match self.config.initial_attitude {
            InitialAttitude::Fixed(q) => q.quaternion(),
            InitialAttitude::Random { seed: Some(seed) } => return self.seeded_state(seed),
            InitialAttitude::Random { seed: None } => {
                UnitQuaternion::rand(&mut rand::rng()).quaternion()
            }
        };
        AttitudeState::new(q, self.initial_omega)
    }

    /// The configured initial rate with a random attitude drawn from `seed`.
    pub fn seeded_state(&self, seed: u64) -> AttitudeState {
        let mut rng = SmallRng::seed_from_u64(seed);
        let q = UnitQuaternion::rand(&mut rng).quaternion();
        AttitudeState::new(q, self.initial_omega)
    }

    /// Runs from the configured initial state, see [`Simulation::run_from`].
    pub fn run(&self, duration: f64, timestep: f64) -> Result<Vec<Sample>, SimulationErrors> {
        let initial = self.initial_state();
        self.run_from(&initial, duration, timestep)
    }

    /// Integrates the closed loop from `initial` and samples it at
    /// `t_i = i * duration / n` for `i in 0..n`, with `n = floor(duration / timestep)`.
    ///
    /// The first sample is the initial state. Returns an empty vector when
    /// `timestep > duration`.
    pub fn run_from(
        &self,
        initial: &AttitudeState,
        duration: f64,
        timestep: f64,
    ) -> Result<Vec<Sample>, SimulationErrors> {
        let times = sample_times(duration, timestep, self.config.max_samples)?;
        if times.is_empty() {
            return Ok(Vec::new());
        }

        let q0 = initial.q.normalize()?;
        if !initial.omega.iter().all(|w| w.is_finite()) {
            return Err(SimulationErrors::InvalidAngularVelocity);
        }
        let x0 = AttitudeState::new(q0, initial.omega);

        debug!(
            duration,
            timestep,
            samples = times.len(),
            solver = ?self.config.solver,
            "running attitude simulation"
        );

        let tspan = (0.0, duration);
        let save_times = SaveTimes::At(times);
        let mut problem = OdeProblem::new(self.model.clone());
        let result = match self.config.fixed_dt {
            Some(dt) => problem.solve_fixed(&x0, tspan, dt, self.config.solver, &save_times)?,
            None => problem.solve_adaptive(
                &x0,
                tspan,
                self.config.step_control,
                self.config.solver,
                &save_times,
            )?,
        };

        let samples: Vec<Sample> = result.iter().map(|(t, x)| Sample::new(t, x)).collect();
        info!(samples = samples.len(), duration, "simulation complete");
        Ok(samples)
    }
}

/// Output times for a run: `n = floor(duration / timestep)` points evenly spaced
/// over `[0, duration)`.
///
/// Unlike a linspace over `[0, duration]`, the endpoint is excluded, so 10 s at
/// 0.1 s gives 100 samples ending at 9.9.
pub fn sample_times(
    duration: f64,
    timestep: f64,
    max_samples: usize,
) -> Result<Vec<f64>, SimulationErrors> {
    if !(duration.is_finite() && duration > 0.0) {
        warn!(duration, "rejected duration");
        return Err(SimulationErrors::InvalidDuration(duration));
    }
    if !(timestep.is_finite() && timestep > 0.0) {
        warn!(timestep, "rejected timestep");
        return Err(SimulationErrors::InvalidTimestep(timestep));
    }

    let ratio = duration / timestep;
    let nearest = ratio.round();
    let count = if (ratio - nearest).abs() <= SNAP_TOL * nearest.max(1.0) {
        nearest
    } else {
        ratio.floor()
    };
    if !count.is_finite() || count > max_samples as f64 {
        warn!(requested = count, limit = max_samples, "too many samples requested");
        return Err(SimulationErrors::TooManySamples {
            requested: count,
            limit: max_samples,
        });
    }

    let n = count as usize;
    Ok((0..n).map(|i| i as f64 * duration / n as f64).collect())
}

/// Runs the default configuration from a random initial attitude.
pub fn run_simulation(duration: f64, timestep: f64) -> Result<Vec<Sample>, SimulationErrors> {
    Simulation::new(SimulationConfig::default())?.run(duration, timestep)
}
