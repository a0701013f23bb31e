use rand::{Rng, SeedableRng, rngs::SmallRng};
use rayon::prelude::*;
use rotations::prelude::Quaternion;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{SimulationErrors, simulation::Simulation};

/// Final condition of one dispersed run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Seed of the run's initial attitude.
    pub seed: u64,
    pub final_time: f64,
    pub final_rate_norm: f64,
    pub peak_rate_norm: f64,
    /// Angle (rad) between the final attitude and the target at the final time.
    pub final_pointing_error: f64,
}

/// Largest batch accepted by [`MonteCarlo::run`].
pub const MAX_RUNS: usize = 100_000;

/// Runs the same simulation from many random initial attitudes.
#[derive(Clone, Copy, Debug)]
pub struct MonteCarlo {
    pub runs: usize,
    pub seed: u64,
}

impl MonteCarlo {
    pub fn new(runs: usize, seed: u64) -> Self {
        Self { runs, seed }
    }

    /// Per-run seeds, drawn in order from the master seed.
    pub fn seeds(&self) -> Vec<u64> {
        let mut rng = SmallRng::seed_from_u64(self.seed);
        (0..self.runs).map(|_| rng.random()).collect()
    }

    /// Solves every run in parallel. Summaries come back in seed order and
    /// the first failing run fails the whole batch.
    pub fn run(
        &self,
        simulation: &Simulation,
        duration: f64,
        timestep: f64,
    ) -> Result<Vec<RunSummary>, SimulationErrors> {
        if self.runs > MAX_RUNS {
            warn!(runs = self.runs, limit = MAX_RUNS, "too many monte carlo runs requested");
            return Err(SimulationErrors::TooManyRuns {
                requested: self.runs,
                limit: MAX_RUNS,
            });
        }
        let summaries = self
            .seeds()
            .into_par_iter()
            .map(|seed| -> Result<RunSummary, SimulationErrors> {
                let initial = simulation.seeded_state(seed);
                let samples = simulation.run_from(&initial, duration, timestep)?;
                let last = samples.last().ok_or(SimulationErrors::NoSamples {
                    duration,
                    timestep,
                })?;

                let rate = |w: &[f64; 3]| w.iter().map(|v| v * v).sum::<f64>().sqrt();
                let target = simulation.model().command.target(last.time);
                Ok(RunSummary {
                    seed,
                    final_time: last.time,
                    final_rate_norm: rate(&last.angular_velocity),
                    peak_rate_norm: samples
                        .iter()
                        .map(|s| rate(&s.angular_velocity))
                        .fold(0.0, f64::max),
                    final_pointing_error: Quaternion::from_array(last.quaternion)
                        .angle_to(&target),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(runs = summaries.len(), "monte carlo complete");
        Ok(summaries)
    }
}
