use diffeq::{ModelError, OdeModel};
use nalgebra::Vector3;
use rotations::prelude::{Quaternion, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::{
    SimulationErrors, control::PdController, dynamics::AttitudeDynamics, state::AttitudeState,
};

/// A target attitude taking effect at `start` seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandSegment {
    pub start: f64,
    pub target: UnitQuaternion,
}

/// Commanded attitude as a function of time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttitudeCommand {
    Constant(UnitQuaternion),
    /// Piecewise constant. Each segment holds until the next one starts,
    /// and the first segment also covers any time before its start.
    Schedule(Vec<CommandSegment>),
}

impl Default for AttitudeCommand {
    fn default() -> Self {
        Self::Constant(UnitQuaternion::IDENTITY)
    }
}

impl AttitudeCommand {
    pub fn target(&self, t: f64) -> Quaternion {
        match self {
            Self::Constant(q) => q.quaternion(),
            Self::Schedule(segments) => {
                let i = segments.partition_point(|segment| segment.start <= t);
                segments
                    .get(i.saturating_sub(1))
                    .map_or(Quaternion::IDENTITY, |segment| segment.target.quaternion())
            }
        }
    }

    /// Checks a schedule is non-empty with finite, strictly ascending start times.
    pub fn validate(&self) -> Result<(), SimulationErrors> {
        let Self::Schedule(segments) = self else {
            return Ok(());
        };
        if segments.is_empty() {
            return Err(SimulationErrors::InvalidCommand(
                "schedule has no segments".into(),
            ));
        }
        if segments.iter().any(|s| !s.start.is_finite()) {
            return Err(SimulationErrors::InvalidCommand(
                "segment start times must be finite".into(),
            ));
        }
        if segments.windows(2).any(|w| w[1].start <= w[0].start) {
            return Err(SimulationErrors::InvalidCommand(
                "segment start times must be strictly ascending".into(),
            ));
        }
        Ok(())
    }
}

/// Spacecraft dynamics driven by the PD controller, integrated as one ODE.
#[derive(Clone, Debug)]
pub struct ClosedLoop {
    pub dynamics: AttitudeDynamics,
    pub controller: PdController,
    pub command: AttitudeCommand,
    /// Project the quaternion back to unit norm after every accepted step.
    pub renormalize: bool,
}

impl ClosedLoop {
    pub fn torque(&self, t: f64, state: &AttitudeState) -> Vector3<f64> {
        let target = self.command.target(t);
        self.controller.torque(&state.q, &state.omega, &target)
    }
}

impl OdeModel for ClosedLoop {
    type State = AttitudeState;

    fn f(
        &mut self,
        t: f64,
        state: &AttitudeState,
        derivative: &mut AttitudeState,
    ) -> Result<(), ModelError> {
        let torque = self.torque(t, state);
        self.dynamics.derivative(state, &torque, derivative);
        Ok(())
    }

    fn post_step(&mut self, _t: f64, state: &mut AttitudeState) -> Result<(), ModelError> {
        if self.renormalize {
            state.q = state.q.normalize()?;
        }
        Ok(())
    }
}
