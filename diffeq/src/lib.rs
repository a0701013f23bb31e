use std::{error::Error, fmt::Debug};
use thiserror::Error;

/// Submodules for core ODE system components.
pub mod rk;
pub mod saving;
pub mod solvers;
pub mod state;
pub mod stepping;
pub mod tableau;

use saving::{MemoryResult, SaveTimes};
use solvers::Solver;
use state::{Adaptive, OdeState};
use stepping::{AdaptiveStepControl, FixedStepControl};

/// Error type returned by model callbacks.
pub type ModelError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DiffEqErrors {
    #[error("model failed at t = {t}: {source}")]
    Model {
        t: f64,
        #[source]
        source: ModelError,
    },
    #[error("invalid time span ({0}, {1})")]
    InvalidTimeSpan(f64, f64),
    #[error("step size must be positive and finite, got {0}")]
    InvalidStepSize(f64),
    #[error("save times must be finite, strictly ascending and inside the time span")]
    InvalidSaveTimes,
    #[error("step size {dt:e} fell below the minimum {min_dt:e} at t = {t}")]
    StepSizeUnderflow { t: f64, dt: f64, min_dt: f64 },
    #[error("exceeded the maximum of {0} steps")]
    MaxStepsExceeded(usize),
    #[error("state became non-finite at t = {0}")]
    NonFiniteState(f64),
    #[error("{0} has no embedded error estimate and cannot be used with adaptive stepping")]
    NotAdaptive(&'static str),
}

/// Trait for defining a dynamical system model that can be numerically integrated.
///
/// Types implementing this trait must define how to compute the derivative (or RHS function)
/// of the ODE at a given time and state.
pub trait OdeModel: Debug {
    type State: OdeState;
    /// Compute the derivative at time `t` and state `state`, storing the result in `derivative`.
    fn f(
        &mut self,
        t: f64,
        state: &Self::State,
        derivative: &mut Self::State,
    ) -> Result<(), ModelError>;

    /// Runs after every accepted step, before the state is checked and saved.
    /// Use it to project the state back onto a constraint, e.g. unit norm.
    fn post_step(&mut self, _t: f64, _state: &mut Self::State) -> Result<(), ModelError> {
        Ok(())
    }
}

/// Container for an ODE problem. Owns the model for the duration of the solve.
#[derive(Debug)]
pub struct OdeProblem<Model>
where
    Model: OdeModel,
{
    model: Model,
}

impl<Model, State> OdeProblem<Model>
where
    Model: OdeModel<State = State>,
    State: Adaptive,
{
    pub fn new(model: Model) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Integrates with error controlled step sizes.
    ///
    /// # Errors
    ///
    /// Fails atomically, no partial result is returned. `NotAdaptive` if the
    /// solver has no embedded error estimate.
    pub fn solve_adaptive(
        &mut self,
        x0: &State,
        tspan: (f64, f64),
        step_control: AdaptiveStepControl,
        solver: Solver,
        save_times: &SaveTimes,
    ) -> Result<MemoryResult<State>, DiffEqErrors> {
        solver.solve(&mut self.model, x0, tspan, step_control.into(), save_times)
    }

    /// Integrates with a constant step size. The last step is shortened to end on
    /// `tspan.1` or on a save time.
    pub fn solve_fixed(
        &mut self,
        x0: &State,
        tspan: (f64, f64),
        dt: f64,
        solver: Solver,
        save_times: &SaveTimes,
    ) -> Result<MemoryResult<State>, DiffEqErrors> {
        solver.solve(
            &mut self.model,
            x0,
            tspan,
            FixedStepControl::new(dt).into(),
            save_times,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use state::StateArray;

    /// x' = -k x
    #[derive(Debug)]
    struct Decay {
        k: f64,
        post_steps: usize,
    }

    impl OdeModel for Decay {
        type State = StateArray<1>;
        fn f(
            &mut self,
            _t: f64,
            x: &StateArray<1>,
            dx: &mut StateArray<1>,
        ) -> Result<(), ModelError> {
            dx[0] = -self.k * x[0];
            Ok(())
        }

        fn post_step(&mut self, _t: f64, _x: &mut StateArray<1>) -> Result<(), ModelError> {
            self.post_steps += 1;
            Ok(())
        }
    }

    /// x'' = -x as a first order system
    #[derive(Debug)]
    struct Oscillator;

    impl OdeModel for Oscillator {
        type State = StateArray<2>;
        fn f(
            &mut self,
            _t: f64,
            x: &StateArray<2>,
            dx: &mut StateArray<2>,
        ) -> Result<(), ModelError> {
            dx[0] = x[1];
            dx[1] = -x[0];
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Failing;

    impl OdeModel for Failing {
        type State = StateArray<1>;
        fn f(
            &mut self,
            t: f64,
            _x: &StateArray<1>,
            dx: &mut StateArray<1>,
        ) -> Result<(), ModelError> {
            if t > 0.5 {
                return Err("model gave up".into());
            }
            dx[0] = 1.0;
            Ok(())
        }
    }

    #[derive(Debug)]
    struct GoesNan;

    impl OdeModel for GoesNan {
        type State = StateArray<1>;
        fn f(
            &mut self,
            t: f64,
            _x: &StateArray<1>,
            dx: &mut StateArray<1>,
        ) -> Result<(), ModelError> {
            dx[0] = if t > 0.5 { f64::NAN } else { 1.0 };
            Ok(())
        }
    }

    fn decay() -> Decay {
        Decay { k: 0.5, post_steps: 0 }
    }

    #[test]
    fn test_rk4_fixed_decay() {
        let mut problem = OdeProblem::new(decay());
        let x0 = StateArray::new([1.0]);
        let result = problem
            .solve_fixed(&x0, (0.0, 2.0), 0.01, Solver::Rk4, &SaveTimes::Steps)
            .unwrap();

        assert_eq!(result.len(), 201);
        let (tf, xf) = result.last().unwrap();
        assert_abs_diff_eq!(tf, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(xf[0], (-1.0f64).exp(), epsilon = 1e-10);
        assert_eq!(problem.model().post_steps, 200);
    }

    #[test]
    fn test_fixed_step_shortens_last_step() {
        let mut problem = OdeProblem::new(decay());
        let x0 = StateArray::new([1.0]);
        let result = problem
            .solve_fixed(&x0, (0.0, 1.05), 0.1, Solver::Rk4, &SaveTimes::Steps)
            .unwrap();
        assert_eq!(result.len(), 12);
        assert_abs_diff_eq!(result.t[11], 1.05, epsilon = 1e-12);
    }

    #[test]
    fn test_dopri_adaptive_oscillator() {
        let mut problem = OdeProblem::new(Oscillator);
        let x0 = StateArray::new([1.0, 0.0]);
        let control = AdaptiveStepControl::default()
            .with_rel_tol(1e-10)
            .with_abs_tol(1e-12);
        let result = problem
            .solve_adaptive(&x0, (0.0, 10.0), control, Solver::DoPri45, &SaveTimes::Steps)
            .unwrap();

        let (tf, xf) = result.last().unwrap();
        assert_abs_diff_eq!(tf, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(xf[0], 10.0f64.cos(), epsilon = 1e-7);
        assert_abs_diff_eq!(xf[1], -10.0f64.sin(), epsilon = 1e-7);
        // times strictly increase
        assert!(result.t.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_save_at_requested_times() {
        let mut problem = OdeProblem::new(Oscillator);
        let x0 = StateArray::new([1.0, 0.0]);
        let times: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let control = AdaptiveStepControl::default()
            .with_rel_tol(1e-9)
            .with_abs_tol(1e-12);
        let result = problem
            .solve_adaptive(
                &x0,
                (0.0, 5.0),
                control,
                Solver::BogackiShampine32,
                &SaveTimes::At(times.clone()),
            )
            .unwrap();

        assert_eq!(result.t, times);
        for (t, x) in result.iter() {
            assert_abs_diff_eq!(x[0], t.cos(), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_save_times_stop_integration() {
        let mut problem = OdeProblem::new(decay());
        let x0 = StateArray::new([1.0]);
        let result = problem
            .solve_fixed(
                &x0,
                (0.0, 100.0),
                0.1,
                Solver::Rk4,
                &SaveTimes::At(vec![0.0, 0.25]),
            )
            .unwrap();
        assert_eq!(result.t, vec![0.0, 0.25]);
        // 0.1, 0.2, then shortened to 0.25, nothing after the last save time
        assert_eq!(problem.model().post_steps, 3);
    }

    #[test]
    fn test_empty_save_times() {
        let mut problem = OdeProblem::new(decay());
        let x0 = StateArray::new([1.0]);
        let result = problem
            .solve_fixed(&x0, (0.0, 1.0), 0.1, Solver::Rk4, &SaveTimes::At(Vec::new()))
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_rk4_cannot_be_adaptive() {
        let mut problem = OdeProblem::new(decay());
        let x0 = StateArray::new([1.0]);
        let err = problem
            .solve_adaptive(
                &x0,
                (0.0, 1.0),
                AdaptiveStepControl::default(),
                Solver::Rk4,
                &SaveTimes::Steps,
            )
            .unwrap_err();
        assert!(matches!(err, DiffEqErrors::NotAdaptive("Rk4")));
    }

    #[test]
    fn test_invalid_inputs() {
        let mut problem = OdeProblem::new(decay());
        let x0 = StateArray::new([1.0]);
        assert!(matches!(
            problem.solve_fixed(&x0, (1.0, 0.0), 0.1, Solver::Rk4, &SaveTimes::Steps),
            Err(DiffEqErrors::InvalidTimeSpan(..))
        ));
        assert!(matches!(
            problem.solve_fixed(&x0, (0.0, 1.0), 0.0, Solver::Rk4, &SaveTimes::Steps),
            Err(DiffEqErrors::InvalidStepSize(..))
        ));
        assert!(matches!(
            problem.solve_fixed(
                &x0,
                (0.0, 1.0),
                0.1,
                Solver::Rk4,
                &SaveTimes::At(vec![0.5, 0.2])
            ),
            Err(DiffEqErrors::InvalidSaveTimes)
        ));
        assert!(matches!(
            problem.solve_fixed(
                &x0,
                (0.0, 1.0),
                0.1,
                Solver::Rk4,
                &SaveTimes::At(vec![0.5, 2.0])
            ),
            Err(DiffEqErrors::InvalidSaveTimes)
        ));
    }

    #[test]
    fn test_model_error_aborts() {
        let mut problem = OdeProblem::new(Failing);
        let x0 = StateArray::new([0.0]);
        let err = problem
            .solve_fixed(&x0, (0.0, 1.0), 0.1, Solver::Rk4, &SaveTimes::Steps)
            .unwrap_err();
        match err {
            DiffEqErrors::Model { t, source } => {
                assert!(t > 0.3 && t < 0.6);
                assert_eq!(source.to_string(), "model gave up");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_non_finite_state_aborts() {
        let mut problem = OdeProblem::new(GoesNan);
        let x0 = StateArray::new([0.0]);
        let err = problem
            .solve_fixed(&x0, (0.0, 1.0), 0.1, Solver::Rk4, &SaveTimes::Steps)
            .unwrap_err();
        assert!(matches!(err, DiffEqErrors::NonFiniteState(_)));
    }

    #[test]
    fn test_max_steps() {
        let mut problem = OdeProblem::new(decay());
        let x0 = StateArray::new([1.0]);
        let control = AdaptiveStepControl::default().with_max_dt(0.01).with_max_steps(10);
        let err = problem
            .solve_adaptive(&x0, (0.0, 1.0), control, Solver::DoPri45, &SaveTimes::Steps)
            .unwrap_err();
        assert!(matches!(err, DiffEqErrors::MaxStepsExceeded(10)));
    }
}
