use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    DiffEqErrors, OdeModel,
    rk::RungeKutta,
    saving::{MemoryResult, SaveTimes},
    state::Adaptive,
    stepping::StepMethods,
    tableau::ButcherTableau,
};

/// Enum representing the available solvers supported by the framework.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Solver {
    /// Classical Runge-Kutta 4th-order method. Fixed step only.
    Rk4,
    /// Bogacki-Shampine 3(2) method.
    BogackiShampine32,
    /// Dormand-Prince 5(4) method.
    #[default]
    DoPri45,
}

impl Solver {
    pub fn solve<Model, State>(
        &self,
        model: &mut Model,
        x0: &State,
        tspan: (f64, f64),
        step_method: StepMethods,
        save_times: &SaveTimes,
    ) -> Result<MemoryResult<State>, DiffEqErrors>
    where
        Model: OdeModel<State = State>,
        State: Adaptive,
    {
        match self {
            Solver::Rk4 => integrate(
                RungeKutta::new(ButcherTableau::<4>::RK4),
                model,
                x0,
                tspan,
                step_method,
                save_times,
            ),
            Solver::BogackiShampine32 => integrate(
                RungeKutta::new(ButcherTableau::<4>::BOGACKISHAMPINE32),
                model,
                x0,
                tspan,
                step_method,
                save_times,
            ),
            Solver::DoPri45 => integrate(
                RungeKutta::new(ButcherTableau::<7>::DORMANDPRINCE45),
                model,
                x0,
                tspan,
                step_method,
                save_times,
            ),
        }
    }
}

/// Relative slack used when deciding whether a step lands on its target time.
const LANDING_TOL: f64 = 1e-12;

fn integrate<Model, State, const STAGES: usize>(
    mut solver: RungeKutta<State, STAGES>,
    model: &mut Model,
    x0: &State,
    tspan: (f64, f64),
    mut step_method: StepMethods,
    save_times: &SaveTimes,
) -> Result<MemoryResult<State>, DiffEqErrors>
where
    Model: OdeModel<State = State>,
    State: Adaptive,
{
    let (t0, tf) = tspan;
    if !t0.is_finite() || !tf.is_finite() || tf < t0 {
        return Err(DiffEqErrors::InvalidTimeSpan(t0, tf));
    }
    save_times.validate(tspan)?;
    if !x0.is_finite() {
        return Err(DiffEqErrors::NonFiniteState(t0));
    }

    let span = tf - t0;
    let scale = tf.abs().max(t0.abs()).max(1.0);

    let (mut dt, max_steps, min_dt) = match &step_method {
        StepMethods::Fixed(fixed) => {
            if !(fixed.dt.is_finite() && fixed.dt > 0.0) {
                return Err(DiffEqErrors::InvalidStepSize(fixed.dt));
            }
            (fixed.dt, fixed.max_steps, 0.0)
        }
        StepMethods::Adaptive(adaptive) => {
            if !solver.is_adaptive() {
                return Err(DiffEqErrors::NotAdaptive(solver.tableau().name));
            }
            let mut dt = (span / 100.0).max(f64::EPSILON * scale);
            if let Some(max_dt) = adaptive.max_dt {
                dt = dt.min(max_dt);
            }
            let min_dt = adaptive.min_dt.unwrap_or(1e-12 * scale);
            (dt, adaptive.max_steps, min_dt)
        }
    };
    let error_order = solver
        .tableau()
        .embedded_order
        .unwrap_or(solver.tableau().order);

    debug!(
        solver = solver.tableau().name,
        t0, tf, dt, "starting integration"
    );

    let mut result = MemoryResult::new(save_times.capacity());
    let mut t = t0;
    let mut x = x0.clone();

    // index of the next save time when saving at requested times
    let mut next_save = 0;
    if let SaveTimes::Steps = save_times {
        result.insert(t, &x);
    }

    let mut steps = 0usize;
    loop {
        let target = match save_times {
            SaveTimes::Steps => tf,
            SaveTimes::At(times) => match times.get(next_save) {
                Some(time) => *time,
                None => break,
            },
        };
        if target - t <= LANDING_TOL * scale {
            match save_times {
                SaveTimes::Steps => break,
                // already there, covers a save time at t0
                SaveTimes::At(_) => {
                    result.insert(target, &x);
                    next_save += 1;
                    continue;
                }
            }
        }

        // shorten the step to land exactly on the target
        let remaining = target - t;
        let landing = dt >= remaining * (1.0 - LANDING_TOL);
        let h = if landing { remaining } else { dt };

        solver
            .step(model, t, &x, h)
            .map_err(|source| DiffEqErrors::Model { t, source })?;

        if let StepMethods::Adaptive(adaptive) = &mut step_method {
            let error = solver.y.compute_error(&x, &solver.y_tilde, &adaptive.tolerances);
            let accepted = error.is_finite() && error <= 1.0;
            let next_dt = adaptive.step(h, error, error_order, accepted);
            if !accepted {
                trace!(t, h, error, "step rejected");
                if next_dt < min_dt {
                    return Err(DiffEqErrors::StepSizeUnderflow { t, dt: next_dt, min_dt });
                }
                dt = next_dt;
                continue;
            }
            // a step shortened to land on a target says nothing about the natural step size
            dt = if landing { next_dt.max(dt) } else { next_dt };
            if let Some(max_dt) = adaptive.max_dt {
                dt = dt.min(max_dt);
            }
        }

        t = if landing { target } else { t + h };
        x.clone_from(&solver.y);
        model
            .post_step(t, &mut x)
            .map_err(|source| DiffEqErrors::Model { t, source })?;
        if !x.is_finite() {
            return Err(DiffEqErrors::NonFiniteState(t));
        }

        steps += 1;
        if steps > max_steps {
            return Err(DiffEqErrors::MaxStepsExceeded(max_steps));
        }

        match save_times {
            SaveTimes::Steps => result.insert(t, &x),
            SaveTimes::At(_) => {
                if landing {
                    result.insert(t, &x);
                    next_save += 1;
                }
            }
        }
    }

    debug!(steps, saved = result.len(), "integration complete");
    Ok(result)
}
