use std::array;

use crate::{ModelError, OdeModel, state::OdeState, tableau::ButcherTableau};

/// Explicit Runge-Kutta stepper with preallocated stage buffers.
pub struct RungeKutta<State: OdeState, const STAGES: usize> {
    tableau: ButcherTableau<STAGES>,
    k: [State; STAGES],
    stage: State,
    scratch: State,
    /// Solution at the end of the last step.
    pub y: State,
    /// Embedded solution at the end of the last step, if the tableau has one.
    pub y_tilde: State,
}

impl<State: OdeState, const STAGES: usize> RungeKutta<State, STAGES> {
    pub fn new(tableau: ButcherTableau<STAGES>) -> Self {
        Self {
            tableau,
            k: array::from_fn(|_| State::default()),
            stage: State::default(),
            scratch: State::default(),
            y: State::default(),
            y_tilde: State::default(),
        }
    }

    pub fn tableau(&self) -> &ButcherTableau<STAGES> {
        &self.tableau
    }

    pub fn is_adaptive(&self) -> bool {
        self.tableau.b_tilde.is_some()
    }

    /// Takes one step of size `h` from `(t, x)`, leaving the result in `self.y`
    /// and, for embedded tableaus, the error estimate solution in `self.y_tilde`.
    pub fn step<Model: OdeModel<State = State>>(
        &mut self,
        model: &mut Model,
        t: f64,
        x: &State,
        h: f64,
    ) -> Result<(), ModelError> {
        // k0
        model.f(t, x, &mut self.k[0])?;

        // k1 - ks
        for s in 1..STAGES {
            // stage = x + h * sum(a[s][i] * k[i])
            self.stage.clone_from(x);
            for i in 0..s {
                let a = self.tableau.a[s][i];
                if a == 0.0 {
                    continue;
                }
                self.scratch.clone_from(&self.k[i]);
                self.scratch *= a * h;
                self.stage += &self.scratch;
            }

            model.f(t + self.tableau.c[s] * h, &self.stage, &mut self.k[s])?;
        }

        combine(&mut self.y, &mut self.scratch, x, &self.k, &self.tableau.b, h);
        if let Some(b_tilde) = &self.tableau.b_tilde {
            combine(&mut self.y_tilde, &mut self.scratch, x, &self.k, b_tilde, h);
        }
        Ok(())
    }
}

/// out = x + h * sum(b[s] * k[s])
fn combine<State: OdeState, const STAGES: usize>(
    out: &mut State,
    scratch: &mut State,
    x: &State,
    k: &[State; STAGES],
    b: &[f64; STAGES],
    h: f64,
) {
    out.clone_from(x);
    for s in 0..STAGES {
        if b[s] == 0.0 {
            continue;
        }
        scratch.clone_from(&k[s]);
        *scratch *= b[s] * h;
        *out += &*scratch;
    }
}
