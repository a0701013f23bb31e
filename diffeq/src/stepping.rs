use serde::{Deserialize, Serialize};
use tolerance::Tolerances;

/// Specifies the type of step size control strategy used by the ODE solver.
///
/// - `Fixed`: Uses a constant step size throughout integration.
/// - `Adaptive`: Dynamically adjusts step size based on local error estimates.
#[derive(Copy, Clone, Debug)]
pub enum StepMethods {
    Fixed(FixedStepControl),
    Adaptive(AdaptiveStepControl),
}

impl From<FixedStepControl> for StepMethods {
    fn from(value: FixedStepControl) -> Self {
        Self::Fixed(value)
    }
}

impl From<AdaptiveStepControl> for StepMethods {
    fn from(value: AdaptiveStepControl) -> Self {
        Self::Adaptive(value)
    }
}

/// Fixed-step control configuration.
#[derive(Copy, Clone, Debug)]
pub struct FixedStepControl {
    /// Constant step size.
    pub dt: f64,
    /// Upper bound on the number of steps in one solve.
    pub max_steps: usize,
}

impl FixedStepControl {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

pub const DEFAULT_MAX_STEPS: usize = 10_000_000;

/// Adaptive step size controller.
///
/// Uses an internal method (basic or PID) to adjust step size based on
/// normalized error. Provides absolute and relative tolerance configuration.
/// Missing fields deserialize to their defaults.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveStepControl {
    pub method: AdaptiveStepMethods,
    pub tolerances: Tolerances,
    /// Optional minimum allowed step size. Defaults to a tiny fraction of the time span.
    pub min_dt: Option<f64>,
    /// Optional maximum allowed step size.
    pub max_dt: Option<f64>,
    pub max_steps: usize,
}

impl Default for AdaptiveStepControl {
    fn default() -> Self {
        Self {
            method: AdaptiveStepMethods::Basic,
            tolerances: Tolerances::new(1e-3, 1e-6),
            min_dt: None,
            max_dt: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

const SAFETY: f64 = 0.9;
const MIN_GROWTH: f64 = 0.2;
const MAX_GROWTH: f64 = 5.0;

impl AdaptiveStepControl {
    /// Computes the next step size based on the current step and estimated error.
    ///
    /// - `dt`: current step size
    /// - `error`: normalized RMS error, <= 1.0 for an accepted step
    /// - `order`: order of the embedded error estimate
    /// - `accepted`: whether the step that produced `error` is kept
    pub fn step(&mut self, dt: f64, error: f64, order: usize, accepted: bool) -> f64 {
        let k = order as f64 + 1.0;
        let factor = match &mut self.method {
            AdaptiveStepMethods::PID(pid) if accepted => pid.factor(error, k),
            // rejected steps only trust the current error
            _ => basic_factor(error, k),
        };
        let mut new_dt = dt * factor;
        if let Some(max_dt) = self.max_dt {
            new_dt = new_dt.min(max_dt);
        }
        new_dt
    }

    /// Checks tolerances and step limits are usable.
    pub fn validate(&self) -> Result<(), String> {
        let Tolerances { rel_tol, abs_tol } = self.tolerances;
        if !(rel_tol.is_finite() && abs_tol.is_finite() && rel_tol >= 0.0 && abs_tol >= 0.0)
            || rel_tol + abs_tol <= 0.0
        {
            return Err(format!(
                "tolerances must be finite, non-negative and not both zero, got rel {rel_tol:e} abs {abs_tol:e}"
            ));
        }
        for (name, dt) in [("min_dt", self.min_dt), ("max_dt", self.max_dt)] {
            if let Some(dt) = dt {
                if !(dt.is_finite() && dt > 0.0) {
                    return Err(format!("{name} must be positive and finite, got {dt}"));
                }
            }
        }
        if let (Some(min_dt), Some(max_dt)) = (self.min_dt, self.max_dt) {
            if min_dt > max_dt {
                return Err(format!("min_dt {min_dt} is larger than max_dt {max_dt}"));
            }
        }
        if self.max_steps == 0 {
            return Err("max_steps must be at least 1".into());
        }
        Ok(())
    }

    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.tolerances.abs_tol = abs_tol;
        self
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.tolerances.rel_tol = rel_tol;
        self
    }

    pub fn with_min_dt(mut self, min_dt: f64) -> Self {
        self.min_dt = Some(min_dt);
        self
    }

    pub fn with_max_dt(mut self, max_dt: f64) -> Self {
        self.max_dt = Some(max_dt);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_method(mut self, method: AdaptiveStepMethods) -> Self {
        self.method = method;
        self
    }
}

fn basic_factor(error: f64, k: f64) -> f64 {
    if !error.is_finite() {
        return MIN_GROWTH;
    }
    if error <= f64::EPSILON {
        return MAX_GROWTH;
    }
    (SAFETY * error.powf(-1.0 / k)).clamp(MIN_GROWTH, MAX_GROWTH)
}

/// Enum for selecting the adaptive step control algorithm.
///
/// - `Basic`: Simple step control using embedded error estimates.
/// - `PID`: PID-controlled step size adaptation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum AdaptiveStepMethods {
    #[default]
    Basic,
    PID(StepPIDControl),
}

/// PID controller for adaptive step size control.
///
/// The step factor is `e0^-b1 * e1^-b2 * e2^-b3` with the exponents divided by
/// (embedded order + 1), where `e0` is the latest accepted error and `e1`, `e2` are
/// the two before it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepPIDControl {
    pub beta1: f64,
    pub beta2: f64,
    pub beta3: f64,
    #[serde(skip, default = "unit_error")]
    err_prev: f64,
    #[serde(skip, default = "unit_error")]
    err_prevprev: f64,
}

fn unit_error() -> f64 {
    1.0
}

impl Default for StepPIDControl {
    /// H312 gains.
    fn default() -> Self {
        Self::new(1.0 / 4.0, 1.0 / 2.0, 1.0 / 4.0)
    }
}

impl StepPIDControl {
    pub fn new(beta1: f64, beta2: f64, beta3: f64) -> Self {
        Self {
            beta1,
            beta2,
            beta3,
            err_prev: 1.0,
            err_prevprev: 1.0,
        }
    }

    fn factor(&mut self, err_now: f64, k: f64) -> f64 {
        const EPS: f64 = 1e-14;
        let e0 = err_now.max(EPS);
        let e1 = self.err_prev.max(EPS);
        let e2 = self.err_prevprev.max(EPS);

        let factor = SAFETY
            * e0.powf(-self.beta1 / k)
            * e1.powf(-self.beta2 / k)
            * e2.powf(-self.beta3 / k);

        self.err_prevprev = self.err_prev;
        self.err_prev = e0;

        factor.clamp(MIN_GROWTH, MAX_GROWTH)
    }
}
