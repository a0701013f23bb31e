use serde::{Deserialize, Serialize};

/// Absolute and relative tolerance pair for one state component.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub rel_tol: f64,
    pub abs_tol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            rel_tol: 1e-6,
            abs_tol: 1e-9,
        }
    }
}

impl Tolerances {
    pub fn new(rel_tol: f64, abs_tol: f64) -> Self {
        Self { rel_tol, abs_tol }
    }

    pub fn compute_error(&self, x: f64, x_prev: f64, x_tilde: f64) -> f64 {
        compute_error(x, x_prev, x_tilde, self.rel_tol, self.abs_tol)
    }
}

/// Scaled local error of one component.
///
/// `x` is the new solution, `x_prev` the solution at the start of the step and
/// `x_tilde` the embedded lower order solution. A value <= 1.0 is within tolerance.
pub fn compute_error(x: f64, x_prev: f64, x_tilde: f64, rel_tol: f64, abs_tol: f64) -> f64 {
    let scale = abs_tol + rel_tol * x.abs().max(x_prev.abs());
    (x - x_tilde).abs() / scale
}

/// Root mean square of the scaled component errors.
pub fn rms<I: IntoIterator<Item = f64>>(errors: I) -> f64 {
    let mut n = 0usize;
    let mut sum = 0.0;
    for e in errors {
        sum += e * e;
        n += 1;
    }
    if n == 0 {
        return 0.0;
    }
    (sum / n as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_compute_error_scales_by_magnitude() {
        let tol = Tolerances::new(1e-3, 1e-6);
        // difference of 1e-3 on a value of 1.0 sits right at the tolerance
        assert_abs_diff_eq!(tol.compute_error(1.0, 1.0, 1.001), 1e-3 / (1e-6 + 1e-3), epsilon = 1e-12);
        // near zero the absolute tolerance dominates
        assert_abs_diff_eq!(tol.compute_error(0.0, 0.0, 1e-6), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rms() {
        assert_abs_diff_eq!(rms([3.0, 4.0]), (12.5f64).sqrt(), epsilon = 1e-12);
        assert_eq!(rms(std::iter::empty()), 0.0);
    }
}
