use std::ops::{AddAssign, MulAssign};

use diffeq::state::{Adaptive, OdeState};
use nalgebra::Vector3;
use rotations::prelude::Quaternion;
use tolerance::{Tolerances, rms};

/// Attitude and body rate of a rigid spacecraft.
///
/// As an ODE state this is the 7-vector `[q0, q1, q2, q3, w0, w1, w2]`.
/// The same type holds the derivative, where `q` is the quaternion rate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AttitudeState {
    /// Orientation, scalar first.
    pub q: Quaternion,
    /// Body-frame angular velocity (rad/s).
    pub omega: Vector3<f64>,
}

impl AttitudeState {
    pub fn new(q: Quaternion, omega: Vector3<f64>) -> Self {
        Self { q, omega }
    }

    pub fn to_array(&self) -> [f64; 7] {
        [
            self.q.w,
            self.q.x,
            self.q.y,
            self.q.z,
            self.omega[0],
            self.omega[1],
            self.omega[2],
        ]
    }

    pub fn from_array(x: [f64; 7]) -> Self {
        Self {
            q: Quaternion::new(x[0], x[1], x[2], x[3]),
            omega: Vector3::new(x[4], x[5], x[6]),
        }
    }
}

impl AddAssign<&Self> for AttitudeState {
    fn add_assign(&mut self, rhs: &Self) {
        self.q += &rhs.q;
        self.omega += rhs.omega;
    }
}

impl MulAssign<f64> for AttitudeState {
    fn mul_assign(&mut self, rhs: f64) {
        self.q *= rhs;
        self.omega *= rhs;
    }
}

impl OdeState for AttitudeState {
    fn is_finite(&self) -> bool {
        self.q.is_finite() && self.omega.iter().all(|v| v.is_finite())
    }
}

impl Adaptive for AttitudeState {
    fn compute_error(&self, x_prev: &Self, x_tilde: &Self, tol: &Tolerances) -> f64 {
        let x = self.to_array();
        let x_prev = x_prev.to_array();
        let x_tilde = x_tilde.to_array();
        rms((0..7).map(|i| tol.compute_error(x[i], x_prev[i], x_tilde[i])))
    }
}
