use mass_properties::Inertia;
use nalgebra::{Matrix4, Vector3, Vector4};

use crate::state::AttitudeState;

/// The 4x4 kinematic matrix for a scalar-first quaternion, so that
/// `q_dot = 0.5 * omega_matrix(w) * q` with `w` in the body frame.
pub fn omega_matrix(w: &Vector3<f64>) -> Matrix4<f64> {
    Matrix4::new(
        0.0, -w[0], -w[1], -w[2], //
        w[0], 0.0, w[2], -w[1], //
        w[1], -w[2], 0.0, w[0], //
        w[2], w[1], -w[0], 0.0,
    )
}

/// Rigid body rotational dynamics about the center of mass.
#[derive(Clone, Copy, Debug)]
pub struct AttitudeDynamics {
    inertia: Inertia,
}

impl AttitudeDynamics {
    pub fn new(inertia: Inertia) -> Self {
        Self { inertia }
    }

    /// Writes the time derivative of `state` under the applied body torque.
    ///
    /// Kinematics: `q_dot = 0.5 * Omega(w) * q`.
    /// Euler's equation: `w_dot = J^-1 * (torque - w x (J * w))`.
    pub fn derivative(
        &self,
        state: &AttitudeState,
        torque: &Vector3<f64>,
        derivative: &mut AttitudeState,
    ) {
        let w = &state.omega;
        let q: Vector4<f64> = state.q.into();
        let q_dot = 0.5 * omega_matrix(w) * q;
        derivative.q = q_dot.into();

        let h = self.inertia.mul_vector(w);
        derivative.omega = self.inertia.solve(&(torque - w.cross(&h)));
    }
}
