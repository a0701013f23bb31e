use mass_properties::Inertia;
use nalgebra::Vector3;
use rotations::prelude::Quaternion;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PdGains {
    pub kp: f64,
    pub kd: f64,
}

impl Default for PdGains {
    fn default() -> Self {
        Self { kp: 4.0, kd: 2.5 }
    }
}

impl PdGains {
    pub fn is_valid(&self) -> bool {
        self.kp.is_finite() && self.kd.is_finite() && self.kp >= 0.0 && self.kd >= 0.0
    }
}

/// Inertia-scaled proportional-derivative attitude controller with
/// gyroscopic feedforward.
///
/// `torque = kp * J * vec(q_target * q^-1) + kd * J * (-w) + w x (J * w)`
///
/// The feedforward term cancels the gyroscopic coupling in Euler's equation,
/// leaving `w_dot = kp * vec(q_err) - kd * w` in closed loop.
#[derive(Clone, Copy, Debug)]
pub struct PdController {
    pub gains: PdGains,
    inertia: Inertia,
}

impl PdController {
    pub fn new(gains: PdGains, inertia: Inertia) -> Self {
        Self { gains, inertia }
    }

    pub fn torque(
        &self,
        q: &Quaternion,
        omega: &Vector3<f64>,
        q_target: &Quaternion,
    ) -> Vector3<f64> {
        let q_error = *q_target * q.inv();
        let proportional = self.gains.kp * self.inertia.mul_vector(&q_error.vector());
        let derivative = self.gains.kd * self.inertia.mul_vector(&(-omega));
        let gyroscopic = omega.cross(&self.inertia.mul_vector(omega));
        proportional + derivative + gyroscopic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dynamics::AttitudeDynamics, state::AttitudeState};
    use approx::assert_abs_diff_eq;

    fn inertia() -> Inertia {
        Inertia::diagonal(1200.0, 1500.0, 1000.0).unwrap()
    }

    #[test]
    fn test_zero_torque_at_equilibrium() {
        let controller = PdController::new(PdGains::default(), inertia());
        let torque = controller.torque(
            &Quaternion::IDENTITY,
            &Vector3::zeros(),
            &Quaternion::IDENTITY,
        );
        assert_abs_diff_eq!(torque.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_damping_opposes_rate() {
        let controller = PdController::new(PdGains { kp: 0.0, kd: 2.0 }, inertia());
        let omega = Vector3::new(0.1, 0.0, 0.0);
        let torque = controller.torque(&Quaternion::IDENTITY, &omega, &Quaternion::IDENTITY);
        assert_abs_diff_eq!(torque, Vector3::new(-240.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_closed_loop_is_decoupled() {
        let inertia = Inertia::new(1200.0, 1500.0, 1000.0, 20.0, -10.0, 5.0).unwrap();
        let gains = PdGains::default();
        let controller = PdController::new(gains, inertia);
        let dynamics = AttitudeDynamics::new(inertia);

        let half = 0.3_f64;
        let q = Quaternion::new(half.cos(), 0.0, 0.0, half.sin());
        let omega = Vector3::new(0.1, 0.01, 0.5);
        let state = AttitudeState::new(q, omega);
        let torque = controller.torque(&q, &omega, &Quaternion::IDENTITY);

        let mut dx = AttitudeState::default();
        dynamics.derivative(&state, &torque, &mut dx);

        let q_error = q.inv();
        let expected = gains.kp * q_error.vector() - gains.kd * omega;
        assert_abs_diff_eq!(dx.omega, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_gain_validation() {
        assert!(PdGains::default().is_valid());
        assert!(PdGains { kp: 0.0, kd: 0.0 }.is_valid());
        assert!(!PdGains { kp: -1.0, kd: 2.5 }.is_valid());
        assert!(!PdGains { kp: 4.0, kd: f64::NAN }.is_valid());
    }
}
