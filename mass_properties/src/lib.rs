use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum MassPropertiesErrors {
    #[error("Ixx cant be less than or equal to zero")]
    IxxLessThanOrEqualToZero,
    #[error("Iyy cant be less than or equal to zero")]
    IyyLessThanOrEqualToZero,
    #[error("Izz cant be less than or equal to zero")]
    IzzLessThanOrEqualToZero,
    #[error("inertia components must be finite")]
    NonFinite,
    #[error("inertia matrix is not symmetric")]
    NotSymmetric,
    #[error("inertia matrix is not positive definite")]
    NotPositiveDefinite,
    #[error("inertia matrix is singular")]
    Singular,
}

/// The six independent components of a symmetric inertia tensor.
/// Products of inertia default to zero so principal-axis inertias can be written
/// as just `(ixx, iyy, izz)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InertiaComponents {
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
    #[serde(default)]
    pub ixy: f64,
    #[serde(default)]
    pub ixz: f64,
    #[serde(default)]
    pub iyz: f64,
}

/// A validated inertia tensor.
///
/// Construction fails unless the tensor is finite, symmetric and positive definite,
/// so the inverse is computed once here and never again during a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "InertiaComponents", into = "InertiaComponents")]
pub struct Inertia {
    components: InertiaComponents,
    matrix: Matrix3<f64>,
    inverse: Matrix3<f64>,
}

impl Inertia {
    pub fn new(
        ixx: f64,
        iyy: f64,
        izz: f64,
        ixy: f64,
        ixz: f64,
        iyz: f64,
    ) -> Result<Self, MassPropertiesErrors> {
        if ![ixx, iyy, izz, ixy, ixz, iyz].iter().all(|v| v.is_finite()) {
            return Err(MassPropertiesErrors::NonFinite);
        }
        if ixx <= f64::EPSILON {
            return Err(MassPropertiesErrors::IxxLessThanOrEqualToZero);
        }
        if iyy <= f64::EPSILON {
            return Err(MassPropertiesErrors::IyyLessThanOrEqualToZero);
        }
        if izz <= f64::EPSILON {
            return Err(MassPropertiesErrors::IzzLessThanOrEqualToZero);
        }

        let matrix = Matrix3::new(ixx, ixy, ixz, ixy, iyy, iyz, ixz, iyz, izz);

        // positive principal moments are not enough, large products can still break definiteness
        let cholesky = matrix
            .cholesky()
            .ok_or(MassPropertiesErrors::NotPositiveDefinite)?;
        let inverse = cholesky.inverse();
        if !inverse.iter().all(|v| v.is_finite()) {
            return Err(MassPropertiesErrors::Singular);
        }

        Ok(Self {
            components: InertiaComponents { ixx, iyy, izz, ixy, ixz, iyz },
            matrix,
            inverse,
        })
    }

    /// Principal-axis inertia, all products of inertia zero.
    pub fn diagonal(ixx: f64, iyy: f64, izz: f64) -> Result<Self, MassPropertiesErrors> {
        Self::new(ixx, iyy, izz, 0.0, 0.0, 0.0)
    }

    pub fn components(&self) -> &InertiaComponents {
        &self.components
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn inverse(&self) -> &Matrix3<f64> {
        &self.inverse
    }

    /// J * v
    pub fn mul_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.matrix * v
    }

    /// J^-1 * v
    pub fn solve(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.inverse * v
    }
}

impl TryFrom<InertiaComponents> for Inertia {
    type Error = MassPropertiesErrors;
    fn try_from(c: InertiaComponents) -> Result<Self, Self::Error> {
        Inertia::new(c.ixx, c.iyy, c.izz, c.ixy, c.ixz, c.iyz)
    }
}

impl From<Inertia> for InertiaComponents {
    fn from(inertia: Inertia) -> Self {
        inertia.components
    }
}

impl TryFrom<Matrix3<f64>> for Inertia {
    type Error = MassPropertiesErrors;
    fn try_from(m: Matrix3<f64>) -> Result<Self, Self::Error> {
        let scale = m.amax().max(1.0);
        if (m - m.transpose()).amax() > 1e-9 * scale {
            return Err(MassPropertiesErrors::NotSymmetric);
        }
        Inertia::new(
            m[(0, 0)],
            m[(1, 1)],
            m[(2, 2)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 2)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_diagonal_inverse() {
        let inertia = Inertia::diagonal(1200.0, 1500.0, 1000.0).unwrap();
        let inv = inertia.inverse();
        assert_abs_diff_eq!(inv[(0, 0)], 1.0 / 1200.0, epsilon = 1e-15);
        assert_abs_diff_eq!(inv[(1, 1)], 1.0 / 1500.0, epsilon = 1e-15);
        assert_abs_diff_eq!(inv[(2, 2)], 1.0 / 1000.0, epsilon = 1e-15);
        assert_abs_diff_eq!(inv[(0, 1)], 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_full_inverse_round_trip() {
        let inertia = Inertia::new(10.0, 12.0, 8.0, 1.0, -0.5, 0.3).unwrap();
        let identity = inertia.matrix() * inertia.inverse();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(identity[(i, j)], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_solve_undoes_mul_vector() {
        let inertia = Inertia::new(10.0, 12.0, 8.0, 1.0, -0.5, 0.3).unwrap();
        let v = Vector3::new(0.1, -2.0, 3.5);
        let back = inertia.solve(&inertia.mul_vector(&v));
        assert_abs_diff_eq!((back - v).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_non_positive_moments() {
        assert_eq!(
            Inertia::diagonal(0.0, 1.0, 1.0),
            Err(MassPropertiesErrors::IxxLessThanOrEqualToZero)
        );
        assert_eq!(
            Inertia::diagonal(1.0, -1.0, 1.0),
            Err(MassPropertiesErrors::IyyLessThanOrEqualToZero)
        );
        assert_eq!(
            Inertia::diagonal(1.0, 1.0, 0.0),
            Err(MassPropertiesErrors::IzzLessThanOrEqualToZero)
        );
    }

    #[test]
    fn test_rejects_indefinite() {
        // positive diagonal but products large enough to make it indefinite
        assert_eq!(
            Inertia::new(1.0, 1.0, 1.0, 2.0, 0.0, 0.0),
            Err(MassPropertiesErrors::NotPositiveDefinite)
        );
    }

    #[test]
    fn test_rejects_non_finite() {
        assert_eq!(
            Inertia::diagonal(f64::NAN, 1.0, 1.0),
            Err(MassPropertiesErrors::NonFinite)
        );
    }

    #[test]
    fn test_matrix_requires_symmetry() {
        let m = Matrix3::new(10.0, 1.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 10.0);
        assert_eq!(Inertia::try_from(m), Err(MassPropertiesErrors::NotSymmetric));

        let m = Matrix3::new(10.0, 1.0, 0.0, 1.0, 10.0, 0.0, 0.0, 0.0, 10.0);
        let inertia = Inertia::try_from(m).unwrap();
        assert_eq!(inertia.components().ixy, 1.0);
    }

    #[test]
    fn test_deserialize_validates() {
        let inertia: Inertia = ron::from_str("(ixx: 1200.0, iyy: 1500.0, izz: 1000.0)").unwrap();
        assert_eq!(inertia.matrix()[(1, 1)], 1500.0);
        assert_eq!(inertia.components().ixz, 0.0);

        let bad: Result<Inertia, _> = ron::from_str("(ixx: 1200.0, iyy: 0.0, izz: 1000.0)");
        assert!(bad.is_err());
    }
}
