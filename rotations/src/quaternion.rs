use nalgebra::{Vector3, Vector4};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{AddAssign, Mul, MulAssign, Neg};
use thiserror::Error;

/// A quaternion stored scalar first, `[w, x, y, z]`.
///
/// Serializes as the array `[w, x, y, z]`.
#[derive(Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Errors that can occur when normalizing a `Quaternion`.
#[derive(Debug, Clone, Error, Copy, PartialEq)]
pub enum QuaternionErrors {
    #[error("got zero magnitude quaternion")]
    ZeroMagnitude,
    #[error("got non-finite quaternion [{0}, {1}, {2}, {3}]")]
    NonFinite(f64, f64, f64, f64),
}

impl Quaternion {
    /// The quaternion representing no rotation.
    pub const IDENTITY: Self = Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };

    /// Creates a new `Quaternion`. No normalization is performed.
    ///
    /// # Arguments
    ///
    /// * `w` - The scalar component of the quaternion.
    /// * `x` - The x component of the quaternion.
    /// * `y` - The y component of the quaternion.
    /// * `z` - The z component of the quaternion.
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn from_array(a: [f64; 4]) -> Self {
        Self::new(a[0], a[1], a[2], a[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }

    /// The imaginary part `[x, y, z]`.
    pub fn vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    // Dot product of two quaternions
    pub fn dot(&self, other: &Quaternion) -> f64 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Inverse of a unit quaternion, i.e. its conjugate.
    ///
    /// The caller is responsible for unit norm. A non-unit input gives
    /// the conjugate, not the true inverse.
    pub fn inv(&self) -> Quaternion {
        self.conjugate()
    }

    /// Divides by the Euclidean norm.
    ///
    /// # Errors
    ///
    /// Returns `QuaternionErrors::NonFinite` if any component is NaN or infinite
    /// and `QuaternionErrors::ZeroMagnitude` if the norm is below `f64::EPSILON`.
    pub fn normalize(&self) -> Result<Self, QuaternionErrors> {
        if !self.is_finite() {
            return Err(QuaternionErrors::NonFinite(self.w, self.x, self.y, self.z));
        }
        let mag = self.norm();
        if mag < f64::EPSILON {
            return Err(QuaternionErrors::ZeroMagnitude);
        }
        Ok(Quaternion::new(
            self.w / mag,
            self.x / mag,
            self.y / mag,
            self.z / mag,
        ))
    }

    /// Creates a quaternion with each component uniform in [-0.5, 0.5).
    /// The result is not normalized.
    pub fn rand<R: Rng + ?Sized>(rng: &mut R) -> Quaternion {
        Quaternion::new(
            rng.random_range(-0.5..0.5),
            rng.random_range(-0.5..0.5),
            rng.random_range(-0.5..0.5),
            rng.random_range(-0.5..0.5),
        )
    }

    /// Rotation angle in radians, in [0, pi], of the rotation taking `self` to `other`.
    pub fn angle_to(&self, other: &Quaternion) -> f64 {
        let relative = *other * self.inv();
        2.0 * relative.vector().norm().atan2(relative.w.abs())
    }
}

/// A quaternion that is only ever built through normalization.
///
/// Deserializes from `[w, x, y, z]` and normalizes it, so a zero or non-finite
/// attitude in a config file fails to parse.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Quaternion", into = "Quaternion")]
pub struct UnitQuaternion(Quaternion);

impl UnitQuaternion {
    pub const IDENTITY: Self = Self(Quaternion::IDENTITY);

    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Result<Self, QuaternionErrors> {
        Ok(Self(Quaternion::new(w, x, y, z).normalize()?))
    }

    /// Draws random quaternions until one is safely normalizable.
    pub fn rand<R: Rng + ?Sized>(rng: &mut R) -> Self {
        loop {
            let q = Quaternion::rand(rng);
            // reject draws too close to the origin, their direction is ill conditioned
            if q.norm() > 1e-3 {
                if let Ok(q) = q.normalize() {
                    return Self(q);
                }
            }
        }
    }

    pub fn quaternion(&self) -> Quaternion {
        self.0
    }
}

impl TryFrom<Quaternion> for UnitQuaternion {
    type Error = QuaternionErrors;
    fn try_from(value: Quaternion) -> Result<Self, QuaternionErrors> {
        Ok(Self(value.normalize()?))
    }
}

impl From<UnitQuaternion> for Quaternion {
    fn from(value: UnitQuaternion) -> Self {
        value.0
    }
}

impl Default for Quaternion {
    /// Provides the identity quaternion.
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Quaternion> for Quaternion {
    type Output = Self;

    /// Hamilton product. Not commutative: `a * b != b * a` in general.
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }
}

impl AddAssign<&Quaternion> for Quaternion {
    /// Component-wise sum.
    /// NOTE: this is not a composition of rotations, use multiplication for that.
    /// It exists so quaternion rates can be accumulated into quaternion states in an ODE.
    fn add_assign(&mut self, rhs: &Self) {
        self.w += rhs.w;
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Mul<f64> for Quaternion {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.w * rhs, self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl MulAssign<f64> for Quaternion {
    fn mul_assign(&mut self, rhs: f64) {
        self.w *= rhs;
        self.x *= rhs;
        self.y *= rhs;
        self.z *= rhs;
    }
}

impl Neg for Quaternion {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.w, -self.x, -self.y, -self.z)
    }
}

impl From<[f64; 4]> for Quaternion {
    fn from(a: [f64; 4]) -> Self {
        Self::from_array(a)
    }
}

impl From<Quaternion> for [f64; 4] {
    fn from(q: Quaternion) -> Self {
        q.to_array()
    }
}

impl From<Vector4<f64>> for Quaternion {
    /// Reads a `Vector4` laid out `[w, x, y, z]`.
    fn from(v: Vector4<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Quaternion> for Vector4<f64> {
    fn from(q: Quaternion) -> Self {
        Vector4::new(q.w, q.x, q.y, q.z)
    }
}

impl fmt::Debug for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Quaternion ")?;
        writeln!(f, "   w: {: >10.6}", self.w)?;
        writeln!(f, "   x: {: >10.6}", self.x)?;
        writeln!(f, "   y: {: >10.6}", self.y)?;
        writeln!(f, "   z: {: >10.6}", self.z)?;
        Ok(())
    }
}
