use std::{
    fmt::Debug,
    ops::{AddAssign, Deref, DerefMut, MulAssign},
};

use tolerance::{Tolerances, rms};

/// Trait representing an integrable state for use in ODE solvers.
///
/// The derivative of a state is represented by the same type, so the
/// Runge-Kutta stages can be accumulated with `+=` and `*=` alone.
pub trait OdeState: Clone + Debug + Default + MulAssign<f64>
where
    for<'a> Self: AddAssign<&'a Self>,
{
    /// False if any component is NaN or infinite.
    fn is_finite(&self) -> bool;
}

/// States that can be integrated with adaptive step size control.
pub trait Adaptive: OdeState {
    /// RMS of the scaled difference between the propagated solution (`self`)
    /// and the embedded solution `x_tilde`. A value <= 1.0 accepts the step.
    fn compute_error(&self, x_prev: &Self, x_tilde: &Self, tol: &Tolerances) -> f64;
}

/// A fixed-size array wrapper representing a generic state vector with `N` f64 components.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateArray<const N: usize>([f64; N]);

impl<const N: usize> StateArray<N> {
    pub fn new(array: [f64; N]) -> Self {
        Self(array)
    }
}

impl<const N: usize> Default for StateArray<N> {
    fn default() -> Self {
        Self([0.0; N])
    }
}

impl<const N: usize> AddAssign<&Self> for StateArray<N> {
    fn add_assign(&mut self, rhs: &Self) {
        for i in 0..N {
            self.0[i] += rhs.0[i];
        }
    }
}

impl<const N: usize> MulAssign<f64> for StateArray<N> {
    fn mul_assign(&mut self, rhs: f64) {
        for i in 0..N {
            self.0[i] *= rhs;
        }
    }
}

impl<const N: usize> Deref for StateArray<N> {
    type Target = [f64; N];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> DerefMut for StateArray<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const N: usize> OdeState for StateArray<N> {
    fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl<const N: usize> Adaptive for StateArray<N> {
    fn compute_error(&self, x_prev: &Self, x_tilde: &Self, tol: &Tolerances) -> f64 {
        rms((0..N).map(|i| tol.compute_error(self.0[i], x_prev.0[i], x_tilde.0[i])))
    }
}
