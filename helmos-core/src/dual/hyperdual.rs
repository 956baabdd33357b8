use super::{impl_dual, DualNum};
use ndarray::ScalarOperand;
use num_traits::{One, Zero};
use std::fmt;
use std::iter::Sum;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign,
};

/// A hyper-dual number for the calculation of second partial derivatives.
///
/// The two independent directions are seeded with [HyperDual::derivative1] and
/// [HyperDual::derivative2]. If both are seeded on the same variable, `eps1eps2`
/// contains the second derivative with respect to that variable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HyperDual<T> {
    /// Real part
    pub re: T,
    /// Partial derivative in the first direction
    pub eps1: T,
    /// Partial derivative in the second direction
    pub eps2: T,
    /// Mixed second partial derivative
    pub eps1eps2: T,
}

pub type HyperDual64 = HyperDual<f64>;

impl<T: DualNum> HyperDual<T> {
    #[inline]
    pub fn new(re: T, eps1: T, eps2: T, eps1eps2: T) -> Self {
        Self {
            re,
            eps1,
            eps2,
            eps1eps2,
        }
    }

    /// Set the derivative part of the first direction to 1.
    #[inline]
    pub fn derivative1(mut self) -> Self {
        self.eps1 = T::one();
        self
    }

    /// Set the derivative part of the second direction to 1.
    #[inline]
    pub fn derivative2(mut self) -> Self {
        self.eps2 = T::one();
        self
    }

    #[inline]
    fn chain_rule(&self, f0: T, f1: T, f2: T, _f3: T) -> Self {
        Self::new(
            f0,
            self.eps1 * f1,
            self.eps2 * f1,
            self.eps1eps2 * f1 + self.eps1 * self.eps2 * f2,
        )
    }
}

impl<T: DualNum> Mul for HyperDual<T> {
    type Output = Self;
    #[inline]
    fn mul(self, other: Self) -> Self {
        Self::new(
            self.re * other.re,
            self.re * other.eps1 + self.eps1 * other.re,
            self.re * other.eps2 + self.eps2 * other.re,
            self.re * other.eps1eps2
                + self.eps1 * other.eps2
                + self.eps2 * other.eps1
                + self.eps1eps2 * other.re,
        )
    }
}

impl<T: DualNum> fmt::Display for HyperDual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + {}ε1 + {}ε2 + {}ε1ε2",
            self.re, self.eps1, self.eps2, self.eps1eps2
        )
    }
}

impl_dual!(HyperDual, [eps1, eps2, eps1eps2]);
