use super::{impl_dual, DualNum};
use ndarray::ScalarOperand;
use num_traits::{One, Zero};
use std::fmt;
use std::iter::Sum;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign,
};

/// A dual number for the calculation of derivatives up to third order with respect
/// to a single variable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dual3<T> {
    /// Real part
    pub re: T,
    /// First derivative
    pub v1: T,
    /// Second derivative
    pub v2: T,
    /// Third derivative
    pub v3: T,
}

#[allow(non_camel_case_types)]
pub type Dual3_64 = Dual3<f64>;

impl<T: DualNum> Dual3<T> {
    #[inline]
    pub fn new(re: T, v1: T, v2: T, v3: T) -> Self {
        Self { re, v1, v2, v3 }
    }

    /// Set the first derivative part to 1.
    #[inline]
    pub fn derivative(mut self) -> Self {
        self.v1 = T::one();
        self
    }

    #[inline]
    fn chain_rule(&self, f0: T, f1: T, f2: T, f3: T) -> Self {
        let v1_2 = self.v1 * self.v1;
        Self::new(
            f0,
            self.v1 * f1,
            self.v2 * f1 + v1_2 * f2,
            self.v3 * f1 + self.v1 * self.v2 * f2 * 3.0 + v1_2 * self.v1 * f3,
        )
    }
}

impl<T: DualNum> Mul for Dual3<T> {
    type Output = Self;
    #[inline]
    fn mul(self, other: Self) -> Self {
        Self::new(
            self.re * other.re,
            self.re * other.v1 + self.v1 * other.re,
            self.re * other.v2 + self.v1 * other.v1 * 2.0 + self.v2 * other.re,
            self.re * other.v3
                + (self.v1 * other.v2 + self.v2 * other.v1) * 3.0
                + self.v3 * other.re,
        )
    }
}

impl<T: DualNum> fmt::Display for Dual3<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + {}v1 + {}v2 + {}v3",
            self.re, self.v1, self.v2, self.v3
        )
    }
}

impl_dual!(Dual3, [v1, v2, v3]);
