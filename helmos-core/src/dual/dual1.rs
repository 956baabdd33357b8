use super::{impl_dual, DualNum};
use ndarray::ScalarOperand;
use num_traits::{One, Zero};
use std::fmt;
use std::iter::Sum;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign,
};

/// A dual number for the calculation of first derivatives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dual<T> {
    /// Real part
    pub re: T,
    /// First derivative
    pub eps: T,
}

pub type Dual64 = Dual<f64>;

impl<T: DualNum> Dual<T> {
    #[inline]
    pub fn new(re: T, eps: T) -> Self {
        Self { re, eps }
    }

    /// Set the derivative part to 1.
    #[inline]
    pub fn derivative(mut self) -> Self {
        self.eps = T::one();
        self
    }

    #[inline]
    fn chain_rule(&self, f0: T, f1: T, _f2: T, _f3: T) -> Self {
        Self::new(f0, self.eps * f1)
    }
}

impl<T: DualNum> Mul for Dual<T> {
    type Output = Self;
    #[inline]
    fn mul(self, other: Self) -> Self {
        Self::new(self.re * other.re, self.re * other.eps + self.eps * other.re)
    }
}

impl<T: DualNum> fmt::Display for Dual<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}ε", self.re, self.eps)
    }
}

impl_dual!(Dual, [eps]);
