//! Generalized dual numbers for the automatic differentiation of the Helmholtz energy.
//!
//! The module provides a closed family of dual number types that are all generic over
//! an inner number type, so that they can be nested to obtain derivatives with respect
//! to additional variables:
//!
//! | type | non-real parts | used for |
//! |-|-|-|
//! | `f64` | - | function values |
//! | [Dual] | $\varepsilon$ | first derivatives |
//! | [HyperDual] | $\varepsilon_1$, $\varepsilon_2$, $\varepsilon_1\varepsilon_2$ | (mixed) second derivatives |
//! | [Dual3] | $v_1$, $v_2$, $v_3$ | derivatives up to third order |
//!
//! All derivatives are exact up to floating point precision. The step of every
//! derivative is fixed at unity.
use ndarray::ScalarOperand;
use num_traits::{One, Zero};
use std::fmt;
use std::iter::Sum;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign,
};
use thiserror::Error;

mod dual1;
mod dual3;
mod hyperdual;
pub use dual1::{Dual, Dual64};
pub use dual3::{Dual3, Dual3_64};
pub use hyperdual::{HyperDual, HyperDual64};

/// Error type for operations that are not defined for the real part of a dual number.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DualError {
    #[error("Division by zero.")]
    DivisionByZero,
    #[error("`{operation}` is not defined for a real part of {value}.")]
    Domain {
        operation: &'static str,
        value: f64,
    },
}

/// A generalized (hyper) dual number.
///
/// The operator forms (`+`, `*`, [DualNum::sqrt], ...) follow IEEE semantics for the
/// real part. The `checked_*` methods report operations that are not defined for the
/// given real part as [DualError] instead.
pub trait DualNum:
    Copy
    + fmt::Debug
    + fmt::Display
    + Send
    + Sync
    + 'static
    + Zero
    + One
    + From<f64>
    + ScalarOperand
    + Neg<Output = Self>
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + AddAssign<f64>
    + SubAssign<f64>
    + MulAssign<f64>
    + DivAssign<f64>
    + Sum
{
    /// Real part of the number.
    fn re(&self) -> f64;

    fn recip(&self) -> Self;
    fn powi(&self, n: i32) -> Self;
    fn powf(&self, n: f64) -> Self;
    fn sqrt(&self) -> Self;
    fn cbrt(&self) -> Self;
    fn exp(&self) -> Self;
    fn ln(&self) -> Self;
    /// $\ln(1+x)$, more accurate than `(x + 1).ln()` for small $x$.
    fn ln_1p(&self) -> Self;

    fn checked_recip(&self) -> Result<Self, DualError> {
        if self.re() == 0.0 {
            Err(DualError::DivisionByZero)
        } else {
            Ok(self.recip())
        }
    }

    fn checked_div(&self, rhs: Self) -> Result<Self, DualError> {
        Ok(*self * rhs.checked_recip()?)
    }

    fn checked_powi(&self, n: i32) -> Result<Self, DualError> {
        if n < 0 && self.re() == 0.0 {
            Err(DualError::DivisionByZero)
        } else {
            Ok(self.powi(n))
        }
    }

    fn checked_powf(&self, n: f64) -> Result<Self, DualError> {
        let re = self.re();
        if re < 0.0 && n.fract() != 0.0 {
            Err(DualError::Domain {
                operation: "powf",
                value: re,
            })
        } else if re == 0.0 && n < 0.0 {
            Err(DualError::DivisionByZero)
        } else {
            Ok(self.powf(n))
        }
    }

    fn checked_sqrt(&self) -> Result<Self, DualError> {
        let re = self.re();
        if re < 0.0 {
            Err(DualError::Domain {
                operation: "sqrt",
                value: re,
            })
        } else {
            Ok(self.sqrt())
        }
    }

    fn checked_ln(&self) -> Result<Self, DualError> {
        let re = self.re();
        if re <= 0.0 {
            Err(DualError::Domain {
                operation: "ln",
                value: re,
            })
        } else {
            Ok(self.ln())
        }
    }

    fn checked_ln_1p(&self) -> Result<Self, DualError> {
        let re = self.re();
        if re <= -1.0 {
            Err(DualError::Domain {
                operation: "ln_1p",
                value: re,
            })
        } else {
            Ok(self.ln_1p())
        }
    }
}

impl DualNum for f64 {
    fn re(&self) -> f64 {
        *self
    }
    fn recip(&self) -> Self {
        f64::recip(*self)
    }
    fn powi(&self, n: i32) -> Self {
        f64::powi(*self, n)
    }
    fn powf(&self, n: f64) -> Self {
        f64::powf(*self, n)
    }
    fn sqrt(&self) -> Self {
        f64::sqrt(*self)
    }
    fn cbrt(&self) -> Self {
        f64::cbrt(*self)
    }
    fn exp(&self) -> Self {
        f64::exp(*self)
    }
    fn ln(&self) -> Self {
        f64::ln(*self)
    }
    fn ln_1p(&self) -> Self {
        f64::ln_1p(*self)
    }
}

/// Implements everything that does not depend on the structure of the
/// non-real parts. The type has to provide `from_re`, `chain_rule` and `Mul<Self>`.
macro_rules! impl_dual {
    ($struct:ident, [$($im:ident),+]) => {
        impl<T: DualNum> $struct<T> {
            /// Create a new dual number from its real part.
            #[inline]
            pub fn from_re(re: T) -> Self {
                Self { re, $($im: T::zero()),+ }
            }
        }

        impl<T: DualNum> From<f64> for $struct<T> {
            fn from(re: f64) -> Self {
                Self::from_re(T::from(re))
            }
        }

        impl<T: DualNum> Zero for $struct<T> {
            fn zero() -> Self {
                Self::from_re(T::zero())
            }
            fn is_zero(&self) -> bool {
                self.re.is_zero() $(&& self.$im.is_zero())+
            }
        }

        impl<T: DualNum> One for $struct<T> {
            fn one() -> Self {
                Self::from_re(T::one())
            }
        }

        impl<T: DualNum> ScalarOperand for $struct<T> {}

        impl<T: DualNum> Neg for $struct<T> {
            type Output = Self;
            #[inline]
            fn neg(self) -> Self {
                Self { re: -self.re, $($im: -self.$im),+ }
            }
        }

        impl<T: DualNum> Add for $struct<T> {
            type Output = Self;
            #[inline]
            fn add(self, other: Self) -> Self {
                Self { re: self.re + other.re, $($im: self.$im + other.$im),+ }
            }
        }

        impl<T: DualNum> Sub for $struct<T> {
            type Output = Self;
            #[inline]
            fn sub(self, other: Self) -> Self {
                Self { re: self.re - other.re, $($im: self.$im - other.$im),+ }
            }
        }

        impl<T: DualNum> Div for $struct<T> {
            type Output = Self;
            #[inline]
            #[allow(clippy::suspicious_arithmetic_impl)]
            fn div(self, other: Self) -> Self {
                self * other.recip()
            }
        }

        impl<T: DualNum> Add<f64> for $struct<T> {
            type Output = Self;
            #[inline]
            fn add(mut self, other: f64) -> Self {
                self.re += other;
                self
            }
        }

        impl<T: DualNum> Sub<f64> for $struct<T> {
            type Output = Self;
            #[inline]
            fn sub(mut self, other: f64) -> Self {
                self.re -= other;
                self
            }
        }

        impl<T: DualNum> Mul<f64> for $struct<T> {
            type Output = Self;
            #[inline]
            fn mul(self, other: f64) -> Self {
                Self { re: self.re * other, $($im: self.$im * other),+ }
            }
        }

        impl<T: DualNum> Div<f64> for $struct<T> {
            type Output = Self;
            #[inline]
            fn div(self, other: f64) -> Self {
                Self { re: self.re / other, $($im: self.$im / other),+ }
            }
        }

        impl_dual!(@assign $struct, AddAssign, add_assign, +);
        impl_dual!(@assign $struct, SubAssign, sub_assign, -);
        impl_dual!(@assign $struct, MulAssign, mul_assign, *);
        impl_dual!(@assign $struct, DivAssign, div_assign, /);

        impl<T: DualNum> Sum for $struct<T> {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::zero(), |acc, x| acc + x)
            }
        }

        impl<'a, T: DualNum> Sum<&'a $struct<T>> for $struct<T> {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                iter.fold(Self::zero(), |acc, &x| acc + x)
            }
        }

        impl<T: DualNum> DualNum for $struct<T> {
            #[inline]
            fn re(&self) -> f64 {
                self.re.re()
            }

            fn recip(&self) -> Self {
                let f0 = self.re.recip();
                let f1 = -f0 * f0;
                let f2 = f1 * f0 * -2.0;
                let f3 = f2 * f0 * -3.0;
                self.chain_rule(f0, f1, f2, f3)
            }

            fn powi(&self, n: i32) -> Self {
                match n {
                    0 => Self::one(),
                    1 => *self,
                    2 => *self * *self,
                    _ => {
                        let p3 = self.re.powi(n - 3);
                        let p2 = p3 * self.re;
                        let p1 = p2 * self.re;
                        let f0 = p1 * self.re;
                        let n = n as f64;
                        self.chain_rule(
                            f0,
                            p1 * n,
                            p2 * (n * (n - 1.0)),
                            p3 * (n * (n - 1.0) * (n - 2.0)),
                        )
                    }
                }
            }

            fn powf(&self, n: f64) -> Self {
                if n == 0.0 {
                    Self::one()
                } else if n == 1.0 {
                    *self
                } else {
                    let x = self.re;
                    self.chain_rule(
                        x.powf(n),
                        x.powf(n - 1.0) * n,
                        x.powf(n - 2.0) * (n * (n - 1.0)),
                        x.powf(n - 3.0) * (n * (n - 1.0) * (n - 2.0)),
                    )
                }
            }

            fn sqrt(&self) -> Self {
                let rec = self.re.recip();
                let f0 = self.re.sqrt();
                let f1 = f0 * rec * 0.5;
                let f2 = f1 * rec * -0.5;
                let f3 = f2 * rec * -1.5;
                self.chain_rule(f0, f1, f2, f3)
            }

            fn cbrt(&self) -> Self {
                let rec = self.re.recip();
                let f0 = self.re.cbrt();
                let f1 = f0 * rec * (1.0 / 3.0);
                let f2 = f1 * rec * (-2.0 / 3.0);
                let f3 = f2 * rec * (-5.0 / 3.0);
                self.chain_rule(f0, f1, f2, f3)
            }

            fn exp(&self) -> Self {
                let f = self.re.exp();
                self.chain_rule(f, f, f, f)
            }

            fn ln(&self) -> Self {
                let f1 = self.re.recip();
                let f2 = -f1 * f1;
                let f3 = f2 * f1 * -2.0;
                self.chain_rule(self.re.ln(), f1, f2, f3)
            }

            fn ln_1p(&self) -> Self {
                let f1 = (self.re + 1.0).recip();
                let f2 = -f1 * f1;
                let f3 = f2 * f1 * -2.0;
                self.chain_rule(self.re.ln_1p(), f1, f2, f3)
            }
        }
    };
    (@assign $struct:ident, $trt:ident, $mth:ident, $op:tt) => {
        impl<T: DualNum> $trt for $struct<T> {
            #[inline]
            fn $mth(&mut self, other: Self) {
                *self = *self $op other;
            }
        }

        impl<T: DualNum> $trt<f64> for $struct<T> {
            #[inline]
            fn $mth(&mut self, other: f64) {
                *self = *self $op other;
            }
        }
    };
}
pub(crate) use impl_dual;

/// Value and first derivative of a scalar function.
pub fn first_derivative<G>(g: G, x: f64) -> (f64, f64)
where
    G: FnOnce(Dual64) -> Dual64,
{
    let res = g(Dual64::from_re(x).derivative());
    (res.re, res.eps)
}

/// Value, first and second derivative of a scalar function.
pub fn second_derivative<G>(g: G, x: f64) -> (f64, f64, f64)
where
    G: FnOnce(Dual3_64) -> Dual3_64,
{
    let res = g(Dual3_64::from_re(x).derivative());
    (res.re, res.v1, res.v2)
}

/// Value and the first, second and third derivative of a scalar function.
pub fn third_derivative<G>(g: G, x: f64) -> (f64, f64, f64, f64)
where
    G: FnOnce(Dual3_64) -> Dual3_64,
{
    let res = g(Dual3_64::from_re(x).derivative());
    (res.re, res.v1, res.v2, res.v3)
}

/// Value, gradient and mixed second derivative of a function of two variables.
pub fn second_partial_derivative<G>(g: G, (x, y): (f64, f64)) -> (f64, f64, f64, f64)
where
    G: FnOnce(HyperDual64, HyperDual64) -> HyperDual64,
{
    let res = g(
        HyperDual64::from_re(x).derivative1(),
        HyperDual64::from_re(y).derivative2(),
    );
    (res.re, res.eps1, res.eps2, res.eps1eps2)
}
