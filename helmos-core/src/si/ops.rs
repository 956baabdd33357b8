use super::{Quantity, SIUnit};
use approx::{AbsDiffEq, RelativeEq};
use ndarray::{Array, ArrayBase, Data, Dimension};
use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

impl Mul for SIUnit {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        let mut exponents = self.0;
        exponents
            .iter_mut()
            .zip(other.0.iter())
            .for_each(|(e, o)| *e += o);
        Self(exponents)
    }
}

impl Div for SIUnit {
    type Output = Self;
    fn div(self, other: Self) -> Self {
        self * other.powi(-1)
    }
}

fn assert_same_unit(u1: SIUnit, u2: SIUnit, operation: &str) {
    if u1 != u2 {
        panic!("Inconsistent units in {operation}: {u1} and {u2}.");
    }
}

macro_rules! impl_mul_div {
    ($trt:ident, $mth:ident, $op:tt) => {
        impl<T1, T2> $trt<Quantity<T2>> for Quantity<T1>
        where
            T1: $trt<T2>,
        {
            type Output = Quantity<<T1 as $trt<T2>>::Output>;
            fn $mth(self, other: Quantity<T2>) -> Self::Output {
                Quantity::new(self.value $op other.value, self.unit $op other.unit)
            }
        }

        impl<'a, T1, T2> $trt<Quantity<T2>> for &'a Quantity<T1>
        where
            &'a T1: $trt<T2>,
        {
            type Output = Quantity<<&'a T1 as $trt<T2>>::Output>;
            fn $mth(self, other: Quantity<T2>) -> Self::Output {
                Quantity::new(&self.value $op other.value, self.unit $op other.unit)
            }
        }

        impl<'b, T1, T2> $trt<&'b Quantity<T2>> for Quantity<T1>
        where
            T1: $trt<&'b T2>,
        {
            type Output = Quantity<<T1 as $trt<&'b T2>>::Output>;
            fn $mth(self, other: &'b Quantity<T2>) -> Self::Output {
                Quantity::new(self.value $op &other.value, self.unit $op other.unit)
            }
        }

        impl<'a, 'b, T1, T2> $trt<&'b Quantity<T2>> for &'a Quantity<T1>
        where
            &'a T1: $trt<&'b T2>,
        {
            type Output = Quantity<<&'a T1 as $trt<&'b T2>>::Output>;
            fn $mth(self, other: &'b Quantity<T2>) -> Self::Output {
                Quantity::new(&self.value $op &other.value, self.unit $op other.unit)
            }
        }

        impl<T: $trt<f64>> $trt<f64> for Quantity<T> {
            type Output = Quantity<<T as $trt<f64>>::Output>;
            fn $mth(self, other: f64) -> Self::Output {
                Quantity::new(self.value $op other, self.unit)
            }
        }

        impl<'a, T> $trt<f64> for &'a Quantity<T>
        where
            &'a T: $trt<f64>,
        {
            type Output = Quantity<<&'a T as $trt<f64>>::Output>;
            fn $mth(self, other: f64) -> Self::Output {
                Quantity::new(&self.value $op other, self.unit)
            }
        }

        impl<'b, T, S, D> $trt<&'b ArrayBase<S, D>> for Quantity<T>
        where
            T: $trt<&'b ArrayBase<S, D>>,
            S: Data<Elem = f64>,
            D: Dimension,
        {
            type Output = Quantity<<T as $trt<&'b ArrayBase<S, D>>>::Output>;
            fn $mth(self, other: &'b ArrayBase<S, D>) -> Self::Output {
                Quantity::new(self.value $op other, self.unit)
            }
        }

        impl<'a, 'b, T, S, D> $trt<&'b ArrayBase<S, D>> for &'a Quantity<T>
        where
            &'a T: $trt<&'b ArrayBase<S, D>>,
            S: Data<Elem = f64>,
            D: Dimension,
        {
            type Output = Quantity<<&'a T as $trt<&'b ArrayBase<S, D>>>::Output>;
            fn $mth(self, other: &'b ArrayBase<S, D>) -> Self::Output {
                Quantity::new(&self.value $op other, self.unit)
            }
        }
    };
}

impl_mul_div!(Mul, mul, *);
impl_mul_div!(Div, div, /);

impl<T> Mul<Quantity<T>> for f64
where
    f64: Mul<T>,
{
    type Output = Quantity<<f64 as Mul<T>>::Output>;
    fn mul(self, other: Quantity<T>) -> Self::Output {
        Quantity::new(self * other.value, other.unit)
    }
}

impl<T> Div<Quantity<T>> for f64
where
    f64: Div<T>,
{
    type Output = Quantity<<f64 as Div<T>>::Output>;
    fn div(self, other: Quantity<T>) -> Self::Output {
        Quantity::new(self / other.value, other.unit.powi(-1))
    }
}

impl<S: Data<Elem = f64>, D: Dimension> Mul<Quantity<f64>> for ArrayBase<S, D> {
    type Output = Quantity<Array<f64, D>>;
    fn mul(self, other: Quantity<f64>) -> Self::Output {
        Quantity::new(&self * other.value, other.unit)
    }
}

impl<'a, S: Data<Elem = f64>, D: Dimension> Mul<Quantity<f64>> for &'a ArrayBase<S, D> {
    type Output = Quantity<Array<f64, D>>;
    fn mul(self, other: Quantity<f64>) -> Self::Output {
        Quantity::new(self * other.value, other.unit)
    }
}

impl<S: Data<Elem = f64>, D: Dimension> Div<Quantity<f64>> for ArrayBase<S, D> {
    type Output = Quantity<Array<f64, D>>;
    fn div(self, other: Quantity<f64>) -> Self::Output {
        Quantity::new(&self / other.value, other.unit.powi(-1))
    }
}

impl<'a, S: Data<Elem = f64>, D: Dimension> Div<Quantity<f64>> for &'a ArrayBase<S, D> {
    type Output = Quantity<Array<f64, D>>;
    fn div(self, other: Quantity<f64>) -> Self::Output {
        Quantity::new(self / other.value, other.unit.powi(-1))
    }
}

macro_rules! impl_add_sub {
    ($trt:ident, $mth:ident, $op:tt, $trt_assign:ident, $mth_assign:ident) => {
        impl<T1, T2> $trt<Quantity<T2>> for Quantity<T1>
        where
            T1: $trt<T2>,
        {
            type Output = Quantity<<T1 as $trt<T2>>::Output>;
            fn $mth(self, other: Quantity<T2>) -> Self::Output {
                assert_same_unit(self.unit, other.unit, stringify!($mth));
                Quantity::new(self.value $op other.value, self.unit)
            }
        }

        impl<'a, T1, T2> $trt<Quantity<T2>> for &'a Quantity<T1>
        where
            &'a T1: $trt<T2>,
        {
            type Output = Quantity<<&'a T1 as $trt<T2>>::Output>;
            fn $mth(self, other: Quantity<T2>) -> Self::Output {
                assert_same_unit(self.unit, other.unit, stringify!($mth));
                Quantity::new(&self.value $op other.value, self.unit)
            }
        }

        impl<'b, T1, T2> $trt<&'b Quantity<T2>> for Quantity<T1>
        where
            T1: $trt<&'b T2>,
        {
            type Output = Quantity<<T1 as $trt<&'b T2>>::Output>;
            fn $mth(self, other: &'b Quantity<T2>) -> Self::Output {
                assert_same_unit(self.unit, other.unit, stringify!($mth));
                Quantity::new(self.value $op &other.value, self.unit)
            }
        }

        impl<'a, 'b, T1, T2> $trt<&'b Quantity<T2>> for &'a Quantity<T1>
        where
            &'a T1: $trt<&'b T2>,
        {
            type Output = Quantity<<&'a T1 as $trt<&'b T2>>::Output>;
            fn $mth(self, other: &'b Quantity<T2>) -> Self::Output {
                assert_same_unit(self.unit, other.unit, stringify!($mth));
                Quantity::new(&self.value $op &other.value, self.unit)
            }
        }

        impl<T1, T2> $trt_assign<Quantity<T2>> for Quantity<T1>
        where
            T1: $trt_assign<T2>,
        {
            fn $mth_assign(&mut self, other: Quantity<T2>) {
                assert_same_unit(self.unit, other.unit, stringify!($mth_assign));
                self.value.$mth_assign(other.value);
            }
        }
    };
}

impl_add_sub!(Add, add, +, AddAssign, add_assign);
impl_add_sub!(Sub, sub, -, SubAssign, sub_assign);

impl<T: MulAssign<f64>> MulAssign<f64> for Quantity<T> {
    fn mul_assign(&mut self, other: f64) {
        self.value *= other;
    }
}

impl<T: DivAssign<f64>> DivAssign<f64> for Quantity<T> {
    fn div_assign(&mut self, other: f64) {
        self.value /= other;
    }
}

impl<T: Neg> Neg for Quantity<T> {
    type Output = Quantity<<T as Neg>::Output>;
    fn neg(self) -> Self::Output {
        Quantity::new(-self.value, self.unit)
    }
}

impl<'a, T> Neg for &'a Quantity<T>
where
    &'a T: Neg,
{
    type Output = Quantity<<&'a T as Neg>::Output>;
    fn neg(self) -> Self::Output {
        Quantity::new(-&self.value, self.unit)
    }
}

impl<T: PartialEq> PartialEq for Quantity<T> {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.value == other.value
    }
}

impl PartialOrd for Quantity<f64> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.unit == other.unit {
            self.value.partial_cmp(&other.value)
        } else {
            None
        }
    }
}

impl<T: AbsDiffEq> AbsDiffEq for Quantity<T> {
    type Epsilon = T::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        T::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.unit == other.unit && self.value.abs_diff_eq(&other.value, epsilon)
    }
}

impl<T: RelativeEq> RelativeEq for Quantity<T> {
    fn default_max_relative() -> Self::Epsilon {
        T::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.unit == other.unit && self.value.relative_eq(&other.value, epsilon, max_relative)
    }
}
