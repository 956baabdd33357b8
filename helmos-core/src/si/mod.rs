//! Physical quantities with units that are checked at runtime.
//!
//! A [Quantity] stores a value (a float or an `ndarray` array) together with
//! the exponents of the seven SI base units. Multiplication and division combine
//! the units, addition and subtraction require identical units. Conversions into
//! plain numbers ([Quantity::to_reduced], [Quantity::into_value]) fail with a
//! [QuantityError] if the dimensions do not match.
use ndarray::{Array, Array1, Array2};
use thiserror::Error;

mod array;
mod fmt;
mod ops;

/// Exponents of the SI base units in the order
/// $\left[\text{s},\text{m},\text{kg},\text{A},\text{K},\text{mol},\text{cd}\right]$.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SIUnit(pub(crate) [i8; 7]);

impl SIUnit {
    pub const DIMENSIONLESS: Self = SIUnit([0; 7]);

    pub const fn new(exponents: [i8; 7]) -> Self {
        Self(exponents)
    }

    pub fn exponents(&self) -> [i8; 7] {
        self.0
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Self::DIMENSIONLESS
    }

    pub fn powi(&self, n: i32) -> Self {
        Self(self.0.map(|e| e * n as i8))
    }

    /// The n-th root of the unit. Fails, if any exponent is not divisible by `n`.
    pub fn root(&self, n: i32) -> Result<Self, QuantityError> {
        let n = n as i8;
        if n == 0 || self.0.iter().any(|e| e % n != 0) {
            return Err(QuantityError::UndefinedOperation {
                operation: format!("root({n})"),
                unit: self.to_string(),
            });
        }
        Ok(Self(self.0.map(|e| e / n)))
    }
}

/// Errors raised by unit conversions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    #[error("Inconsistent units in {operation}: expected {expected}, got {found}.")]
    InconsistentUnits {
        operation: String,
        expected: String,
        found: String,
    },
    #[error("Operation {operation} is not defined for the unit {unit}.")]
    UndefinedOperation { operation: String, unit: String },
}

/// Physical quantity with a unit that is checked at runtime.
#[derive(Clone, Copy, Debug)]
pub struct Quantity<T> {
    pub(crate) value: T,
    pub(crate) unit: SIUnit,
}

pub type SINumber = Quantity<f64>;
pub type SIArray<D> = Quantity<Array<f64, D>>;
pub type SIArray1 = Quantity<Array1<f64>>;
pub type SIArray2 = Quantity<Array2<f64>>;

impl<T> Quantity<T> {
    pub fn new(value: T, unit: SIUnit) -> Self {
        Self { value, unit }
    }

    pub fn unit(&self) -> SIUnit {
        self.unit
    }

    /// Check whether two quantities have the same dimension.
    pub fn has_unit<T2>(&self, other: &Quantity<T2>) -> bool {
        self.unit == other.unit
    }

    /// Divide the quantity by a reference value and return the
    /// resulting dimensionless value.
    pub fn to_reduced<'a>(&'a self, reference: SINumber) -> Result<T, QuantityError>
    where
        &'a T: std::ops::Div<f64, Output = T>,
    {
        if self.unit == reference.unit {
            Ok(&self.value / reference.value)
        } else {
            Err(QuantityError::InconsistentUnits {
                operation: String::from("to_reduced"),
                expected: reference.unit.to_string(),
                found: self.unit.to_string(),
            })
        }
    }

    /// Return the value of a dimensionless quantity.
    pub fn into_value(self) -> Result<T, QuantityError> {
        if self.unit.is_dimensionless() {
            Ok(self.value)
        } else {
            Err(QuantityError::InconsistentUnits {
                operation: String::from("into_value"),
                expected: String::from("dimensionless"),
                found: self.unit.to_string(),
            })
        }
    }
}

impl SINumber {
    pub fn abs(&self) -> Self {
        Self::new(self.value.abs(), self.unit)
    }

    pub fn powi(&self, n: i32) -> Self {
        Self::new(self.value.powi(n), self.unit.powi(n))
    }

    pub fn sqrt(&self) -> Result<Self, QuantityError> {
        Ok(Self::new(self.value.sqrt(), self.unit.root(2)?))
    }

    pub fn cbrt(&self) -> Result<Self, QuantityError> {
        Ok(Self::new(self.value.cbrt(), self.unit.root(3)?))
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite()
    }
}

const fn unit(value: f64, exponents: [i8; 7]) -> SINumber {
    Quantity {
        value,
        unit: SIUnit(exponents),
    }
}

/// SI base unit second $\\left(\text{s}\\right)$
pub const SECOND: SINumber = unit(1.0, [1, 0, 0, 0, 0, 0, 0]);
/// SI base unit meter $\\left(\text{m}\\right)$
pub const METER: SINumber = unit(1.0, [0, 1, 0, 0, 0, 0, 0]);
/// SI base unit kilogram $\\left(\text{kg}\\right)$
pub const KILOGRAM: SINumber = unit(1.0, [0, 0, 1, 0, 0, 0, 0]);
/// SI base unit Ampere $\\left(\text{A}\\right)$
pub const AMPERE: SINumber = unit(1.0, [0, 0, 0, 1, 0, 0, 0]);
/// SI base unit Kelvin $\\left(\text{K}\\right)$
pub const KELVIN: SINumber = unit(1.0, [0, 0, 0, 0, 1, 0, 0]);
/// SI base unit mol $\\left(\text{mol}\\right)$
pub const MOL: SINumber = unit(1.0, [0, 0, 0, 0, 0, 1, 0]);
/// SI base unit candela $\\left(\text{cd}\\right)$
pub const CANDELA: SINumber = unit(1.0, [0, 0, 0, 0, 0, 0, 1]);

/// Derived unit Hertz $\\left(1\\,\text{Hz}=1\\,\text{s}^{-1}\\right)$
pub const HERTZ: SINumber = unit(1.0, [-1, 0, 0, 0, 0, 0, 0]);
/// Derived unit Newton $\\left(1\\,\text{N}=1\\,\text{kg}\\frac{\text{m}}{\text{s}^2}\\right)$
pub const NEWTON: SINumber = unit(1.0, [-2, 1, 1, 0, 0, 0, 0]);
/// Derived unit Pascal $\\left(1\\,\text{Pa}=1\\,\\frac{\text{kg}}{\text{m}\\cdot\text{s}^2}\\right)$
pub const PASCAL: SINumber = unit(1.0, [-2, -1, 1, 0, 0, 0, 0]);
/// Derived unit Joule $\\left(1\\,\text{J}=1\\,\text{kg}\\frac{\text{m}^2}{\text{s}^2}\\right)$
pub const JOULE: SINumber = unit(1.0, [-2, 2, 1, 0, 0, 0, 0]);
/// Derived unit Watt $\\left(1\\,\text{W}=1\\,\text{kg}\\frac{\text{m}^2}{\text{s}^3}\\right)$
pub const WATT: SINumber = unit(1.0, [-3, 2, 1, 0, 0, 0, 0]);

/// Additional unit Ångstrom $\\left(1\\,\text{\\AA}=10^{-10}\\,\text{m}\\right)$
pub const ANGSTROM: SINumber = unit(1e-10, [0, 1, 0, 0, 0, 0, 0]);
/// Additional unit unified atomic mass $\\left(1\\,\text{u}\\approx 1.660539\\times 10^{-27}\\,\text{kg}\\right)$
pub const AMU: SINumber = unit(1.6605390671738466e-27, [0, 0, 1, 0, 0, 0, 0]);
/// Additional unit bar $\\left(1\\,\text{bar}=10^5\\,\text{Pa}\\right)$
pub const BAR: SINumber = unit(1e5, [-2, -1, 1, 0, 0, 0, 0]);
/// Additional unit calorie $\\left(1\\,\text{cal}=4.184\\,\text{J}\\right)$
pub const CALORIE: SINumber = unit(4.184, [-2, 2, 1, 0, 0, 0, 0]);
/// Additional unit gram $\\left(1\\,\text{g}=10^{-3}\\,\text{kg}\\right)$
pub const GRAM: SINumber = unit(1e-3, [0, 0, 1, 0, 0, 0, 0]);
/// Additional unit liter $\\left(1\\,\text{l}=10^{-3}\\,\text{m}^3\\right)$
pub const LITER: SINumber = unit(1e-3, [0, 3, 0, 0, 0, 0, 0]);

/// Boltzmann constant $\\left(k_\text{B}=1.380649\times 10^{-23}\\,\\frac{\text{J}}{\text{K}}\\right)$
pub const KB: SINumber = unit(1.380649e-23, [-2, 2, 1, 0, -1, 0, 0]);
/// Avogadro constant $\\left(N_\text{A}=6.02214076\times 10^{23}\\,\text{mol}^{-1}\\right)$
pub const NAV: SINumber = unit(6.02214076e23, [0, 0, 0, 0, 0, -1, 0]);
/// Planck constant $\\left(h=6.62607015\times 10^{-34}\\,\text{J}\\cdot\text{s}\\right)$
pub const PLANCK: SINumber = unit(6.62607015e-34, [-1, 2, 1, 0, 0, 0, 0]);
/// Ideal gas constant $\\left(R=8.31446261815324\\,\\frac{\text{J}}{\text{molK}}\\right)$
pub const RGAS: SINumber = unit(6.02214076e23 * 1.380649e-23, [-2, 2, 1, 0, -1, -1, 0]);

/// Prefix femto $\\left(\text{f}=10^{-15}\\right)$
pub const FEMTO: f64 = 1e-15;
/// Prefix pico $\\left(\text{p}=10^{-12}\\right)$
pub const PICO: f64 = 1e-12;
/// Prefix nano $\\left(\text{n}=10^{-9}\\right)$
pub const NANO: f64 = 1e-9;
/// Prefix micro $\\left(\text{µ}=10^{-6}\\right)$
pub const MICRO: f64 = 1e-6;
/// Prefix milli $\\left(\text{m}=10^{-3}\\right)$
pub const MILLI: f64 = 1e-3;
/// Prefix centi $\\left(\text{c}=10^{-2}\\right)$
pub const CENTI: f64 = 1e-2;
/// Prefix deci $\\left(\text{d}=10^{-1}\\right)$
pub const DECI: f64 = 1e-1;
/// Prefix kilo $\\left(\text{k}=10^{3}\\right)$
pub const KILO: f64 = 1e3;
/// Prefix mega $\\left(\text{M}=10^{6}\\right)$
pub const MEGA: f64 = 1e6;
/// Prefix giga $\\left(\text{G}=10^{9}\\right)$
pub const GIGA: f64 = 1e9;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn test_units() {
        let p = 2.0 * BAR;
        let v = 3.0 * METER.powi(3);
        let e = p * v;
        assert!(e.has_unit(&JOULE));
        assert_relative_eq!(e, 6e5 * JOULE);
        assert_eq!(e.to_reduced(KILO * JOULE), Ok(600.0));
        assert_relative_eq!(RGAS, NAV * KB, max_relative = 1e-15);
        assert_relative_eq!((KILOGRAM / GRAM).into_value().unwrap(), 1000.0);
        assert_relative_eq!((4.0 * METER.powi(2)).sqrt().unwrap(), 2.0 * METER);
    }

    #[test]
    fn test_unit_mismatch() {
        let t = 300.0 * KELVIN;
        assert!(matches!(
            t.to_reduced(BAR),
            Err(QuantityError::InconsistentUnits { .. })
        ));
        assert!(t.into_value().is_err());
        assert!(METER.sqrt().is_err());
        assert_eq!(t.partial_cmp(&BAR), None);
        assert!(t > 200.0 * KELVIN);
    }

    #[test]
    #[should_panic]
    fn test_add_mismatch() {
        let _ = KELVIN + PASCAL;
    }

    #[test]
    fn test_arrays() {
        let n = arr1(&[1.0, 3.0]) * MOL;
        assert_relative_eq!(n.sum(), 4.0 * MOL);
        assert_relative_eq!(n.get(1), 3.0 * MOL);
        let x = (&n / n.sum()).into_value().unwrap();
        assert_relative_eq!(x, arr1(&[0.25, 0.75]));
        let rho = &n / (2.0 * METER.powi(3));
        assert_eq!(rho.to_string(), "[0.5, 1.5] mol/m³");
        assert!(SIArray1::from_vec(vec![KELVIN, PASCAL]).is_err());
        let t = SIArray1::linspace(300.0 * KELVIN, 400.0 * KELVIN, 5).unwrap();
        assert_relative_eq!(t.get(2), 350.0 * KELVIN);
    }

    #[test]
    fn scalar_products() {
        let rho = 2.0 * (MOL / METER.powi(3));
        assert_relative_eq!(rho / 2.0, MOL / METER.powi(3));
        assert_relative_eq!(1.0 / rho, 0.5 * METER.powi(3) / MOL);
        let n = &arr1(&[0.25, 0.75]) * (4.0 * MOL);
        assert_relative_eq!(0.5 * n.sum(), 2.0 * MOL);
        let doubled = 2.0 * n;
        assert_relative_eq!(doubled.get(1), 6.0 * MOL);
    }
}
