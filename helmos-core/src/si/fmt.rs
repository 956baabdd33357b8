use super::{Quantity, SIUnit};
use std::fmt;

const UNIT_SYMBOLS: [&str; 7] = ["s", "m", "kg", "A", "K", "mol", "cd"];

const DERIVED_UNITS: [([i8; 7], &str); 26] = [
    ([0, 0, 0, 0, 1, 0, 0], "K"),
    ([0, 0, 0, 0, 0, 1, 0], "mol"),
    ([0, 1, 0, 0, 0, 0, 0], "m"),
    ([0, 3, 0, 0, 0, 0, 0], "m³"),
    ([1, 0, 0, 0, 0, 0, 0], "s"),
    ([0, 0, 1, 0, 0, 0, 0], "kg"),
    ([-1, 0, 0, 0, 0, 0, 0], "Hz"),
    ([-2, 1, 1, 0, 0, 0, 0], "N"),
    ([-2, -1, 1, 0, 0, 0, 0], "Pa"),
    ([-2, 2, 1, 0, 0, 0, 0], "J"),
    ([-3, 2, 1, 0, 0, 0, 0], "W"),
    ([-2, 2, 1, 0, -1, 0, 0], "J/K"),
    ([-2, 2, 1, 0, -2, 0, 0], "J/K²"),
    ([-2, 2, 1, 0, 0, -1, 0], "J/mol"),
    ([-2, 2, 1, 0, -1, -1, 0], "J/mol/K"),
    ([-2, 2, 1, 0, -2, -1, 0], "J/mol/K²"),
    ([-2, 2, 0, 0, 0, 0, 0], "J/kg"),
    ([-2, 2, 0, 0, -1, 0, 0], "J/kg/K"),
    ([0, -3, 0, 0, 0, 1, 0], "mol/m³"),
    ([0, 3, 0, 0, 0, -1, 0], "m³/mol"),
    ([0, -3, 1, 0, 0, 0, 0], "kg/m³"),
    ([0, 0, 1, 0, 0, -1, 0], "kg/mol"),
    ([-1, 1, 0, 0, 0, 0, 0], "m/s"),
    ([-2, -1, 1, 0, -1, 0, 0], "Pa/K"),
    ([-2, -4, 1, 0, 0, 0, 0], "Pa/m³"),
    ([2, 1, -1, 0, 0, 0, 0], "1/Pa"),
];

impl fmt::Display for SIUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((_, symbol)) = DERIVED_UNITS.iter().find(|(u, _)| *u == self.0) {
            return write!(f, "{symbol}");
        }
        let unit = self
            .0
            .iter()
            .zip(UNIT_SYMBOLS.iter())
            .filter_map(|(&u, &s)| match u {
                0 => None,
                1 => Some(s.to_owned()),
                _ => Some(format!("{s}^{u}")),
            })
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{unit}")
    }
}

impl<T: fmt::Display> fmt::Display for Quantity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)?;
        if !self.unit.is_dimensionless() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}

impl<T: fmt::LowerExp> fmt::LowerExp for Quantity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)?;
        if !self.unit.is_dimensionless() {
            write!(f, " {}", self.unit)?;
        }
        Ok(())
    }
}
