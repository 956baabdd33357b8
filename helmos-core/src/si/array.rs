use super::{Quantity, QuantityError, SIArray1, SINumber, SIUnit};
use ndarray::{Array, Array1, ArrayBase, Data, DataMut, Dimension, NdIndex};

/// Constructors for 1D arrays
impl SIArray1 {
    /// Collect scalar quantities into an array. All elements need to have the same unit.
    pub fn from_vec(v: Vec<SINumber>) -> Result<Self, QuantityError> {
        let unit = v.first().map_or(SIUnit::DIMENSIONLESS, |x| x.unit);
        if let Some(x) = v.iter().find(|x| x.unit != unit) {
            return Err(QuantityError::InconsistentUnits {
                operation: String::from("from_vec"),
                expected: unit.to_string(),
                found: x.unit.to_string(),
            });
        }
        Ok(Quantity::new(v.iter().map(|x| x.value).collect(), unit))
    }

    pub fn linspace(start: SINumber, end: SINumber, n: usize) -> Result<Self, QuantityError> {
        let end = end.to_reduced(Quantity::new(1.0, start.unit))?;
        Ok(Quantity::new(
            Array1::linspace(start.value, end, n),
            start.unit,
        ))
    }
}

impl<S: Data<Elem = f64>, D: Dimension> Quantity<ArrayBase<S, D>> {
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn sum(&self) -> SINumber {
        Quantity::new(self.value.sum(), self.unit)
    }

    pub fn to_owned(&self) -> Quantity<Array<f64, D>> {
        Quantity::new(self.value.to_owned(), self.unit)
    }

    pub fn get<I: NdIndex<D>>(&self, index: I) -> SINumber {
        Quantity::new(self.value[index], self.unit)
    }

    /// Set a single element. Panics if the units are not identical.
    pub fn set<I: NdIndex<D>>(&mut self, index: I, value: SINumber)
    where
        S: DataMut,
    {
        assert_eq!(self.unit, value.unit, "Inconsistent units in set.");
        self.value[index] = value.value;
    }

    /// Iterate over the elements as scalar quantities.
    pub fn iter(&self) -> impl Iterator<Item = SINumber> + '_ {
        let unit = self.unit;
        self.value.iter().map(move |&x| Quantity::new(x, unit))
    }
}
