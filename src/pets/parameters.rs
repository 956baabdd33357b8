use crate::hard_sphere::HardSphereProperties;
use helmos_core::dual::{DualError, DualNum};
use helmos_core::parameter::{Parameter, ParameterError, PureRecord};
use ndarray::{Array1, Array2, Zip};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

/// PeTS parameters for a pure substance.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PetsRecord {
    /// Segment diameter in units of Angstrom
    pub sigma: f64,
    /// Energetic parameter in units of Kelvin
    pub epsilon_k: f64,
}

impl fmt::Display for PetsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PetsRecord(sigma={}, epsilon_k={})",
            self.sigma, self.epsilon_k
        )
    }
}

impl PetsRecord {
    /// New PeTS parameters for a pure substance.
    ///
    /// # Example
    ///
    /// ```
    /// use helmos::pets::PetsRecord;
    /// let record = PetsRecord::new(3.7, 120.0);
    /// ```
    pub fn new(sigma: f64, epsilon_k: f64) -> PetsRecord {
        PetsRecord { sigma, epsilon_k }
    }
}

/// Parameters that modify binary interactions.
///
/// $\varepsilon_{k,ij} = (1 - k_{ij})\sqrt{\varepsilon_{k,i} \varepsilon_{k,j}}$
#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq)]
pub struct PetsBinaryRecord {
    pub k_ij: f64,
}

impl From<f64> for PetsBinaryRecord {
    fn from(k_ij: f64) -> Self {
        Self { k_ij }
    }
}

impl From<PetsBinaryRecord> for f64 {
    fn from(binary_record: PetsBinaryRecord) -> Self {
        binary_record.k_ij
    }
}

impl fmt::Display for PetsBinaryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PetsBinaryRecord(k_ij={})", self.k_ij)
    }
}

/// Parameter set for the PeTS equation of state.
///
/// Cross parameters follow the Lorentz-Berthelot combining rules, with
/// $k_{ij}$ reducing the geometric mean of the energy parameters.
#[derive(Debug, Clone)]
pub struct PetsParameters {
    /// molar weight in g/mol
    pub molarweight: Array1<f64>,
    /// Lennard-Jones diameter in Angstrom
    pub sigma: Array1<f64>,
    /// Lennard-Jones energy parameter in Kelvin
    pub epsilon_k: Array1<f64>,
    pub k_ij: Array2<f64>,
    pub sigma_ij: Array2<f64>,
    pub epsilon_k_ij: Array2<f64>,
    pub pure_records: Vec<PureRecord<PetsRecord>>,
    pub binary_records: Option<Array2<PetsBinaryRecord>>,
}

impl PetsParameters {
    fn build(
        pure_records: Vec<PureRecord<PetsRecord>>,
        binary_records: Option<Array2<PetsBinaryRecord>>,
    ) -> Self {
        let n = pure_records.len();
        let pure = |f: fn(&PureRecord<PetsRecord>) -> f64| -> Array1<f64> {
            pure_records.iter().map(f).collect()
        };
        let molarweight = pure(|r| r.molarweight);
        let sigma = pure(|r| r.model_record.sigma);
        let epsilon_k = pure(|r| r.model_record.epsilon_k);

        let k_ij = match &binary_records {
            Some(br) => br.mapv(f64::from),
            None => Array2::zeros((n, n)),
        };
        let sigma_ij = Array2::from_shape_fn((n, n), |(i, j)| 0.5 * (sigma[i] + sigma[j]));
        let epsilon_k_ij = Array2::from_shape_fn((n, n), |(i, j)| {
            (1.0 - k_ij[(i, j)]) * (epsilon_k[i] * epsilon_k[j]).sqrt()
        });

        Self {
            molarweight,
            sigma,
            epsilon_k,
            k_ij,
            sigma_ij,
            epsilon_k_ij,
            pure_records,
            binary_records,
        }
    }

    /// Parameters of the components in `component_list`, in that order.
    ///
    /// Panics if an index is out of bounds.
    pub(crate) fn select(&self, component_list: &[usize]) -> Self {
        let pure_records = component_list
            .iter()
            .map(|&i| self.pure_records[i].clone())
            .collect();
        let n = component_list.len();
        let binary_records = self.binary_records.as_ref().map(|br| {
            Array2::from_shape_fn((n, n), |(i, j)| br[(component_list[i], component_list[j])])
        });
        Self::build(pure_records, binary_records)
    }
}

impl Parameter for PetsParameters {
    type Pure = PetsRecord;
    type Binary = PetsBinaryRecord;

    fn from_records(
        pure_records: Vec<PureRecord<Self::Pure>>,
        binary_records: Option<Array2<PetsBinaryRecord>>,
    ) -> Result<Self, ParameterError> {
        let n = pure_records.len();
        match binary_records.as_ref().map(|br| br.dim()) {
            Some(dim) if dim != (n, n) => {
                return Err(ParameterError::IncompatibleParameters(format!(
                    "binary parameters of shape {dim:?} for {n} components"
                )))
            }
            _ => (),
        }
        let invalid = |r: &PetsRecord| r.sigma <= 0.0 || r.epsilon_k <= 0.0;
        if let Some(i) = pure_records.iter().position(|r| invalid(&r.model_record)) {
            return Err(ParameterError::IncompatibleParameters(format!(
                "non-positive parameters of component {i}: {}",
                pure_records[i].model_record
            )));
        }
        Ok(Self::build(pure_records, binary_records))
    }

    fn records(&self) -> (&[PureRecord<PetsRecord>], Option<&Array2<PetsBinaryRecord>>) {
        (&self.pure_records, self.binary_records.as_ref())
    }
}

/// Coefficients of the temperature dependent diameter
/// $d_i=\sigma_i\left(1-c_1\exp\left(-c_2\varepsilon_i/kT\right)\right)$.
const DIAMETER_C1: f64 = 0.127112544;
const DIAMETER_C2: f64 = 3.052785558;

impl HardSphereProperties for PetsParameters {
    fn hs_diameter<D: DualNum>(&self, temperature: D) -> Result<Array1<D>, DualError> {
        let beta = temperature.checked_recip()?;
        Ok(Zip::from(&self.sigma)
            .and(&self.epsilon_k)
            .map_collect(|&s, &e| {
                -((beta * (-DIAMETER_C2 * e)).exp() * DIAMETER_C1 - 1.0) * s
            }))
    }
}

impl fmt::Display for PetsParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PetsParameters(")?;
        writeln!(f, "    molarweight={},", self.molarweight)?;
        writeln!(f, "    sigma={},", self.sigma)?;
        write!(f, "    epsilon_k={}", self.epsilon_k)?;
        if self.k_ij.iter().any(|k| !k.is_zero()) {
            write!(f, ",\n    k_ij={}", self.k_ij)?;
        }
        write!(f, "\n)")
    }
}
