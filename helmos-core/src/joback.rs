//! Ideal gas model based on the heat capacity correlation of
//! [Joback and Reid, 1987](https://doi.org/10.1080/00986448708960487).
use crate::dual::DualNum;
use crate::equation_of_state::{Components, IdealGas};
use crate::errors::EosResult;
use crate::parameter::{NoBinaryModelRecord, Parameter, ParameterError, PureRecord};
use crate::si::{SINumber, SIUnit, RGAS};
use crate::EosUnit;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Coefficients of the ideal gas heat capacity polynomial
/// $c_p^\mathrm{ig}=a+bT+cT^2+dT^3+eT^4$ in J/mol/K.
///
/// The fourth order coefficient `e` is not part of the original
/// publication but is used by later parametrizations.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct JobackRecord {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
}

impl JobackRecord {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64) -> Self {
        Self { a, b, c, d, e }
    }

    /// Heat capacity in J/mol/K at temperature `t` in K.
    fn c_p(&self, t: f64) -> f64 {
        self.a + t * (self.b + t * (self.c + t * (self.d + t * self.e)))
    }
}

impl fmt::Display for JobackRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JobackRecord(a={}, b={}, c={}, d={}, e={})",
            self.a, self.b, self.c, self.d, self.e
        )
    }
}

/// Joback parameters for one or more components.
pub struct JobackParameters {
    pure_records: Vec<PureRecord<JobackRecord>>,
}

impl Parameter for JobackParameters {
    type Pure = JobackRecord;
    type Binary = NoBinaryModelRecord;

    fn from_records(
        pure_records: Vec<PureRecord<Self::Pure>>,
        _binary_records: Option<Array2<Self::Binary>>,
    ) -> Result<Self, ParameterError> {
        Ok(Self { pure_records })
    }

    fn records(&self) -> (&[PureRecord<Self::Pure>], Option<&Array2<Self::Binary>>) {
        (&self.pure_records, None)
    }
}

/// Ideal gas model of Joback and Reid.
///
/// The (cubic) de Broglie wavelength is obtained by integrating the heat
/// capacity from the reference state $T_0=298.15$ K, $p_0=10^5$ Pa.
pub struct Joback {
    pub parameters: Arc<JobackParameters>,
}

impl Joback {
    pub fn new(parameters: Arc<JobackParameters>) -> Self {
        Self { parameters }
    }

    /// Molar ideal gas heat capacity of a mixture directly from the correlation.
    pub fn molar_isobaric_heat_capacity(
        &self,
        temperature: SINumber,
        molefracs: &Array1<f64>,
    ) -> EosResult<SINumber> {
        let t = temperature.to_reduced(SIUnit::reference_temperature())?;
        let c_p: f64 = self
            .parameters
            .pure_records
            .iter()
            .zip(molefracs.iter())
            .map(|(r, x)| x * r.model_record.c_p(t))
            .sum();
        Ok(c_p / RGAS_SI * RGAS)
    }
}

impl Components for Joback {
    fn components(&self) -> usize {
        self.parameters.pure_records.len()
    }

    fn subset(&self, component_list: &[usize]) -> Self {
        let pure_records = component_list
            .iter()
            .map(|&i| self.parameters.pure_records[i].clone())
            .collect();
        Self::new(Arc::new(JobackParameters { pure_records }))
    }
}

impl IdealGas for Joback {
    fn ln_lambda3<D: DualNum>(&self, temperature: D) -> Array1<D> {
        let t = temperature;
        let t2 = t * t;
        let t4 = t2 * t2;
        let f = (t * (KB / (P0 * A3))).ln();
        self.parameters
            .pure_records
            .iter()
            .map(|record| {
                let j = &record.model_record;
                let h = (t - T0) * j.a
                    + (t2 - T0_2) * (0.5 * j.b)
                    + (t * t2 - T0_3) * (j.c / 3.0)
                    + (t4 - T0_4) * (j.d / 4.0)
                    + (t4 * t - T0_5) * (j.e / 5.0);
                let s = (t / T0).ln() * j.a
                    + (t - T0) * j.b
                    + (t2 - T0_2) * (0.5 * j.c)
                    + (t2 * t - T0_3) * (j.d / 3.0)
                    + (t4 - T0_4) * (j.e / 4.0);
                (h - t * s) / (t * RGAS_SI) + f
            })
            .collect()
    }

    fn ideal_gas_model(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Joback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ideal gas (Joback)")
    }
}

/// gas constant in J/mol/K
const RGAS_SI: f64 = 6.02214076 * 1.380649;
const T0: f64 = 298.15;
const T0_2: f64 = T0 * T0;
const T0_3: f64 = T0 * T0_2;
const T0_4: f64 = T0_2 * T0_2;
const T0_5: f64 = T0 * T0_4;
const P0: f64 = 1.0e5;
/// Å³ in m³
const A3: f64 = 1e-30;
const KB: f64 = 1.380649e-23;
