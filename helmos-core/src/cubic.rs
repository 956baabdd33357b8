//! Implementation of the Peng-Robinson equation of state.
//!
//! The model is the smallest complete example of a residual Helmholtz energy
//! model in this crate: a single contribution, van der Waals one-fluid mixing
//! rules and an optional matrix of binary interaction parameters $k_{ij}$.
//! The equations follow the form given in
//! [this wikipedia article](https://en.wikipedia.org/wiki/Cubic_equations_of_state#Peng%E2%80%93Robinson_equation_of_state).
use crate::dual::{DualError, DualNum};
use crate::equation_of_state::{Components, HelmholtzEnergy, HelmholtzEnergyDual, Residual};
use crate::errors::EosResult;
use crate::parameter::{Identifier, Parameter, ParameterError, PureRecord};
use crate::si::{SIArray1, GRAM, MOL};
use crate::state::StateHD;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use std::fmt;
use std::sync::Arc;

/// Boltzmann constant in J/K times 1e30, converts Pa·m³ to Pa·Å³.
const KB_A3: f64 = 13806490.0;

/// Peng-Robinson parameters for a single substance.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PengRobinsonRecord {
    /// critical temperature in Kelvin
    tc: f64,
    /// critical pressure in Pascal
    pc: f64,
    /// acentric factor
    acentric_factor: f64,
}

impl PengRobinsonRecord {
    pub fn new(tc: f64, pc: f64, acentric_factor: f64) -> Self {
        Self {
            tc,
            pc,
            acentric_factor,
        }
    }
}

impl fmt::Display for PengRobinsonRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PengRobinsonRecord(tc={} K, pc={} Pa, acentric factor={})",
            self.tc, self.pc, self.acentric_factor
        )
    }
}

/// Peng-Robinson parameters for one or more substances.
pub struct PengRobinsonParameters {
    tc: Array1<f64>,
    /// energy parameter in K·Å³
    a: Array1<f64>,
    /// co-volume in Å³
    b: Array1<f64>,
    k_ij: Array2<f64>,
    kappa: Array1<f64>,
    /// molar weight in g/mol
    molarweight: Array1<f64>,
    pure_records: Vec<PureRecord<PengRobinsonRecord>>,
}

impl fmt::Display for PengRobinsonParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in self.pure_records.iter() {
            writeln!(f, "{:?}", record)?;
        }
        write!(f, "k_ij:\n{}", self.k_ij)
    }
}

impl PengRobinsonParameters {
    /// Build a parameter set without identifiers and binary interaction parameters.
    pub fn new_simple(
        tc: &[f64],
        pc: &[f64],
        acentric_factor: &[f64],
        molarweight: &[f64],
    ) -> Result<Self, ParameterError> {
        if [pc.len(), acentric_factor.len(), molarweight.len()]
            .iter()
            .any(|&l| l != tc.len())
        {
            return Err(ParameterError::IncompatibleParameters(format!(
                "expected {} values for every parameter",
                tc.len()
            )));
        }
        let records = tc
            .iter()
            .zip(pc)
            .zip(acentric_factor)
            .zip(molarweight)
            .map(|(((&tc, &pc), &w), &mw)| {
                PureRecord::new(Identifier::default(), mw, PengRobinsonRecord::new(tc, pc, w))
            })
            .collect();
        Self::from_records(records, None)
    }

    /// Parameters of the components in `component_list`, in that order.
    ///
    /// Panics if an index is out of bounds.
    fn select(&self, component_list: &[usize]) -> Self {
        let select = |x: &Array1<f64>| component_list.iter().map(|&i| x[i]).collect();
        let n = component_list.len();
        Self {
            tc: select(&self.tc),
            a: select(&self.a),
            b: select(&self.b),
            k_ij: Array2::from_shape_fn((n, n), |(i, j)| {
                self.k_ij[(component_list[i], component_list[j])]
            }),
            kappa: select(&self.kappa),
            molarweight: select(&self.molarweight),
            pure_records: component_list
                .iter()
                .map(|&i| self.pure_records[i].clone())
                .collect(),
        }
    }
}

impl Parameter for PengRobinsonParameters {
    type Pure = PengRobinsonRecord;
    type Binary = f64;

    fn from_records(
        pure_records: Vec<PureRecord<Self::Pure>>,
        binary_records: Option<Array2<Self::Binary>>,
    ) -> Result<Self, ParameterError> {
        let n = pure_records.len();
        if let Some(k_ij) = binary_records.as_ref() {
            if k_ij.dim() != (n, n) {
                return Err(ParameterError::IncompatibleParameters(format!(
                    "binary parameters of shape {:?} for {} components",
                    k_ij.dim(),
                    n
                )));
            }
        }

        let mut tc = Array1::zeros(n);
        let mut a = Array1::zeros(n);
        let mut b = Array1::zeros(n);
        let mut kappa = Array1::zeros(n);
        let mut molarweight = Array1::zeros(n);
        for (i, record) in pure_records.iter().enumerate() {
            let r = &record.model_record;
            if r.tc <= 0.0 || r.pc <= 0.0 {
                return Err(ParameterError::IncompatibleParameters(format!(
                    "non-positive critical point of component {i}: {r}"
                )));
            }
            tc[i] = r.tc;
            a[i] = 0.45724 * r.tc.powi(2) * KB_A3 / r.pc;
            b[i] = 0.07780 * r.tc * KB_A3 / r.pc;
            kappa[i] = 0.37464 + (1.54226 - 0.26992 * r.acentric_factor) * r.acentric_factor;
            molarweight[i] = record.molarweight;
        }

        Ok(Self {
            tc,
            a,
            b,
            k_ij: binary_records.unwrap_or_else(|| Array2::zeros((n, n))),
            kappa,
            molarweight,
            pure_records,
        })
    }

    fn records(&self) -> (&[PureRecord<PengRobinsonRecord>], Option<&Array2<f64>>) {
        (&self.pure_records, Some(&self.k_ij))
    }
}

struct PengRobinsonContribution {
    parameters: Arc<PengRobinsonParameters>,
}

impl<D: DualNum> HelmholtzEnergyDual<D> for PengRobinsonContribution {
    fn helmholtz_energy(&self, state: &StateHD<D>) -> EosResult<D> {
        let p = &self.parameters;
        let x = &state.molefracs;
        let t = state.temperature;

        // temperature dependent energy parameter
        let ak = p
            .tc
            .iter()
            .zip(p.kappa.iter())
            .zip(p.a.iter())
            .map(|((&tc, &kappa), &a)| -> Result<D, DualError> {
                let alpha = (-(t / tc).checked_sqrt()? + 1.0) * kappa + 1.0;
                Ok(alpha * alpha * a)
            })
            .collect::<Result<Array1<D>, DualError>>()?;

        // van der Waals one-fluid mixing rules
        let mut ak_mix = D::zero();
        for ((i, j), &k_ij) in p.k_ij.indexed_iter() {
            ak_mix += (ak[i] * ak[j]).checked_sqrt()? * x[i] * x[j] * (1.0 - k_ij);
        }
        let b = x
            .iter()
            .zip(p.b.iter())
            .fold(D::zero(), |acc, (&x, &b)| acc + x * b);

        let n = state.moles.iter().copied().sum::<D>();
        let v = state.volume;
        let bn = b * n;
        let repulsion = v.checked_div(v - bn)?.checked_ln()?;
        let volume_ratio = (v + bn * (1.0 + SQRT_2)).checked_div(v + bn * (1.0 - SQRT_2))?;
        let attraction = ak_mix.checked_div(b * t * (2.0 * SQRT_2))? * volume_ratio.checked_ln()?;
        Ok(n * (repulsion - attraction))
    }
}

impl fmt::Display for PengRobinsonContribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peng Robinson")
    }
}

/// A simple version of the Peng-Robinson equation of state.
pub struct PengRobinson {
    parameters: Arc<PengRobinsonParameters>,
    contributions: Vec<Box<dyn HelmholtzEnergy>>,
}

impl PengRobinson {
    /// Create a new equation of state from a set of parameters.
    pub fn new(parameters: Arc<PengRobinsonParameters>) -> Self {
        let contributions: Vec<Box<dyn HelmholtzEnergy>> =
            vec![Box::new(PengRobinsonContribution {
                parameters: parameters.clone(),
            })];
        Self {
            parameters,
            contributions,
        }
    }
}

impl fmt::Display for PengRobinson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Peng Robinson")
    }
}

impl Components for PengRobinson {
    fn components(&self) -> usize {
        self.parameters.b.len()
    }

    fn subset(&self, component_list: &[usize]) -> Self {
        Self::new(Arc::new(self.parameters.select(component_list)))
    }
}

impl Residual for PengRobinson {
    fn compute_max_density(&self, moles: &Array1<f64>) -> f64 {
        let b = (moles * &self.parameters.b).sum() / moles.sum();
        0.9 / b
    }

    fn contributions(&self) -> &[Box<dyn HelmholtzEnergy>] {
        &self.contributions
    }

    fn molar_weight(&self) -> Option<SIArray1> {
        Some(&self.parameters.molarweight * (GRAM / MOL))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EosError;
    use crate::si::*;
    use crate::state::{Contributions, State};
    use crate::{EosUnit, SolverOptions};
    use approx::assert_relative_eq;
    use ndarray::arr1;

    const RECORDS: &str = r#"[
        {
            "identifier": {"cas": "74-98-6", "name": "propane", "formula": "C3H8"},
            "model_record": {"tc": 369.96, "pc": 4250000.0, "acentric_factor": 0.153},
            "molarweight": 44.0962
        },
        {
            "identifier": {"cas": "106-97-8", "name": "butane", "formula": "C4H10"},
            "model_record": {"tc": 425.2, "pc": 3800000.0, "acentric_factor": 0.199},
            "molarweight": 58.123
        }
    ]"#;

    fn records() -> Result<Vec<PureRecord<PengRobinsonRecord>>, ParameterError> {
        Ok(serde_json::from_str(RECORDS)?)
    }

    #[test]
    fn critical_point_from_record() -> EosResult<()> {
        let propane = records()?.remove(0);
        let tc = propane.model_record.tc;
        let pc = propane.model_record.pc;
        let pr = Arc::new(PengRobinson::new(Arc::new(PengRobinsonParameters::new_pure(
            propane,
        )?)));
        let cp = State::critical_point(&pr, None, None, SolverOptions::default())?;
        assert_relative_eq!(cp.temperature, tc * KELVIN, max_relative = 1e-4);
        assert_relative_eq!(
            cp.pressure(Contributions::Total)?,
            pc * PASCAL,
            max_relative = 1e-4
        );
        Ok(())
    }

    #[test]
    fn subset_and_molar_weight() -> EosResult<()> {
        let k_ij = Array2::from_shape_fn((2, 2), |(i, j)| if i == j { 0.0 } else { 0.02 });
        let parameters = PengRobinsonParameters::from_records(records()?, Some(k_ij))?;
        let pr = PengRobinson::new(Arc::new(parameters));
        assert_eq!(pr.components(), 2);
        assert_eq!(pr.to_string(), "Peng Robinson");

        let butane = pr.subset(&[1]);
        assert_eq!(butane.components(), 1);
        assert_eq!(butane.parameters.k_ij, Array2::<f64>::zeros((1, 1)));
        assert_eq!(butane.parameters.pure_records[0].identifier.name.as_deref(), Some("butane"));
        let mw = butane.molar_weight().ok_or(EosError::IncompatibleModels)?;
        assert_relative_eq!(mw.get(0), 58.123 * GRAM / MOL, max_relative = 1e-12);

        let reversed = pr.subset(&[1, 0]);
        assert_eq!(reversed.parameters.tc, arr1(&[425.2, 369.96]));
        assert_relative_eq!(reversed.parameters.k_ij[(0, 1)], 0.02);
        Ok(())
    }

    #[test]
    fn inconsistent_parameters() {
        assert!(PengRobinsonParameters::new_simple(&[300.0], &[1e6, 2e6], &[0.1], &[1.0]).is_err());
        assert!(PengRobinsonParameters::new_simple(&[300.0], &[0.0], &[0.1], &[1.0]).is_err());
    }

    #[test]
    fn overpacked_state() -> EosResult<()> {
        let pr = Arc::new(PengRobinson::new(Arc::new(
            PengRobinsonParameters::new_simple(&[369.96], &[4.25e6], &[0.153], &[44.0962])?,
        )));
        // the co-volume is exceeded at 2.5 times the maximum density
        let density = 2.5 * pr.max_density(None)?;
        let state = State::new_pure(&pr, 300.0 * KELVIN, density)?;
        assert!(matches!(
            state.pressure(Contributions::Total),
            Err(EosError::Domain(_))
        ));
        assert!(matches!(
            state.residual_helmholtz_energy(),
            Err(EosError::Domain(_))
        ));

        let state = State::new_pure(&pr, 300.0 * KELVIN, 0.5 * pr.max_density(None)?)?;
        let a = state.residual_helmholtz_energy()?;
        assert!(a.to_reduced(SIUnit::reference_energy())?.is_finite());
        Ok(())
    }

    #[test]
    fn negative_temperature() -> EosResult<()> {
        let parameters = PengRobinsonParameters::new_simple(&[369.96], &[4.25e6], &[0.153], &[44.0962])?;
        let contribution = PengRobinsonContribution {
            parameters: Arc::new(parameters),
        };
        let state = StateHD::new(-300.0, 1e5, arr1(&[1.0]));
        assert!(matches!(
            contribution.helmholtz_energy(&state),
            Err(EosError::Domain(_))
        ));

        // volume equal to the covolume
        let b = contribution.parameters.b[0];
        let state = StateHD::new(300.0, b, arr1(&[1.0]));
        assert!(matches!(
            contribution.helmholtz_energy(&state),
            Err(EosError::Domain(_))
        ));
        Ok(())
    }
}
