use crate::dual::DualNum;
use crate::si::SIArray1;
use crate::{EosError, EosResult, StateHD};
use ndarray::Array1;
use std::fmt;
use std::sync::Arc;

mod helmholtz_energy;
mod ideal_gas;
mod residual;

pub use helmholtz_energy::{HelmholtzEnergy, HelmholtzEnergyDual};
pub use ideal_gas::IdealGas;
pub use residual::{Components, Residual};

/// An equation of state consisting of an ideal gas model
/// and a residual Helmholtz energy model.
///
/// Both models have to be defined for the same number of components.
/// This is checked once on construction.
#[derive(Clone)]
pub struct EquationOfState<I, R> {
    pub ideal_gas: Arc<I>,
    pub residual: Arc<R>,
}

impl<I: IdealGas, R: Residual> EquationOfState<I, R> {
    /// Combine an ideal gas and a residual model.
    pub fn new(ideal_gas: Arc<I>, residual: Arc<R>) -> EosResult<Self> {
        if ideal_gas.components() != residual.components() {
            return Err(EosError::IncompatibleComponents(
                residual.components(),
                ideal_gas.components(),
            ));
        }
        Ok(Self {
            ideal_gas,
            residual,
        })
    }
}

impl<I: IdealGas, R: Residual + fmt::Display> fmt::Display for EquationOfState<I, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} + {}", self.ideal_gas.ideal_gas_model(), self.residual)
    }
}

impl<I: IdealGas, R: Residual> Components for EquationOfState<I, R> {
    fn components(&self) -> usize {
        self.residual.components()
    }

    fn subset(&self, component_list: &[usize]) -> Self {
        Self {
            ideal_gas: Arc::new(self.ideal_gas.subset(component_list)),
            residual: Arc::new(self.residual.subset(component_list)),
        }
    }
}

impl<I: IdealGas, R: Residual> IdealGas for EquationOfState<I, R> {
    fn ln_lambda3<D: DualNum>(&self, temperature: D) -> Array1<D> {
        self.ideal_gas.ln_lambda3(temperature)
    }

    fn ideal_gas_model(&self) -> String {
        self.ideal_gas.ideal_gas_model()
    }

    fn evaluate_ideal_gas<D: DualNum>(&self, state: &StateHD<D>) -> EosResult<D> {
        self.ideal_gas.evaluate_ideal_gas(state)
    }
}

impl<I: IdealGas, R: Residual> Residual for EquationOfState<I, R> {
    fn compute_max_density(&self, moles: &Array1<f64>) -> f64 {
        self.residual.compute_max_density(moles)
    }

    fn contributions(&self) -> &[Box<dyn HelmholtzEnergy>] {
        self.residual.contributions()
    }

    fn molar_weight(&self) -> Option<SIArray1> {
        self.residual.molar_weight()
    }
}
