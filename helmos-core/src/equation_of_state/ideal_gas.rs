use super::Components;
use crate::dual::DualNum;
use crate::{EosResult, StateHD};
use ndarray::Array1;

/// Ideal gas Helmholtz energy model.
///
/// The model only has to provide the logarithm of the (cubic) thermal
/// de Broglie wavelength of every component in reduced units. It has to be
/// generic in the dual number type so that all temperature derivatives
/// are available.
pub trait IdealGas: Components + Sync + Send {
    /// Logarithm of the cubic de Broglie wavelength $\ln\Lambda_i^3$ of each component.
    fn ln_lambda3<D: DualNum>(&self, temperature: D) -> Array1<D>;

    /// Short description of the ideal gas model.
    fn ideal_gas_model(&self) -> String;

    /// Evaluate the ideal gas Helmholtz energy
    /// $\beta A^\mathrm{ig}=\sum_iN_i\left(\ln\left(\rho_i\Lambda_i^3\right)-1\right)$.
    ///
    /// Components that are absent ($\rho_i=0$) do not contribute.
    fn evaluate_ideal_gas<D: DualNum>(&self, state: &StateHD<D>) -> EosResult<D> {
        let ln_lambda3 = self.ln_lambda3(state.temperature);
        let mut a = D::zero();
        for ((&rho, &n), &l) in state
            .partial_density
            .iter()
            .zip(state.moles.iter())
            .zip(ln_lambda3.iter())
        {
            if rho.re() != 0.0 {
                a += (rho.checked_ln()? + l - 1.0) * n;
            }
        }
        Ok(a)
    }
}
