use super::{HelmholtzEnergy, HelmholtzEnergyDual};
use crate::dual::{Dual3, Dual3_64, Dual64, DualNum, HyperDual, HyperDual64};
use crate::si::{SIArray1, SINumber, SIUnit};
use crate::{EosError, EosResult, EosUnit, StateHD};
use ndarray::prelude::*;
use num_traits::{One, Zero};

/// Number of components and the possibility to extract a subset of them.
pub trait Components {
    fn components(&self) -> usize;

    /// Model restricted to the components in `component_list`, in that order.
    fn subset(&self, component_list: &[usize]) -> Self;
}

/// A residual Helmholtz energy model.
///
/// Implementors provide their contributions and a density estimate for
/// liquid phases. Everything else is derived from the sum of the
/// contributions.
pub trait Residual: Components + Send + Sync {
    /// Density in Angstrom^-3 that is used as starting value for liquid
    /// phases. It does not have to be a bound of the model.
    fn compute_max_density(&self, moles: &Array1<f64>) -> f64;

    fn contributions(&self) -> &[Box<dyn HelmholtzEnergy>];

    /// Molar weight of all components, `None` if the model does not know
    /// them. Mass specific properties fail for such models.
    fn molar_weight(&self) -> Option<SIArray1> {
        None
    }

    /// Residual reduced Helmholtz energy $\beta A^\mathrm{res}$ summed over all contributions.
    fn evaluate_residual<D: DualNum>(&self, state: &StateHD<D>) -> EosResult<D>
    where
        dyn HelmholtzEnergy: HelmholtzEnergyDual<D>,
    {
        self.contributions()
            .iter()
            .try_fold(D::zero(), |a, c| Ok(a + c.helmholtz_energy(state)?))
    }

    /// Reduced Helmholtz energy of every contribution, labeled by its name.
    fn evaluate_residual_contributions<D: DualNum>(
        &self,
        state: &StateHD<D>,
    ) -> EosResult<Vec<(String, D)>>
    where
        dyn HelmholtzEnergy: HelmholtzEnergyDual<D>,
    {
        self.contributions()
            .iter()
            .map(|c| Ok((c.to_string(), c.helmholtz_energy(state)?)))
            .collect()
    }

    /// Check mole numbers against the model.
    ///
    /// Pure component models accept `None` and use the reference amount
    /// of substance.
    fn validate_moles(&self, moles: Option<&SIArray1>) -> EosResult<SIArray1> {
        let n = self.components();
        match moles {
            None if n == 1 => Ok(arr1(&[1.0]) * SIUnit::reference_moles()),
            None => Err(EosError::IncompatibleComponents(n, 1)),
            Some(m) if m.len() != n => Err(EosError::IncompatibleComponents(n, m.len())),
            Some(m) if !m.has_unit(&SIUnit::reference_moles()) => Err(EosError::WrongUnits(
                String::from("mol"),
                m.unit().to_string(),
            )),
            Some(m) => Ok(m.clone()),
        }
    }

    /// [Residual::compute_max_density] in SI units.
    fn max_density(&self, moles: Option<&SIArray1>) -> EosResult<SINumber> {
        let moles = self
            .validate_moles(moles)?
            .to_reduced(SIUnit::reference_moles())?;
        Ok(self.compute_max_density(&moles) * SIUnit::reference_density())
    }

    /// Second virial coefficient $B(T)$.
    fn second_virial_coefficient(
        &self,
        temperature: SINumber,
        moles: Option<&SIArray1>,
    ) -> EosResult<SINumber> {
        let (t, x) = virial_inputs(self, temperature, moles)?;
        let rho = HyperDual64::zero().derivative1().derivative2();
        let a = self.evaluate_residual(&StateHD::new_virial(HyperDual64::from(t), rho, x))?;
        Ok(a.eps1eps2 * 0.5 / SIUnit::reference_density())
    }

    /// Third virial coefficient $C(T)$.
    fn third_virial_coefficient(
        &self,
        temperature: SINumber,
        moles: Option<&SIArray1>,
    ) -> EosResult<SINumber> {
        let (t, x) = virial_inputs(self, temperature, moles)?;
        let rho = Dual3_64::zero().derivative();
        let a = self.evaluate_residual(&StateHD::new_virial(Dual3_64::from(t), rho, x))?;
        Ok(a.v3 / 3.0 / SIUnit::reference_density().powi(2))
    }

    /// Temperature derivative of the second virial coefficient $B'(T)$.
    fn second_virial_coefficient_temperature_derivative(
        &self,
        temperature: SINumber,
        moles: Option<&SIArray1>,
    ) -> EosResult<SINumber> {
        let (t, x) = virial_inputs(self, temperature, moles)?;
        let rho = HyperDual::new(Dual64::zero(), Dual64::one(), Dual64::one(), Dual64::zero());
        let t = HyperDual::from_re(Dual64::from(t).derivative());
        let a = self.evaluate_residual(&StateHD::new_virial(t, rho, x))?;
        Ok(a.eps1eps2.eps * 0.5 / (SIUnit::reference_density() * SIUnit::reference_temperature()))
    }

    /// Temperature derivative of the third virial coefficient $C'(T)$.
    fn third_virial_coefficient_temperature_derivative(
        &self,
        temperature: SINumber,
        moles: Option<&SIArray1>,
    ) -> EosResult<SINumber> {
        let (t, x) = virial_inputs(self, temperature, moles)?;
        let rho = Dual3::from_re(Dual64::zero()).derivative();
        let t = Dual3::from_re(Dual64::from(t).derivative());
        let a = self.evaluate_residual(&StateHD::new_virial(t, rho, x))?;
        let reference = SIUnit::reference_density().powi(2) * SIUnit::reference_temperature();
        Ok(a.v3.eps / 3.0 / reference)
    }
}

/// Reduced temperature and mole fractions at which virial coefficients
/// are evaluated.
fn virial_inputs<R: Residual + ?Sized>(
    eos: &R,
    temperature: SINumber,
    moles: Option<&SIArray1>,
) -> EosResult<(f64, Array1<f64>)> {
    let moles = eos.validate_moles(moles)?;
    let x = moles.to_reduced(moles.sum())?;
    let t = temperature.to_reduced(SIUnit::reference_temperature())?;
    Ok((t, x))
}
