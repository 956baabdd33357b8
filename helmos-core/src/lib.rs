#![warn(clippy::all)]
#![allow(clippy::reversed_empty_ranges)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_arguments)]
//! Core traits and functionalities for Helmholtz energy based thermodynamics.
//!
//! Properties are obtained as partial derivatives of the Helmholtz energy
//! $A(T,V,N_i)$ that are calculated exactly with (hyper) dual numbers.
use si::{SINumber, SIUnit, ANGSTROM, KELVIN, NAV, PICO, RGAS, SECOND};

#[doc(hidden)]
pub use tracing;

/// Log messages with level `Verbosity::Iter` or higher.
#[macro_export]
macro_rules! log_iter {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::Verbosity::Iter {
            $crate::tracing::debug!($($arg)*);
        }
    }
}

/// Log messages with level `Verbosity::Result` or higher.
#[macro_export]
macro_rules! log_result {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::Verbosity::Result {
            $crate::tracing::info!($($arg)*);
        }
    }
}

pub mod cubic;
mod density_iteration;
pub mod dual;
mod equation_of_state;
mod errors;
pub mod joback;
mod linalg;
pub mod parameter;
mod phase_equilibria;
pub mod si;
mod state;
pub use equation_of_state::{
    Components, EquationOfState, HelmholtzEnergy, HelmholtzEnergyDual, IdealGas, Residual,
};
pub use errors::{EosError, EosResult};
pub use phase_equilibria::{PhaseDiagram, PhaseEquilibrium, SolverOptions, Verbosity};
pub use state::{
    Contributions, DensityInitialization, Derivative, PartialDerivative, State, StateBuilder,
    StateHD, TPSpec,
};

/// Consistent conversions between quantities and reduced properties.
///
/// The reduced units are Kelvin for the temperature, Angstrom for lengths,
/// single molecules for amounts of substance and $k_\mathrm{B}\cdot\mathrm{K}$ for energies.
pub trait EosUnit {
    fn reference_temperature() -> SINumber;
    fn reference_length() -> SINumber;
    fn reference_density() -> SINumber;
    fn reference_time() -> SINumber;
    fn gas_constant() -> SINumber;
    fn reference_volume() -> SINumber {
        Self::reference_length().powi(3)
    }
    fn reference_velocity() -> SINumber {
        Self::reference_length() / Self::reference_time()
    }
    fn reference_moles() -> SINumber {
        Self::reference_density() * Self::reference_volume()
    }
    fn reference_mass() -> SINumber {
        Self::reference_energy() * Self::reference_velocity().powi(-2)
    }
    fn reference_energy() -> SINumber {
        Self::gas_constant() * Self::reference_temperature() * Self::reference_moles()
    }
    fn reference_pressure() -> SINumber {
        Self::reference_energy() / Self::reference_volume()
    }
    fn reference_entropy() -> SINumber {
        Self::reference_energy() / Self::reference_temperature()
    }
    fn reference_molar_energy() -> SINumber {
        Self::reference_energy() / Self::reference_moles()
    }
    fn reference_molar_entropy() -> SINumber {
        Self::reference_entropy() / Self::reference_moles()
    }
    fn reference_molar_mass() -> SINumber {
        Self::reference_mass() / Self::reference_moles()
    }
}

impl EosUnit for SIUnit {
    fn reference_temperature() -> SINumber {
        KELVIN
    }
    fn reference_length() -> SINumber {
        ANGSTROM
    }
    fn reference_density() -> SINumber {
        ANGSTROM.powi(-3) / NAV
    }
    fn reference_time() -> SINumber {
        PICO * SECOND
    }
    fn gas_constant() -> SINumber {
        RGAS
    }
}

#[cfg(test)]
mod tests {
    use crate::cubic::*;
    use crate::joback::{Joback, JobackParameters, JobackRecord};
    use crate::parameter::Parameter;
    use crate::si::*;
    use crate::{Contributions, EosResult, EosUnit, EquationOfState, StateBuilder};
    use approx::*;
    use std::sync::Arc;

    #[test]
    fn reference_units() {
        assert_relative_eq!(SIUnit::reference_moles(), NAV.powi(-1), max_relative = 1e-15);
        assert_relative_eq!(
            SIUnit::reference_energy(),
            KB * KELVIN,
            max_relative = 1e-14
        );
        assert_relative_eq!(
            SIUnit::reference_pressure(),
            KB * KELVIN / ANGSTROM.powi(3),
            max_relative = 1e-14
        );
        assert!(SIUnit::reference_molar_mass().has_unit(&(GRAM / MOL)));
    }

    #[test]
    fn validate_residual_properties() -> EosResult<()> {
        let parameters =
            PengRobinsonParameters::new_simple(&[369.96], &[4.25e6], &[0.153], &[44.0962])?;
        let residual = Arc::new(PengRobinson::new(Arc::new(parameters)));
        let joback = JobackParameters::from_model_records(vec![JobackRecord::new(
            1.0, 1.0, 1.0, 1.0, 1.0,
        )])?;
        let ideal_gas = Arc::new(Joback::new(Arc::new(joback)));
        let eos = Arc::new(EquationOfState::new(ideal_gas, residual.clone())?);

        let sr = StateBuilder::new(&residual)
            .temperature(300.0 * KELVIN)
            .pressure(1.0 * BAR)
            .build()?;

        let s = StateBuilder::new(&eos)
            .temperature(300.0 * KELVIN)
            .pressure(1.0 * BAR)
            .build()?;

        // pressure
        let c = Contributions::Total;
        assert_relative_eq!(s.pressure(c)?, sr.pressure(c)?, max_relative = 1e-14);
        assert_relative_eq!(
            s.pressure(Contributions::Residual)?,
            sr.pressure(Contributions::Residual)?,
            max_relative = 1e-14
        );
        assert_relative_eq!(s.compressibility(c)?, sr.compressibility(c)?, max_relative = 1e-14);

        // residual properties
        assert_relative_eq!(
            s.helmholtz_energy(Contributions::Residual)?,
            sr.residual_helmholtz_energy()?,
            max_relative = 1e-14
        );
        assert_relative_eq!(
            s.entropy(Contributions::Residual)?,
            sr.residual_entropy()?,
            max_relative = 1e-14
        );
        assert_relative_eq!(
            s.enthalpy(Contributions::Residual)?,
            sr.residual_enthalpy()?,
            max_relative = 1e-14
        );
        assert_relative_eq!(
            s.internal_energy(Contributions::Residual)?,
            sr.residual_internal_energy()?,
            max_relative = 1e-14
        );
        assert_relative_eq!(
            s.gibbs_energy(Contributions::ResidualNpt)?,
            sr.residual_gibbs_energy()?,
            max_relative = 1e-10
        );
        assert_relative_eq!(
            s.chemical_potential(Contributions::Residual)?,
            sr.residual_chemical_potential()?,
            max_relative = 1e-14
        );

        // pressure derivatives
        assert_relative_eq!(s.dp_dt(c)?, sr.dp_dt(c)?, max_relative = 1e-14);
        assert_relative_eq!(s.dp_dv(c)?, sr.dp_dv(c)?, max_relative = 1e-14);
        assert_relative_eq!(s.dp_drho(c)?, sr.dp_drho(c)?, max_relative = 1e-14);
        assert_relative_eq!(s.d2p_dv2(c)?, sr.d2p_dv2(c)?, max_relative = 1e-14);
        assert_relative_eq!(s.dp_dni(c)?, sr.dp_dni(c)?, max_relative = 1e-14);

        // entropy
        assert_relative_eq!(
            s.ds_dt(Contributions::Residual)?,
            sr.ds_res_dt()?,
            max_relative = 1e-14
        );

        // chemical potential
        assert_relative_eq!(
            s.dmu_dt(Contributions::Residual)?,
            sr.dmu_res_dt()?,
            max_relative = 1e-14
        );
        assert_relative_eq!(
            s.dmu_dni(Contributions::Residual)?,
            sr.dmu_res_dni()?,
            max_relative = 1e-14
        );

        // fugacity
        assert_relative_eq!(s.ln_phi()?, sr.ln_phi()?, max_relative = 1e-14);
        assert_relative_eq!(s.dln_phi_dt()?, sr.dln_phi_dt()?, max_relative = 1e-14);
        assert_relative_eq!(s.dln_phi_dp()?, sr.dln_phi_dp()?, max_relative = 1e-14);

        // residual properties using multiple derivatives
        assert_relative_eq!(
            s.molar_isochoric_heat_capacity(Contributions::Residual)?,
            sr.c_v_res()?,
            max_relative = 1e-14
        );
        assert_relative_eq!(
            s.dc_v_dt(Contributions::Residual)?,
            sr.dc_v_res_dt()?,
            max_relative = 1e-14
        );
        Ok(())
    }
}
