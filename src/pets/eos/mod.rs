use super::parameters::PetsParameters;
use crate::hard_sphere::HardSphere;
use helmos_core::si::{SIArray1, GRAM, MOL};
use helmos_core::{Components, HelmholtzEnergy, Residual};
use ndarray::{Array1, Zip};
use std::f64::consts::FRAC_PI_6;
use std::fmt;
use std::sync::Arc;

pub(crate) mod dispersion;
use dispersion::Dispersion;

/// Settings of the PeTS equation of state.
#[derive(Copy, Clone, Debug)]
pub struct PetsOptions {
    /// Packing fraction that liquid density iterations start from.
    pub max_packing_fraction: f64,
}

impl Default for PetsOptions {
    fn default() -> Self {
        Self {
            max_packing_fraction: 0.5,
        }
    }
}

/// PeTS equation of state.
///
/// Residual Helmholtz energy of the Lennard-Jones fluid truncated and shifted
/// at $2.5\sigma$, built from a hard-sphere reference and a dispersion term.
pub struct Pets {
    parameters: Arc<PetsParameters>,
    options: PetsOptions,
    contributions: Vec<Box<dyn HelmholtzEnergy>>,
}

impl Pets {
    pub fn new(parameters: Arc<PetsParameters>) -> Self {
        Self::with_options(parameters, PetsOptions::default())
    }

    pub fn with_options(parameters: Arc<PetsParameters>, options: PetsOptions) -> Self {
        let hard_sphere = HardSphere::new(&parameters);
        let dispersion = Dispersion {
            parameters: parameters.clone(),
        };
        Self {
            parameters,
            options,
            contributions: vec![Box::new(hard_sphere), Box::new(dispersion)],
        }
    }

    pub fn parameters(&self) -> &Arc<PetsParameters> {
        &self.parameters
    }
}

impl fmt::Display for Pets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeTS")
    }
}

impl Components for Pets {
    fn components(&self) -> usize {
        self.parameters.sigma.len()
    }

    fn subset(&self, component_list: &[usize]) -> Self {
        let parameters = self.parameters.select(component_list);
        Self::with_options(Arc::new(parameters), self.options)
    }
}

impl Residual for Pets {
    /// Number density at which the spheres of diameter $\sigma$ fill the
    /// maximum packing fraction.
    fn compute_max_density(&self, moles: &Array1<f64>) -> f64 {
        let sphere_volume = Zip::from(moles)
            .and(&self.parameters.sigma)
            .fold(0.0, |acc, &n, &s| acc + n * FRAC_PI_6 * s.powi(3));
        self.options.max_packing_fraction * moles.sum() / sphere_volume
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
    use crate::pets::parameters::utils::{
        argon_krypton_parameters, argon_parameters, krypton_parameters,
    };
    use approx::assert_relative_eq;
    use helmos_core::si::{BAR, KELVIN, METER, RGAS};
    use helmos_core::{
        Contributions, DensityInitialization, EosError, EosResult, HelmholtzEnergyDual,
        PhaseEquilibrium, State, StateHD,
    };
    use ndarray::arr1;

    #[test]
    fn hard_sphere_helmholtz_energy() -> EosResult<()> {
        let hs = HardSphere::new(&argon_parameters());
        let s = StateHD::new(250.0, 1000.0, arr1(&[1.0]));
        assert_relative_eq!(
            hs.helmholtz_energy(&s)?,
            0.07742058691407161,
            max_relative = 1e-10
        );
        Ok(())
    }

    #[test]
    fn hard_sphere_mix() -> EosResult<()> {
        let c1 = HardSphere::new(&argon_parameters());
        let c2 = HardSphere::new(&krypton_parameters());
        let c12 = HardSphere::new(&argon_krypton_parameters());
        let t = 250.0;
        let v = 2.5e28;
        let n = 1.0;
        let s = StateHD::new(t, v, arr1(&[n]));
        let a1 = c1.helmholtz_energy(&s)?;
        let a2 = c2.helmholtz_energy(&s)?;
        let s1m = StateHD::new(t, v, arr1(&[n, 0.0]));
        let a1m = c12.helmholtz_energy(&s1m)?;
        let s2m = StateHD::new(t, v, arr1(&[0.0, n]));
        let a2m = c12.helmholtz_energy(&s2m)?;
        assert_relative_eq!(a1, a1m, epsilon = 1e-14);
        assert_relative_eq!(a2, a2m, epsilon = 1e-14);
        Ok(())
    }

    #[test]
    fn overpacked_hard_spheres() {
        let hs = HardSphere::new(&argon_parameters());
        // packing fraction above 1
        let s = StateHD::new(250.0, 10.0, arr1(&[1.0]));
        assert!(matches!(hs.helmholtz_energy(&s), Err(EosError::Domain(_))));
    }

    #[test]
    fn ideal_gas_pressure() -> EosResult<()> {
        let e = Arc::new(Pets::new(argon_parameters()));
        let t = 200.0 * KELVIN;
        let v = 1e-3 * METER.powi(3);
        let n = arr1(&[1.0]) * MOL;
        let s = State::new_nvt(&e, t, v, &n)?;
        let p_ig = s.total_moles * RGAS * t / v;
        assert_relative_eq!(
            s.pressure(Contributions::IdealGas)?,
            p_ig,
            max_relative = 1e-10
        );
        assert_relative_eq!(
            s.pressure(Contributions::IdealGas)? + s.pressure(Contributions::Residual)?,
            s.pressure(Contributions::Total)?,
            max_relative = 1e-10
        );
        Ok(())
    }

    #[test]
    fn new_tpn() -> EosResult<()> {
        let e = Arc::new(Pets::new(argon_parameters()));
        let t = 300.0 * KELVIN;
        let p = BAR;
        let m = arr1(&[1.0]) * MOL;
        let s = State::new_npt(&e, t, p, &m, DensityInitialization::None)?;
        assert_relative_eq!(p, s.pressure(Contributions::Total)?, max_relative = 1e-8);
        Ok(())
    }

    #[test]
    fn vle_pure_t() -> EosResult<()> {
        let e = Arc::new(Pets::new(argon_parameters()));
        let vle = PhaseEquilibrium::pure(&e, 100.0 * KELVIN, None, Default::default())?;
        assert_relative_eq!(
            vle.vapor().pressure(Contributions::Total)?,
            vle.liquid().pressure(Contributions::Total)?,
            max_relative = 1e-6
        );
        assert!(vle.liquid().density > vle.vapor().density);
        Ok(())
    }

    #[test]
    fn critical_point() -> EosResult<()> {
        let e = Arc::new(Pets::new(argon_parameters()));
        let cp = State::critical_point(&e, None, Some(150.0 * KELVIN), Default::default())?;
        assert_relative_eq!(cp.temperature, 130.47 * KELVIN, max_relative = 1e-3);
        Ok(())
    }

    #[test]
    fn subset_and_molar_weight() -> EosResult<()> {
        let e = Pets::new(argon_krypton_parameters());
        let kr = e.subset(&[1]);
        assert_eq!(kr.components(), 1);
        assert_relative_eq!(kr.parameters().sigma[0], 3.63);
        let mw = kr
            .molar_weight()
            .ok_or_else(|| EosError::MissingCapability(String::from("molar weights")))?;
        assert_relative_eq!(mw.get(0), 83.798 * GRAM / MOL, max_relative = 1e-14);
        assert_eq!(e.to_string(), "PeTS");
        Ok(())
    }
}
