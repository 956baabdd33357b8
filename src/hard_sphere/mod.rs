//! Generic implementation of the hard-sphere contribution
//! that can be used across models.
use helmos_core::dual::{DualError, DualNum};
use helmos_core::{EosResult, HelmholtzEnergyDual, StateHD};
use ndarray::{Array1, Zip};
use std::f64::consts::{FRAC_PI_6, PI};
use std::fmt;
use std::sync::Arc;

/// Temperature dependent diameters of hard spheres.
///
/// Only `hs_diameter` has to be provided. The moments of the diameter
/// distribution used by the BMCSL expression follow from it.
pub trait HardSphereProperties {
    /// Hard-sphere diameter of every component in Angstrom.
    fn hs_diameter<D: DualNum>(&self, temperature: D) -> Result<Array1<D>, DualError>;

    /// Packing fractions $\zeta_k=\frac{\pi}{6}\sum_i\rho_i d_i^k$ for every requested `k`.
    fn zeta<D: DualNum, const N: usize>(
        &self,
        temperature: D,
        partial_density: &Array1<D>,
        k: [i32; N],
    ) -> Result<[D; N], DualError> {
        let diameter = self.hs_diameter(temperature)?;
        Ok(k.map(|k| {
            Zip::from(partial_density)
                .and(&diameter)
                .fold(D::zero(), |acc, &rho, &d| acc + rho * d.powi(k))
                * FRAC_PI_6
        }))
    }

    /// $\frac{\zeta_2}{\zeta_3}$ from mole fractions, which stays finite at zero density.
    fn zeta_23<D: DualNum>(&self, temperature: D, molefracs: &Array1<D>) -> Result<D, DualError> {
        let diameter = self.hs_diameter(temperature)?;
        let moment = |k: i32| {
            Zip::from(molefracs)
                .and(&diameter)
                .fold(D::zero(), |acc, &x, &d| acc + x * d.powi(k))
        };
        moment(2).checked_div(moment(3))
    }
}

/// Implementation of the BMCSL equation of state for hard-sphere mixtures.
///
/// The reduced Helmholtz energy of the Boublík-Mansoori-Carnahan-Starling-Leland
/// equation of state is
/// $$\frac{\beta A}{V}=\frac{6}{\pi}\left(\frac{3\zeta_1\zeta_2}{1-\zeta_3}+\frac{\zeta_2^3}{\zeta_3\left(1-\zeta_3\right)^2}+\left(\frac{\zeta_2^3}{\zeta_3^2}-\zeta_0\right)\ln\left(1-\zeta_3\right)\right)$$
/// with the packing fractions
/// $$\zeta_k=\frac{\pi}{6}\sum_i\rho_i d_i^k,~~~~~~~~k=0\ldots 3.$$
///
/// Packing fractions $\zeta_3\geq 1$ are outside of the domain of the
/// logarithm and result in an error.
pub struct HardSphere<P> {
    parameters: Arc<P>,
}

impl<P> HardSphere<P> {
    pub fn new(parameters: &Arc<P>) -> Self {
        Self {
            parameters: parameters.clone(),
        }
    }
}

impl<D: DualNum, P: HardSphereProperties> HelmholtzEnergyDual<D> for HardSphere<P> {
    fn helmholtz_energy(&self, state: &StateHD<D>) -> EosResult<D> {
        let p = &self.parameters;
        let [z0, z1, z2, z3] = p.zeta(state.temperature, &state.partial_density, [0, 1, 2, 3])?;
        let frac_1mz3 = (-z3 + 1.0).checked_recip()?;
        let zeta_23 = p.zeta_23(state.temperature, &state.molefracs)?;
        Ok(state.volume * 6.0 / PI
            * (z1 * z2 * frac_1mz3 * 3.0
                + z2.powi(2) * frac_1mz3.powi(2) * zeta_23
                + (z2 * zeta_23.powi(2) - z0) * (-z3).checked_ln_1p()?))
    }
}

impl<P> fmt::Display for HardSphere<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hard Sphere")
    }
}
