use crate::hard_sphere::HardSphereProperties;
use crate::pets::parameters::PetsParameters;
use helmos_core::dual::DualNum;
use helmos_core::{EosResult, HelmholtzEnergyDual, StateHD};
use ndarray::{Array1, Zip};
use std::f64::consts::{FRAC_PI_3, PI};
use std::fmt;
use std::sync::Arc;

/// Coefficients of the first order integral $I_1(\eta)$.
const A: [f64; 7] = [
    0.690603404,
    1.189317012,
    1.265604153,
    -24.34554201,
    93.67300357,
    -157.8773415,
    96.93736697,
];
/// Coefficients of the second order integral $I_2(\eta)$.
const B: [f64; 7] = [
    0.664852128,
    2.10733079,
    -9.597951213,
    -17.37871193,
    30.17506222,
    209.3942909,
    -353.2743581,
];

/// Evaluate $\sum_k c_k\eta^k$.
fn power_series<D: DualNum>(coefficients: &[f64; 7], eta: D) -> D {
    coefficients
        .iter()
        .rev()
        .fold(D::zero(), |acc, &c| acc * eta + c)
}

/// Barker-Henderson second order perturbation term of the PeTS model.
#[derive(Debug, Clone)]
pub struct Dispersion {
    pub parameters: Arc<PetsParameters>,
}

impl Dispersion {
    /// First and second order mixing sums
    /// $\sum_{ij}\rho_i\rho_j\left(\frac{\varepsilon_{ij}}{kT}\right)^k\sigma_{ij}^3$.
    fn mixing_sums<D: DualNum>(&self, inverse_temperature: D, density: &Array1<D>) -> (D, D) {
        let p = &self.parameters;
        let mut first = D::zero();
        let mut second = D::zero();
        for ((i, j), &eps_k) in p.epsilon_k_ij.indexed_iter() {
            let eps = inverse_temperature * eps_k;
            let weight = density[i] * density[j] * p.sigma_ij[(i, j)].powi(3);
            first += weight * eps;
            second += weight * eps * eps;
        }
        (first, second)
    }
}

impl<D: DualNum> HelmholtzEnergyDual<D> for Dispersion {
    fn helmholtz_energy(&self, state: &StateHD<D>) -> EosResult<D> {
        let inverse_temperature = state.temperature.checked_recip()?;
        let radius = self.parameters.hs_diameter(state.temperature)? * 0.5;
        let eta = Zip::from(&state.partial_density)
            .and(&radius)
            .fold(D::zero(), |acc, &rho, &r| acc + rho * r.powi(3))
            * (4.0 * FRAC_PI_3);
        let (rho1mix, rho2mix) = self.mixing_sums(inverse_temperature, &state.partial_density);

        // compressibility term of the hard-sphere fluid
        let c1 = ((eta * 8.0 - eta * eta * 2.0).checked_div((eta - 1.0).powi(4))? + 1.0)
            .checked_recip()?;
        let i1 = power_series(&A, eta);
        let i2 = power_series(&B, eta);
        Ok(-(rho1mix * i1 * 2.0 + rho2mix * c1 * i2) * PI * state.volume)
    }
}

impl fmt::Display for Dispersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dispersion")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pets::parameters::utils::{
        argon_krypton_parameters, argon_parameters, krypton_parameters,
    };
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn helmholtz_energy() -> EosResult<()> {
        let disp = Dispersion {
            parameters: argon_parameters(),
        };
        let s = StateHD::new(250.0, 1000.0, arr1(&[1.0]));
        let a = disp.helmholtz_energy(&s)?;
        assert_relative_eq!(a, -0.10197288299545795, max_relative = 1e-10);

        let s = StateHD::new(0.0, 1000.0, arr1(&[1.0]));
        assert!(matches!(
            disp.helmholtz_energy(&s),
            Err(helmos_core::EosError::Domain(_))
        ));
        Ok(())
    }

    #[test]
    fn power_series_matches_direct_sum() {
        let eta = 0.3;
        let direct: f64 = A.iter().enumerate().map(|(k, a)| a * eta.powi(k as i32)).sum();
        assert_relative_eq!(power_series(&A, eta), direct, max_relative = 1e-14);
    }

    #[test]
    fn mix() -> EosResult<()> {
        let c1 = Dispersion {
            parameters: argon_parameters(),
        };
        let c2 = Dispersion {
            parameters: krypton_parameters(),
        };
        let c12 = Dispersion {
            parameters: argon_krypton_parameters(),
        };
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
}
