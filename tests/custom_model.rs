//! A van der Waals fluid implemented outside of the library that
//! counts the evaluations of its Helmholtz energy.
use approx::assert_relative_eq;
use helmos_core::dual::DualNum;
use helmos_core::si::*;
use helmos_core::{
    Components, Contributions, EosError, EosResult, HelmholtzEnergy, HelmholtzEnergyDual,
    Residual, State, StateHD,
};
use ndarray::{arr1, Array1};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone)]
struct VdwContribution {
    /// attraction parameter in K·Å³
    a: f64,
    /// co-volume in Å³
    b: f64,
    calls: Arc<AtomicUsize>,
}

impl<D: DualNum> HelmholtzEnergyDual<D> for VdwContribution {
    fn helmholtz_energy(&self, state: &StateHD<D>) -> EosResult<D> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let n = state.moles.iter().copied().sum::<D>();
        let v = state.volume;
        let repulsion = (-(n * self.b) / v + 1.0).checked_ln()?;
        Ok(-n * repulsion - n * n * self.a / (v * state.temperature))
    }
}

impl fmt::Display for VdwContribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "van der Waals")
    }
}

struct CountingVdw {
    contribution: VdwContribution,
    contributions: Vec<Box<dyn HelmholtzEnergy>>,
}

impl CountingVdw {
    fn new(a: f64, b: f64) -> Self {
        let contribution = VdwContribution {
            a,
            b,
            calls: Arc::new(AtomicUsize::new(0)),
        };
        Self {
            contributions: vec![Box::new(contribution.clone())],
            contribution,
        }
    }

    fn calls(&self) -> usize {
        self.contribution.calls.load(Ordering::Relaxed)
    }
}

impl Components for CountingVdw {
    fn components(&self) -> usize {
        1
    }

    fn subset(&self, _: &[usize]) -> Self {
        Self::new(self.contribution.a, self.contribution.b)
    }
}

impl Residual for CountingVdw {
    fn compute_max_density(&self, moles: &Array1<f64>) -> f64 {
        0.9 * moles.sum() / (self.contribution.b * moles.sum())
    }

    fn contributions(&self) -> &[Box<dyn HelmholtzEnergy>] {
        &self.contributions
    }
}

fn argon_vdw() -> Arc<CountingVdw> {
    Arc::new(CountingVdw::new(27000.0, 53.0))
}

#[test]
fn cached_derivatives() -> EosResult<()> {
    let eos = argon_vdw();
    let moles = arr1(&[1.0]) * MOL;
    let state = State::new_nvt(&eos, 300.0 * KELVIN, 1e-3 * METER.powi(3), &moles)?;
    let c = Contributions::Residual;

    let calls = eos.calls();
    let p = state.pressure(c)?;
    let after_first = eos.calls();
    assert!(after_first > calls);

    // repeated requests are served from the cache
    assert_eq!(state.pressure(c)?, p);
    assert_eq!(eos.calls(), after_first);

    // second derivatives are evaluated once and contain the first derivative
    let dp_dv = state.dp_dv(c)?;
    let after_second = eos.calls();
    assert!(after_second > after_first);
    assert_eq!(state.dp_dv(c)?, dp_dv);
    assert_eq!(state.pressure(c)?, p);
    assert_eq!(eos.calls(), after_second);
    Ok(())
}

#[test]
fn van_der_waals_pressure() -> EosResult<()> {
    let eos = argon_vdw();
    let moles = arr1(&[1.0]) * MOL;
    let t = 300.0 * KELVIN;
    let v = 1e-3 * METER.powi(3);
    let state = State::new_nvt(&eos, t, v, &moles)?;
    // p = NkT / (V - Nb) - a N^2 / V^2 in reduced units
    let n = (moles.sum() * NAV).into_value()?;
    let v_r = v.to_reduced(ANGSTROM.powi(3))?;
    let p = n * 300.0 / (v_r - n * 53.0) - 27000.0 * n * n / (v_r * v_r);
    assert_relative_eq!(
        state.pressure(Contributions::Total)?,
        p * KB * KELVIN / ANGSTROM.powi(3),
        max_relative = 1e-10
    );
    Ok(())
}

#[test]
fn missing_molar_weight() -> EosResult<()> {
    let eos = argon_vdw();
    let state = State::new_nvt(
        &eos,
        300.0 * KELVIN,
        1e-3 * METER.powi(3),
        &(arr1(&[1.0]) * MOL),
    )?;
    assert!(eos.molar_weight().is_none());
    assert!(matches!(
        state.mass_density(),
        Err(EosError::MissingCapability(_))
    ));
    assert!(matches!(
        state.total_mass(),
        Err(EosError::MissingCapability(_))
    ));
    Ok(())
}

#[test]
fn volume_below_covolume() -> EosResult<()> {
    let eos = argon_vdw();
    let moles = arr1(&[1.0]) * MOL;
    // 1 mol in 10 cm³ is denser than 1 / b
    let state = State::new_nvt(&eos, 300.0 * KELVIN, 1e-5 * METER.powi(3), &moles)?;
    assert!(matches!(
        state.pressure(Contributions::Total),
        Err(EosError::Domain(_))
    ));
    assert!(matches!(
        state.residual_helmholtz_energy(),
        Err(EosError::Domain(_))
    ));
    Ok(())
}
