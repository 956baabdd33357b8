use super::{argon, argon_eos, argon_krypton, monatomic_ideal_gas, ArgonEos};
use approx::assert_relative_eq;
use helmos::pets::Pets;
use helmos_core::si::*;
use helmos_core::{
    Components, Contributions, DensityInitialization, EquationOfState, PhaseEquilibrium,
    Residual, State,
};
use ndarray::arr1;
use std::error::Error;
use std::sync::Arc;

fn liquid_argon() -> Result<State<ArgonEos>, Box<dyn Error>> {
    let eos = argon_eos()?;
    Ok(State::new_npt(
        &eos,
        100.0 * KELVIN,
        50.0 * BAR,
        &(arr1(&[1.0]) * MOL),
        DensityInitialization::Liquid,
    )?)
}

#[test]
fn contributions_are_additive() -> Result<(), Box<dyn Error>> {
    let s = liquid_argon()?;
    let (ig, res, tot) = (
        Contributions::IdealGas,
        Contributions::Residual,
        Contributions::Total,
    );
    assert_relative_eq!(
        s.pressure(ig)? + s.pressure(res)?,
        s.pressure(tot)?,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        s.helmholtz_energy(ig)? + s.helmholtz_energy(res)?,
        s.helmholtz_energy(tot)?,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        s.entropy(ig)? + s.entropy(res)?,
        s.entropy(tot)?,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        s.internal_energy(ig)? + s.internal_energy(res)?,
        s.internal_energy(tot)?,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        s.enthalpy(ig)? + s.enthalpy(res)?,
        s.enthalpy(tot)?,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        s.molar_isochoric_heat_capacity(ig)? + s.molar_isochoric_heat_capacity(res)?,
        s.molar_isochoric_heat_capacity(tot)?,
        max_relative = 1e-12
    );
    assert_relative_eq!(
        s.chemical_potential(ig)? + s.chemical_potential(res)?,
        s.chemical_potential(tot)?,
        max_relative = 1e-12
    );
    Ok(())
}

#[test]
fn residual_contributions() -> Result<(), Box<dyn Error>> {
    let s = liquid_argon()?;
    let contributions = s.residual_helmholtz_energy_contributions()?;
    let names: Vec<_> = contributions.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["Hard Sphere", "Dispersion"]);
    let sum = contributions
        .iter()
        .fold(0.0 * JOULE, |acc, (_, a)| acc + a);
    assert_relative_eq!(sum, s.residual_helmholtz_energy()?, max_relative = 1e-12);
    assert_relative_eq!(
        s.helmholtz_energy(Contributions::Residual)?,
        s.residual_helmholtz_energy()?,
        max_relative = 1e-12
    );
    Ok(())
}

#[test]
fn monatomic_heat_capacities() -> Result<(), Box<dyn Error>> {
    let s = liquid_argon()?;
    assert_relative_eq!(
        s.molar_isobaric_heat_capacity(Contributions::IdealGas)?,
        20.786 * JOULE / MOL / KELVIN,
        max_relative = 1e-10
    );
    assert_relative_eq!(
        s.molar_isochoric_heat_capacity(Contributions::IdealGas)?,
        20.786 * JOULE / MOL / KELVIN - RGAS,
        max_relative = 1e-10
    );
    // positive residual heat capacity of the liquid
    let c_p = s.molar_isobaric_heat_capacity(Contributions::Total)?;
    assert!(c_p > 20.786 * JOULE / MOL / KELVIN);
    Ok(())
}

#[test]
fn thermodynamic_consistency() -> Result<(), Box<dyn Error>> {
    let s = liquid_argon()?;
    let c = Contributions::Total;
    // G = H - TS = sum_i N_i mu_i
    let g = s.gibbs_energy(c)?;
    assert_relative_eq!(
        g,
        s.enthalpy(c)? - s.temperature * s.entropy(c)?,
        max_relative = 1e-10
    );
    assert_relative_eq!(
        g,
        (s.chemical_potential(c)? * &s.moles).sum(),
        max_relative = 1e-10
    );
    // speed of sound from the isentropic compressibility
    let w = s.speed_of_sound()?;
    let kappa_s = s.isentropic_compressibility()?;
    assert_relative_eq!(
        (w * w * kappa_s * s.mass_density()?).into_value()?,
        1.0,
        max_relative = 1e-10
    );
    Ok(())
}

#[test]
fn mass_properties() -> Result<(), Box<dyn Error>> {
    let eos = argon_krypton()?;
    let moles = arr1(&[1.0, 3.0]) * MOL;
    let s = State::new_nvt(&eos, 300.0 * KELVIN, METER.powi(3), &moles)?;
    let mw = arr1(&[39.948, 83.798]);
    let mass = (&mw * &arr1(&[1.0, 3.0])).sum() * GRAM;
    assert_relative_eq!(s.total_mass()?, mass, max_relative = 1e-14);
    assert_relative_eq!(s.mass_density()?, mass / METER.powi(3), max_relative = 1e-14);
    let w = s.massfracs()?;
    assert_relative_eq!(w.sum(), 1.0, max_relative = 1e-14);
    assert_relative_eq!(w[0], 39.948 / 291.342, max_relative = 1e-12);
    Ok(())
}

#[test]
fn subset_of_mixture() -> Result<(), Box<dyn Error>> {
    let mixture = argon_krypton()?;
    let argon_from_mixture = Arc::new(mixture.subset(&[0]));
    let t = 200.0 * KELVIN;
    let rho = 5.0 * KILO * MOL / METER.powi(3);
    let s1 = State::new_pure(&argon()?, t, rho)?;
    let s2 = State::new_pure(&argon_from_mixture, t, rho)?;
    assert_relative_eq!(
        s1.pressure(Contributions::Total)?,
        s2.pressure(Contributions::Total)?,
        max_relative = 1e-14
    );
    Ok(())
}

#[test]
fn incompatible_component_numbers() -> Result<(), Box<dyn Error>> {
    let eos = EquationOfState::new(monatomic_ideal_gas(1)?, argon_krypton()?);
    assert!(eos.is_err());
    Ok(())
}

#[test]
fn models_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Pets>();
    assert_send_sync::<State<ArgonEos>>();
    assert_send_sync::<PhaseEquilibrium<ArgonEos, 2>>();
}

#[test]
fn max_density() -> Result<(), Box<dyn Error>> {
    let eos = argon()?;
    let rho_max = eos.max_density(None)?;
    let s = liquid_argon()?;
    assert!(s.density < rho_max);
    Ok(())
}
