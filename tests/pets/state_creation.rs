use super::{argon, argon_eos, argon_krypton};
use approx::assert_relative_eq;
use helmos_core::si::*;
use helmos_core::{
    Contributions, DensityInitialization, EosError, SolverOptions, State, StateBuilder,
};
use ndarray::arr1;
use std::error::Error;

#[test]
fn density_round_trip() -> Result<(), Box<dyn Error>> {
    let eos = argon()?;
    let moles = arr1(&[1.0]) * MOL;
    let t = 100.0 * KELVIN;
    for (p, init) in [
        (BAR, DensityInitialization::Vapor),
        (50.0 * BAR, DensityInitialization::Liquid),
        (50.0 * BAR, DensityInitialization::None),
    ] {
        let state = State::new_npt(&eos, t, p, &moles, init)?;
        assert_relative_eq!(
            state.pressure(Contributions::Total)?,
            p,
            max_relative = 1e-8
        );
    }
    Ok(())
}

#[test]
fn liquid_and_vapor_roots() -> Result<(), Box<dyn Error>> {
    let eos = argon()?;
    let moles = arr1(&[1.0]) * MOL;
    let t = 100.0 * KELVIN;
    let p = 5.0 * BAR;
    let vapor = State::new_npt(&eos, t, p, &moles, DensityInitialization::Vapor)?;
    let liquid = State::new_npt(&eos, t, p, &moles, DensityInitialization::Liquid)?;
    assert!(liquid.density > 10.0 * vapor.density);
    // both roots are mechanically stable
    for state in [&vapor, &liquid] {
        let dp_drho = state.dp_drho(Contributions::Total)? * state.density / p;
        assert!(dp_drho.into_value()? > 0.0);
    }
    Ok(())
}

#[test]
fn builder_temperature_volume() -> Result<(), Box<dyn Error>> {
    let eos = argon()?;
    let volume = 1.5e-3 * METER.powi(3);
    let state = StateBuilder::new(&eos)
        .temperature(300.0 * KELVIN)
        .volume(volume)
        .total_moles(MOL)
        .build()?;
    assert_relative_eq!(state.volume, volume, max_relative = 1e-14);
    assert_relative_eq!(state.density, MOL / volume, max_relative = 1e-14);
    Ok(())
}

#[test]
fn builder_temperature_pressure_mixture() -> Result<(), Box<dyn Error>> {
    let eos = argon_krypton()?;
    let molefracs = arr1(&[0.3, 0.7]);
    let state = StateBuilder::new(&eos)
        .temperature(250.0 * KELVIN)
        .pressure(20.0 * BAR)
        .molefracs(&molefracs)
        .build()?;
    assert_relative_eq!(
        state.pressure(Contributions::Total)?,
        20.0 * BAR,
        max_relative = 1e-8
    );
    assert_relative_eq!(state.molefracs, molefracs, max_relative = 1e-14);
    Ok(())
}

#[test]
fn enthalpy_and_entropy_specifications() -> Result<(), Box<dyn Error>> {
    let eos = argon_eos()?;
    let moles = arr1(&[1.0]) * MOL;
    let t = 150.0 * KELVIN;
    let p = 20.0 * BAR;
    let state = State::new_npt(&eos, t, p, &moles, DensityInitialization::None)?;
    let h = state.molar_enthalpy(Contributions::Total)?;
    let s = state.molar_entropy(Contributions::Total)?;
    let u = state.molar_internal_energy(Contributions::Total)?;
    let options = SolverOptions::default();

    let state_ph = State::new_nph(
        &eos,
        p,
        h,
        &moles,
        DensityInitialization::None,
        Some(170.0 * KELVIN),
        options,
    )?;
    assert_relative_eq!(state_ph.temperature, t, max_relative = 1e-6);

    let state_ps = State::new_nps(
        &eos,
        p,
        s,
        &moles,
        DensityInitialization::None,
        Some(170.0 * KELVIN),
        options,
    )?;
    assert_relative_eq!(state_ps.temperature, t, max_relative = 1e-6);

    let state_th = State::new_nth(&eos, t, h, &moles, DensityInitialization::Vapor, options)?;
    assert_relative_eq!(state_th.density, state.density, max_relative = 1e-6);

    let state_vu = State::new_nvu(&eos, state.volume, u, &moles, Some(170.0 * KELVIN), options)?;
    assert_relative_eq!(state_vu.temperature, t, max_relative = 1e-6);
    Ok(())
}

#[test]
fn builder_enthalpy_iteration_limit() -> Result<(), Box<dyn Error>> {
    let eos = argon_eos()?;
    let moles = arr1(&[1.0]) * MOL;
    let p = 20.0 * BAR;
    let state = State::new_npt(&eos, 150.0 * KELVIN, p, &moles, DensityInitialization::None)?;
    let h = state.molar_enthalpy(Contributions::Total)?;

    let builder = StateBuilder::new(&eos)
        .pressure(p)
        .moles(&moles)
        .molar_enthalpy(h)
        .initial_temperature(170.0 * KELVIN);
    let limited = builder
        .clone()
        .solver_options(SolverOptions::default().max_iter(1))
        .build();
    assert!(matches!(limited, Err(EosError::NotConverged(_))));

    let state_ph = builder.build()?;
    assert_relative_eq!(state_ph.temperature, 150.0 * KELVIN, max_relative = 1e-6);
    Ok(())
}
