use super::{argon, argon_eos, argon_krypton};
use approx::assert_relative_eq;
use helmos_core::si::*;
use helmos_core::{
    Contributions, DensityInitialization, PhaseDiagram, PhaseEquilibrium, SolverOptions, State,
    Verbosity,
};
use ndarray::arr1;
use std::error::Error;
use tracing_subscriber::filter::LevelFilter;

#[test]
fn vle_pure_temperature() -> Result<(), Box<dyn Error>> {
    let eos = argon_eos()?;
    let t = 100.0 * KELVIN;
    let vle = PhaseEquilibrium::pure(&eos, t, None, SolverOptions::default())?;
    let (vapor, liquid) = (vle.vapor(), vle.liquid());
    assert_relative_eq!(vapor.temperature, t, max_relative = 1e-14);
    assert_relative_eq!(
        vapor.pressure(Contributions::Total)?,
        liquid.pressure(Contributions::Total)?,
        max_relative = 1e-6
    );
    assert_relative_eq!(
        vapor.chemical_potential(Contributions::Total)?,
        liquid.chemical_potential(Contributions::Total)?,
        max_relative = 1e-6
    );
    assert!(liquid.density > vapor.density);

    let p_sat = PhaseEquilibrium::vapor_pressure(&eos, t);
    assert_eq!(p_sat.len(), 1);
    let p_sat = p_sat[0].ok_or("no vapor pressure")?;
    assert_relative_eq!(p_sat, vapor.pressure(Contributions::Total)?, max_relative = 1e-6);
    Ok(())
}

#[test]
fn critical_point() -> Result<(), Box<dyn Error>> {
    let eos = argon()?;
    let cp = State::critical_point(&eos, None, Some(150.0 * KELVIN), SolverOptions::default())?;
    let c = Contributions::Total;
    let p = cp.pressure(c)?;
    // both derivatives vanish in reduced form
    let dp_dv = (cp.dp_dv(c)? * cp.volume / p).into_value()?;
    let d2p_dv2 = (cp.d2p_dv2(c)? * cp.volume * cp.volume / p).into_value()?;
    assert!(dp_dv.abs() < 1e-6);
    assert!(d2p_dv2.abs() < 1e-4);
    assert_relative_eq!(cp.temperature, 130.47 * KELVIN, max_relative = 1e-3);

    // no vapor-liquid equilibrium above the critical temperature
    let t = cp.temperature * 1.05;
    assert!(PhaseEquilibrium::pure(&eos, t, None, SolverOptions::default()).is_err());
    Ok(())
}

#[test]
fn phase_diagram() -> Result<(), Box<dyn Error>> {
    let eos = argon()?;
    let npoints = 10;
    let diagram = PhaseDiagram::pure(
        &eos,
        90.0 * KELVIN,
        npoints,
        Some(150.0 * KELVIN),
        SolverOptions::default(),
    )?;
    assert_eq!(diagram.states.len(), npoints);
    let pressures = diagram
        .vapor()
        .iter()
        .map(|s| s.pressure(Contributions::Total))
        .collect::<Result<Vec<_>, _>>()?;
    assert!(pressures.windows(2).all(|p| p[0] < p[1]));
    for (v, l) in diagram.vapor().iter().zip(diagram.liquid()) {
        assert!(v.density <= l.density);
    }
    Ok(())
}

#[cfg(feature = "rayon")]
#[test]
fn parallel_phase_diagram() -> Result<(), Box<dyn Error>> {
    let eos = argon()?;
    let t_min = 90.0 * KELVIN;
    let t_c = Some(150.0 * KELVIN);
    let options = SolverOptions::default();
    let serial = PhaseDiagram::pure(&eos, t_min, 12, t_c, options)?;
    let thread_pool = rayon::ThreadPoolBuilder::new().num_threads(3).build()?;
    let parallel = PhaseDiagram::par_pure(&eos, t_min, 12, 4, thread_pool, t_c, options)?;
    assert_eq!(serial.states.len(), parallel.states.len());
    for (s, p) in serial.liquid().iter().zip(parallel.liquid()) {
        assert_relative_eq!(s.density, p.density, max_relative = 1e-6);
    }
    Ok(())
}

#[test]
fn stability_of_pure_states() -> Result<(), Box<dyn Error>> {
    let eos = argon()?;
    let moles = arr1(&[1.0]) * MOL;
    let options = SolverOptions::default();
    let gas = State::new_npt(&eos, 300.0 * KELVIN, BAR, &moles, DensityInitialization::None)?;
    assert!(gas.is_stable(options)?);

    // vapor compressed above the vapor pressure
    let t = 100.0 * KELVIN;
    let p_sat = PhaseEquilibrium::pure(&eos, t, None, options)?
        .vapor()
        .pressure(Contributions::Total)?;
    let vapor = State::new_npt(&eos, t, p_sat * 1.1, &moles, DensityInitialization::Vapor)?;
    assert!(!vapor.is_stable(options)?);
    Ok(())
}

#[test]
fn tp_flash_argon_krypton() -> Result<(), Box<dyn Error>> {
    let eos = argon_krypton()?;
    let t = 120.0 * KELVIN;
    let p = 10.0 * BAR;
    let feed = arr1(&[0.5, 0.5]) * MOL;
    let options = SolverOptions::default();
    let state = State::new_npt(&eos, t, p, &feed, DensityInitialization::Liquid)?;
    assert!(!state.is_stable(options)?);

    let vle = PhaseEquilibrium::tp_flash(&eos, t, p, &feed, None, options, None)?;
    let (vapor, liquid) = (vle.vapor(), vle.liquid());
    assert_relative_eq!(vapor.pressure(Contributions::Total)?, p, max_relative = 1e-6);
    assert_relative_eq!(liquid.pressure(Contributions::Total)?, p, max_relative = 1e-6);

    // mass balance
    let total = (&vapor.moles + &liquid.moles).to_reduced(MOL)?;
    assert_relative_eq!(total, arr1(&[0.5, 0.5]), max_relative = 1e-8);

    // equal fugacities
    let ln_f_v = vapor.molefracs.mapv(f64::ln) + vapor.ln_phi()?;
    let ln_f_l = liquid.molefracs.mapv(f64::ln) + liquid.ln_phi()?;
    assert_relative_eq!(ln_f_v, ln_f_l, epsilon = 1e-6);

    // argon is the more volatile component
    assert!(vapor.molefracs[0] > 0.5);
    assert!(liquid.molefracs[0] < 0.5);
    Ok(())
}

#[test]
fn iteration_output() -> Result<(), Box<dyn Error>> {
    // output is only visible with `cargo test -- --nocapture`
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
    let eos = argon()?;
    let options = SolverOptions::default().verbosity(Verbosity::Iter);
    let vle = PhaseEquilibrium::pure(&eos, 110.0 * KELVIN, None, options)?;
    let cp = State::critical_point(&eos, None, Some(150.0 * KELVIN), options)?;
    assert!(vle.vapor().temperature < cp.temperature);
    Ok(())
}
