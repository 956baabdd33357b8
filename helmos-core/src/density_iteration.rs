use crate::equation_of_state::Residual;
use crate::errors::{EosError, EosResult};
use crate::si::{SIArray1, SINumber, SIUnit};
use crate::state::State;
use crate::{log_iter, log_result, EosUnit, SolverOptions};
use ndarray::Array1;
use std::sync::Arc;

/// Pressure and its density derivative in reduced units.
fn p_dpdrho<E: Residual>(
    eos: &Arc<E>,
    temperature: f64,
    density: f64,
    moles: &Array1<f64>,
) -> EosResult<(f64, f64, State<E>)> {
    let state = State::new_nvt_reduced(eos, temperature, moles.sum() / density, moles.clone())?;
    let (p, dp_drho) = state.p_dpdrho()?;
    Ok((
        p.to_reduced(SIUnit::reference_pressure())?,
        dp_drho.to_reduced(SIUnit::reference_pressure() / SIUnit::reference_density())?,
        state,
    ))
}

/// Pressure and its first and second density derivatives in reduced units.
fn d2pdrho2<E: Residual>(
    eos: &Arc<E>,
    temperature: f64,
    density: f64,
    moles: &Array1<f64>,
) -> EosResult<(f64, f64, f64)> {
    let state = State::new_nvt_reduced(eos, temperature, moles.sum() / density, moles.clone())?;
    let (p, dp_drho, d2p_drho2) = state.d2pdrho2()?;
    let p_ref = SIUnit::reference_pressure();
    let rho_ref = SIUnit::reference_density();
    Ok((
        p.to_reduced(p_ref)?,
        dp_drho.to_reduced(p_ref / rho_ref)?,
        d2p_drho2.to_reduced(p_ref / rho_ref.powi(2))?,
    ))
}

/// Find the density at which the given pressure is reached at
/// fixed temperature and mole numbers.
///
/// Newton iteration on the density that is restarted close to a
/// spinodal if it enters the mechanically unstable region.
pub fn density_iteration<E: Residual>(
    eos: &Arc<E>,
    temperature: SINumber,
    pressure: SINumber,
    moles: &SIArray1,
    initial_density: SINumber,
    options: SolverOptions,
) -> EosResult<State<E>> {
    let (maxiter, tol, verbosity) = options.unwrap_or(50, 1e-12);
    let t = temperature.to_reduced(SIUnit::reference_temperature())?;
    let pressure = pressure.to_reduced(SIUnit::reference_pressure())?;
    let moles = eos
        .validate_moles(Some(moles))?
        .to_reduced(SIUnit::reference_moles())?;
    let initial_density = initial_density.to_reduced(SIUnit::reference_density())?;
    let maxdensity = eos.compute_max_density(&moles);

    if !initial_density.is_finite() || initial_density <= 0.0 {
        return Err(EosError::InvalidState(
            String::from("density iteration"),
            String::from("density"),
            initial_density,
        ));
    }
    // restarts from a state with a different composition can lie above the
    // maximum density of the current one
    let initial_density = initial_density.min(maxdensity);
    let mut rho = initial_density;

    log_iter!(verbosity, " iter |    residual    |   density   ");
    for k in 0..maxiter {
        let (mut p, mut dp_drho, _) = p_dpdrho(eos, t, rho, &moles)?;

        // attempt to correct for poor initial density
        if dp_drho.is_sign_negative() && k == 0 {
            rho = if initial_density <= 0.15 * maxdensity {
                0.05 * initial_density
            } else {
                (1.1 * initial_density).min(maxdensity)
            };
            (p, dp_drho, _) = p_dpdrho(eos, t, rho, &moles)?;
        }

        let mut error = p - pressure;

        let mut delta_rho = -error / dp_drho;
        if delta_rho.abs() > 0.075 * maxdensity {
            delta_rho = 0.075 * maxdensity * delta_rho.signum();
        };
        // prevent stepping to rho < 0.0
        delta_rho = delta_rho.max(-0.95 * rho);

        // correction for instable region
        if dp_drho.is_sign_negative() {
            let (_, _, d2p_drho2) = d2pdrho2(eos, t, rho, &moles)?;

            if rho > 0.85 * maxdensity {
                let (sp_p, sp_rho) = pressure_spinodal(eos, t, initial_density, &moles)?;
                rho = sp_rho;
                error = sp_p - pressure;
                if rho > 0.85 * maxdensity {
                    if error.is_sign_negative() {
                        return Err(EosError::IterationFailed(String::from(
                            "density_iteration",
                        )));
                    } else {
                        rho *= 0.98
                    }
                } else if error.is_sign_positive() {
                    rho = 0.001 * maxdensity
                } else {
                    rho = (rho * 1.1).min(maxdensity)
                }
            } else if error.is_sign_positive() && d2p_drho2.is_sign_positive() {
                let (sp_p, sp_rho) = pressure_spinodal(eos, t, initial_density, &moles)?;
                rho = sp_rho;
                error = sp_p - pressure;
                if error.is_sign_positive() {
                    rho = 0.001 * maxdensity
                } else {
                    rho = (rho * 1.1).min(maxdensity)
                }
            } else if error.is_sign_negative() && d2p_drho2.is_sign_negative() {
                let (sp_p, sp_rho) = pressure_spinodal(eos, t, initial_density, &moles)?;
                rho = sp_rho;
                error = sp_p - pressure;
                if error.is_sign_negative() {
                    rho = 0.8 * maxdensity
                } else {
                    rho *= 0.8
                }
            } else if error.is_sign_negative() && d2p_drho2.is_sign_positive() {
                let (_, rho_l) = pressure_spinodal(eos, t, 0.8 * maxdensity, &moles)?;
                let (sp_v_p, rho_v) = pressure_spinodal(eos, t, 0.001 * maxdensity, &moles)?;
                error = sp_v_p - pressure;
                if error.is_sign_positive()
                    && (initial_density - rho_v).abs() < (initial_density - rho_l).abs()
                {
                    rho = 0.8 * rho_v
                } else {
                    rho = (rho_l * 1.1).min(maxdensity)
                }
            } else if error.is_sign_positive() && d2p_drho2.is_sign_negative() {
                let (_, rho_l) = pressure_spinodal(eos, t, 0.8 * maxdensity, &moles)?;
                let (sp_v_p, rho_v) = pressure_spinodal(eos, t, 0.001 * maxdensity, &moles)?;
                error = sp_v_p - pressure;
                if error.is_sign_negative()
                    && (initial_density - rho_v).abs() > (initial_density - rho_l).abs()
                {
                    rho = (rho_l * 1.1).min(maxdensity)
                } else {
                    rho = 0.8 * rho_v
                }
            } else {
                rho = (rho + initial_density) * 0.5;
                if (rho - initial_density).abs() < 1e-8 {
                    rho = (rho + 0.1 * maxdensity).min(maxdensity)
                }
            }
            continue;
        }

        // Newton step
        rho += delta_rho;
        if !rho.is_finite() {
            return Err(EosError::IterationFailed(String::from("density_iteration")));
        }
        log_iter!(verbosity, " {:4} | {:14.8e} | {:11.5e}", k, error, rho);
        if error.abs() < f64::max(tol, rho * tol * 1e-2) {
            if rho > maxdensity {
                return Err(EosError::IterationFailed(String::from(
                    "density_iteration: density above the maximum density",
                )));
            }
            log_result!(verbosity, "density iteration: converged in {} step(s)", k + 1);
            return State::new_nvt_reduced(eos, t, moles.sum() / rho, moles);
        }
    }
    Err(options.not_converged("density_iteration", maxiter))
}

/// Find a local extremum of the pressure isotherm starting at `rho_init`.
fn pressure_spinodal<E: Residual>(
    eos: &Arc<E>,
    temperature: f64,
    rho_init: f64,
    moles: &Array1<f64>,
) -> EosResult<(f64, f64)> {
    let maxiter = 30;
    let abstol = 1e-8;

    let maxdensity = eos.compute_max_density(moles);
    let mut rho = rho_init;

    if rho <= 0.0 {
        return Err(EosError::InvalidState(
            String::from("pressure spinodal"),
            String::from("density"),
            rho,
        ));
    }

    for _ in 0..maxiter {
        let (p, dpdrho, d2pdrho2) = d2pdrho2(eos, temperature, rho, moles)?;

        let mut delta_rho = -dpdrho / d2pdrho2;
        if delta_rho.abs() > 0.05 * maxdensity {
            delta_rho = 0.05 * maxdensity * delta_rho.signum()
        }
        // keep the density within (0, maxdensity]
        delta_rho = delta_rho.max(-rho * 0.95);
        delta_rho = delta_rho.min(maxdensity - rho);
        rho += delta_rho;

        if dpdrho.abs() < abstol {
            return Ok((p, rho));
        }
    }
    Err(EosError::NotConverged(String::from("pressure_spinodal")))
}
