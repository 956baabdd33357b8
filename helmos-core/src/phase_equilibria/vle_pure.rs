use super::{PhaseEquilibrium, SolverOptions};
use crate::equation_of_state::Residual;
use crate::errors::{EosError, EosResult};
use crate::si::{SINumber, SIUnit, KELVIN, PASCAL, RGAS};
use crate::state::{Contributions, DensityInitialization, State, TPSpec};
use crate::{log_iter, log_result, EosUnit};
use ndarray::arr1;
use std::convert::TryFrom;
use std::sync::Arc;

const SCALE_T_NEW: f64 = 0.7;
const MAX_ITER_PURE: usize = 50;
const TOL_PURE: f64 = 1e-12;

/// # Pure component phase equilibria
impl<E: Residual> PhaseEquilibrium<E, 2> {
    /// Calculate a phase equilibrium for a pure component
    /// at given temperature or pressure.
    pub fn pure(
        eos: &Arc<E>,
        temperature_or_pressure: SINumber,
        initial_state: Option<&PhaseEquilibrium<E, 2>>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        match TPSpec::try_from(temperature_or_pressure)? {
            TPSpec::Temperature(t) => Self::pure_t(eos, t, initial_state, options),
            TPSpec::Pressure(p) => Self::pure_p(eos, p, initial_state, options),
        }
    }

    /// Vapor-liquid equilibrium of a pure substance at given temperature.
    ///
    /// Starting points are tried in turn: the given initial state, an
    /// ideal vapor in equilibrium with a dense liquid, and a pressure
    /// between the spinodals.
    fn pure_t(
        eos: &Arc<E>,
        temperature: SINumber,
        initial_state: Option<&PhaseEquilibrium<E, 2>>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let solve = |start: EosResult<Self>| start.and_then(|vle| vle.iterate_pure_t(options));
        if let Some(vle) = initial_state
            .and_then(|init| solve(Self::init_pure_state(init, temperature)).ok())
        {
            return Ok(vle);
        }
        solve(Self::init_pure_ideal_gas(eos, temperature))
            .or_else(|_| solve(Self::init_pure_spinodal(eos, temperature)))
    }

    fn iterate_pure_t(self, options: SolverOptions) -> EosResult<Self> {
        let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_PURE, TOL_PURE);
        let mut p_old = self.vapor().pressure(Contributions::Total)?;
        let [mut vapor, mut liquid] = self.0;

        log_iter!(verbosity,
            " iter |     residual      |     pressure     |    liquid density    |    vapor density     | Newton steps"
        );
        log_iter!(verbosity, "{:-<106}", "");
        log_iter!(
            verbosity,
            " {:4} |                   | {:12.8} | {:12.8} | {:12.8} |",
            0,
            p_old,
            liquid.density,
            vapor.density
        );

        for i in 1..=max_iter {
            let (p_l, p_rho_l) = liquid.p_dpdrho()?;
            let (p_v, p_rho_v) = vapor.p_dpdrho()?;
            // molar residual Helmholtz energies (cached)
            let a_l_res = liquid.residual_helmholtz_energy()? / liquid.total_moles;
            let a_v_res = vapor.residual_helmholtz_energy()? / vapor.total_moles;

            // estimate the new pressure
            let kt = RGAS * vapor.temperature;
            let delta_v = 1.0 / vapor.density - 1.0 / liquid.density;
            let delta_a =
                a_v_res - a_l_res + kt * (vapor.density / liquid.density).into_value()?.ln();
            let mut p_new = -delta_a / delta_v;

            // a negative estimate is replaced by the ideal gas estimate
            // which is always positive
            if p_new < 0.0 * PASCAL {
                p_new = p_v
                    * ((-delta_a - p_v * vapor.volume / vapor.total_moles) / kt)
                        .into_value()?
                        .exp();
            }

            // correct for the almost ideal behavior of the vapor phase
            let mut newton_iter = 0;
            let newton_tol = (p_old * delta_v * tol).abs();
            for _ in 0..20 {
                let p_frac = (p_new / p_old).into_value()?;
                let f = p_new * delta_v + delta_a + kt * (p_frac.ln() + 1.0 - p_frac);
                let df_dp = delta_v + kt * (1.0 / p_new - 1.0 / p_old);
                p_new -= f / df_dp;
                newton_iter += 1;
                if f.abs() < newton_tol {
                    break;
                }
            }

            if !p_new.is_finite() {
                return Err(EosError::IterationFailed(String::from("pure_t")));
            }

            // Newton steps for the densities
            let rho_l = liquid.density + (p_new - p_l) / p_rho_l;
            let rho_v = vapor.density + (p_new - p_v) / p_rho_v;
            liquid = State::new_pure(&liquid.eos, liquid.temperature, rho_l)?;
            vapor = State::new_pure(&vapor.eos, vapor.temperature, rho_v)?;
            if Self::is_trivial_solution(&vapor, &liquid) {
                return Err(EosError::TrivialSolution);
            }

            let res = ((p_new - p_old) / p_old).into_value()?.abs();
            log_iter!(
                verbosity,
                " {:4} | {:14.8e} | {:12.8} | {:12.8} | {:12.8} | {}",
                i,
                res,
                p_new,
                liquid.density,
                vapor.density,
                newton_iter
            );
            if res < tol {
                log_result!(
                    verbosity,
                    "PhaseEquilibrium::pure_t: calculation converged in {} step(s)",
                    i
                );
                return Ok(Self([vapor, liquid]));
            }
            p_old = p_new;
        }
        Err(options.not_converged("pure_t", max_iter))
    }

    /// Calculate a phase equilibrium for a pure component
    /// and given pressure.
    fn pure_p(
        eos: &Arc<E>,
        pressure: SINumber,
        initial_state: Option<&Self>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_PURE, TOL_PURE);

        let mut vle = match initial_state {
            Some(init) => init
                .clone()
                .update_pressure(init.vapor().temperature, pressure)?,
            None => Self::init_pure_p(eos, pressure)?,
        };

        log_iter!(
            verbosity,
            " iter |     residual     |   temperature   |    liquid density    |    vapor density     "
        );
        log_iter!(verbosity, "{:-<89}", "");
        log_iter!(
            verbosity,
            " {:4} |                  | {:13.8} | {:12.8} | {:12.8}",
            0,
            vle.vapor().temperature,
            vle.liquid().density,
            vle.vapor().density
        );
        for i in 1..=max_iter {
            let (liquid, vapor) = (vle.liquid(), vle.vapor());
            let (p_l, p_rho_l) = liquid.p_dpdrho()?;
            let (p_v, p_rho_v) = vapor.p_dpdrho()?;
            let p_t_l = liquid.dp_dt(Contributions::Total)?;
            let p_t_v = vapor.dp_dt(Contributions::Total)?;

            // molar residual entropies and Helmholtz energies (cached)
            let s_l_res = liquid.residual_entropy()? / liquid.total_moles;
            let s_v_res = vapor.residual_entropy()? / vapor.total_moles;
            let a_l_res = liquid.residual_helmholtz_energy()? / liquid.total_moles;
            let a_v_res = vapor.residual_helmholtz_energy()? / vapor.total_moles;

            let v_l = 1.0 / liquid.density;
            let v_v = 1.0 / vapor.density;

            // temperature step
            let kt = RGAS * vapor.temperature;
            let ln_rho = (v_l / v_v).into_value()?.ln();
            let delta_t = (pressure * (v_v - v_l) + (a_v_res - a_l_res + kt * ln_rho))
                / (s_v_res - s_l_res - RGAS * ln_rho);
            let t_new = vapor.temperature + delta_t;

            // Newton steps for the densities
            let rho_l = liquid.density + (pressure - p_l - p_t_l * delta_t) / p_rho_l;
            let rho_v = vapor.density + (pressure - p_v - p_t_v * delta_t) / p_rho_v;

            let zero_density = 0.0 * SIUnit::reference_density();
            vle = if rho_l < zero_density || rho_v < zero_density || delta_t.abs() > KELVIN {
                // fall back to density iterations for large steps
                vle.update_pressure(t_new, pressure)?
                    .check_trivial_solution()?
            } else {
                Self([
                    State::new_pure(eos, t_new, rho_v)?,
                    State::new_pure(eos, t_new, rho_l)?,
                ])
            };

            let res = (delta_t / vle.vapor().temperature).into_value()?.abs();
            log_iter!(
                verbosity,
                " {:4} | {:14.8e} | {:13.8} | {:12.8} | {:12.8}",
                i,
                res,
                vle.vapor().temperature,
                vle.liquid().density,
                vle.vapor().density
            );
            if res < tol {
                log_result!(
                    verbosity,
                    "PhaseEquilibrium::pure_p: calculation converged in {} step(s)",
                    i
                );
                return Ok(vle);
            }
        }
        Err(options.not_converged("pure_p", max_iter))
    }

    fn init_pure_state(initial_state: &Self, temperature: SINumber) -> EosResult<Self> {
        let vapor = initial_state.vapor().update_temperature(temperature)?;
        let liquid = initial_state.liquid().update_temperature(temperature)?;
        Ok(Self([vapor, liquid]))
    }

    /// Initial pressure from a liquid at high density and an ideal vapor phase.
    fn init_pure_ideal_gas(eos: &Arc<E>, temperature: SINumber) -> EosResult<Self> {
        let m = arr1(&[1.0]) * SIUnit::reference_moles();
        let density = 0.75 * eos.max_density(Some(&m))?;
        let liquid = State::new_nvt(eos, temperature, m.sum() / density, &m)?;
        let v_l = liquid.partial_molar_volume()?;
        let p_l = liquid.pressure(Contributions::Total)?;
        let mu_l = liquid.residual_chemical_potential()?;
        let kt = RGAS * temperature;
        let p = kt * density * ((mu_l - p_l * v_l) / kt).into_value()?[0].exp();
        PhaseEquilibrium::new_npt(eos, temperature, p, &m, &m)?.check_trivial_solution()
    }

    /// Initial pressure between the pressures of the two spinodal states.
    fn init_pure_spinodal(eos: &Arc<E>, temperature: SINumber) -> EosResult<Self> {
        let [sp_v, sp_l] = State::spinodal(eos, temperature, None, SolverOptions::default())?;
        let pv = sp_v.pressure(Contributions::Total)?;
        let pl = sp_l.pressure(Contributions::Total)?;
        let pl = if pl > 0.0 * PASCAL { pl } else { 0.0 * PASCAL };
        let p = 0.5 * (pl + pv);
        let m = arr1(&[1.0]) * SIUnit::reference_moles();
        PhaseEquilibrium::new_npt(eos, temperature, p, &m, &m)
    }

    /// Initialize a new VLE for a pure substance for a given pressure.
    fn init_pure_p(eos: &Arc<E>, pressure: SINumber) -> EosResult<Self> {
        let m = arr1(&[1.0]) * SIUnit::reference_moles();
        let mut vle = None;
        for t in [300.0, 500.0, 200.0] {
            let t = t * KELVIN;
            let trial = PhaseEquilibrium::new_npt(eos, t, pressure, &m, &m)?;
            if !Self::is_trivial_solution(trial.vapor(), trial.liquid()) {
                return Ok(trial);
            }
            vle = Some((t, trial));
        }
        let (mut t0, mut e) =
            vle.ok_or_else(|| EosError::IterationFailed(String::from("init_pure_p")))?;

        let cp = State::critical_point(eos, None, None, SolverOptions::default())?;
        if pressure > cp.pressure(Contributions::Total)? {
            return Err(EosError::SuperCritical);
        };
        if e.vapor().density < cp.density {
            for _ in 0..8 {
                t0 = t0 * SCALE_T_NEW;
                e.0[1] = State::new_npt(eos, t0, pressure, &m, DensityInitialization::Liquid)?;
                if e.liquid().density > cp.density {
                    break;
                }
            }
        } else {
            for _ in 0..8 {
                t0 = t0 / SCALE_T_NEW;
                e.0[0] = State::new_npt(eos, t0, pressure, &m, DensityInitialization::Vapor)?;
                if e.vapor().density < cp.density {
                    break;
                }
            }
        }

        // Clausius-Clapeyron like update of the temperature
        let h = |s: &State<E>| -> EosResult<SINumber> {
            Ok(s.residual_enthalpy()? + s.total_moles * RGAS * s.temperature)
        };
        for _ in 0..20 {
            t0 = (h(e.vapor())? - h(e.liquid())?)
                / (e.vapor().residual_entropy()?
                    - e.liquid().residual_entropy()?
                    - RGAS
                        * e.vapor().total_moles
                        * (e.vapor().density / e.liquid().density).into_value()?.ln());
            let trial_state = State::new_npt(eos, t0, pressure, &m, DensityInitialization::Vapor)?;
            if trial_state.density < cp.density {
                e.0[0] = trial_state;
            }
            let trial_state = State::new_npt(eos, t0, pressure, &m, DensityInitialization::Liquid)?;
            if trial_state.density > cp.density {
                e.0[1] = trial_state;
            }
            if e.liquid().temperature == e.vapor().temperature {
                return Ok(e);
            }
        }
        Err(EosError::IterationFailed(String::from(
            "init_pure_p: could not find proper initial state",
        )))
    }
}

impl<E: Residual> PhaseEquilibrium<E, 2> {
    /// Calculate the pure component vapor pressures of all
    /// components in the system for the given temperature.
    ///
    /// Components without a phase transition at the given
    /// temperature yield `None`.
    pub fn vapor_pressure(eos: &Arc<E>, temperature: SINumber) -> Vec<Option<SINumber>> {
        (0..eos.components())
            .map(|i| {
                let pure_eos = Arc::new(eos.subset(&[i]));
                PhaseEquilibrium::pure_t(&pure_eos, temperature, None, SolverOptions::default())
                    .and_then(|vle| vle.vapor().pressure(Contributions::Total))
                    .ok()
            })
            .collect()
    }

    /// Calculate the pure component boiling temperatures of all
    /// components in the system for the given pressure.
    pub fn boiling_temperature(eos: &Arc<E>, pressure: SINumber) -> Vec<Option<SINumber>> {
        (0..eos.components())
            .map(|i| {
                let pure_eos = Arc::new(eos.subset(&[i]));
                PhaseEquilibrium::pure_p(&pure_eos, pressure, None, SolverOptions::default())
                    .map(|vle| vle.vapor().temperature)
                    .ok()
            })
            .collect()
    }
}
