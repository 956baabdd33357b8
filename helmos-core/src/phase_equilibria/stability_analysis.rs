use super::{ln_molefracs, PhaseEquilibrium, SolverOptions};
use crate::equation_of_state::Residual;
use crate::errors::EosResult;
use crate::linalg::{smallest_eigenvalue, solve};
use crate::si::SIUnit;
use crate::state::{Contributions, DensityInitialization, State};
use crate::{log_iter, log_result, EosUnit};
use ndarray::{Array1, Array2, Axis};

const X_DOMINANT: f64 = 0.99;
const MINIMIZE_TOL: f64 = 1e-6;
const MIN_EIGENVAL: f64 = 1e-3;
const ETA_STEP: f64 = 0.25;
const MINIMIZE_KMAX: usize = 100;
const ZERO_TPD: f64 = -1e-8;

/// # Stability analysis
impl<E: Residual> State<E> {
    /// Determine if the state is stable, i.e. if no phase split
    /// lowers the Gibbs energy of the system.
    pub fn is_stable(&self, options: SolverOptions) -> EosResult<bool> {
        Ok(self.stability_analysis(options)?.is_empty())
    }

    /// Perform a stability analysis based on the tangent plane distance.
    ///
    /// Trial phases are started from an ideal vapor and from every
    /// component as a nearly pure liquid. The result contains all distinct
    /// trial states with a negative tangent plane distance which can be
    /// used as initial guesses for a phase equilibrium calculation.
    pub fn stability_analysis(&self, options: SolverOptions) -> EosResult<Vec<State<E>>> {
        let nc = self.eos.components();
        let mut result = Vec::new();
        for i_trial in 0..=nc {
            // no liquid trial phase dominated by a component absent from the feed
            if i_trial < nc && self.molefracs[i_trial] <= f64::EPSILON {
                continue;
            }
            let phase = if i_trial == nc {
                String::from("vapor trial phase")
            } else {
                format!("liquid trial phase {}", i_trial + 1)
            };
            // trial phases without a solution of the density iteration are skipped
            let Ok(mut trial) = self.define_trial_state(i_trial) else {
                log_result!(options.verbosity, "{}: no initial state", phase);
                continue;
            };
            let (tpd, iter) = self.minimize_tpd(&mut trial, options)?;
            let msg = match tpd {
                Some(tpd) if tpd < ZERO_TPD => {
                    if result
                        .iter()
                        .any(|s| PhaseEquilibrium::is_trivial_solution(s, &trial))
                    {
                        "found already identified minimum"
                    } else {
                        result.push(trial);
                        "found candidate"
                    }
                }
                Some(_) => "found minimum > 0",
                None => "found trivial solution",
            };
            log_result!(options.verbosity, "{}: {} in {} step(s)", phase, msg, iter);
        }
        Ok(result)
    }

    fn define_trial_state(&self, dominant_component: usize) -> EosResult<State<E>> {
        let nc = self.eos.components();
        let x_feed = &self.molefracs;

        let (x_trial, density_initialization) = if dominant_component == nc {
            let y = self.ln_phi()?.mapv(f64::exp) * x_feed;
            (&y / y.sum(), DensityInitialization::Vapor)
        } else {
            let rest = x_feed.sum() - x_feed[dominant_component];
            let x = Array1::from_shape_fn(nc, |i| {
                if i == dominant_component {
                    X_DOMINANT
                } else if rest > 0.0 {
                    x_feed[i] * (1.0 - X_DOMINANT) / rest
                } else {
                    (1.0 - X_DOMINANT) / (nc - 1) as f64
                }
            });
            (x, DensityInitialization::Liquid)
        };

        State::new_npt(
            &self.eos,
            self.temperature,
            self.pressure(Contributions::Total)?,
            &(x_trial * SIUnit::reference_moles()),
            density_initialization,
        )
    }

    /// Replace the trial state by a state with the given (reduced) mole
    /// numbers at the same temperature and pressure.
    fn update_trial(&mut self, moles: Array1<f64>) -> EosResult<()> {
        *self = State::new_npt(
            &self.eos,
            self.temperature,
            self.pressure(Contributions::Total)?,
            &(moles * SIUnit::reference_moles()),
            DensityInitialization::InitialDensity(self.density),
        )?;
        Ok(())
    }

    fn minimize_tpd(
        &self,
        trial: &mut State<E>,
        options: SolverOptions,
    ) -> EosResult<(Option<f64>, usize)> {
        let (max_iter, tol, verbosity) = options.unwrap_or(MINIMIZE_KMAX, MINIMIZE_TOL);
        let mut newton = false;
        let mut scaled_tol = tol;
        let mut tpd = 1e10;
        let di = ln_molefracs(&self.molefracs) + self.ln_phi()?;
        // components absent from the feed stay absent in the trial phase
        let present = self.molefracs.mapv(|x| if x > f64::EPSILON { 1.0 } else { 0.0 });

        log_iter!(verbosity, " iter |    residual    |     tpd     | Newton");
        log_iter!(verbosity, "{:-<46}", "");

        for i in 1..=max_iter {
            let error = if newton {
                trial.stability_newton_step(&di, &mut tpd)?
            } else {
                // successive substitution
                let y = (&di - &trial.ln_phi()?).mapv(f64::exp) * &present;
                let tpd_old = tpd;
                tpd = 1.0 - y.sum();
                let error = (&y / y.sum() - &trial.molefracs).mapv(f64::abs).sum();
                trial.update_trial(y)?;
                if (i > 4 && error > scaled_tol) || (i > 2 && tpd > tpd_old + 1e-5) {
                    newton = true;
                }
                error
            };
            log_iter!(
                verbosity,
                " {:4} | {:14.8e} | {:11.8} | {}",
                i,
                error,
                tpd,
                newton
            );
            if PhaseEquilibrium::is_trivial_solution(self, trial) {
                return Ok((None, i));
            }
            if tpd < -1e-1 && i > 5 {
                scaled_tol = tol * 1e3
            } else if tpd < -1e-1 {
                scaled_tol = tol * 1e2
            } else if tpd < -1e-2 {
                scaled_tol = tol * 1e1
            }
            if error < scaled_tol {
                return Ok((Some(tpd), i));
            }
        }
        Err(options.not_converged("stability analysis", max_iter))
    }

    /// Newton step in the variables $\alpha_i=2\sqrt{Y_i}$. The Hessian is
    /// shifted by a multiple of the identity matrix if it is not positive
    /// definite, if the step is too large or if the tangent plane distance
    /// increases.
    fn stability_newton_step(&mut self, di: &Array1<f64>, tpd: &mut f64) -> EosResult<f64> {
        let nc = self.eos.components();
        let tpd_old = *tpd;

        let mut hesse = self
            .dln_phi_dnj()?
            .to_reduced(SIUnit::reference_moles().powi(-1))?;
        let ln_phi = self.ln_phi()?;
        let y = self.moles.to_reduced(SIUnit::reference_moles())?;
        let ln_y = ln_molefracs(&y);
        let sq_y = y.mapv(f64::sqrt);
        let gradient = (&ln_y + &ln_phi - di) * &sq_y;

        for i in 0..nc {
            let row = &sq_y * sq_y[i];
            hesse.index_axis_mut(Axis(0), i).zip_mut_with(&row, |h, r| *h *= r);
            if y[i] > f64::EPSILON {
                hesse[[i, i]] += ln_y[i] + ln_phi[i] - di[i];
            }
        }

        let mut eta_h = 1.0;
        loop {
            let hessian = &hesse + &(Array2::<f64>::eye(nc) * eta_h);

            // not positive definite
            if smallest_eigenvalue(&hessian) < MIN_EIGENVAL && eta_h < 20.0 {
                eta_h += 2.0 * ETA_STEP;
                continue;
            }

            // step too large
            let delta_y = solve(&hessian, &gradient)?;
            if delta_y
                .iter()
                .zip(y.iter())
                .any(|(dy, y)| ((0.5 * dy).powi(2) / y).abs() > 5.0)
            {
                eta_h += 2.0 * ETA_STEP;
                continue;
            }

            // no descent of the tangent plane distance
            let y_new = (&sq_y - &(delta_y * 0.5)).mapv(|v| v * v);
            let ln_y_new = ln_molefracs(&y_new);
            *tpd = 1.0 + (&y_new * &(&ln_y_new + &ln_phi - di - 1.0)).sum();
            if *tpd > tpd_old && eta_h < 30.0 {
                eta_h += ETA_STEP;
                continue;
            }

            self.update_trial(y_new)?;
            break;
        }
        Ok(gradient.mapv(f64::abs).sum())
    }
}
