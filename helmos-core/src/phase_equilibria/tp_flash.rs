use super::{ln_molefracs, PhaseEquilibrium, SolverOptions};
use crate::equation_of_state::Residual;
use crate::errors::{EosError, EosResult};
use crate::linalg::norm;
use crate::si::{SIArray1, SINumber};
use crate::state::{Contributions, DensityInitialization, State};
use crate::{log_iter, log_result};
use ndarray::{s, Array1, Array2, Axis};
use std::sync::Arc;

const MAX_ITER_TP: usize = 400;
const TOL_TP: f64 = 1e-8;

/// # Flash calculations
impl<E: Residual> PhaseEquilibrium<E, 2> {
    /// Perform a Tp-flash calculation. If no initial values are
    /// given, the solution is initialized using a stability analysis.
    ///
    /// Components listed in `non_volatile_components` are restricted
    /// to the liquid phase (e.g. ions or polymers).
    pub fn tp_flash(
        eos: &Arc<E>,
        temperature: SINumber,
        pressure: SINumber,
        feed: &SIArray1,
        initial_state: Option<&PhaseEquilibrium<E, 2>>,
        options: SolverOptions,
        non_volatile_components: Option<Vec<usize>>,
    ) -> EosResult<Self> {
        State::new_npt(
            eos,
            temperature,
            pressure,
            feed,
            DensityInitialization::None,
        )?
        .tp_flash(initial_state, options, non_volatile_components)
    }
}

/// # Flash calculations
impl<E: Residual> State<E> {
    /// Perform a Tp-flash calculation using the [State] as feed.
    /// If no initial values are given, the solution is initialized
    /// using a stability analysis.
    pub fn tp_flash(
        &self,
        initial_state: Option<&PhaseEquilibrium<E, 2>>,
        options: SolverOptions,
        non_volatile_components: Option<Vec<usize>>,
    ) -> EosResult<PhaseEquilibrium<E, 2>> {
        let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_TP, TOL_TP);
        let flash = Flash {
            feed: self,
            tol,
            options,
            non_volatile: non_volatile_components.unwrap_or_default(),
        };

        let mut vle = match initial_state {
            Some(init) => init
                .clone()
                .update_pressure(self.temperature, self.pressure(Contributions::Total)?)?,
            None => PhaseEquilibrium::vle_init_stability(self)?,
        };

        log_iter!(
            verbosity,
            " iter |    residual    |  phase I mole fractions  |  phase II mole fractions  "
        );
        log_iter!(verbosity, "{:-<77}", "");
        log_iter!(
            verbosity,
            " {:4} |                | {:10.8} | {:10.8}",
            0,
            vle.vapor().molefracs,
            vle.liquid().molefracs,
        );

        let mut iter = 0;
        if flash.non_volatile.is_empty() {
            flash.successive_substitution(&mut vle, 3, &mut iter, None)?;

            // restart from the feed if only one of the phases lowers the Gibbs energy
            let beta = vle.vapor_phase_fraction()?;
            let tpd = [
                self.tangent_plane_distance(vle.vapor())?,
                self.tangent_plane_distance(vle.liquid())?,
            ];
            let dg = (1.0 - beta) * tpd[1] + beta * tpd[0];

            if tpd[0] < 0.0 && dg >= 0.0 {
                let k = (self.ln_phi()? - vle.vapor().ln_phi()?).mapv(f64::exp);
                flash.update_states(&mut vle, k)?;
                flash.successive_substitution(&mut vle, 1, &mut iter, None)?;
            }
            if tpd[1] < 0.0 && dg >= 0.0 {
                let k = (vle.liquid().ln_phi()? - self.ln_phi()?).mapv(f64::exp);
                flash.update_states(&mut vle, k)?;
                flash.successive_substitution(&mut vle, 1, &mut iter, None)?;
            }
        }

        flash.accelerated_successive_substitution(&mut vle, &mut iter, max_iter)?;
        Ok(vle)
    }

    /// Tangent plane distance of a trial phase with respect to this state
    /// in units of $RT$.
    fn tangent_plane_distance(&self, trial_state: &State<E>) -> EosResult<f64> {
        let ln_phi_z = self.ln_phi()?;
        let ln_phi_w = trial_state.ln_phi()?;
        let z = &self.molefracs;
        let w = &trial_state.molefracs;
        Ok((w * &(ln_molefracs(w) + ln_phi_w - ln_molefracs(z) - ln_phi_z)).sum())
    }
}

/// Settings shared by all steps of a single flash calculation.
struct Flash<'a, E> {
    feed: &'a State<E>,
    tol: f64,
    options: SolverOptions,
    non_volatile: Vec<usize>,
}

impl<E: Residual> Flash<'_, E> {
    /// K values of non-volatile components are zero.
    fn k_values(&self, vle: &PhaseEquilibrium<E, 2>) -> EosResult<Array1<f64>> {
        let mut k = (vle.liquid().ln_phi()? - vle.vapor().ln_phi()?).mapv(f64::exp);
        self.non_volatile.iter().for_each(|&c| k[c] = 0.0);
        Ok(k)
    }

    /// Perform up to `iterations` steps of successive substitution. The
    /// logarithms of the last three K vectors are stored in `k_vec` if given.
    /// Returns `true` if the phase equilibrium is converged.
    fn successive_substitution(
        &self,
        vle: &mut PhaseEquilibrium<E, 2>,
        iterations: usize,
        iter: &mut usize,
        mut k_vec: Option<&mut Array2<f64>>,
    ) -> EosResult<bool> {
        for i in 0..iterations {
            let ln_phi_v = vle.vapor().ln_phi()?;
            let ln_phi_l = vle.liquid().ln_phi()?;
            let k = self.k_values(vle)?;

            *iter += 1;
            let ln_x_ratio = (&vle.liquid().molefracs / &vle.vapor().molefracs)
                .mapv(|r| if r > 0.0 { r.ln() } else { 0.0 });
            let mut res_vec = ln_phi_l - ln_phi_v + ln_x_ratio;
            self.non_volatile.iter().for_each(|&c| res_vec[c] = 0.0);
            let res = norm(&res_vec);
            log_iter!(
                self.options.verbosity,
                " {:4} | {:14.8e} | {:.8} | {:.8}",
                iter,
                res,
                vle.vapor().molefracs,
                vle.liquid().molefracs,
            );
            if res < self.tol {
                return Ok(true);
            }

            let ln_k = k.mapv(|k| if k > 0.0 { k.ln() } else { 0.0 });
            self.update_states(vle, k)?;
            if let Some(k_vec) = k_vec.as_deref_mut() {
                if i + 3 >= iterations {
                    k_vec
                        .index_axis_mut(Axis(0), i + 3 - iterations)
                        .assign(&ln_k);
                }
            }
        }
        Ok(false)
    }

    /// Successive substitution, accelerated by an extrapolation of the
    /// K values every five steps. Extrapolated states are only accepted if
    /// they lower the total Gibbs energy.
    fn accelerated_successive_substitution(
        &self,
        vle: &mut PhaseEquilibrium<E, 2>,
        iter: &mut usize,
        max_iter: usize,
    ) -> EosResult<()> {
        let nc = vle.vapor().eos.components();
        while *iter < max_iter {
            let mut k_vec = Array2::zeros((4, nc));
            if self.successive_substitution(vle, 5, iter, Some(&mut k_vec))? {
                log_result!(
                    self.options.verbosity,
                    "Tp flash: calculation converged in {} step(s)",
                    iter
                );
                return Ok(());
            }

            let gibbs = vle.total_gibbs_energy()?;

            let delta_vec = &k_vec.slice(s![1.., ..]) - &k_vec.slice(s![..3, ..]);
            let delta = Array2::from_shape_fn((3, 3), |(i, j)| {
                delta_vec.row(i).dot(&delta_vec.row(j))
            });
            let d = delta[(0, 1)] * delta[(0, 1)] - delta[(0, 0)] * delta[(1, 1)];
            let a = (delta[(0, 2)] * delta[(0, 1)] - delta[(1, 2)] * delta[(0, 0)]) / d;
            let b = (delta[(1, 2)] * delta[(0, 1)] - delta[(0, 2)] * delta[(1, 1)]) / d;

            let mut k = (&k_vec.row(3)
                + &((&delta_vec.row(1) * b + &delta_vec.row(2) * (a + b)) / (1.0 - a - b)))
                .mapv(f64::exp);
            self.non_volatile.iter().for_each(|&c| k[c] = 0.0);
            if !k.iter().all(|k| k.is_finite()) {
                continue;
            }

            let mut trial = vle.clone();
            if self.update_states(&mut trial, k).is_ok() && trial.total_gibbs_energy()? < gibbs {
                *vle = trial;
            }
        }
        Err(self.options.not_converged("tp_flash", max_iter))
    }

    /// Distribute the feed between the phases according to the K values.
    fn update_states(&self, vle: &mut PhaseEquilibrium<E, 2>, k: Array1<f64>) -> EosResult<()> {
        let beta = rachford_rice(&self.feed.molefracs, &k, Some(vle.vapor_phase_fraction()?))?;
        let denominator = k.mapv(|k| 1.0 - beta + beta * k);
        let v = &self.feed.moles * &(&k * beta / &denominator);
        let l = &self.feed.moles * &(denominator.mapv(|d| (1.0 - beta) / d));
        vle.update_moles(self.feed.pressure(Contributions::Total)?, [&v, &l])
    }
}

impl<E: Residual> PhaseEquilibrium<E, 2> {
    /// Initial phases from a stability analysis of the feed.
    fn vle_init_stability(feed_state: &State<E>) -> EosResult<Self> {
        let mut candidates = feed_state.stability_analysis(SolverOptions::default())?;
        match (candidates.pop(), candidates.pop()) {
            (Some(s1), Some(s2)) => Self::from_states(s1, s2),
            (Some(s1), None) => Self::from_states(s1, feed_state.clone()),
            _ => Err(EosError::NoPhaseSplit),
        }
    }
}

/// Solve the Rachford-Rice equation
/// $\sum_i\frac{z_i(K_i-1)}{1-\beta+\beta K_i}=0$ for the vapor
/// phase fraction $\beta$.
fn rachford_rice(feed: &Array1<f64>, k: &Array1<f64>, beta_in: Option<f64>) -> EosResult<f64> {
    const MAX_ITER: usize = 10;
    const ABS_TOL: f64 = 1e-6;

    // a solution in (0, 1) requires sum(z K) > 1 and sum(z / K) > 1
    let sum_zk = (feed * k).sum();
    let sum_z_over_k: f64 = feed
        .iter()
        .zip(k.iter())
        .map(|(z, k)| z / k)
        .filter(|x| !x.is_nan())
        .sum();
    if sum_zk <= 1.0 || sum_z_over_k <= 1.0 {
        return Err(EosError::IterationFailed(String::from("rachford_rice")));
    }

    let (mut beta_min, mut beta_max) = (0.0, 1.0);
    for (&k, &z) in k.iter().zip(feed.iter()) {
        if k > 1.0 {
            beta_min = f64::max(beta_min, (k * z - 1.0) / (k - 1.0));
        }
        if k < 1.0 {
            beta_max = f64::min(beta_max, (1.0 - z) / (1.0 - k));
        }
    }

    let mut beta = match beta_in {
        Some(b) if b > beta_min && b < beta_max => b,
        _ => 0.5 * (beta_min + beta_max),
    };

    for _ in 0..MAX_ITER {
        let frac = k.mapv(|k| (k - 1.0) / (1.0 - beta + beta * k));
        let g = (feed * &frac).sum();
        let dg = -(feed * &frac * &frac).sum();
        if g > 0.0 {
            beta_min = beta;
        } else {
            beta_max = beta;
        }

        let dbeta = g / dg;
        beta -= dbeta;
        // bisection if Newton leaves the bracket
        if beta < beta_min || beta > beta_max {
            beta = 0.5 * (beta_min + beta_max);
        }
        if dbeta.abs() < ABS_TOL {
            return Ok(beta);
        }
    }
    Ok(beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cubic::{PengRobinson, PengRobinsonParameters};
    use crate::si::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    fn propane_hexane() -> EosResult<Arc<PengRobinson>> {
        Ok(Arc::new(PengRobinson::new(Arc::new(
            PengRobinsonParameters::new_simple(
                &[369.96, 507.6],
                &[4.25e6, 3.025e6],
                &[0.153, 0.301],
                &[44.0962, 86.175],
            )?,
        ))))
    }

    #[test]
    fn test_rachford_rice() -> EosResult<()> {
        let z = arr1(&[0.5, 0.5]);
        let beta = rachford_rice(&z, &arr1(&[2.0, 0.5]), None)?;
        assert_relative_eq!(beta, 0.5, epsilon = 1e-6);
        let beta = rachford_rice(&z, &arr1(&[4.0, 0.25]), Some(0.9))?;
        assert_relative_eq!(beta, 0.5, epsilon = 1e-6);
        assert!(rachford_rice(&z, &arr1(&[0.9, 0.5]), None).is_err());
        Ok(())
    }

    #[test]
    fn binary_flash() -> EosResult<()> {
        let eos = propane_hexane()?;
        let t = 300.0 * KELVIN;
        let p = 2.0 * BAR;
        let feed = arr1(&[0.5, 0.5]) * MOL;
        let vle = PhaseEquilibrium::tp_flash(
            &eos,
            t,
            p,
            &feed,
            None,
            SolverOptions::default(),
            None,
        )?;
        let (vapor, liquid) = (vle.vapor(), vle.liquid());

        assert!(vapor.molefracs[0] > 0.5);
        assert!(liquid.molefracs[0] < 0.5);
        assert_relative_eq!(vapor.pressure(Contributions::Total)?, p, max_relative = 1e-8);
        assert_relative_eq!(liquid.pressure(Contributions::Total)?, p, max_relative = 1e-8);
        assert_relative_eq!(
            (&vapor.moles + &liquid.moles).to_reduced(MOL)?,
            arr1(&[0.5, 0.5]),
            max_relative = 1e-8
        );

        // equal fugacities
        let ln_f_v = vapor.molefracs.mapv(f64::ln) + vapor.ln_phi()?;
        let ln_f_l = liquid.molefracs.mapv(f64::ln) + liquid.ln_phi()?;
        assert_relative_eq!(ln_f_v, ln_f_l, epsilon = 1e-6);

        // restart from the converged solution
        let restart = PhaseEquilibrium::tp_flash(
            &eos,
            t,
            p,
            &feed,
            Some(&vle),
            SolverOptions::default(),
            None,
        )?;
        assert_relative_eq!(
            restart.vapor().molefracs,
            vapor.molefracs,
            max_relative = 1e-6
        );
        Ok(())
    }

    #[test]
    fn iteration_limit() -> EosResult<()> {
        let eos = propane_hexane()?;
        let feed = arr1(&[0.5, 0.5]) * MOL;
        let options = SolverOptions::default().max_iter(1);
        let vle = PhaseEquilibrium::tp_flash(&eos, 300.0 * KELVIN, 2.0 * BAR, &feed, None, options, None);
        assert!(matches!(vle, Err(crate::EosError::NotConverged(s)) if s == "tp_flash"));
        Ok(())
    }
}
