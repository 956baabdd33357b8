use super::{DensityInitialization, State, StateHD, TPSpec};
use crate::dual::{Dual, Dual3, Dual64, DualNum, HyperDual};
use crate::equation_of_state::Residual;
use crate::errors::{EosError, EosResult};
use crate::linalg::{norm, smallest_ev, solve};
use crate::phase_equilibria::SolverOptions;
use crate::si::{SIArray1, SINumber, SIUnit};
use crate::{log_iter, log_result, EosUnit};
use ndarray::{arr1, arr2, Array1, Array2};
use num_traits::{One, Zero};
use std::convert::TryFrom;
use std::sync::Arc;

const MAX_ITER_CRIT_POINT: usize = 50;
const TOL_CRIT_POINT: f64 = 1e-8;

/// # Critical points
impl<E: Residual> State<E> {
    /// Calculate the pure component critical point of all components.
    pub fn critical_point_pure(
        eos: &Arc<E>,
        initial_temperature: Option<SINumber>,
        options: SolverOptions,
    ) -> EosResult<Vec<Self>> {
        (0..eos.components())
            .map(|i| {
                Self::critical_point(
                    &Arc::new(eos.subset(&[i])),
                    None,
                    initial_temperature,
                    options,
                )
            })
            .collect()
    }

    /// Calculate a point on the critical line of a binary mixture
    /// for a given temperature or pressure.
    pub fn critical_point_binary(
        eos: &Arc<E>,
        temperature_or_pressure: SINumber,
        initial_temperature: Option<SINumber>,
        initial_molefracs: Option<[f64; 2]>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        if eos.components() != 2 {
            return Err(EosError::IncompatibleComponents(eos.components(), 2));
        }
        match TPSpec::try_from(temperature_or_pressure)? {
            TPSpec::Temperature(t) => {
                Self::critical_point_binary_t(eos, t, initial_molefracs, options)
            }
            TPSpec::Pressure(p) => Self::critical_point_binary_p(
                eos,
                p,
                initial_temperature,
                initial_molefracs,
                options,
            ),
        }
    }

    /// Calculate the critical point of a system for given moles.
    ///
    /// Without an initial temperature, several starting values are tried
    /// and the first converged result is returned.
    pub fn critical_point(
        eos: &Arc<E>,
        moles: Option<&SIArray1>,
        initial_temperature: Option<SINumber>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let moles = eos.validate_moles(moles)?;
        if let Some(t) = initial_temperature {
            return Self::critical_point_hkm(eos, &moles, t, options);
        }
        let trial_temperatures = [300.0, 700.0, 500.0];
        for t in trial_temperatures {
            let t = t * SIUnit::reference_temperature();
            let s = Self::critical_point_hkm(eos, &moles, t, options);
            if s.is_ok() {
                return s;
            }
        }
        Err(EosError::NotConverged(String::from("Critical point")))
    }

    fn critical_point_hkm(
        eos: &Arc<E>,
        moles: &SIArray1,
        initial_temperature: SINumber,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_CRIT_POINT, TOL_CRIT_POINT);

        let mut t = initial_temperature.to_reduced(SIUnit::reference_temperature())?;
        let max_density = eos
            .max_density(Some(moles))?
            .to_reduced(SIUnit::reference_density())?;
        let mut rho = 0.3 * max_density;
        let n = moles.to_reduced(SIUnit::reference_moles())?;
        let n_total = n.sum();
        // the iteration is carried out for a total of one particle
        let x = n.mapv(|n| Dual64::from(n / n_total));

        log_iter!(
            verbosity,
            " iter |    residual    |   temperature   |       density        "
        );
        log_iter!(verbosity, "{:-<64}", "");
        log_iter!(
            verbosity,
            " {:4} |                | {:13.8} | {:12.8}",
            0,
            t * SIUnit::reference_temperature(),
            rho * SIUnit::reference_density(),
        );

        for i in 1..=max_iter {
            // residuals and their derivatives w.r.t. temperature and density
            let res_t = criticality_conditions(
                eos,
                Dual64::from(t).derivative(),
                Dual64::from(rho).recip(),
                &x,
            )?;
            let res_r = criticality_conditions(
                eos,
                Dual64::from(t),
                Dual64::from(rho).derivative().recip(),
                &x,
            )?;
            let res = arr1(&[res_t[0].re, res_t[1].re]);

            // Newton step
            let h = arr2(&[
                [res_t[0].eps, res_r[0].eps],
                [res_t[1].eps, res_r[1].eps],
            ]);
            let mut delta = solve(&h, &res)?;

            // reduce step if necessary
            if delta[0].abs() > 0.25 * t {
                delta *= 0.25 * t / delta[0].abs()
            }
            if delta[1].abs() > 0.03 * max_density {
                delta *= 0.03 * max_density / delta[1].abs()
            }

            t -= delta[0];
            rho -= delta[1];
            rho = f64::max(rho, 1e-4 * max_density);
            if !t.is_finite() || t <= 0.0 {
                return Err(EosError::IterationFailed(String::from("Critical point")));
            }

            log_iter!(
                verbosity,
                " {:4} | {:14.8e} | {:13.8} | {:12.8}",
                i,
                norm(&res),
                t * SIUnit::reference_temperature(),
                rho * SIUnit::reference_density(),
            );

            if norm(&res) < tol {
                log_result!(
                    verbosity,
                    "Critical point calculation converged in {} step(s)",
                    i
                );
                return State::new_nvt_reduced(eos, t, n_total / rho, n);
            }
        }
        Err(options.not_converged("Critical point", max_iter))
    }

    /// Critical point of a binary mixture at given temperature.
    ///
    /// The iteration variables are the partial densities at unit volume.
    fn critical_point_binary_t(
        eos: &Arc<E>,
        temperature: SINumber,
        initial_molefracs: Option<[f64; 2]>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_CRIT_POINT, TOL_CRIT_POINT);

        let t = temperature.to_reduced(SIUnit::reference_temperature())?;
        let x = arr1(&initial_molefracs.unwrap_or([0.5, 0.5]));
        let max_density = eos
            .max_density(Some(&(&x * SIUnit::reference_moles())))?
            .to_reduced(SIUnit::reference_density())?;
        let mut rho = x * 0.3 * max_density;

        log_iter!(
            verbosity,
            " iter |    residual    |      density 1       |      density 2       "
        );
        log_iter!(verbosity, "{:-<69}", "");
        log_iter!(
            verbosity,
            " {:4} |                | {:12.8} | {:12.8}",
            0,
            rho[0] * SIUnit::reference_density(),
            rho[1] * SIUnit::reference_density(),
        );

        for i in 1..=max_iter {
            // residuals and their derivatives w.r.t. the partial densities
            let seeded = |k: usize| {
                Array1::from_shape_fn(2, |j| {
                    let r = Dual64::from(rho[j]);
                    if j == k {
                        r.derivative()
                    } else {
                        r
                    }
                })
            };
            let res_1 = criticality_conditions(eos, Dual64::from(t), Dual64::one(), &seeded(0))?;
            let res_2 = criticality_conditions(eos, Dual64::from(t), Dual64::one(), &seeded(1))?;
            let res = arr1(&[res_1[0].re, res_1[1].re]);

            // Newton step
            let h = [
                [res_1[0].eps, res_2[0].eps],
                [res_1[1].eps, res_2[1].eps],
            ];
            let det = h[0][0] * h[1][1] - h[0][1] * h[1][0];
            let mut delta = arr1(&[
                h[1][1] * res[0] - h[0][1] * res[1],
                h[0][0] * res[1] - h[1][0] * res[0],
            ]) / det;

            // reduce step if necessary
            for k in 0..2 {
                if delta[k].abs() > 0.03 * max_density {
                    delta *= 0.03 * max_density / delta[k].abs()
                }
            }

            rho -= &delta;
            rho.mapv_inplace(|r| f64::max(r, 1e-4 * max_density));
            if rho.iter().any(|r| !r.is_finite()) {
                return Err(EosError::IterationFailed(String::from("Critical point")));
            }

            log_iter!(
                verbosity,
                " {:4} | {:14.8e} | {:12.8} | {:12.8}",
                i,
                norm(&res),
                rho[0] * SIUnit::reference_density(),
                rho[1] * SIUnit::reference_density(),
            );

            if norm(&res) < tol {
                log_result!(
                    verbosity,
                    "Critical point calculation converged in {} step(s)",
                    i
                );
                return State::new_nvt_reduced(eos, t, 1.0, rho);
            }
        }
        Err(options.not_converged("Critical point", max_iter))
    }

    /// Critical point of a binary mixture at given pressure.
    fn critical_point_binary_p(
        eos: &Arc<E>,
        pressure: SINumber,
        initial_temperature: Option<SINumber>,
        initial_molefracs: Option<[f64; 2]>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_CRIT_POINT, TOL_CRIT_POINT);

        let p = pressure.to_reduced(SIUnit::reference_pressure())?;
        let mut t = initial_temperature
            .map(|t| t.to_reduced(SIUnit::reference_temperature()))
            .transpose()?
            .unwrap_or(300.0);
        let x = arr1(&initial_molefracs.unwrap_or([0.5, 0.5]));
        let max_density = eos
            .max_density(Some(&(&x * SIUnit::reference_moles())))?
            .to_reduced(SIUnit::reference_density())?;
        let mut rho = x * 0.3 * max_density;

        log_iter!(
            verbosity,
            " iter |    residual    |   temperature   |      density 1       |      density 2       "
        );
        log_iter!(verbosity, "{:-<87}", "");
        log_iter!(
            verbosity,
            " {:4} |                | {:13.8} | {:12.8} | {:12.8}",
            0,
            t * SIUnit::reference_temperature(),
            rho[0] * SIUnit::reference_density(),
            rho[1] * SIUnit::reference_density(),
        );

        for i in 1..=max_iter {
            // residuals and their derivatives w.r.t. temperature and partial densities
            let mut h = Array2::zeros((3, 3));
            let mut res = Array1::zeros(3);
            for k in 0..3 {
                let temperature = if k == 0 {
                    Dual64::from(t).derivative()
                } else {
                    Dual64::from(t)
                };
                let density = Array1::from_shape_fn(2, |j| {
                    let r = Dual64::from(rho[j]);
                    if j + 1 == k {
                        r.derivative()
                    } else {
                        r
                    }
                });
                let [eval, cubic] =
                    criticality_conditions(eos, temperature, Dual64::one(), &density)?;
                let p_res = pressure_residual(eos, p, temperature, &density)?;
                for (l, r) in [eval, cubic, p_res].into_iter().enumerate() {
                    h[[l, k]] = r.eps;
                    res[l] = r.re;
                }
            }

            // Newton step
            let mut delta = solve(&h, &res)?;

            // reduce step if necessary
            if delta[0].abs() > 0.25 * t {
                delta *= 0.25 * t / delta[0].abs()
            }
            if delta[1].abs() > 0.03 * max_density {
                delta *= 0.03 * max_density / delta[1].abs()
            }
            if delta[2].abs() > 0.03 * max_density {
                delta *= 0.03 * max_density / delta[2].abs()
            }

            t -= delta[0];
            rho[0] = f64::max(rho[0] - delta[1], 1e-4 * max_density);
            rho[1] = f64::max(rho[1] - delta[2], 1e-4 * max_density);
            if !t.is_finite() || t <= 0.0 {
                return Err(EosError::IterationFailed(String::from("Critical point")));
            }

            log_iter!(
                verbosity,
                " {:4} | {:14.8e} | {:13.8} | {:12.8} | {:12.8}",
                i,
                norm(&res),
                t * SIUnit::reference_temperature(),
                rho[0] * SIUnit::reference_density(),
                rho[1] * SIUnit::reference_density(),
            );

            if norm(&res) < tol {
                log_result!(
                    verbosity,
                    "Critical point calculation converged in {} step(s)",
                    i
                );
                return State::new_nvt_reduced(eos, t, 1.0, rho);
            }
        }
        Err(options.not_converged("Critical point", max_iter))
    }

    /// Calculate the vapor and liquid spinodal states at given temperature and moles.
    pub fn spinodal(
        eos: &Arc<E>,
        temperature: SINumber,
        moles: Option<&SIArray1>,
        options: SolverOptions,
    ) -> EosResult<[Self; 2]> {
        let critical_point = Self::critical_point(eos, moles, None, options)?;
        let moles = eos.validate_moles(moles)?;
        let spinodal_vapor = Self::calculate_spinodal(
            eos,
            temperature,
            &moles,
            DensityInitialization::Vapor,
            options,
        )?;
        let rho = 2.0 * critical_point.density - spinodal_vapor.density;
        let spinodal_liquid = Self::calculate_spinodal(
            eos,
            temperature,
            &moles,
            DensityInitialization::InitialDensity(rho),
            options,
        )?;
        Ok([spinodal_vapor, spinodal_liquid])
    }

    fn calculate_spinodal(
        eos: &Arc<E>,
        temperature: SINumber,
        moles: &SIArray1,
        density_initialization: DensityInitialization,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let (max_iter, tol, verbosity) = options.unwrap_or(MAX_ITER_CRIT_POINT, TOL_CRIT_POINT);

        let max_density = eos
            .max_density(Some(moles))?
            .to_reduced(SIUnit::reference_density())?;
        let t = temperature.to_reduced(SIUnit::reference_temperature())?;
        let mut rho = match density_initialization {
            DensityInitialization::Vapor => 1e-5 * max_density,
            DensityInitialization::Liquid => max_density,
            DensityInitialization::InitialDensity(rho) => {
                rho.to_reduced(SIUnit::reference_density())?
            }
            DensityInitialization::None => {
                return Err(EosError::UndeterminedState(String::from(
                    "spinodal requires a density initialization",
                )))
            }
        };
        let n = moles.to_reduced(SIUnit::reference_moles())?;
        let n_dual = n.mapv(Dual64::from);
        let n_total = n.sum();

        log_iter!(verbosity, " iter |    residual    |       density        ");
        log_iter!(verbosity, "{:-<46}", "");
        log_iter!(
            verbosity,
            " {:4} |                | {:12.8}",
            0,
            rho * SIUnit::reference_density(),
        );

        for i in 1..=max_iter {
            // smallest eigenvalue and its derivative w.r.t. density
            let v = Dual64::from(rho).derivative().recip() * n_total;
            let (res, _) = stability_eigenpair(eos, Dual64::from(t), v, &n_dual)?;

            let mut delta = res.re / res.eps;
            if delta.abs() > 0.03 * max_density {
                delta *= 0.03 * max_density / delta.abs()
            }

            rho -= delta;
            rho = f64::max(rho, 1e-4 * max_density);

            log_iter!(
                verbosity,
                " {:4} | {:14.8e} | {:12.8}",
                i,
                res.re.abs(),
                rho * SIUnit::reference_density(),
            );

            if res.re.abs() < tol {
                log_result!(
                    verbosity,
                    "Spinodal calculation converged in {} step(s)",
                    i
                );
                return State::new_nvt_reduced(eos, t, n_total / rho, n);
            }
        }
        Err(EosError::SuperCritical)
    }
}

/// Ideal gas contribution to $\beta A$ without the temperature dependent
/// terms that are linear in the mole numbers.
///
/// Those terms do not contribute to the derivatives w.r.t. moles and
/// volume that define critical points.
fn ideal_gas_mixing<D: DualNum>(state: &StateHD<D>) -> EosResult<D> {
    state
        .moles
        .iter()
        .zip(state.partial_density.iter())
        .map(|(&n, &rho)| -> EosResult<D> { Ok(n * (rho.checked_ln()? - 1.0)) })
        .sum()
}

/// Smallest eigenvalue and eigenvector of the matrix
/// $Q_{ij}=\sqrt{n_in_j}\frac{\partial^2\beta A}{\partial n_i\partial n_j}$.
fn stability_eigenpair<E: Residual>(
    eos: &Arc<E>,
    temperature: Dual64,
    volume: Dual64,
    moles: &Array1<Dual64>,
) -> EosResult<(Dual64, Array1<Dual64>)> {
    let nc = eos.components();
    let t = HyperDual::from_re(temperature);
    let v = HyperDual::from_re(volume);
    let mut qij = Array2::zeros((nc, nc));
    for i in 0..nc {
        for j in i..nc {
            let mut m = moles.mapv(HyperDual::from_re);
            m[i].eps1 = Dual64::one();
            m[j].eps2 = Dual64::one();
            let state = StateHD::new(t, v, m);
            let a = eos.evaluate_residual(&state)? + ideal_gas_mixing(&state)?;
            let q = a.eps1eps2 * (moles[i] * moles[j]).sqrt();
            qij[[i, j]] = q;
            qij[[j, i]] = q;
        }
    }
    smallest_ev(&qij)
}

/// Smallest eigenvalue of the stability matrix and the third derivative of
/// $\beta A$ along the corresponding eigenvector.
fn criticality_conditions<E: Residual>(
    eos: &Arc<E>,
    temperature: Dual64,
    volume: Dual64,
    moles: &Array1<Dual64>,
) -> EosResult<[Dual64; 2]> {
    let (eval, evec) = stability_eigenpair(eos, temperature, volume, moles)?;

    let moles_s = Array1::from_shape_fn(eos.components(), |i| {
        Dual3::new(
            moles[i],
            evec[i] * moles[i].sqrt(),
            Dual64::zero(),
            Dual64::zero(),
        )
    });
    let state_s = StateHD::new(
        Dual3::from_re(temperature),
        Dual3::from_re(volume),
        moles_s,
    );
    let cubic = eos.evaluate_residual(&state_s)? + ideal_gas_mixing(&state_s)?;
    Ok([eval, cubic.v3])
}

/// Difference between the given pressure and the pressure at unit volume
/// and the given partial densities.
fn pressure_residual<E: Residual>(
    eos: &Arc<E>,
    pressure: f64,
    temperature: Dual64,
    density: &Array1<Dual64>,
) -> EosResult<Dual64> {
    let v = Dual::new(Dual64::one(), Dual64::one());
    let m = density.mapv(Dual::from_re);
    let state = StateHD::new(Dual::from_re(temperature), v, m);
    let a = eos.evaluate_residual(&state)? + ideal_gas_mixing(&state)?;
    Ok(a.eps * temperature + pressure)
}
