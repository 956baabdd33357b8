use crate::equation_of_state::Residual;
use crate::errors::{EosError, EosResult};
use crate::si::{SIArray1, SINumber, SIUnit, RGAS};
use crate::state::{Contributions, DensityInitialization, State};
use crate::{log_result, EosUnit};
use ndarray::Array1;
use std::fmt;
use std::sync::Arc;

mod phase_diagram_pure;
mod stability_analysis;
mod tp_flash;
mod vle_pure;
pub use phase_diagram_pure::PhaseDiagram;

/// Level of detail in the iteration output.
#[derive(Copy, Clone, Debug, Default, PartialOrd, Ord, PartialEq, Eq)]
pub enum Verbosity {
    /// Do not print output.
    #[default]
    None,
    /// Print information about the success or failure of the iteration.
    Result,
    /// Print a detailed output for every iteration.
    Iter,
}

/// Iteration limits and output of an iterative solver.
///
/// Unset values fall back to the defaults of the individual solver.
/// Exceeding `max_iter` is reported as [EosError::NotConverged].
///
/// ```
/// # use helmos_core::{SolverOptions, Verbosity};
/// let options = SolverOptions::default().max_iter(100).verbosity(Verbosity::Result);
/// assert_eq!(options.unwrap_or(50, 1e-10), (100, 1e-10, Verbosity::Result));
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct SolverOptions {
    pub max_iter: Option<usize>,
    pub tol: Option<f64>,
    pub verbosity: Verbosity,
}

impl SolverOptions {
    pub fn max_iter(self, max_iter: usize) -> Self {
        Self {
            max_iter: Some(max_iter),
            ..self
        }
    }

    pub fn tol(self, tol: f64) -> Self {
        Self {
            tol: Some(tol),
            ..self
        }
    }

    pub fn verbosity(self, verbosity: Verbosity) -> Self {
        Self { verbosity, ..self }
    }

    /// Iteration limit, tolerance and verbosity with solver defaults
    /// filled in.
    pub fn unwrap_or(self, max_iter: usize, tol: f64) -> (usize, f64, Verbosity) {
        (
            self.max_iter.unwrap_or(max_iter),
            self.tol.unwrap_or(tol),
            self.verbosity,
        )
    }

    /// Report that `solver` exhausted its iterations.
    pub(crate) fn not_converged(self, solver: &str, max_iter: usize) -> EosError {
        log_result!(
            self.verbosity,
            "{}: not converged in {} iteration(s)",
            solver,
            max_iter
        );
        EosError::NotConverged(solver.to_owned())
    }
}

/// Logarithm of mole fractions. Absent components contribute zero.
pub(super) fn ln_molefracs(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|x| if x > f64::EPSILON { x.ln() } else { 0.0 })
}

/// A thermodynamic equilibrium state.
///
/// The struct is parametrized over the number of phases. The phases are
/// sorted by density and all of them are described by the same model
/// instance.
///
/// ## Contents
///
/// + [Flash calculations](#flash-calculations)
/// + [Pure component phase equilibria](#pure-component-phase-equilibria)
/// + [Utility functions](#utility-functions)
#[derive(Debug)]
pub struct PhaseEquilibrium<E, const N: usize>([State<E>; N]);

impl<E, const N: usize> Clone for PhaseEquilibrium<E, N> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<E: Residual, const N: usize> fmt::Display for PhaseEquilibrium<E, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.0.iter().enumerate() {
            writeln!(f, "phase {}: {}", i, s)?;
        }
        Ok(())
    }
}

impl<E: Residual> PhaseEquilibrium<E, 2> {
    pub fn vapor(&self) -> &State<E> {
        &self.0[0]
    }

    pub fn liquid(&self) -> &State<E> {
        &self.0[1]
    }

    /// Create a phase equilibrium from two states, the state with the lower
    /// density being the vapor phase.
    ///
    /// # Errors
    ///
    /// [EosError::IncompatibleModels] if the states are not defined by the
    /// same model instance.
    pub fn from_states(state1: State<E>, state2: State<E>) -> EosResult<Self> {
        if !Arc::ptr_eq(&state1.eos, &state2.eos) {
            return Err(EosError::IncompatibleModels);
        }
        let (vapor, liquid) = if state1.density < state2.density {
            (state1, state2)
        } else {
            (state2, state1)
        };
        Ok(Self([vapor, liquid]))
    }

    /// Creates a new PhaseEquilibrium that contains two states at the
    /// specified temperature, pressure and moles.
    ///
    /// The constructor can be used in custom phase equilibrium solvers or,
    /// e.g., to generate initial guesses for an actual VLE solver.
    /// In general, the two states generated are NOT in an equilibrium.
    pub fn new_npt(
        eos: &Arc<E>,
        temperature: SINumber,
        pressure: SINumber,
        vapor_moles: &SIArray1,
        liquid_moles: &SIArray1,
    ) -> EosResult<Self> {
        let liquid = State::new_npt(
            eos,
            temperature,
            pressure,
            liquid_moles,
            DensityInitialization::Liquid,
        )?;
        let vapor = State::new_npt(
            eos,
            temperature,
            pressure,
            vapor_moles,
            DensityInitialization::Vapor,
        )?;
        Ok(Self([vapor, liquid]))
    }

    pub(super) fn vapor_phase_fraction(&self) -> EosResult<f64> {
        Ok((self.vapor().total_moles / (self.vapor().total_moles + self.liquid().total_moles))
            .into_value()?)
    }
}

impl<E: Residual, const N: usize> PhaseEquilibrium<E, N> {
    pub(super) fn update_pressure(
        mut self,
        temperature: SINumber,
        pressure: SINumber,
    ) -> EosResult<Self> {
        for s in self.0.iter_mut() {
            *s = State::new_npt(
                &s.eos,
                temperature,
                pressure,
                &s.moles,
                DensityInitialization::InitialDensity(s.density),
            )?;
        }
        Ok(self)
    }

    pub(super) fn update_moles(
        &mut self,
        pressure: SINumber,
        moles: [&SIArray1; N],
    ) -> EosResult<()> {
        for (s, m) in self.0.iter_mut().zip(moles) {
            *s = State::new_npt(
                &s.eos,
                s.temperature,
                pressure,
                m,
                DensityInitialization::InitialDensity(s.density),
            )?;
        }
        Ok(())
    }

    /// Gibbs energy of all phases relative to an ideal gas reference at the
    /// same temperature and total composition.
    ///
    /// Only differences between phase equilibria with the same feed are
    /// meaningful.
    pub(super) fn total_gibbs_energy(&self) -> EosResult<SINumber> {
        let mut g = 0.0 * SIUnit::reference_energy();
        for s in self.0.iter() {
            let rho = s.partial_density.to_reduced(SIUnit::reference_density())?;
            let n = s.moles.to_reduced(SIUnit::reference_moles())?;
            let ideal: f64 = n
                .iter()
                .zip(rho.iter())
                .filter(|(n, _)| **n > 0.0)
                .map(|(&n, &rho)| n * (rho.ln() - 1.0))
                .sum();
            g = g
                + s.residual_helmholtz_energy()?
                + s.pressure(Contributions::Total)? * s.volume
                + ideal * SIUnit::reference_moles() * RGAS * s.temperature;
        }
        Ok(g)
    }
}

const TRIVIAL_REL_DEVIATION: f64 = 1e-5;

/// # Utility functions
impl<E: Residual> PhaseEquilibrium<E, 2> {
    pub(super) fn check_trivial_solution(self) -> EosResult<Self> {
        if Self::is_trivial_solution(self.vapor(), self.liquid()) {
            Err(EosError::TrivialSolution)
        } else {
            Ok(self)
        }
    }

    /// Check if the two states form a trivial solution
    pub fn is_trivial_solution(state1: &State<E>, state2: &State<E>) -> bool {
        let rho1 = state1.partial_density.to_reduced(SIUnit::reference_density());
        let rho2 = state2.partial_density.to_reduced(SIUnit::reference_density());
        match (rho1, rho2) {
            (Ok(rho1), Ok(rho2)) => {
                rho1.iter()
                    .zip(rho2.iter())
                    .fold(0.0, |acc, (&rho1, &rho2)| {
                        (rho2 / rho1 - 1.0).abs().max(acc)
                    })
                    < TRIVIAL_REL_DEVIATION
            }
            _ => false,
        }
    }
}
