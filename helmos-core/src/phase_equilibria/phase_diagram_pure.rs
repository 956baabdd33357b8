use super::{PhaseEquilibrium, SolverOptions};
use crate::equation_of_state::Residual;
use crate::errors::EosResult;
use crate::si::{SIArray1, SINumber};
#[cfg(feature = "rayon")]
use crate::si::SIUnit;
use crate::state::State;
#[cfg(feature = "rayon")]
use crate::EosUnit;
#[cfg(feature = "rayon")]
use ndarray::{Array1, ArrayView1, Axis};
#[cfg(feature = "rayon")]
use rayon::{prelude::*, ThreadPool};
use std::sync::Arc;

/// Pure component phase diagram: a list of vapor-liquid equilibria
/// that ends at the critical point.
pub struct PhaseDiagram<E> {
    pub states: Vec<PhaseEquilibrium<E, 2>>,
}

impl<E> Clone for PhaseDiagram<E> {
    fn clone(&self) -> Self {
        Self {
            states: self.states.clone(),
        }
    }
}

impl<E> PhaseDiagram<E> {
    /// Create a phase diagram from a list of phase equilibria.
    pub fn new(states: Vec<PhaseEquilibrium<E, 2>>) -> Self {
        Self { states }
    }
}

impl<E: Residual> PhaseDiagram<E> {
    /// Temperatures between `min_temperature` and the critical point.
    /// The critical point itself is not included.
    fn temperatures(
        eos: &Arc<E>,
        min_temperature: SINumber,
        npoints: usize,
        critical_temperature: Option<SINumber>,
    ) -> EosResult<(State<E>, SIArray1)> {
        let sc = State::critical_point(eos, None, critical_temperature, SolverOptions::default())?;
        let npoints = npoints.max(2);
        let max_temperature = min_temperature
            + (sc.temperature - min_temperature) * ((npoints - 2) as f64 / (npoints - 1) as f64);
        let temperatures = SIArray1::linspace(min_temperature, max_temperature, npoints - 1)?;
        Ok((sc, temperatures))
    }

    /// Calculate a phase diagram for a pure component.
    ///
    /// Every equilibrium is used as initial guess for the next temperature.
    /// Temperatures at which the solver fails are skipped.
    pub fn pure(
        eos: &Arc<E>,
        min_temperature: SINumber,
        npoints: usize,
        critical_temperature: Option<SINumber>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let (sc, temperatures) =
            Self::temperatures(eos, min_temperature, npoints, critical_temperature)?;

        let mut states = Vec::with_capacity(npoints);
        let mut vle = None;
        for t in temperatures.iter() {
            vle = PhaseEquilibrium::pure(eos, t, vle.as_ref(), options).ok();
            if let Some(vle) = vle.as_ref() {
                states.push(vle.clone());
            }
        }
        states.push(PhaseEquilibrium::from_states(sc.clone(), sc)?);
        Ok(Self::new(states))
    }

    /// Return the vapor states of the diagram.
    pub fn vapor(&self) -> Vec<&State<E>> {
        self.states.iter().map(|s| s.vapor()).collect()
    }

    /// Return the liquid states of the diagram.
    pub fn liquid(&self) -> Vec<&State<E>> {
        self.states.iter().map(|s| s.liquid()).collect()
    }
}

#[cfg(feature = "rayon")]
impl<E: Residual + Send + Sync> PhaseDiagram<E> {
    fn solve_temperatures(
        eos: &Arc<E>,
        temperatures: ArrayView1<f64>,
        options: SolverOptions,
    ) -> Vec<PhaseEquilibrium<E, 2>> {
        let mut states = Vec::with_capacity(temperatures.len());
        let mut vle = None;
        for &t in temperatures {
            let t = t * SIUnit::reference_temperature();
            vle = PhaseEquilibrium::pure(eos, t, vle.as_ref(), options).ok();
            if let Some(vle) = vle.as_ref() {
                states.push(vle.clone());
            }
        }
        states
    }

    /// Calculate a phase diagram for a pure component in parallel.
    ///
    /// The temperatures are split into chunks of size `chunksize` that
    /// are solved independently on the given thread pool.
    pub fn par_pure(
        eos: &Arc<E>,
        min_temperature: SINumber,
        npoints: usize,
        chunksize: usize,
        thread_pool: ThreadPool,
        critical_temperature: Option<SINumber>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let (sc, temperatures) =
            Self::temperatures(eos, min_temperature, npoints, critical_temperature)?;
        let temperatures: Array1<f64> =
            temperatures.to_reduced(SIUnit::reference_temperature())?;

        let mut states: Vec<PhaseEquilibrium<E, 2>> = thread_pool.install(|| {
            temperatures
                .axis_chunks_iter(Axis(0), chunksize.max(1))
                .into_par_iter()
                .map(|t| Self::solve_temperatures(eos, t, options))
                .flatten()
                .collect()
        });

        states.push(PhaseEquilibrium::from_states(sc.clone(), sc)?);
        Ok(Self::new(states))
    }
}
