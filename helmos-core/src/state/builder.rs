use super::{DensityInitialization, State};
use crate::equation_of_state::{IdealGas, Residual};
use crate::errors::EosResult;
use crate::phase_equilibria::SolverOptions;
use crate::si::{SIArray1, SINumber};
use ndarray::Array1;
use std::sync::Arc;

/// Every quantity a state can be specified by. Unset inputs are `None`.
#[derive(Clone, Copy, Default)]
pub(super) struct StateInputs<'a> {
    pub(super) temperature: Option<SINumber>,
    pub(super) volume: Option<SINumber>,
    pub(super) density: Option<SINumber>,
    pub(super) partial_density: Option<&'a SIArray1>,
    pub(super) total_moles: Option<SINumber>,
    pub(super) moles: Option<&'a SIArray1>,
    pub(super) molefracs: Option<&'a Array1<f64>>,
    pub(super) pressure: Option<SINumber>,
    pub(super) molar_enthalpy: Option<SINumber>,
    pub(super) molar_entropy: Option<SINumber>,
    pub(super) molar_internal_energy: Option<SINumber>,
    pub(super) density_initialization: DensityInitialization,
    pub(super) initial_temperature: Option<SINumber>,
    pub(super) options: SolverOptions,
}

/// Construct [State]s from any sufficient combination of inputs.
///
/// Specifying a molar enthalpy, entropy or internal energy requires an
/// ideal gas model. The const parameter records whether one of them was
/// given, so `build` is only available when the model can handle it.
///
/// If the inputs determine the state directly ($T$ and $V$ or $\rho$ with a
/// composition), no iteration is needed. Otherwise, in this order, a density
/// iteration at given $p$ and $T$ or a Newton iteration on $(p, h)$, $(p, s)$,
/// $(T, h)$, $(T, s)$ or $(V, u)$ is used. [StateBuilder::solver_options]
/// controls all of these iterations.
///
/// # Examples
/// ```
/// # use helmos_core::{EosResult, StateBuilder};
/// # use helmos_core::cubic::{PengRobinson, PengRobinsonParameters};
/// # use helmos_core::si::*;
/// # use std::sync::Arc;
/// # use ndarray::arr1;
/// # use approx::assert_relative_eq;
/// # fn main() -> EosResult<()> {
/// let params = PengRobinsonParameters::new_simple(&[369.8], &[41.9 * 1e5], &[0.15], &[15.0])?;
/// let eos = Arc::new(PengRobinson::new(Arc::new(params)));
///
/// let state = StateBuilder::new(&eos)
///     .temperature(300.0 * KELVIN)
///     .volume(12.5 * METER.powi(3))
///     .total_moles(2.5 * MOL)
///     .build()?;
/// assert_relative_eq!(state.density, 0.2 * MOL / METER.powi(3));
///
/// // without an extensive input, the reference amount of substance is used
/// let params = PengRobinsonParameters::new_simple(
///     &[369.8, 305.4],
///     &[41.9 * 1e5, 48.2 * 1e5],
///     &[0.15, 0.10],
///     &[15.0, 30.0],
/// )?;
/// let eos = Arc::new(PengRobinson::new(Arc::new(params)));
/// let partial_density = arr1(&[0.2, 0.6]) * MOL / METER.powi(3);
/// let state = StateBuilder::new(&eos)
///     .temperature(300.0 * KELVIN)
///     .partial_density(&partial_density)
///     .build()?;
/// assert_relative_eq!(state.molefracs, arr1(&[0.25, 0.75]));
/// # Ok(())
/// # }
/// ```
pub struct StateBuilder<'a, E, const IG: bool> {
    eos: Arc<E>,
    inputs: StateInputs<'a>,
}

impl<'a, E: Residual> StateBuilder<'a, E, false> {
    /// Create a new `StateBuilder` for the given equation of state.
    pub fn new(eos: &Arc<E>) -> Self {
        Self {
            eos: eos.clone(),
            inputs: StateInputs::default(),
        }
    }

    /// Try to build the state with the given inputs.
    pub fn build(self) -> EosResult<State<E>> {
        State::from_inputs(&self.eos, &self.inputs)
    }
}

impl<'a, E: Residual + IdealGas> StateBuilder<'a, E, true> {
    /// Try to build the state with the given inputs.
    pub fn build(self) -> EosResult<State<E>> {
        State::from_inputs_full(&self.eos, &self.inputs)
    }
}

impl<'a, E: Residual, const IG: bool> StateBuilder<'a, E, IG> {
    fn set(mut self, f: impl FnOnce(&mut StateInputs<'a>)) -> Self {
        f(&mut self.inputs);
        self
    }

    pub fn temperature(self, temperature: SINumber) -> Self {
        self.set(|i| i.temperature = Some(temperature))
    }

    pub fn volume(self, volume: SINumber) -> Self {
        self.set(|i| i.volume = Some(volume))
    }

    /// Total density. Conflicts with [StateBuilder::partial_density].
    pub fn density(self, density: SINumber) -> Self {
        self.set(|i| i.density = Some(density))
    }

    /// Partial densities, which fix both density and composition.
    pub fn partial_density(self, partial_density: &'a SIArray1) -> Self {
        self.set(|i| i.partial_density = Some(partial_density))
    }

    pub fn total_moles(self, total_moles: SINumber) -> Self {
        self.set(|i| i.total_moles = Some(total_moles))
    }

    /// Mole numbers, which fix both amount and composition.
    pub fn moles(self, moles: &'a SIArray1) -> Self {
        self.set(|i| i.moles = Some(moles))
    }

    pub fn molefracs(self, molefracs: &'a Array1<f64>) -> Self {
        self.set(|i| i.molefracs = Some(molefracs))
    }

    pub fn pressure(self, pressure: SINumber) -> Self {
        self.set(|i| i.pressure = Some(pressure))
    }

    /// Start density iterations from the ideal gas.
    pub fn vapor(self) -> Self {
        self.set(|i| i.density_initialization = DensityInitialization::Vapor)
    }

    /// Start density iterations from the maximum density.
    pub fn liquid(self) -> Self {
        self.set(|i| i.density_initialization = DensityInitialization::Liquid)
    }

    pub fn initial_density(self, initial_density: SINumber) -> Self {
        self.set(|i| {
            i.density_initialization = DensityInitialization::InitialDensity(initial_density)
        })
    }

    /// Iteration limits and output for the solver that resolves the state.
    pub fn solver_options(self, options: SolverOptions) -> Self {
        self.set(|i| i.options = options)
    }
}

impl<'a, E: Residual + IdealGas, const IG: bool> StateBuilder<'a, E, IG> {
    fn with_ideal_gas(self, f: impl FnOnce(&mut StateInputs<'a>)) -> StateBuilder<'a, E, true> {
        let mut inputs = self.inputs;
        f(&mut inputs);
        StateBuilder {
            eos: self.eos,
            inputs,
        }
    }

    pub fn molar_enthalpy(self, molar_enthalpy: SINumber) -> StateBuilder<'a, E, true> {
        self.with_ideal_gas(|i| i.molar_enthalpy = Some(molar_enthalpy))
    }

    pub fn molar_entropy(self, molar_entropy: SINumber) -> StateBuilder<'a, E, true> {
        self.with_ideal_gas(|i| i.molar_entropy = Some(molar_entropy))
    }

    pub fn molar_internal_energy(
        self,
        molar_internal_energy: SINumber,
    ) -> StateBuilder<'a, E, true> {
        self.with_ideal_gas(|i| i.molar_internal_energy = Some(molar_internal_energy))
    }

    /// Starting temperature of the Newton iteration for energy inputs.
    pub fn initial_temperature(self, initial_temperature: SINumber) -> StateBuilder<'a, E, true> {
        self.with_ideal_gas(|i| i.initial_temperature = Some(initial_temperature))
    }
}

impl<'a, E, const IG: bool> Clone for StateBuilder<'a, E, IG> {
    fn clone(&self) -> Self {
        Self {
            eos: self.eos.clone(),
            inputs: self.inputs,
        }
    }
}
