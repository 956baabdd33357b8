//! Description of a thermodynamic state.
//!
//! A thermodynamic state is defined by
//! * a temperature
//! * an array of mole numbers
//! * the volume
//!
//! Internally, all properties are computed using such states as input.
use crate::density_iteration::density_iteration;
use crate::dual::{Dual3_64, Dual64, DualNum, HyperDual64};
use crate::equation_of_state::{IdealGas, Residual};
use crate::errors::{EosError, EosResult};
use crate::phase_equilibria::SolverOptions;
use crate::si::*;
use crate::{log_iter, log_result, EosUnit};
use builder::StateInputs;
use cache::Cache;
use ndarray::prelude::*;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

mod builder;
mod cache;
mod critical_point;
mod properties;
mod residual_properties;
pub use builder::StateBuilder;
pub(crate) use cache::CacheContribution;

/// Possible contributions that can be computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Contributions {
    /// Only compute the ideal gas contribution
    IdealGas,
    /// Only compute the difference between the total and the ideal gas contribution
    /// at the same temperature, volume and composition
    Residual,
    /// Compute the difference between the total and the ideal gas contribution
    /// for a reference state at the same temperature, pressure and composition
    ResidualNpt,
    /// Compute ideal gas and residual contributions
    Total,
}

/// Initial values in a density iteration.
#[derive(Clone, Copy, Debug, Default)]
pub enum DensityInitialization {
    /// Calculate a vapor phase by initializing using the ideal gas.
    Vapor,
    /// Calculate a liquid phase by using the `max_density`.
    Liquid,
    /// Use the given density as initial value.
    InitialDensity(SINumber),
    /// Calculate the most stable phase by calculating both a vapor and a liquid
    /// and return the one with the lower molar Gibbs energy.
    #[default]
    None,
}

/// Thermodynamic state of the system in reduced variables
/// including their derivatives.
///
/// Properties are stored as generalized (hyper) dual numbers which allows
/// for automatic differentiation.
#[derive(Clone, Debug)]
pub struct StateHD<D> {
    /// temperature in Kelvin
    pub temperature: D,
    /// volume in Angstrom^3
    pub volume: D,
    /// number of particles
    pub moles: Array1<D>,
    /// mole fractions
    pub molefracs: Array1<D>,
    /// partial number densities in Angstrom^-3
    pub partial_density: Array1<D>,
}

impl<D: DualNum> StateHD<D> {
    /// Create a new `StateHD` for given temperature volume and moles.
    pub fn new(temperature: D, volume: D, moles: Array1<D>) -> Self {
        let total_moles = moles.sum();
        let partial_density = moles.mapv(|n| n / volume);
        let molefracs = moles.mapv(|n| n / total_moles);

        Self {
            temperature,
            volume,
            moles,
            molefracs,
            partial_density,
        }
    }

    // The mole fractions can not be recovered from the moles at zero density.
    pub(crate) fn new_virial(temperature: D, density: D, molefracs: Array1<f64>) -> Self {
        let volume = D::one();
        let partial_density = molefracs.mapv(|x| density * x);
        let moles = partial_density.mapv(|pd| pd * volume);
        let molefracs = molefracs.mapv(D::from);
        Self {
            temperature,
            volume,
            moles,
            molefracs,
            partial_density,
        }
    }
}

/// Thermodynamic state of the system.
///
/// The state is always specified by the variables of the Helmholtz energy: volume $V$,
/// temperature $T$ and mole numbers $N_i$. Additional to these variables, the state saves
/// properties like the density, that can be calculated directly from the basic variables.
/// The state also contains a reference to the equation of state used to create the state.
/// Therefore, it can be used directly to calculate all state properties.
///
/// Calculated partial derivatives are cached in the state. Therefore, the second evaluation
/// of a property like the pressure, does not require a recalculation of the equation of state.
/// In the calculation of a derivative all lower derivatives are calculated as well. Since they
/// are cached, it is more efficient to calculate the highest derivatives first.
///
/// `State` objects are immutable. All constructors validate their inputs.
#[derive(Debug)]
pub struct State<E> {
    /// Equation of state
    pub eos: Arc<E>,
    /// Temperature $T$
    pub temperature: SINumber,
    /// Volume $V$
    pub volume: SINumber,
    /// Mole numbers $N_i$
    pub moles: SIArray1,
    /// Total number of moles $N=\sum_iN_i$
    pub total_moles: SINumber,
    /// Partial densities $\rho_i=\frac{N_i}{V}$
    pub partial_density: SIArray1,
    /// Total density $\rho=\frac{N}{V}=\sum_i\rho_i$
    pub density: SINumber,
    /// Mole fractions $x_i=\frac{N_i}{N}=\frac{\rho_i}{\rho}$
    pub molefracs: Array1<f64>,
    reduced_temperature: f64,
    reduced_volume: f64,
    reduced_moles: Array1<f64>,
    cache: Mutex<Cache>,
}

impl<E> State<E> {
    pub(crate) fn cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E> Clone for State<E> {
    fn clone(&self) -> Self {
        Self {
            eos: self.eos.clone(),
            total_moles: self.total_moles,
            temperature: self.temperature,
            volume: self.volume,
            moles: self.moles.clone(),
            partial_density: self.partial_density.clone(),
            density: self.density,
            molefracs: self.molefracs.clone(),
            reduced_temperature: self.reduced_temperature,
            reduced_volume: self.reduced_volume,
            reduced_moles: self.reduced_moles.clone(),
            cache: Mutex::new(self.cache().clone()),
        }
    }
}

impl<E: Residual> fmt::Display for State<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.eos.components() == 1 {
            write!(f, "T = {:.5}, ρ = {:.5}", self.temperature, self.density)
        } else {
            write!(
                f,
                "T = {:.5}, ρ = {:.5}, x = {:.5}",
                self.temperature, self.density, self.molefracs
            )
        }
    }
}

/// Derivatives of the helmholtz energy.
#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug, PartialOrd, Ord)]
pub enum Derivative {
    /// Derivative with respect to system volume.
    DV,
    /// Derivative with respect to temperature.
    DT,
    /// Derivative with respect to component `i`.
    DN(usize),
}

impl Derivative {
    /// Reference value of the variable.
    pub fn reference(&self) -> SINumber {
        match self {
            Derivative::DV => SIUnit::reference_volume(),
            Derivative::DT => SIUnit::reference_temperature(),
            Derivative::DN(_) => SIUnit::reference_moles(),
        }
    }
}

/// Order and variables of a partial derivative of the Helmholtz energy.
#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug)]
pub enum PartialDerivative {
    Zeroth,
    First(Derivative),
    /// Second (mixed) derivative. Use [PartialDerivative::second] to construct it.
    Second(Derivative, Derivative),
    Third(Derivative),
}

impl PartialDerivative {
    /// Second partial derivative with the variables in canonical order.
    pub fn second(derivative1: Derivative, derivative2: Derivative) -> Self {
        Self::Second(derivative1.min(derivative2), derivative1.max(derivative2))
    }

    /// Reference value of the partial derivative of an energy.
    pub fn reference(&self) -> SINumber {
        let energy = SIUnit::reference_energy();
        match self {
            Self::Zeroth => energy,
            Self::First(d) => energy / d.reference(),
            Self::Second(d1, d2) => energy / (d1.reference() * d2.reference()),
            Self::Third(d) => energy / d.reference().powi(3),
        }
    }
}

/// # State constructors
impl<E: Residual> State<E> {
    /// Return a new `State` given a temperature, an array of mole numbers and a volume.
    ///
    /// This function will perform a validation of the given properties, i.e. test for units,
    /// signs and if values are finite. It will **not** validate physics, i.e. if the resulting
    /// densities are below the maximum packing fraction.
    pub fn new_nvt(
        eos: &Arc<E>,
        temperature: SINumber,
        volume: SINumber,
        moles: &SIArray1,
    ) -> EosResult<Self> {
        let m = eos
            .validate_moles(Some(moles))?
            .to_reduced(SIUnit::reference_moles())?;
        let t = temperature.to_reduced(SIUnit::reference_temperature())?;
        let v = volume.to_reduced(SIUnit::reference_volume())?;
        Self::new_nvt_reduced(eos, t, v, m)
    }

    /// Create a state from temperature, volume and moles in reduced units.
    pub(crate) fn new_nvt_reduced(
        eos: &Arc<E>,
        temperature: f64,
        volume: f64,
        moles: Array1<f64>,
    ) -> EosResult<Self> {
        if moles.len() != eos.components() {
            return Err(EosError::IncompatibleComponents(
                eos.components(),
                moles.len(),
            ));
        }
        validate(temperature, volume, &moles)?;

        let n = moles.sum();
        Ok(State {
            eos: eos.clone(),
            total_moles: n * SIUnit::reference_moles(),
            temperature: temperature * SIUnit::reference_temperature(),
            volume: volume * SIUnit::reference_volume(),
            moles: &moles * SIUnit::reference_moles(),
            partial_density: (&moles / volume) * SIUnit::reference_density(),
            density: n / volume * SIUnit::reference_density(),
            molefracs: &moles / n,
            reduced_temperature: temperature,
            reduced_volume: volume,
            reduced_moles: moles,
            cache: Mutex::new(Cache::with_capacity(eos.components())),
        })
    }

    /// Return a new `State` for a pure component given a temperature and a density. The moles
    /// are set to the reference value for each component.
    ///
    /// This function will perform a validation of the given properties, i.e. test for signs
    /// and if values are finite. It will **not** validate physics, i.e. if the resulting
    /// densities are below the maximum packing fraction.
    pub fn new_pure(eos: &Arc<E>, temperature: SINumber, density: SINumber) -> EosResult<Self> {
        let moles = eos.validate_moles(None)?;
        Self::new_nvt(eos, temperature, SIUnit::reference_moles() / density, &moles)
    }

    /// Resolve a state from the inputs collected by a [StateBuilder].
    fn from_inputs(eos: &Arc<E>, inputs: &StateInputs) -> EosResult<Self> {
        match Self::resolve(eos, inputs)? {
            Resolved::State(state) => Ok(state),
            Resolved::Moles(_) => Err(missing_inputs()),
        }
    }

    /// Create the state if temperature, volume or pressure and an amount
    /// of substance suffice. Otherwise return the mole numbers implied by
    /// the inputs for the energy based constructors.
    fn resolve(eos: &Arc<E>, inputs: &StateInputs) -> EosResult<Resolved<E>> {
        let density = match (inputs.density, inputs.partial_density) {
            (Some(_), Some(_)) => return Err(overdetermined("density")),
            (rho, partial) => rho.or_else(|| partial.map(|pd| pd.sum())),
        };
        let mut total_moles = match (inputs.total_moles, inputs.moles) {
            (Some(_), Some(_)) => return Err(overdetermined("amount of substance")),
            (n, moles) => n.or_else(|| moles.map(|m| m.sum())),
        };
        if let (Some(rho), Some(v)) = (density, inputs.volume) {
            if total_moles.is_some() {
                return Err(overdetermined("density"));
            }
            total_moles = Some(rho * v);
        }
        let molefracs = Self::resolve_molefracs(eos, inputs)?;

        // without any extensive input the reference amount is used
        if inputs.volume.is_none() && total_moles.is_none() {
            total_moles = Some(SIUnit::reference_moles());
        }
        let moles = total_moles.map(|n| &molefracs * n);
        let volume = inputs
            .volume
            .or_else(|| density.zip(total_moles).map(|(rho, n)| n / rho));

        let (init, options) = (inputs.density_initialization, inputs.options);
        let state = match (inputs.temperature, volume, &moles, inputs.pressure) {
            (Some(t), Some(v), Some(n), _) => Self::new_nvt(eos, t, v, n)?,
            (Some(t), _, Some(n), Some(p)) => Self::new_npt_with_options(eos, t, p, n, init, options)?,
            (Some(t), Some(v), None, Some(p)) => {
                let reference = &molefracs * SIUnit::reference_moles();
                let state = Self::new_npt_with_options(eos, t, p, &reference, init, options)?;
                Self::new_nvt(eos, t, v, &(state.partial_density * v))?
            }
            _ => return Ok(Resolved::Moles(moles)),
        };
        Ok(Resolved::State(state))
    }

    fn resolve_molefracs(eos: &Arc<E>, inputs: &StateInputs) -> EosResult<Array1<f64>> {
        let from_amounts = match (inputs.partial_density, inputs.moles) {
            (Some(_), Some(_)) => return Err(overdetermined("composition")),
            (Some(amounts), None) | (None, Some(amounts)) => {
                Some((amounts / amounts.sum()).into_value()?)
            }
            (None, None) => None,
        };
        match (from_amounts, inputs.molefracs) {
            (Some(_), Some(_)) => Err(overdetermined("composition")),
            (Some(x), None) => Ok(x),
            (None, Some(x)) => Ok(x.clone()),
            (None, None) if eos.components() == 1 => Ok(arr1(&[1.0])),
            (None, None) => Err(EosError::UndeterminedState(String::from(
                "Missing composition.",
            ))),
        }
    }

    /// Return a new `State` using a density iteration. [DensityInitialization] is used to
    /// influence the calculation with respect to the possible solutions.
    ///
    /// Without an initialization, a vapor-like and a liquid-like solution are calculated and
    /// the one with the lower Gibbs energy is returned. If both iterations converge to the same
    /// root, that root is the result.
    pub fn new_npt(
        eos: &Arc<E>,
        temperature: SINumber,
        pressure: SINumber,
        moles: &SIArray1,
        density_initialization: DensityInitialization,
    ) -> EosResult<Self> {
        let options = SolverOptions::default();
        Self::new_npt_with_options(eos, temperature, pressure, moles, density_initialization, options)
    }

    /// [State::new_npt] with explicit iteration limits for the density iteration.
    ///
    /// If neither start converges, the error of the liquid start is returned.
    pub fn new_npt_with_options(
        eos: &Arc<E>,
        temperature: SINumber,
        pressure: SINumber,
        moles: &SIArray1,
        density_initialization: DensityInitialization,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let max_density = eos.max_density(Some(moles))?;
        let ideal_gas_density = pressure / temperature / RGAS;
        let iterate = |rho0| density_iteration(eos, temperature, pressure, moles, rho0, options);

        match density_initialization {
            DensityInitialization::InitialDensity(rho0) => return iterate(rho0),
            DensityInitialization::Vapor => return iterate(ideal_gas_density),
            DensityInitialization::Liquid => return iterate(max_density),
            DensityInitialization::None => (),
        }

        let liquid = iterate(max_density);
        // no vapor-like root below the maximum density
        if ideal_gas_density >= max_density {
            return liquid;
        }
        match (liquid, iterate(ideal_gas_density)) {
            (Ok(l), Ok(v)) => {
                if v.residual_gibbs_energy()? < l.residual_gibbs_energy()? {
                    Ok(v)
                } else {
                    Ok(l)
                }
            }
            (Ok(state), Err(_)) | (Err(_), Ok(state)) => Ok(state),
            (Err(e), Err(_)) => Err(e),
        }
    }

    /// Return a new `State` for given pressure $p$, volume $V$, temperature $T$ and composition $x_i$.
    pub fn new_npvx(
        eos: &Arc<E>,
        temperature: SINumber,
        pressure: SINumber,
        volume: SINumber,
        molefracs: &Array1<f64>,
        density_initialization: DensityInitialization,
    ) -> EosResult<Self> {
        let moles = molefracs * SIUnit::reference_moles();
        let state = Self::new_npt(eos, temperature, pressure, &moles, density_initialization)?;
        let moles = state.partial_density * volume;
        Self::new_nvt(eos, temperature, volume, &moles)
    }
}

/// Outcome of resolving builder inputs without an ideal gas model.
enum Resolved<E> {
    State(State<E>),
    Moles(Option<SIArray1>),
}

fn overdetermined(quantity: &str) -> EosError {
    EosError::UndeterminedState(format!("The {quantity} is overdetermined."))
}

fn missing_inputs() -> EosError {
    EosError::UndeterminedState(String::from("Missing input parameters."))
}

/// # Constructors from caloric properties
///
/// These need an ideal gas model. All of them run a Newton iteration with
/// at most 50 steps and a relative tolerance of 1e-10 unless the
/// [SolverOptions] say otherwise.
impl<E: Residual + IdealGas> State<E> {
    /// Resolve a state from the inputs collected by a [StateBuilder],
    /// including molar enthalpy, entropy and internal energy.
    ///
    /// Pairs are tried in the order $(p, h)$, $(p, s)$, $(T, h)$, $(T, s)$, $(V, u)$.
    fn from_inputs_full(eos: &Arc<E>, inputs: &StateInputs) -> EosResult<Self> {
        let moles = match Self::resolve(eos, inputs)? {
            Resolved::State(state) => return Ok(state),
            Resolved::Moles(Some(moles)) => moles,
            Resolved::Moles(None) => return Err(missing_inputs()),
        };
        let n = &moles;
        let (init, t0, options) = (
            inputs.density_initialization,
            inputs.initial_temperature,
            inputs.options,
        );
        match (
            inputs.pressure,
            inputs.temperature,
            inputs.volume,
            inputs.molar_enthalpy,
            inputs.molar_entropy,
            inputs.molar_internal_energy,
        ) {
            (Some(p), _, _, Some(h), _, _) => Self::new_nph(eos, p, h, n, init, t0, options),
            (Some(p), _, _, _, Some(s), _) => Self::new_nps(eos, p, s, n, init, t0, options),
            (_, Some(t), _, Some(h), _, _) => Self::new_nth(eos, t, h, n, init, options),
            (_, Some(t), _, _, Some(s), _) => Self::new_nts(eos, t, s, n, init, options),
            (_, _, Some(v), _, _, Some(u)) => Self::new_nvu(eos, v, u, n, t0, options),
            _ => Err(missing_inputs()),
        }
    }

    /// Return a new `State` for given pressure $p$ and molar enthalpy $h$.
    ///
    /// Iterates on the temperature. Every step reuses the previous density
    /// as start of the inner density iteration.
    pub fn new_nph(
        eos: &Arc<E>,
        pressure: SINumber,
        molar_enthalpy: SINumber,
        moles: &SIArray1,
        density_initialization: DensityInitialization,
        initial_temperature: Option<SINumber>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let h = molar_enthalpy.to_reduced(SIUnit::reference_molar_energy())?;
        let t0 = reduced_initial_temperature(initial_temperature)?;
        let mut density = density_initialization;
        let f = |t: f64| -> EosResult<_> {
            let temperature = t * SIUnit::reference_temperature();
            let s = State::new_npt(eos, temperature, pressure, moles, density)?;
            density = DensityInitialization::InitialDensity(s.density);
            let h_s = s.molar_enthalpy(Contributions::Total)?;
            let cp = s.molar_isobaric_heat_capacity(Contributions::Total)?;
            Ok((
                h_s.to_reduced(SIUnit::reference_molar_energy())? - h,
                cp.to_reduced(SIUnit::reference_molar_entropy())?,
                s,
            ))
        };
        newton("new_nph", t0, f, 1.0e-8, options)
    }

    /// Return a new `State` for given pressure $p$ and molar entropy $s$.
    pub fn new_nps(
        eos: &Arc<E>,
        pressure: SINumber,
        molar_entropy: SINumber,
        moles: &SIArray1,
        density_initialization: DensityInitialization,
        initial_temperature: Option<SINumber>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let s_target = molar_entropy.to_reduced(SIUnit::reference_molar_entropy())?;
        let t0 = reduced_initial_temperature(initial_temperature)?;
        let mut density = density_initialization;
        let f = |t: f64| -> EosResult<_> {
            let temperature = t * SIUnit::reference_temperature();
            let s = State::new_npt(eos, temperature, pressure, moles, density)?;
            density = DensityInitialization::InitialDensity(s.density);
            let s_s = s.molar_entropy(Contributions::Total)?;
            let cp_t = s.molar_isobaric_heat_capacity(Contributions::Total)? / s.temperature;
            Ok((
                s_s.to_reduced(SIUnit::reference_molar_entropy())? - s_target,
                cp_t.to_reduced(
                    SIUnit::reference_molar_entropy() / SIUnit::reference_temperature(),
                )?,
                s,
            ))
        };
        newton("new_nps", t0, f, 1.0e-8, options)
    }

    /// Return a new `State` for given temperature $T$ and molar enthalpy $h$.
    ///
    /// Iterates on the density at fixed temperature.
    pub fn new_nth(
        eos: &Arc<E>,
        temperature: SINumber,
        molar_enthalpy: SINumber,
        moles: &SIArray1,
        density_initialization: DensityInitialization,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let h = molar_enthalpy.to_reduced(SIUnit::reference_molar_energy())?;
        let rho0 = initial_density(eos, moles, density_initialization)?;
        let n = moles.sum();
        let f = |rho: f64| -> EosResult<_> {
            let volume = n / (rho * SIUnit::reference_density());
            let s = State::new_nvt(eos, temperature, volume, moles)?;
            // (dh/drho)_T = -(V dp/dV + T dp/dT) / rho^2
            let dp = s.volume * s.dp_dv(Contributions::Total)?
                + temperature * s.dp_dt(Contributions::Total)?;
            let dh_drho = -dp / (s.density * s.density);
            Ok((
                s.molar_enthalpy(Contributions::Total)?
                    .to_reduced(SIUnit::reference_molar_energy())?
                    - h,
                dh_drho.to_reduced(
                    SIUnit::reference_molar_energy() / SIUnit::reference_density(),
                )?,
                s,
            ))
        };
        newton("new_nth", rho0, f, 1.0e-12, options)
    }

    /// Return a new `State` for given temperature $T$ and molar entropy $s$.
    pub fn new_nts(
        eos: &Arc<E>,
        temperature: SINumber,
        molar_entropy: SINumber,
        moles: &SIArray1,
        density_initialization: DensityInitialization,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let s_target = molar_entropy.to_reduced(SIUnit::reference_molar_entropy())?;
        let rho0 = initial_density(eos, moles, density_initialization)?;
        let n = moles.sum();
        let f = |rho: f64| -> EosResult<_> {
            let volume = n / (rho * SIUnit::reference_density());
            let s = State::new_nvt(eos, temperature, volume, moles)?;
            // (ds/drho)_T = -(dp/dT)_V / rho^2
            let ds_drho = -s.dp_dt(Contributions::Total)? / (s.density * s.density);
            Ok((
                s.molar_entropy(Contributions::Total)?
                    .to_reduced(SIUnit::reference_molar_entropy())?
                    - s_target,
                ds_drho.to_reduced(
                    SIUnit::reference_molar_entropy() / SIUnit::reference_density(),
                )?,
                s,
            ))
        };
        newton("new_nts", rho0, f, 1.0e-12, options)
    }

    /// Return a new `State` for given volume $V$ and molar internal energy $u$.
    pub fn new_nvu(
        eos: &Arc<E>,
        volume: SINumber,
        molar_internal_energy: SINumber,
        moles: &SIArray1,
        initial_temperature: Option<SINumber>,
        options: SolverOptions,
    ) -> EosResult<Self> {
        let u = molar_internal_energy.to_reduced(SIUnit::reference_molar_energy())?;
        let t0 = reduced_initial_temperature(initial_temperature)?;
        let f = |t: f64| -> EosResult<_> {
            let s = State::new_nvt(eos, t * SIUnit::reference_temperature(), volume, moles)?;
            let u_s = s.molar_internal_energy(Contributions::Total)?;
            let cv = s.molar_isochoric_heat_capacity(Contributions::Total)?;
            Ok((
                u_s.to_reduced(SIUnit::reference_molar_energy())? - u,
                cv.to_reduced(SIUnit::reference_molar_entropy())?,
                s,
            ))
        };
        newton("new_nvu", t0, f, 1.0e-8, options)
    }
}

impl<E: Residual> State<E> {
    /// Update the state with the given temperature
    pub fn update_temperature(&self, temperature: SINumber) -> EosResult<Self> {
        Self::new_nvt(&self.eos, temperature, self.volume, &self.moles)
    }

    /// Update the state with the given mole numbers at constant temperature and volume.
    pub fn update_moles(&self, moles: &SIArray1) -> EosResult<Self> {
        Self::new_nvt(&self.eos, self.temperature, self.volume, moles)
    }

    /// Update the state with the given pressure at constant temperature and composition
    /// using the current density as initial value.
    pub fn update_pressure(&self, pressure: SINumber) -> EosResult<Self> {
        Self::new_npt(
            &self.eos,
            self.temperature,
            pressure,
            &self.moles,
            DensityInitialization::InitialDensity(self.density),
        )
    }

    /// Temperature, volume and moles in reduced units.
    pub fn reduced_variables(&self) -> (f64, f64, &Array1<f64>) {
        (
            self.reduced_temperature,
            self.reduced_volume,
            &self.reduced_moles,
        )
    }

    /// Creates a [StateHD] cloning temperature, volume and moles.
    pub fn derive0(&self) -> StateHD<f64> {
        StateHD::new(
            self.reduced_temperature,
            self.reduced_volume,
            self.reduced_moles.clone(),
        )
    }

    /// Creates a [StateHD] taking the first derivative.
    pub fn derive1(&self, derivative: Derivative) -> StateHD<Dual64> {
        let mut t = Dual64::from(self.reduced_temperature);
        let mut v = Dual64::from(self.reduced_volume);
        let mut n = self.reduced_moles.mapv(Dual64::from);
        match derivative {
            Derivative::DT => t = t.derivative(),
            Derivative::DV => v = v.derivative(),
            Derivative::DN(i) => n[i] = n[i].derivative(),
        }
        StateHD::new(t, v, n)
    }

    /// Creates a [StateHD] taking the first and second (partial) derivatives.
    pub fn derive2(&self, derivative1: Derivative, derivative2: Derivative) -> StateHD<HyperDual64> {
        let mut t = HyperDual64::from(self.reduced_temperature);
        let mut v = HyperDual64::from(self.reduced_volume);
        let mut n = self.reduced_moles.mapv(HyperDual64::from);
        match derivative1 {
            Derivative::DT => t = t.derivative1(),
            Derivative::DV => v = v.derivative1(),
            Derivative::DN(i) => n[i] = n[i].derivative1(),
        }
        match derivative2 {
            Derivative::DT => t = t.derivative2(),
            Derivative::DV => v = v.derivative2(),
            Derivative::DN(i) => n[i] = n[i].derivative2(),
        }
        StateHD::new(t, v, n)
    }

    /// Creates a [StateHD] taking the first, second, and third derivative with respect to a single property.
    pub fn derive3(&self, derivative: Derivative) -> StateHD<Dual3_64> {
        let mut t = Dual3_64::from(self.reduced_temperature);
        let mut v = Dual3_64::from(self.reduced_volume);
        let mut n = self.reduced_moles.mapv(Dual3_64::from);
        match derivative {
            Derivative::DT => t = t.derivative(),
            Derivative::DV => v = v.derivative(),
            Derivative::DN(i) => n[i] = n[i].derivative(),
        };
        StateHD::new(t, v, n)
    }
}

fn initial_density<E: Residual>(
    eos: &Arc<E>,
    moles: &SIArray1,
    density_initialization: DensityInitialization,
) -> EosResult<f64> {
    let max_density = eos
        .max_density(Some(moles))?
        .to_reduced(SIUnit::reference_density())?;
    Ok(match density_initialization {
        DensityInitialization::InitialDensity(r) => r.to_reduced(SIUnit::reference_density())?,
        DensityInitialization::Liquid => max_density,
        DensityInitialization::Vapor => 1.0e-5 * max_density,
        DensityInitialization::None => 0.01 * max_density,
    })
}

fn reduced_initial_temperature(initial_temperature: Option<SINumber>) -> EosResult<f64> {
    initial_temperature
        .map(|t| t.to_reduced(SIUnit::reference_temperature()))
        .transpose()
        .map(|t| t.unwrap_or(298.15))
        .map_err(EosError::from)
}

/// Newton iteration on a scalar that carries the state of the last
/// evaluation. Converged if the step is below `atol + tol * |x|`.
fn newton<E, F>(
    solver: &str,
    mut x0: f64,
    mut f: F,
    atol: f64,
    options: SolverOptions,
) -> EosResult<State<E>>
where
    F: FnMut(f64) -> EosResult<(f64, f64, State<E>)>,
{
    let (max_iter, rtol, verbosity) = options.unwrap_or(50, 1e-10);
    log_iter!(verbosity, " iter |    residual    |      x      ");
    for k in 0..max_iter {
        let (fx, dfx, state) = f(x0)?;
        let x = x0 - fx / dfx;
        log_iter!(verbosity, " {:4} | {:14.8e} | {:11.5e}", k, fx, x);
        if !x.is_finite() {
            log_result!(verbosity, "{}: non-finite step", solver);
            return Err(EosError::IterationFailed(solver.to_owned()));
        }
        if (x - x0).abs() <= atol + rtol * x0.abs() {
            log_result!(verbosity, "{}: converged in {} step(s)", solver, k + 1);
            return Ok(state);
        }
        x0 = x;
    }
    Err(options.not_converged(solver, max_iter))
}

/// Validate the given temperature, mole numbers and volume in reduced units.
///
/// Properties are valid if
/// * they are finite
/// * temperature and volume are positive
/// * mole numbers are not negative and not all zero
///
/// There is no validation of the physical state, e.g.
/// if resulting densities are below maximum packing fraction.
fn validate(temperature: f64, volume: f64, moles: &Array1<f64>) -> EosResult<()> {
    let invalid = |name: &str, value: f64| {
        EosError::InvalidState(String::from("validate"), String::from(name), value)
    };
    if !temperature.is_finite() || temperature <= 0.0 {
        return Err(invalid("temperature", temperature));
    }
    if !volume.is_finite() || volume <= 0.0 {
        return Err(invalid("volume", volume));
    }
    for &n in moles.iter() {
        if !n.is_finite() || n.is_sign_negative() {
            return Err(invalid("moles", n));
        }
    }
    if moles.sum() == 0.0 {
        return Err(invalid("total moles", 0.0));
    }
    Ok(())
}

/// Either a temperature or a pressure.
///
/// Used by solvers that work at either fixed temperature or fixed pressure.
#[derive(Clone, Copy, Debug)]
pub enum TPSpec {
    Temperature(SINumber),
    Pressure(SINumber),
}

impl TryFrom<SINumber> for TPSpec {
    type Error = EosError;

    fn try_from(value: SINumber) -> EosResult<Self> {
        if value.has_unit(&KELVIN) {
            Ok(Self::Temperature(value))
        } else if value.has_unit(&PASCAL) {
            Ok(Self::Pressure(value))
        } else {
            Err(EosError::WrongUnits(
                String::from("temperature or pressure"),
                value.unit().to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cubic::{PengRobinson, PengRobinsonParameters};
    use approx::assert_relative_eq;

    fn propane_butane() -> EosResult<Arc<PengRobinson>> {
        Ok(Arc::new(PengRobinson::new(Arc::new(
            PengRobinsonParameters::new_simple(
                &[369.96, 425.2],
                &[4.25e6, 3.8e6],
                &[0.153, 0.199],
                &[44.0962, 58.123],
            )?,
        ))))
    }

    #[test]
    fn test_validate() {
        let moles = arr1(&[0.03, 0.02, 0.05]);
        assert!(validate(298.15, 3000.0, &moles).is_ok());
    }

    #[test]
    fn test_negative_temperature() {
        let moles = arr1(&[0.03, 0.02, 0.05]);
        assert!(validate(-298.15, 3000.0, &moles).is_err());
        assert!(validate(0.0, 3000.0, &moles).is_err());
    }

    #[test]
    fn test_nan_temperature() {
        let moles = arr1(&[0.03, 0.02, 0.05]);
        assert!(validate(f64::NAN, 3000.0, &moles).is_err());
    }

    #[test]
    fn test_negative_mole_number() {
        let moles = arr1(&[-0.03, 0.02, 0.05]);
        assert!(validate(298.15, 3000.0, &moles).is_err());
        assert!(validate(298.15, 3000.0, &arr1(&[0.0, 0.0])).is_err());
        assert!(validate(298.15, 3000.0, &arr1(&[0.0, 1.0])).is_ok());
    }

    #[test]
    fn test_nan_mole_number() {
        let moles = arr1(&[f64::NAN, 0.02, 0.05]);
        assert!(validate(298.15, 3000.0, &moles).is_err());
    }

    #[test]
    fn test_negative_volume() {
        let moles = arr1(&[0.01, 0.02, 0.05]);
        assert!(validate(298.15, -3000.0, &moles).is_err());
    }

    #[test]
    fn test_new_nvt() -> EosResult<()> {
        let eos = propane_butane()?;
        let moles = arr1(&[1.0, 3.0]) * MOL;
        let state = State::new_nvt(&eos, 300.0 * KELVIN, 2.0 * METER.powi(3), &moles)?;
        assert_relative_eq!(state.molefracs, arr1(&[0.25, 0.75]), max_relative = 1e-14);
        assert_relative_eq!(
            state.density,
            2.0 * MOL / METER.powi(3),
            max_relative = 1e-14
        );

        assert!(matches!(
            State::new_nvt(&eos, 300.0 * BAR, 2.0 * METER.powi(3), &moles),
            Err(EosError::UnitMismatch(_))
        ));
        assert!(matches!(
            State::new_nvt(&eos, 300.0 * KELVIN, 2.0 * METER.powi(3), &(arr1(&[1.0]) * MOL)),
            Err(EosError::IncompatibleComponents(2, 1))
        ));
        assert!(matches!(
            State::new_pure(&eos, 300.0 * KELVIN, MOL / METER.powi(3)),
            Err(EosError::IncompatibleComponents(2, 1))
        ));
        Ok(())
    }

    #[test]
    fn test_overdetermined() -> EosResult<()> {
        let eos = propane_butane()?;
        let moles = arr1(&[1.0, 3.0]) * MOL;
        let x = arr1(&[0.5, 0.5]);
        let state = StateBuilder::new(&eos)
            .temperature(300.0 * KELVIN)
            .volume(METER.powi(3))
            .moles(&moles)
            .molefracs(&x)
            .build();
        assert!(matches!(state, Err(EosError::UndeterminedState(_))));

        let state = StateBuilder::new(&eos)
            .temperature(300.0 * KELVIN)
            .volume(METER.powi(3))
            .density(MOL / METER.powi(3))
            .moles(&moles)
            .build();
        assert!(matches!(state, Err(EosError::UndeterminedState(_))));

        let state = StateBuilder::new(&eos)
            .temperature(300.0 * KELVIN)
            .moles(&moles)
            .build();
        assert!(matches!(state, Err(EosError::UndeterminedState(_))));
        Ok(())
    }

    #[test]
    fn test_temperature_and_pressure() -> EosResult<()> {
        let eos = propane_butane()?;
        let x = arr1(&[0.25, 0.75]);
        let state = StateBuilder::new(&eos)
            .temperature(300.0 * KELVIN)
            .pressure(BAR)
            .molefracs(&x)
            .vapor()
            .build()?;
        assert_relative_eq!(state.pressure(Contributions::Total)?, BAR, max_relative = 1e-8);
        assert_relative_eq!(state.total_moles, SIUnit::reference_moles());

        let state = StateBuilder::new(&eos)
            .temperature(300.0 * KELVIN)
            .pressure(BAR)
            .volume(2.0 * METER.powi(3))
            .molefracs(&x)
            .vapor()
            .build()?;
        assert_relative_eq!(state.volume, 2.0 * METER.powi(3));
        assert_relative_eq!(state.pressure(Contributions::Total)?, BAR, max_relative = 1e-8);
        Ok(())
    }

    #[test]
    fn test_solver_options_reach_density_iteration() -> EosResult<()> {
        let eos = propane_butane()?;
        let x = arr1(&[0.25, 0.75]);
        let builder = StateBuilder::new(&eos)
            .temperature(300.0 * KELVIN)
            .pressure(BAR)
            .molefracs(&x);
        let state = builder
            .clone()
            .solver_options(SolverOptions::default().max_iter(1))
            .build();
        assert!(matches!(state, Err(EosError::NotConverged(_))));
        assert!(builder.build().is_ok());
        Ok(())
    }

    #[test]
    fn test_npt_without_converged_start() -> EosResult<()> {
        let eos = propane_butane()?;
        let moles = arr1(&[1.0, 3.0]) * MOL;
        let options = SolverOptions::default().max_iter(1);
        let state = State::new_npt_with_options(
            &eos,
            300.0 * KELVIN,
            BAR,
            &moles,
            DensityInitialization::None,
            options,
        );
        assert!(matches!(state, Err(EosError::NotConverged(_))));
        Ok(())
    }

    #[test]
    fn test_newton_iteration_limit() -> EosResult<()> {
        let f = |x: f64| -> EosResult<(f64, f64, State<PengRobinson>)> {
            Err(EosError::IterationFailed(format!("evaluated at {x}")))
        };
        assert!(matches!(
            newton("test", 1.0, f, 1e-8, SolverOptions::default()),
            Err(EosError::IterationFailed(_))
        ));

        let eos = propane_butane()?;
        let moles = arr1(&[1.0, 1.0]) * MOL;
        // f(x) = x^2 - 2 converges in a few steps but not in one
        let f = |x: f64| -> EosResult<_> {
            let state = State::new_nvt(&eos, 300.0 * KELVIN, METER.powi(3), &moles)?;
            Ok((x * x - 2.0, 2.0 * x, state))
        };
        let limited = newton("test", 1.0, f, 1e-12, SolverOptions::default().max_iter(1));
        assert!(matches!(limited, Err(EosError::NotConverged(s)) if s == "test"));
        Ok(())
    }

    #[test]
    fn test_tp_spec() {
        assert!(matches!(
            TPSpec::try_from(300.0 * KELVIN),
            Ok(TPSpec::Temperature(_))
        ));
        assert!(matches!(TPSpec::try_from(BAR), Ok(TPSpec::Pressure(_))));
        assert!(matches!(
            TPSpec::try_from(METER),
            Err(EosError::WrongUnits(_, _))
        ));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<State<PengRobinson>>();
    }
}
