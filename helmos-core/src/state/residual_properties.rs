use super::{CacheContribution, Contributions, Derivative::*, PartialDerivative, State};
use crate::equation_of_state::Residual;
use crate::errors::{EosError, EosResult};
use crate::si::*;
use crate::{DensityInitialization, EosUnit};
use ndarray::{arr1, Array1, Array2};
use std::ops::Sub;
use std::sync::Arc;

/// # Access to the cached residual Helmholtz energy
impl<E: Residual> State<E> {
    /// Partial derivative of the residual Helmholtz energy in reduced units.
    fn residual_derivative(&self, derivative: PartialDerivative) -> EosResult<f64> {
        let mut cache = self.cache();
        let c = CacheContribution::Residual;
        match derivative {
            PartialDerivative::Zeroth => {
                let s = self.derive0();
                cache.get_or_insert_with_f64(c, || {
                    Ok(self.eos.evaluate_residual(&s)? * s.temperature)
                })
            }
            PartialDerivative::First(v) => {
                let s = self.derive1(v);
                cache.get_or_insert_with_d64(c, v, || {
                    Ok(self.eos.evaluate_residual(&s)? * s.temperature)
                })
            }
            PartialDerivative::Second(v1, v2) => {
                let s = self.derive2(v1, v2);
                cache.get_or_insert_with_hd64(c, v1, v2, || {
                    Ok(self.eos.evaluate_residual(&s)? * s.temperature)
                })
            }
            PartialDerivative::Third(v) => {
                let s = self.derive3(v);
                cache.get_or_insert_with_d3_64(c, v, || {
                    Ok(self.eos.evaluate_residual(&s)? * s.temperature)
                })
            }
        }
    }

    pub(super) fn get_or_compute_derivative_residual(
        &self,
        derivative: PartialDerivative,
    ) -> EosResult<SINumber> {
        Ok(self.residual_derivative(derivative)? * derivative.reference())
    }

    /// Evaluate a derivative for every component.
    fn residual_derivative_array1<F>(&self, derivative: F) -> EosResult<SIArray1>
    where
        F: Fn(usize) -> PartialDerivative,
    {
        let values = (0..self.eos.components())
            .map(|i| self.residual_derivative(derivative(i)))
            .collect::<EosResult<Array1<f64>>>()?;
        Ok(values * derivative(0).reference())
    }

    /// Evaluate a property. Contributions other than [Contributions::ResidualNpt]
    /// are passed through, the ResidualNpt contribution is obtained as the difference
    /// between the total property and the ideal gas property at the same temperature,
    /// pressure and composition.
    pub(super) fn evaluate_property<R, F>(&self, f: F, contributions: Contributions) -> EosResult<R>
    where
        R: Sub<Output = R>,
        F: Fn(&Self, Contributions) -> EosResult<R>,
    {
        match contributions {
            Contributions::ResidualNpt => {
                let p = self.pressure_(Contributions::Total)?;
                let volume = self.total_moles * RGAS * self.temperature / p;
                let state_p = Self::new_nvt(&self.eos, self.temperature, volume, &self.moles)?;
                Ok(f(self, Contributions::Total)? - f(&state_p, Contributions::IdealGas)?)
            }
            c => f(self, c),
        }
    }

    fn combine(
        ideal_gas: impl FnOnce() -> EosResult<SINumber>,
        residual: impl FnOnce() -> EosResult<SINumber>,
        contributions: Contributions,
    ) -> EosResult<SINumber> {
        match contributions {
            Contributions::IdealGas => ideal_gas(),
            Contributions::Residual => residual(),
            _ => Ok(ideal_gas()? + residual()?),
        }
    }
}

/// # Pressure and its derivatives
///
/// The ideal gas part of these properties does not depend on the
/// ideal gas model and is therefore available for every residual model.
impl<E: Residual> State<E> {
    fn pressure_(&self, c: Contributions) -> EosResult<SINumber> {
        Self::combine(
            || Ok(self.density * RGAS * self.temperature),
            || Ok(-self.get_or_compute_derivative_residual(PartialDerivative::First(DV))?),
            c,
        )
    }

    fn dp_dv_(&self, c: Contributions) -> EosResult<SINumber> {
        Self::combine(
            || Ok(-self.density * RGAS * self.temperature / self.volume),
            || {
                Ok(-self
                    .get_or_compute_derivative_residual(PartialDerivative::second(DV, DV))?)
            },
            c,
        )
    }

    fn dp_dt_(&self, c: Contributions) -> EosResult<SINumber> {
        Self::combine(
            || Ok(self.density * RGAS),
            || {
                Ok(-self
                    .get_or_compute_derivative_residual(PartialDerivative::second(DV, DT))?)
            },
            c,
        )
    }

    fn d2p_dv2_(&self, c: Contributions) -> EosResult<SINumber> {
        Self::combine(
            || Ok(2.0 * self.density * RGAS * self.temperature / self.volume.powi(2)),
            || Ok(-self.get_or_compute_derivative_residual(PartialDerivative::Third(DV))?),
            c,
        )
    }

    fn dp_dni_(&self, c: Contributions) -> EosResult<SIArray1> {
        let n = self.eos.components();
        let ideal_gas = || Array1::<f64>::ones(n) * (RGAS * self.temperature / self.volume);
        let residual = || -> EosResult<SIArray1> {
            Ok(-self.residual_derivative_array1(|i| PartialDerivative::second(DV, DN(i)))?)
        };
        match c {
            Contributions::IdealGas => Ok(ideal_gas()),
            Contributions::Residual => residual(),
            _ => Ok(ideal_gas() + residual()?),
        }
    }

    /// Pressure: $p=-\left(\frac{\partial A}{\partial V}\right)_{T,N_i}$
    pub fn pressure(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(Self::pressure_, contributions)
    }

    /// Compressibility factor: $Z=\frac{pV}{NRT}$
    pub fn compressibility(&self, contributions: Contributions) -> EosResult<f64> {
        Ok((self.pressure(contributions)? / (self.density * RGAS * self.temperature))
            .into_value()?)
    }

    /// Partial derivative of pressure w.r.t. volume: $\left(\frac{\partial p}{\partial V}\right)_{T,N_i}$
    pub fn dp_dv(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(Self::dp_dv_, contributions)
    }

    /// Partial derivative of pressure w.r.t. density: $\left(\frac{\partial p}{\partial \rho}\right)_{T,N_i}$
    pub fn dp_drho(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(
            |s, c| Ok(-s.volume / s.density * s.dp_dv_(c)?),
            contributions,
        )
    }

    /// Partial derivative of pressure w.r.t. temperature: $\left(\frac{\partial p}{\partial T}\right)_{V,N_i}$
    pub fn dp_dt(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(Self::dp_dt_, contributions)
    }

    /// Partial derivative of pressure w.r.t. moles: $\left(\frac{\partial p}{\partial N_i}\right)_{T,V,N_j}$
    pub fn dp_dni(&self, contributions: Contributions) -> EosResult<SIArray1> {
        self.evaluate_property(Self::dp_dni_, contributions)
    }

    /// Second partial derivative of pressure w.r.t. volume: $\left(\frac{\partial^2 p}{\partial V^2}\right)_{T,N_j}$
    pub fn d2p_dv2(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(Self::d2p_dv2_, contributions)
    }

    /// Second partial derivative of pressure w.r.t. density: $\left(\frac{\partial^2 p}{\partial \rho^2}\right)_{T,N_j}$
    pub fn d2p_drho2(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(
            |s, c| {
                Ok(s.volume / s.density.powi(2)
                    * (s.volume * s.d2p_dv2_(c)? + 2.0 * s.dp_dv_(c)?))
            },
            contributions,
        )
    }

    /// Partial molar volume: $v_i=\left(\frac{\partial V}{\partial N_i}\right)_{T,p,N_j}$
    pub fn partial_molar_volume(&self) -> EosResult<SIArray1> {
        let c = Contributions::Total;
        Ok(-self.dp_dni(c)? / self.dp_dv(c)?)
    }

    /// Structure factor: $S(0)=k_BT\left(\frac{\partial\rho}{\partial p}\right)_{T,N_i}$
    pub fn structure_factor(&self) -> EosResult<f64> {
        Ok(-(RGAS * self.temperature * self.density)
            .to_reduced(self.volume * self.dp_dv(Contributions::Total)?)?)
    }

    // used in density iterations
    pub(crate) fn p_dpdrho(&self) -> EosResult<(SINumber, SINumber)> {
        let dp_dv = self.dp_dv(Contributions::Total)?;
        Ok((
            self.pressure(Contributions::Total)?,
            (-self.volume * dp_dv / self.density),
        ))
    }

    // used in spinodal iterations
    pub(crate) fn d2pdrho2(&self) -> EosResult<(SINumber, SINumber, SINumber)> {
        let d2p_dv2 = self.d2p_dv2(Contributions::Total)?;
        let dp_dv = self.dp_dv(Contributions::Total)?;
        Ok((
            self.pressure(Contributions::Total)?,
            (-self.volume * dp_dv / self.density),
            (self.volume / self.density.powi(2) * (2.0 * dp_dv + self.volume * d2p_dv2)),
        ))
    }
}

/// # Residual properties
///
/// Properties that only require the residual Helmholtz energy.
impl<E: Residual> State<E> {
    /// Residual Helmholtz energy: $A^\text{res}$
    pub fn residual_helmholtz_energy(&self) -> EosResult<SINumber> {
        self.get_or_compute_derivative_residual(PartialDerivative::Zeroth)
    }

    /// Residual Helmholtz energy $A^\text{res}$ evaluated for each contribution of the model.
    pub fn residual_helmholtz_energy_contributions(&self) -> EosResult<Vec<(String, SINumber)>> {
        let s = self.derive0();
        Ok(self
            .eos
            .evaluate_residual_contributions(&s)?
            .into_iter()
            .map(|(name, a)| (name, a * s.temperature * SIUnit::reference_energy()))
            .collect())
    }

    /// Residual entropy: $S^\text{res}=-\left(\frac{\partial A^\text{res}}{\partial T}\right)_{V,N_i}$
    pub fn residual_entropy(&self) -> EosResult<SINumber> {
        Ok(-self.get_or_compute_derivative_residual(PartialDerivative::First(DT))?)
    }

    /// Residual chemical potential: $\mu_i^\text{res}=\left(\frac{\partial A^\text{res}}{\partial N_i}\right)_{T,V,N_j}$
    pub fn residual_chemical_potential(&self) -> EosResult<SIArray1> {
        self.residual_derivative_array1(|i| PartialDerivative::First(DN(i)))
    }

    /// Partial derivative of the residual entropy w.r.t. temperature: $\left(\frac{\partial S^\text{res}}{\partial T}\right)_{V,N_i}$
    pub fn ds_res_dt(&self) -> EosResult<SINumber> {
        Ok(-self.get_or_compute_derivative_residual(PartialDerivative::second(DT, DT))?)
    }

    /// Second partial derivative of the residual entropy w.r.t. temperature: $\left(\frac{\partial^2S^\text{res}}{\partial T^2}\right)_{V,N_i}$
    pub fn d2s_res_dt2(&self) -> EosResult<SINumber> {
        Ok(-self.get_or_compute_derivative_residual(PartialDerivative::Third(DT))?)
    }

    /// Partial derivative of the residual chemical potential w.r.t. temperature: $\left(\frac{\partial\mu_i^\text{res}}{\partial T}\right)_{V,N_i}$
    pub fn dmu_res_dt(&self) -> EosResult<SIArray1> {
        self.residual_derivative_array1(|i| PartialDerivative::second(DT, DN(i)))
    }

    /// Partial derivative of the residual chemical potential w.r.t. moles: $\left(\frac{\partial\mu_i^\text{res}}{\partial N_j}\right)_{T,V,N_k}$
    pub fn dmu_res_dni(&self) -> EosResult<SIArray2> {
        let n = self.eos.components();
        let mut values = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let d = self.residual_derivative(PartialDerivative::second(DN(i), DN(j)))?;
                values[[i, j]] = d;
                values[[j, i]] = d;
            }
        }
        Ok(values * PartialDerivative::second(DN(0), DN(0)).reference())
    }

    /// Residual enthalpy: $H^\text{res}=A^\text{res}+TS^\text{res}+p^\text{res}V$
    pub fn residual_enthalpy(&self) -> EosResult<SINumber> {
        Ok(self.temperature * self.residual_entropy()?
            + self.residual_helmholtz_energy()?
            + self.pressure(Contributions::Residual)? * self.volume)
    }

    /// Residual internal energy: $U^\text{res}=A^\text{res}+TS^\text{res}$
    pub fn residual_internal_energy(&self) -> EosResult<SINumber> {
        Ok(self.temperature * self.residual_entropy()? + self.residual_helmholtz_energy()?)
    }

    /// Residual Gibbs energy at constant pressure: $G^\text{res}(T,p,\mathbf{N})=A^\text{res}+p^\text{res}V-NRT \ln Z$
    pub fn residual_gibbs_energy(&self) -> EosResult<SINumber> {
        Ok(self.pressure(Contributions::Residual)? * self.volume
            + self.residual_helmholtz_energy()?
            - self.total_moles
                * RGAS
                * self.temperature
                * self.compressibility(Contributions::Total)?.ln())
    }

    /// Logarithm of the fugacity coefficient: $\ln\varphi_i=\beta\mu_i^\mathrm{res}\left(T,p,\lbrace N_i\rbrace\right)$
    pub fn ln_phi(&self) -> EosResult<Array1<f64>> {
        let mu_res = self.residual_chemical_potential()?;
        Ok((mu_res / (RGAS * self.temperature)).into_value()?
            - self.compressibility(Contributions::Total)?.ln())
    }

    /// Logarithm of the fugacity coefficient of all components treated as pure substance at mixture temperature and pressure.
    pub fn ln_phi_pure_liquid(&self) -> EosResult<Array1<f64>> {
        let pressure = self.pressure(Contributions::Total)?;
        (0..self.eos.components())
            .map(|i| {
                let eos = Arc::new(self.eos.subset(&[i]));
                let state = Self::new_npt(
                    &eos,
                    self.temperature,
                    pressure,
                    &(arr1(&[1.0]) * SIUnit::reference_moles()),
                    DensityInitialization::Liquid,
                )?;
                Ok(state.ln_phi()?[0])
            })
            .collect()
    }

    /// Activity coefficient $\ln \gamma_i = \ln \varphi_i(T, p, \mathbf{N}) - \ln \varphi_i(T, p)$
    pub fn ln_symmetric_activity_coefficient(&self) -> EosResult<Array1<f64>> {
        match self.eos.components() {
            1 => Ok(arr1(&[0.0])),
            _ => Ok(self.ln_phi()? - &self.ln_phi_pure_liquid()?),
        }
    }

    /// Partial derivative of the logarithm of the fugacity coefficient w.r.t. temperature: $\left(\frac{\partial\ln\varphi_i}{\partial T}\right)_{p,N_i}$
    pub fn dln_phi_dt(&self) -> EosResult<SIArray1> {
        let c = Contributions::Total;
        let rt = RGAS * self.temperature;
        let vi = self.partial_molar_volume()?;
        Ok((self.dmu_res_dt()? - self.residual_chemical_potential()? / self.temperature) / rt
            + 1.0 / self.temperature
            - vi / rt * self.dp_dt(c)?)
    }

    /// Partial derivative of the logarithm of the fugacity coefficient w.r.t. pressure: $\left(\frac{\partial\ln\varphi_i}{\partial p}\right)_{T,N_i}$
    pub fn dln_phi_dp(&self) -> EosResult<SIArray1> {
        let vi = self.partial_molar_volume()?;
        Ok(vi / (RGAS * self.temperature) - 1.0 / self.pressure(Contributions::Total)?)
    }

    /// Partial derivative of the logarithm of the fugacity coefficient w.r.t. moles: $\left(\frac{\partial\ln\varphi_i}{\partial N_j}\right)_{T,p,N_k}$
    pub fn dln_phi_dnj(&self) -> EosResult<SIArray2> {
        let n = self.eos.components();
        let c = Contributions::Total;
        let dmu_dni = self.dmu_res_dni()?;
        let reference = SIUnit::reference_pressure() / SIUnit::reference_moles();
        let dp_dni = self.dp_dni(c)?.to_reduced(reference)?;
        let dp_dv = self.dp_dv(c)?;
        let dp_dn_2 = Array2::from_shape_fn((n, n), |(i, j)| dp_dni[i] * dp_dni[j])
            * (reference * reference);
        Ok((dmu_dni + dp_dn_2 / dp_dv) / (RGAS * self.temperature) + 1.0 / self.total_moles)
    }

    /// Thermodynamic factor: $\Gamma_{ij}=\delta_{ij}+x_i\left(\frac{\partial\ln\varphi_i}{\partial x_j}\right)_{T,p,\Sigma}$
    pub fn thermodynamic_factor(&self) -> EosResult<Array2<f64>> {
        let dln_phi_dnj = self
            .dln_phi_dnj()?
            .to_reduced(SIUnit::reference_moles().powi(-1))?;
        let moles = &self.reduced_moles;
        let n = self.eos.components() - 1;
        Ok(Array2::from_shape_fn((n, n), |(i, j)| {
            moles[i] * (dln_phi_dnj[[i, j]] - dln_phi_dnj[[i, n]]) + if i == j { 1.0 } else { 0.0 }
        }))
    }

    /// Molar residual isochoric heat capacity: $c_v^\text{res}=\left(\frac{\partial u^\text{res}}{\partial T}\right)_{V,N_i}$
    pub fn c_v_res(&self) -> EosResult<SINumber> {
        Ok(self.temperature * self.ds_res_dt()? / self.total_moles)
    }

    /// Partial derivative of the molar residual isochoric heat capacity w.r.t. temperature: $\left(\frac{\partial c_V^\text{res}}{\partial T}\right)_{V,N_i}$
    pub fn dc_v_res_dt(&self) -> EosResult<SINumber> {
        Ok((self.temperature * self.d2s_res_dt2()? + self.ds_res_dt()?) / self.total_moles)
    }

    /// Molar residual isobaric heat capacity: $c_p^\text{res}=\left(\frac{\partial h^\text{res}}{\partial T}\right)_{p,N_i}$
    pub fn c_p_res(&self) -> EosResult<SINumber> {
        let c = Contributions::Total;
        Ok(self.temperature / self.total_moles
            * (self.ds_res_dt()? - self.dp_dt(c)?.powi(2) / self.dp_dv(c)?)
            - RGAS)
    }
}

/// # Mass specific properties
///
/// These properties are only available for models that provide molar weights.
impl<E: Residual> State<E> {
    fn molar_weight(&self) -> EosResult<SIArray1> {
        self.eos
            .molar_weight()
            .ok_or_else(|| EosError::MissingCapability(String::from("molar weights")))
    }

    /// Total molar weight: $MW=\sum_ix_iMW_i$
    pub fn total_molar_weight(&self) -> EosResult<SINumber> {
        Ok((self.molar_weight()? * &self.molefracs).sum())
    }

    /// Mass of each component: $m_i=n_iMW_i$
    pub fn mass(&self) -> EosResult<SIArray1> {
        Ok(&self.moles * &self.molar_weight()?)
    }

    /// Total mass: $m=\sum_im_i=nMW$
    pub fn total_mass(&self) -> EosResult<SINumber> {
        Ok(self.mass()?.sum())
    }

    /// Mass density: $\rho^{(m)}=\frac{m}{V}$
    pub fn mass_density(&self) -> EosResult<SINumber> {
        Ok(self.density * self.total_molar_weight()?)
    }

    /// Mass fractions: $w_i=\frac{m_i}{m}$
    pub fn massfracs(&self) -> EosResult<Array1<f64>> {
        let mass = self.mass()?;
        Ok((&mass / mass.sum()).into_value()?)
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
    fn ideal_gas_pressure() -> EosResult<()> {
        let eos = propane_butane()?;
        let moles = arr1(&[1.5, 0.5]) * MOL;
        let state = State::new_nvt(&eos, 320.0 * KELVIN, 3.0 * METER.powi(3), &moles)?;
        assert_relative_eq!(
            state.pressure(Contributions::IdealGas)?,
            2.0 * MOL * RGAS * 320.0 * KELVIN / (3.0 * METER.powi(3)),
            max_relative = 1e-14
        );
        assert_relative_eq!(
            state.pressure(Contributions::Total)?,
            state.pressure(Contributions::IdealGas)? + state.pressure(Contributions::Residual)?,
            max_relative = 1e-14
        );
        assert_relative_eq!(
            state.pressure(Contributions::ResidualNpt)?,
            0.0 * PASCAL,
            epsilon = 1e-8
        );
        Ok(())
    }

    #[test]
    fn pressure_derivatives() -> EosResult<()> {
        let eos = propane_butane()?;
        let t = 300.0 * KELVIN;
        let v = 1.0e-3 * METER.powi(3);
        let moles = arr1(&[0.02, 0.01]) * MOL;
        let state = State::new_nvt(&eos, t, v, &moles)?;
        let c = Contributions::Total;

        let h = 1e-5;
        let p = |s: &State<PengRobinson>| s.pressure(c);
        let s_v = State::new_nvt(&eos, t, v * (1.0 + h), &moles)?;
        let s_t = State::new_nvt(&eos, t * (1.0 + h), v, &moles)?;
        let dp_dv = (p(&s_v)? - p(&state)?) / (v * h);
        let dp_dt = (p(&s_t)? - p(&state)?) / (t * h);
        assert_relative_eq!(state.dp_dv(c)?, dp_dv, max_relative = 1e-4);
        assert_relative_eq!(state.dp_dt(c)?, dp_dt, max_relative = 1e-4);

        let dv_dv = (s_v.dp_dv(c)? - state.dp_dv(c)?) / (v * h);
        assert_relative_eq!(state.d2p_dv2(c)?, dv_dv, max_relative = 1e-4);
        Ok(())
    }

    #[test]
    fn gibbs_duhem() -> EosResult<()> {
        let eos = propane_butane()?;
        let moles = arr1(&[0.3, 0.7]) * MOL;
        let state = State::new_npt(
            &eos,
            350.0 * KELVIN,
            20.0 * BAR,
            &moles,
            DensityInitialization::Liquid,
        )?;
        let v = state.partial_molar_volume()?;
        let n = state.moles.to_reduced(MOL)?;
        assert_relative_eq!(
            (v * &n).sum(),
            state.volume / MOL,
            max_relative = 1e-10
        );
        Ok(())
    }

    #[test]
    fn mass_properties() -> EosResult<()> {
        let eos = propane_butane()?;
        let moles = arr1(&[1.0, 1.0]) * MOL;
        let state = State::new_nvt(&eos, 300.0 * KELVIN, METER.powi(3), &moles)?;
        assert_relative_eq!(
            state.total_molar_weight()?,
            0.5 * (44.0962 + 58.123) * GRAM / MOL,
            max_relative = 1e-14
        );
        assert_relative_eq!(state.massfracs()?.sum(), 1.0, max_relative = 1e-14);
        assert_relative_eq!(
            state.mass_density()?,
            (44.0962 + 58.123) * GRAM / METER.powi(3),
            max_relative = 1e-14
        );
        Ok(())
    }
}
