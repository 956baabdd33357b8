use super::{CacheContribution, Contributions, Derivative::*, PartialDerivative, State};
use crate::equation_of_state::{IdealGas, Residual};
use crate::errors::EosResult;
use crate::si::*;
use crate::EosUnit;
use ndarray::{Array1, Array2};

impl<E: Residual + IdealGas> State<E> {
    /// Partial derivative of the ideal gas Helmholtz energy in reduced units.
    fn ideal_gas_derivative(&self, derivative: PartialDerivative) -> EosResult<f64> {
        let mut cache = self.cache();
        let c = CacheContribution::IdealGas;
        match derivative {
            PartialDerivative::Zeroth => {
                let s = self.derive0();
                cache.get_or_insert_with_f64(c, || {
                    Ok(self.eos.evaluate_ideal_gas(&s)? * s.temperature)
                })
            }
            PartialDerivative::First(v) => {
                let s = self.derive1(v);
                cache.get_or_insert_with_d64(c, v, || {
                    Ok(self.eos.evaluate_ideal_gas(&s)? * s.temperature)
                })
            }
            PartialDerivative::Second(v1, v2) => {
                let s = self.derive2(v1, v2);
                cache.get_or_insert_with_hd64(c, v1, v2, || {
                    Ok(self.eos.evaluate_ideal_gas(&s)? * s.temperature)
                })
            }
            PartialDerivative::Third(v) => {
                let s = self.derive3(v);
                cache.get_or_insert_with_d3_64(c, v, || {
                    Ok(self.eos.evaluate_ideal_gas(&s)? * s.temperature)
                })
            }
        }
    }

    fn derivative(&self, derivative: PartialDerivative, c: Contributions) -> EosResult<f64> {
        match c {
            Contributions::IdealGas => self.ideal_gas_derivative(derivative),
            Contributions::Residual => Ok(self
                .get_or_compute_derivative_residual(derivative)?
                .to_reduced(derivative.reference())?),
            _ => Ok(self.ideal_gas_derivative(derivative)?
                + self
                    .get_or_compute_derivative_residual(derivative)?
                    .to_reduced(derivative.reference())?),
        }
    }

    fn get_or_compute_derivative(
        &self,
        derivative: PartialDerivative,
        c: Contributions,
    ) -> EosResult<SINumber> {
        Ok(self.derivative(derivative, c)? * derivative.reference())
    }

    fn derivative_array1<F>(&self, derivative: F, c: Contributions) -> EosResult<SIArray1>
    where
        F: Fn(usize) -> PartialDerivative,
    {
        let values = (0..self.eos.components())
            .map(|i| self.derivative(derivative(i), c))
            .collect::<EosResult<Array1<f64>>>()?;
        Ok(values * derivative(0).reference())
    }

    fn helmholtz_energy_(&self, c: Contributions) -> EosResult<SINumber> {
        self.get_or_compute_derivative(PartialDerivative::Zeroth, c)
    }

    fn entropy_(&self, c: Contributions) -> EosResult<SINumber> {
        Ok(-self.get_or_compute_derivative(PartialDerivative::First(DT), c)?)
    }

    fn ds_dt_(&self, c: Contributions) -> EosResult<SINumber> {
        Ok(-self.get_or_compute_derivative(PartialDerivative::second(DT, DT), c)?)
    }

    fn d2s_dt2_(&self, c: Contributions) -> EosResult<SINumber> {
        Ok(-self.get_or_compute_derivative(PartialDerivative::Third(DT), c)?)
    }

    fn pv(&self, c: Contributions) -> EosResult<SINumber> {
        Ok(self.pressure(c)? * self.volume)
    }

    fn molar_isochoric_heat_capacity_(&self, c: Contributions) -> EosResult<SINumber> {
        Ok(self.temperature * self.ds_dt_(c)? / self.total_moles)
    }

    fn molar_isobaric_heat_capacity_(&self, c: Contributions) -> EosResult<SINumber> {
        match c {
            Contributions::Residual => self.c_p_res(),
            _ => Ok(self.temperature / self.total_moles
                * (self.ds_dt_(c)? - self.dp_dt(c)?.powi(2) / self.dp_dv(c)?)),
        }
    }

    /// Chemical potential: $\mu_i=\left(\frac{\partial A}{\partial N_i}\right)_{T,V,N_j}$
    pub fn chemical_potential(&self, contributions: Contributions) -> EosResult<SIArray1> {
        self.evaluate_property(
            |s, c| s.derivative_array1(|i| PartialDerivative::First(DN(i)), c),
            contributions,
        )
    }

    /// Partial derivative of chemical potential w.r.t. temperature: $\left(\frac{\partial\mu_i}{\partial T}\right)_{V,N_i}$
    pub fn dmu_dt(&self, contributions: Contributions) -> EosResult<SIArray1> {
        self.evaluate_property(
            |s, c| s.derivative_array1(|i| PartialDerivative::second(DT, DN(i)), c),
            contributions,
        )
    }

    /// Partial derivative of chemical potential w.r.t. moles: $\left(\frac{\partial\mu_i}{\partial N_j}\right)_{T,V,N_k}$
    pub fn dmu_dni(&self, contributions: Contributions) -> EosResult<SIArray2> {
        let f = |s: &Self, c| -> EosResult<SIArray2> {
            let n = s.eos.components();
            let mut values = Array2::<f64>::zeros((n, n));
            for i in 0..n {
                for j in i..n {
                    let d = s.derivative(PartialDerivative::second(DN(i), DN(j)), c)?;
                    values[[i, j]] = d;
                    values[[j, i]] = d;
                }
            }
            Ok(values * PartialDerivative::second(DN(0), DN(0)).reference())
        };
        self.evaluate_property(f, contributions)
    }

    /// Molar isochoric heat capacity: $c_v=\left(\frac{\partial u}{\partial T}\right)_{V,N_i}$
    pub fn molar_isochoric_heat_capacity(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(Self::molar_isochoric_heat_capacity_, contributions)
    }

    /// Specific isochoric heat capacity: $c_v^{(m)}=\frac{C_v}{m}$
    pub fn specific_isochoric_heat_capacity(
        &self,
        contributions: Contributions,
    ) -> EosResult<SINumber> {
        Ok(self.molar_isochoric_heat_capacity(contributions)? / self.total_molar_weight()?)
    }

    /// Isochoric heat capacity: $C_v=\left(\frac{\partial U}{\partial T}\right)_{V,N_i}$
    pub fn isochoric_heat_capacity(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.molar_isochoric_heat_capacity(contributions)? * self.total_moles)
    }

    /// Partial derivative of the molar isochoric heat capacity w.r.t. temperature: $\left(\frac{\partial c_V}{\partial T}\right)_{V,N_i}$
    pub fn dc_v_dt(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(
            |s, c| Ok((s.temperature * s.d2s_dt2_(c)? + s.ds_dt_(c)?) / s.total_moles),
            contributions,
        )
    }

    /// Molar isobaric heat capacity: $c_p=\left(\frac{\partial h}{\partial T}\right)_{p,N_i}$
    pub fn molar_isobaric_heat_capacity(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(Self::molar_isobaric_heat_capacity_, contributions)
    }

    /// Specific isobaric heat capacity: $c_p^{(m)}=\frac{C_p}{m}$
    pub fn specific_isobaric_heat_capacity(
        &self,
        contributions: Contributions,
    ) -> EosResult<SINumber> {
        Ok(self.molar_isobaric_heat_capacity(contributions)? / self.total_molar_weight()?)
    }

    /// Isobaric heat capacity: $C_p=\left(\frac{\partial H}{\partial T}\right)_{p,N_i}$
    pub fn isobaric_heat_capacity(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.molar_isobaric_heat_capacity(contributions)? * self.total_moles)
    }

    /// Entropy: $S=-\left(\frac{\partial A}{\partial T}\right)_{V,N_i}$
    pub fn entropy(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(Self::entropy_, contributions)
    }

    /// Molar entropy: $s=\frac{S}{N}$
    pub fn molar_entropy(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.entropy(contributions)? / self.total_moles)
    }

    /// Specific entropy: $s^{(m)}=\frac{S}{m}$
    pub fn specific_entropy(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.molar_entropy(contributions)? / self.total_molar_weight()?)
    }

    /// Partial molar entropy: $s_i=\left(\frac{\partial S}{\partial N_i}\right)_{T,p,N_j}$
    pub fn partial_molar_entropy(&self) -> EosResult<SIArray1> {
        let c = Contributions::Total;
        Ok(-(self.dmu_dt(c)? + self.dp_dni(c)? * (self.dp_dt(c)? / self.dp_dv(c)?)))
    }

    /// Partial derivative of the entropy w.r.t. temperature: $\left(\frac{\partial S}{\partial T}\right)_{V,N_i}$
    pub fn ds_dt(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(Self::ds_dt_, contributions)
    }

    /// Second partial derivative of the entropy w.r.t. temperature: $\left(\frac{\partial^2 S}{\partial T^2}\right)_{V,N_i}$
    pub fn d2s_dt2(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(Self::d2s_dt2_, contributions)
    }

    /// Enthalpy: $H=A+TS+pV$
    pub fn enthalpy(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(
            |s, c| Ok(s.temperature * s.entropy_(c)? + s.helmholtz_energy_(c)? + s.pv(c)?),
            contributions,
        )
    }

    /// Molar enthalpy: $h=\frac{H}{N}$
    pub fn molar_enthalpy(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.enthalpy(contributions)? / self.total_moles)
    }

    /// Specific enthalpy: $h^{(m)}=\frac{H}{m}$
    pub fn specific_enthalpy(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.molar_enthalpy(contributions)? / self.total_molar_weight()?)
    }

    /// Partial molar enthalpy: $h_i=\left(\frac{\partial H}{\partial N_i}\right)_{T,p,N_j}$
    pub fn partial_molar_enthalpy(&self) -> EosResult<SIArray1> {
        let s = self.partial_molar_entropy()?;
        let mu = self.chemical_potential(Contributions::Total)?;
        Ok(s * self.temperature + mu)
    }

    /// Helmholtz energy: $A$
    pub fn helmholtz_energy(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(Self::helmholtz_energy_, contributions)
    }

    /// Molar Helmholtz energy: $a=\frac{A}{N}$
    pub fn molar_helmholtz_energy(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.helmholtz_energy(contributions)? / self.total_moles)
    }

    /// Specific Helmholtz energy: $a^{(m)}=\frac{A}{m}$
    pub fn specific_helmholtz_energy(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.molar_helmholtz_energy(contributions)? / self.total_molar_weight()?)
    }

    /// Internal energy: $U=A+TS$
    pub fn internal_energy(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(
            |s, c| Ok(s.temperature * s.entropy_(c)? + s.helmholtz_energy_(c)?),
            contributions,
        )
    }

    /// Molar internal energy: $u=\frac{U}{N}$
    pub fn molar_internal_energy(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.internal_energy(contributions)? / self.total_moles)
    }

    /// Specific internal energy: $u^{(m)}=\frac{U}{m}$
    pub fn specific_internal_energy(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.molar_internal_energy(contributions)? / self.total_molar_weight()?)
    }

    /// Gibbs energy: $G=A+pV$
    pub fn gibbs_energy(&self, contributions: Contributions) -> EosResult<SINumber> {
        self.evaluate_property(
            |s, c| Ok(s.pv(c)? + s.helmholtz_energy_(c)?),
            contributions,
        )
    }

    /// Molar Gibbs energy: $g=\frac{G}{N}$
    pub fn molar_gibbs_energy(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.gibbs_energy(contributions)? / self.total_moles)
    }

    /// Specific Gibbs energy: $g^{(m)}=\frac{G}{m}$
    pub fn specific_gibbs_energy(&self, contributions: Contributions) -> EosResult<SINumber> {
        Ok(self.molar_gibbs_energy(contributions)? / self.total_molar_weight()?)
    }

    /// Joule Thomson coefficient: $\mu_{JT}=\left(\frac{\partial T}{\partial p}\right)_{H,N_i}$
    pub fn joule_thomson(&self) -> EosResult<SINumber> {
        let c = Contributions::Total;
        Ok(-(self.volume + self.temperature * self.dp_dt(c)? / self.dp_dv(c)?)
            / (self.total_moles * self.molar_isobaric_heat_capacity(c)?))
    }

    /// Isentropic compressibility: $\kappa_s=-\frac{1}{V}\left(\frac{\partial V}{\partial p}\right)_{S,N_i}$
    pub fn isentropic_compressibility(&self) -> EosResult<SINumber> {
        let c = Contributions::Total;
        Ok(-self.molar_isochoric_heat_capacity(c)?
            / (self.molar_isobaric_heat_capacity(c)? * self.dp_dv(c)? * self.volume))
    }

    /// Isenthalpic compressibility: $\kappa_H=-\frac{1}{V}\left(\frac{\partial V}{\partial p}\right)_{H,N_i}$
    pub fn isenthalpic_compressibility(&self) -> EosResult<SINumber> {
        Ok(self.isentropic_compressibility()? * (1.0 + self.grueneisen_parameter()?))
    }

    /// Thermal expansivity: $\alpha_p=-\frac{1}{V}\left(\frac{\partial V}{\partial T}\right)_{p,N_i}$
    pub fn thermal_expansivity(&self) -> EosResult<SINumber> {
        let c = Contributions::Total;
        Ok(-self.dp_dt(c)? / self.dp_dv(c)? / self.volume)
    }

    /// Grueneisen parameter: $\phi=V\left(\frac{\partial p}{\partial U}\right)_{V,n_i}=\frac{v}{c_v}\left(\frac{\partial p}{\partial T}\right)_{v,n_i}$
    pub fn grueneisen_parameter(&self) -> EosResult<f64> {
        let c = Contributions::Total;
        Ok((self.volume / (self.total_moles * self.molar_isochoric_heat_capacity(c)?)
            * self.dp_dt(c)?)
            .into_value()?)
    }

    /// Chemical potential $\mu_i$ evaluated for each contribution of the equation of state.
    pub fn chemical_potential_contributions(
        &self,
        component: usize,
    ) -> EosResult<Vec<(String, SINumber)>> {
        let s = self.derive1(DN(component));
        let reference = SIUnit::reference_molar_energy();
        let contributions = self.eos.evaluate_residual_contributions(&s)?;
        let mut res = Vec::with_capacity(contributions.len() + 1);
        res.push((
            self.eos.ideal_gas_model(),
            (self.eos.evaluate_ideal_gas(&s)? * s.temperature).eps * reference,
        ));
        for (name, v) in contributions {
            res.push((name, (v * s.temperature).eps * reference));
        }
        Ok(res)
    }

    /// Speed of sound: $c=\sqrt{\left(\frac{\partial p}{\partial\rho^{(m)}}\right)_{S,N_i}}$
    pub fn speed_of_sound(&self) -> EosResult<SINumber> {
        Ok((1.0
            / (self.density * self.total_molar_weight()? * self.isentropic_compressibility()?))
        .sqrt()?)
    }
}
