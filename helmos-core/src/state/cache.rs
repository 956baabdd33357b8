use super::{Derivative, PartialDerivative};
use crate::dual::{Dual3_64, Dual64, HyperDual64};
use crate::EosResult;
use std::collections::HashMap;

/// The part of the Helmholtz energy a cached derivative belongs to.
#[derive(Clone, Copy, Eq, Hash, PartialEq, Debug)]
pub(crate) enum CacheContribution {
    IdealGas,
    Residual,
}

/// Partial derivatives of the Helmholtz energy of a single state.
///
/// Evaluating a dual number also yields all lower order derivatives
/// with respect to the same variables. These are stored as well.
#[derive(Clone, Debug)]
pub(crate) struct Cache {
    map: HashMap<(PartialDerivative, CacheContribution), f64>,
    pub hit: u64,
    pub miss: u64,
}

impl Cache {
    pub fn with_capacity(components: usize) -> Cache {
        let capacity = 6 + 3 * components + components * (components + 1) / 2;
        Cache {
            map: HashMap::with_capacity(capacity),
            hit: 0,
            miss: 0,
        }
    }

    fn get(&mut self, derivative: PartialDerivative, c: CacheContribution) -> Option<f64> {
        let value = self.map.get(&(derivative, c)).copied();
        if value.is_some() {
            self.hit += 1;
        } else {
            self.miss += 1;
        }
        value
    }

    fn insert(&mut self, derivative: PartialDerivative, c: CacheContribution, value: f64) {
        self.map.insert((derivative, c), value);
    }

    pub fn get_or_insert_with_f64<F: FnOnce() -> EosResult<f64>>(
        &mut self,
        c: CacheContribution,
        f: F,
    ) -> EosResult<f64> {
        let key = PartialDerivative::Zeroth;
        if let Some(value) = self.get(key, c) {
            return Ok(value);
        }
        let value = f()?;
        self.insert(key, c, value);
        Ok(value)
    }

    pub fn get_or_insert_with_d64<F: FnOnce() -> EosResult<Dual64>>(
        &mut self,
        c: CacheContribution,
        derivative: Derivative,
        f: F,
    ) -> EosResult<f64> {
        let key = PartialDerivative::First(derivative);
        if let Some(value) = self.get(key, c) {
            return Ok(value);
        }
        let value = f()?;
        self.insert(PartialDerivative::Zeroth, c, value.re);
        self.insert(key, c, value.eps);
        Ok(value.eps)
    }

    pub fn get_or_insert_with_hd64<F: FnOnce() -> EosResult<HyperDual64>>(
        &mut self,
        c: CacheContribution,
        derivative1: Derivative,
        derivative2: Derivative,
        f: F,
    ) -> EosResult<f64> {
        let key = PartialDerivative::second(derivative1, derivative2);
        if let Some(value) = self.get(key, c) {
            return Ok(value);
        }
        let value = f()?;
        self.insert(PartialDerivative::Zeroth, c, value.re);
        self.insert(PartialDerivative::First(derivative1), c, value.eps1);
        self.insert(PartialDerivative::First(derivative2), c, value.eps2);
        self.insert(key, c, value.eps1eps2);
        Ok(value.eps1eps2)
    }

    pub fn get_or_insert_with_d3_64<F: FnOnce() -> EosResult<Dual3_64>>(
        &mut self,
        c: CacheContribution,
        derivative: Derivative,
        f: F,
    ) -> EosResult<f64> {
        let key = PartialDerivative::Third(derivative);
        if let Some(value) = self.get(key, c) {
            return Ok(value);
        }
        let value = f()?;
        self.insert(PartialDerivative::Zeroth, c, value.re);
        self.insert(PartialDerivative::First(derivative), c, value.v1);
        self.insert(PartialDerivative::second(derivative, derivative), c, value.v2);
        self.insert(key, c, value.v3);
        Ok(value.v3)
    }
}
