#![cfg(feature = "pets")]
use helmos::pets::{Pets, PetsParameters};
use helmos_core::joback::{Joback, JobackParameters, JobackRecord};
use helmos_core::parameter::{IdentifierOption, Parameter, ParameterError};
use helmos_core::EquationOfState;
use std::sync::Arc;

mod phase_equilibria;
mod properties;
mod state_creation;

const PURE_RECORDS: &str = r#"[
    {
        "identifier": {"cas": "7440-37-1", "name": "argon", "formula": "Ar"},
        "model_record": {"sigma": 3.4050, "epsilon_k": 119.8},
        "molarweight": 39.948
    },
    {
        "identifier": {"cas": "7439-90-9", "name": "krypton", "formula": "Kr"},
        "model_record": {"sigma": 3.6300, "epsilon_k": 163.10},
        "molarweight": 83.798
    }
]"#;

const BINARY_RECORDS: &str = r#"[
    {"id1": {"name": "argon"}, "id2": {"name": "krypton"}, "model_record": {"k_ij": 0.01}}
]"#;

fn parameters(substances: &[&str]) -> Result<Arc<PetsParameters>, ParameterError> {
    Ok(Arc::new(PetsParameters::from_json_str(
        substances,
        PURE_RECORDS,
        Some(BINARY_RECORDS),
        IdentifierOption::Name,
    )?))
}

fn argon() -> Result<Arc<Pets>, ParameterError> {
    Ok(Arc::new(Pets::new(parameters(&["argon"])?)))
}

fn argon_krypton() -> Result<Arc<Pets>, ParameterError> {
    Ok(Arc::new(Pets::new(parameters(&["argon", "krypton"])?)))
}

/// Monatomic ideal gas heat capacity $c_p=\frac{5}{2}R$ for every component.
fn monatomic_ideal_gas(components: usize) -> Result<Arc<Joback>, ParameterError> {
    let records = vec![JobackRecord::new(20.786, 0.0, 0.0, 0.0, 0.0); components];
    Ok(Arc::new(Joback::new(Arc::new(
        JobackParameters::from_model_records(records)?,
    ))))
}

type ArgonEos = EquationOfState<Joback, Pets>;

fn argon_eos() -> Result<Arc<ArgonEos>, Box<dyn std::error::Error>> {
    Ok(Arc::new(EquationOfState::new(
        monatomic_ideal_gas(1)?,
        argon()?,
    )?))
}
