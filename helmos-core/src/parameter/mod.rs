//! Structures and traits that can be used to build model parameters for equations of state.
//!
//! Records are (de)serialized with `serde`. Parameter sets can be built from
//! in-memory json strings, reading parameter databases from files is left to
//! the application.
use ndarray::{arr2, Array2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

mod identifier;
mod model_record;

pub use identifier::{Identifier, IdentifierOption};
pub use model_record::{BinaryRecord, PureRecord};

/// Parameters of a model, assembled from pure and binary records.
///
/// Implementors only have to convert records into their parameter set and
/// hand the records back. Reading from json and selecting subsets of
/// components are provided on top of that.
pub trait Parameter: Sized {
    type Pure: Clone + DeserializeOwned;
    type Binary: Clone + DeserializeOwned + Default;

    /// Build the parameter set. `binary_records` is a square matrix over
    /// the pure records if given.
    fn from_records(
        pure_records: Vec<PureRecord<Self::Pure>>,
        binary_records: Option<Array2<Self::Binary>>,
    ) -> Result<Self, ParameterError>;

    /// The records the parameter set was built from.
    #[allow(clippy::type_complexity)]
    fn records(&self) -> (&[PureRecord<Self::Pure>], Option<&Array2<Self::Binary>>);

    fn new_pure(pure_record: PureRecord<Self::Pure>) -> Result<Self, ParameterError> {
        Self::from_records(vec![pure_record], None)
    }

    /// Parameters of a binary mixture. The binary record, if given, is used
    /// for both off-diagonal entries.
    fn new_binary(
        pure_records: Vec<PureRecord<Self::Pure>>,
        binary_record: Option<Self::Binary>,
    ) -> Result<Self, ParameterError> {
        if pure_records.len() != 2 {
            return Err(ParameterError::IncompatibleParameters(format!(
                "a binary system needs 2 pure records, got {}",
                pure_records.len()
            )));
        }
        let matrix = binary_record.map(|br| {
            let zero = Self::Binary::default();
            arr2(&[[zero.clone(), br.clone()], [br, zero]])
        });
        Self::from_records(pure_records, matrix)
    }

    /// Parameters from bare model records, without identifiers, molar
    /// weights or binary parameters.
    fn from_model_records(model_records: Vec<Self::Pure>) -> Result<Self, ParameterError> {
        let pure_records = model_records
            .into_iter()
            .map(|r| PureRecord::new(Identifier::default(), 0.0, r))
            .collect();
        Self::from_records(pure_records, None)
    }

    /// Arrange `binary_records` as a matrix over `pure_records`.
    ///
    /// A pair can be given in either order. Pairs without a record get the
    /// default binary record. Returns `None` if there are no binary records.
    fn binary_matrix_from_records(
        pure_records: &[PureRecord<Self::Pure>],
        binary_records: &[BinaryRecord<Identifier, Self::Binary>],
        identifier_option: IdentifierOption,
    ) -> Result<Option<Array2<Self::Binary>>, ParameterError> {
        if binary_records.is_empty() {
            return Ok(None);
        }
        let mut ids = Vec::with_capacity(pure_records.len());
        for record in pure_records {
            match record.identifier.as_str(identifier_option) {
                Some(id) => ids.push(id),
                None => {
                    return Err(ParameterError::IdentifierNotFound(
                        record.identifier.to_string(),
                    ))
                }
            }
        }

        let mut pairs = HashMap::new();
        for br in binary_records {
            if let (Some(id1), Some(id2)) = (
                br.id1.as_str(identifier_option),
                br.id2.as_str(identifier_option),
            ) {
                pairs.insert((id1, id2), &br.model_record);
                pairs.entry((id2, id1)).or_insert(&br.model_record);
            }
        }
        let n = ids.len();
        Ok(Some(Array2::from_shape_fn((n, n), |(i, j)| {
            pairs
                .get(&(ids[i], ids[j]))
                .map_or_else(Self::Binary::default, |&br| br.clone())
        })))
    }

    /// Read pure and binary records from json and keep those of `substances`.
    fn from_json_str(
        substances: &[&str],
        pure_records: &str,
        binary_records: Option<&str>,
        identifier_option: IdentifierOption,
    ) -> Result<Self, ParameterError> {
        let pure_records = PureRecord::from_json_str(substances, pure_records, identifier_option)?;
        let binary_records = match binary_records {
            Some(json) => BinaryRecord::from_json_str(json)?,
            None => Vec::new(),
        };
        let matrix =
            Self::binary_matrix_from_records(&pure_records, &binary_records, identifier_option)?;
        Self::from_records(pure_records, matrix)
    }

    /// The parameter set of the components in `component_list`, in that order.
    fn subset(&self, component_list: &[usize]) -> Result<Self, ParameterError> {
        let (pure_records, binary_records) = self.records();
        let n = pure_records.len();
        if let Some(i) = component_list.iter().find(|&&i| i >= n) {
            return Err(ParameterError::IncompatibleParameters(format!(
                "component index {i} out of bounds for {n} components"
            )));
        }
        let selected = component_list
            .iter()
            .map(|&i| pure_records[i].clone())
            .collect();
        let m = component_list.len();
        let binary_records = binary_records.map(|br| {
            Array2::from_shape_fn((m, m), |(i, j)| {
                br[(component_list[i], component_list[j])].clone()
            })
        });
        Self::from_records(selected, binary_records)
    }
}

/// Binary record of models without binary parameters.
#[derive(Serialize, Deserialize, Clone, Copy, Default, Debug)]
pub struct NoBinaryModelRecord;

/// Error type for incomplete parameter information.
#[derive(Error, Debug)]
pub enum ParameterError {
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("The following component(s) were not found: {0}")]
    ComponentsNotFound(String),
    #[error("The requested identifier is not set in {0}.")]
    IdentifierNotFound(String),
    #[error("Incompatible parameters: {0}")]
    IncompatibleParameters(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Deserialize)]
    struct MyRecord {
        a: f64,
    }

    struct MyParameters {
        a: Vec<f64>,
        k_ij: Array2<f64>,
        records: Vec<PureRecord<MyRecord>>,
    }

    impl Parameter for MyParameters {
        type Pure = MyRecord;
        type Binary = f64;

        fn from_records(
            pure_records: Vec<PureRecord<MyRecord>>,
            binary_records: Option<Array2<f64>>,
        ) -> Result<Self, ParameterError> {
            let n = pure_records.len();
            Ok(Self {
                a: pure_records.iter().map(|r| r.model_record.a).collect(),
                k_ij: binary_records.unwrap_or_else(|| Array2::zeros([n; 2])),
                records: pure_records,
            })
        }

        fn records(&self) -> (&[PureRecord<MyRecord>], Option<&Array2<f64>>) {
            (&self.records, Some(&self.k_ij))
        }
    }

    const PURE: &str = r#"[
        {"identifier": {"cas": "1"}, "molarweight": 1.0, "model_record": {"a": 1.0}},
        {"identifier": {"cas": "2"}, "molarweight": 2.0, "model_record": {"a": 2.0}},
        {"identifier": {"cas": "3"}, "molarweight": 3.0, "model_record": {"a": 3.0}}
    ]"#;

    const BINARY: &str = r#"[
        {"id1": {"cas": "1"}, "id2": {"cas": "2"}, "model_record": 0.1},
        {"id1": {"cas": "3"}, "id2": {"cas": "1"}, "model_record": 0.3}
    ]"#;

    #[test]
    fn binary_matrix() -> Result<(), ParameterError> {
        let p = MyParameters::from_json_str(
            &["1", "2", "3"],
            PURE,
            Some(BINARY),
            IdentifierOption::Cas,
        )?;
        assert_eq!(p.a, vec![1.0, 2.0, 3.0]);
        assert_eq!(
            p.k_ij,
            arr2(&[[0.0, 0.1, 0.3], [0.1, 0.0, 0.0], [0.3, 0.0, 0.0]])
        );
        Ok(())
    }

    #[test]
    fn subset() -> Result<(), ParameterError> {
        let p = MyParameters::from_json_str(
            &["1", "2", "3"],
            PURE,
            Some(BINARY),
            IdentifierOption::Cas,
        )?;
        let s = p.subset(&[2, 0])?;
        assert_eq!(s.a, vec![3.0, 1.0]);
        assert_eq!(s.k_ij, arr2(&[[0.0, 0.3], [0.3, 0.0]]));
        assert!(p.subset(&[3]).is_err());
        Ok(())
    }

    #[test]
    fn missing_identifier() {
        let p = MyParameters::from_json_str(&["1", "2"], PURE, Some(BINARY), IdentifierOption::Name);
        assert!(matches!(p, Err(ParameterError::ComponentsNotFound(_))));
    }
}
