use super::identifier::Identifier;
use super::{IdentifierOption, ParameterError};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Parameters of a pure substance together with its identifier and molar
/// weight in g/mol.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PureRecord<M> {
    pub identifier: Identifier,
    pub molarweight: f64,
    pub model_record: M,
}

impl<M> PureRecord<M> {
    pub fn new(identifier: Identifier, molarweight: f64, model_record: M) -> Self {
        Self {
            identifier,
            molarweight,
            model_record,
        }
    }

    /// Pick the records of `substances`, in that order, from a JSON list
    /// of pure records.
    ///
    /// If several records share an identifier, the first one is used.
    /// Substances requested twice or not found are errors.
    pub fn from_json_str(
        substances: &[&str],
        json: &str,
        identifier_option: IdentifierOption,
    ) -> Result<Vec<Self>, ParameterError>
    where
        M: DeserializeOwned,
    {
        let mut position: IndexMap<&str, Option<usize>> = IndexMap::with_capacity(substances.len());
        for &substance in substances {
            if position.insert(substance, None).is_some() {
                return Err(ParameterError::IncompatibleParameters(format!(
                    "{substance} is requested more than once."
                )));
            }
        }

        let mut records: Vec<Option<Self>> = serde_json::from_str::<Vec<Self>>(json)?
            .into_iter()
            .map(Some)
            .collect();
        for (i, record) in records.iter().enumerate() {
            let id = record
                .as_ref()
                .and_then(|r| r.identifier.as_str(identifier_option));
            if let Some(slot) = id.and_then(|id| position.get_mut(id)) {
                slot.get_or_insert(i);
            }
        }

        let missing: Vec<&str> = position
            .iter()
            .filter(|(_, i)| i.is_none())
            .map(|(&s, _)| s)
            .collect();
        if !missing.is_empty() {
            return Err(ParameterError::ComponentsNotFound(missing.join(", ")));
        }
        Ok(position
            .values()
            .filter_map(|&i| i.and_then(|i| records[i].take()))
            .collect())
    }
}

/// Interaction parameters of a pair of substances.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BinaryRecord<I, B> {
    pub id1: I,
    pub id2: I,
    pub model_record: B,
}

impl<I: DeserializeOwned, B: DeserializeOwned> BinaryRecord<I, B> {
    pub fn from_json_str(json: &str) -> Result<Vec<Self>, ParameterError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, Default, Clone)]
    struct TestModelRecord {
        a: f64,
    }

    const RECORDS: &str = r#"[
        {"identifier": {"cas": "1", "name": "one"}, "molarweight": 1.0, "model_record": {"a": 1.0}},
        {"identifier": {"cas": "2", "name": "two"}, "molarweight": 2.0, "model_record": {"a": 2.0}},
        {"identifier": {"cas": "3", "name": "two"}, "molarweight": 3.0, "model_record": {"a": 3.0}}
    ]"#;

    #[test]
    fn deserialize() -> Result<(), serde_json::Error> {
        let r = r#"{"identifier": {"cas": "123-4-5"}, "molarweight": 16.0426, "model_record": {"a": 0.1}}"#;
        let record: PureRecord<TestModelRecord> = serde_json::from_str(r)?;
        assert_eq!(record.identifier.cas, Some("123-4-5".into()));
        assert_eq!(record.molarweight, 16.0426);
        assert_eq!(record.identifier.name, None);
        Ok(())
    }

    #[test]
    fn select_records() -> Result<(), ParameterError> {
        let records: Vec<PureRecord<TestModelRecord>> =
            PureRecord::from_json_str(&["two", "one"], RECORDS, IdentifierOption::Name)?;
        // the first record named "two" wins
        assert_eq!(records[0].identifier.cas, Some("2".into()));
        assert_eq!(records[1].model_record.a, 1.0);

        let missing = PureRecord::<TestModelRecord>::from_json_str(
            &["one", "three", "four"],
            RECORDS,
            IdentifierOption::Name,
        );
        assert!(matches!(missing, Err(ParameterError::ComponentsNotFound(s)) if s == "three, four"));

        let duplicate = PureRecord::<TestModelRecord>::from_json_str(
            &["1", "1"],
            RECORDS,
            IdentifierOption::Cas,
        );
        assert!(matches!(
            duplicate,
            Err(ParameterError::IncompatibleParameters(_))
        ));
        Ok(())
    }
}
