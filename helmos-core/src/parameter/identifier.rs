use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Key used to look up substances in a record file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierOption {
    Cas,
    Name,
    IupacName,
    Smiles,
    Inchi,
    Formula,
}

impl IdentifierOption {
    const ALL: [Self; 6] = [
        Self::Cas,
        Self::Name,
        Self::IupacName,
        Self::Smiles,
        Self::Inchi,
        Self::Formula,
    ];

    /// Name of the corresponding field in JSON records.
    fn field_name(self) -> &'static str {
        match self {
            Self::Cas => "cas",
            Self::Name => "name",
            Self::IupacName => "iupac_name",
            Self::Smiles => "smiles",
            Self::Inchi => "inchi",
            Self::Formula => "formula",
        }
    }
}

/// Names and structure keys of a substance.
///
/// Identifiers compare and hash by their CAS number only.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Identifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iupac_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smiles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inchi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

impl Identifier {
    /// The identifier selected by `option`, if the record has one.
    pub fn as_str(&self, option: IdentifierOption) -> Option<&str> {
        let field = match option {
            IdentifierOption::Cas => &self.cas,
            IdentifierOption::Name => &self.name,
            IdentifierOption::IupacName => &self.iupac_name,
            IdentifierOption::Smiles => &self.smiles,
            IdentifierOption::Inchi => &self.inchi,
            IdentifierOption::Formula => &self.formula,
        };
        field.as_deref()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known: Vec<_> = IdentifierOption::ALL
            .iter()
            .filter_map(|&o| self.as_str(o).map(|v| format!("{}={v}", o.field_name())))
            .collect();
        write!(f, "Identifier({})", known.join(", "))
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.cas == other.cas
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cas.hash(state);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_and_lookup() -> Result<(), serde_json::Error> {
        let id: Identifier = serde_json::from_str(r#"{"name": "acetone", "smiles": "CC(=O)C"}"#)?;
        assert_eq!(id.to_string(), "Identifier(name=acetone, smiles=CC(=O)C)");
        assert_eq!(id.as_str(IdentifierOption::Smiles), Some("CC(=O)C"));
        assert_eq!(id.as_str(IdentifierOption::Cas), None);
        assert_eq!(serde_json::to_string(&id)?, r#"{"name":"acetone","smiles":"CC(=O)C"}"#);
        Ok(())
    }

    #[test]
    fn equality_by_cas() -> Result<(), serde_json::Error> {
        let a: Identifier = serde_json::from_str(r#"{"cas": "110-54-3", "name": "hexane"}"#)?;
        let b: Identifier = serde_json::from_str(r#"{"cas": "110-54-3", "name": "n-hexane"}"#)?;
        let c: Identifier = serde_json::from_str(r#"{"name": "hexane"}"#)?;
        assert_eq!(a, b);
        assert_ne!(a, c);
        Ok(())
    }
}
