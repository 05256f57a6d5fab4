//! Memory models given on the command line: a built-in name or a JSON file.
//!
//! ```json
//! {
//!   "name": "tso",
//!   "relations": [
//!     { "name": "com", "def": "rf | co | fr" },
//!     { "name": "ppo", "def": "po \\ W * R" }
//!   ],
//!   "axioms": [
//!     { "name": "tso", "kind": "acyclic", "rel": "ppo | (rf & ext) | co | fr" }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use mcm_checker::{Axiom, AxiomKind, Mcm, RelExpr, models};

use crate::error::DriverError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelFile {
    pub name: String,
    /// Definitions in order; later ones may refer to earlier ones.
    #[serde(default)]
    pub relations: Vec<RelationDef>,
    pub axioms: Vec<AxiomDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationDef {
    pub name: String,
    pub def: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxiomDef {
    pub name: String,
    pub kind: String,
    pub rel: String,
}

impl ModelFile {
    pub fn from_file(path: &Path) -> Result<Self, DriverError> {
        let text = std::fs::read_to_string(path).map_err(|source| DriverError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| DriverError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse every relation and check that the result is well formed.
    pub fn into_mcm(self) -> Result<Mcm, DriverError> {
        let mut mcm = Mcm::new(self.name);
        for def in self.relations {
            let rel: RelExpr = def.def.parse()?;
            mcm.define(def.name, rel);
        }
        for axiom in self.axioms {
            let kind: AxiomKind = axiom.kind.parse()?;
            let rel: RelExpr = axiom.rel.parse()?;
            mcm.add_axiom(Axiom::new(axiom.name, kind, rel));
        }
        mcm.validate()?;
        Ok(mcm)
    }
}

/// A built-in model name (`sc`, `tso`, `ra`, `coherence`) or a path to a
/// JSON model.
pub fn load_model(name_or_path: &str) -> Result<Mcm, DriverError> {
    if let Some(mcm) = models::by_name(name_or_path) {
        return Ok(mcm);
    }
    let path = Path::new(name_or_path);
    if !path.exists() {
        return Err(DriverError::Usage(format!(
            "unknown model '{name_or_path}'; expected one of {} or a JSON file",
            models::BUILTIN_MODELS.join(", ")
        )));
    }
    let mcm = ModelFile::from_file(path)?.into_mcm()?;
    tracing::debug!(model = mcm.name(), axioms = mcm.axioms().len(), "loaded model file");
    Ok(mcm)
}
