//! Warhead and covalent-residue definitions.
//!
//! A [`DefinitionCatalog`] is assembled once, before any job is built, and is
//! then shared read-only. Jobs keep an `Arc` to the entries they select.

pub mod definitions;

use definitions::{CovalentResidueDefinition, DefinitionError, WarheadDefinition};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const BUILTIN_DEFINITIONS: &str = include_str!("../../../data/definitions.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid definition '{name}': {source}")]
    Definition {
        name: String,
        source: DefinitionError,
    },
    #[error("Covalent residue '{0}' is defined more than once")]
    DuplicateResidue(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    warhead: Vec<WarheadDefinition>,
    #[serde(default)]
    residue: Vec<CovalentResidueDefinition>,
}

#[derive(Debug, Clone, Default)]
pub struct DefinitionCatalog {
    warheads: Vec<Arc<WarheadDefinition>>,
    residues: Vec<Arc<CovalentResidueDefinition>>,
}

impl DefinitionCatalog {
    /// The definitions shipped with the library.
    pub fn builtin() -> Self {
        Self::from_toml_str(BUILTIN_DEFINITIONS).expect("built-in definitions are valid")
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        let mut catalog = Self::default();
        for warhead in file.warhead {
            catalog = catalog.with_warhead(warhead)?;
        }
        for residue in file.residue {
            catalog = catalog.with_residue(residue)?;
        }
        Ok(catalog)
    }

    /// Appends a warhead; it is tried after every warhead already present.
    pub fn with_warhead(mut self, warhead: WarheadDefinition) -> Result<Self, CatalogError> {
        warhead.validate().map_err(|source| CatalogError::Definition {
            name: warhead.name.clone(),
            source,
        })?;
        self.warheads.push(Arc::new(warhead));
        Ok(self)
    }

    /// Inserts a warhead ahead of the existing ones.
    pub fn with_priority_warhead(mut self, warhead: WarheadDefinition) -> Result<Self, CatalogError> {
        self = self.with_warhead(warhead)?;
        self.warheads.rotate_right(1);
        Ok(self)
    }

    pub fn with_residue(mut self, residue: CovalentResidueDefinition) -> Result<Self, CatalogError> {
        residue.validate().map_err(|source| CatalogError::Definition {
            name: residue.residue.clone(),
            source,
        })?;
        if self.residue(&residue.residue).is_some() {
            return Err(CatalogError::DuplicateResidue(residue.residue));
        }
        self.residues.push(Arc::new(residue));
        Ok(self)
    }

    pub fn warheads(&self) -> &[Arc<WarheadDefinition>] {
        &self.warheads
    }

    pub fn residues(&self) -> &[Arc<CovalentResidueDefinition>] {
        &self.residues
    }

    /// Looks up a covalent residue by its (case-insensitive) three-letter code.
    pub fn residue(&self, code: &str) -> Option<&Arc<CovalentResidueDefinition>> {
        self.residues
            .iter()
            .find(|r| r.residue.eq_ignore_ascii_case(code.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn warhead(name: &str, covalent: &str, names: &[&str]) -> WarheadDefinition {
        WarheadDefinition {
            name: name.to_string(),
            covalent: covalent.to_string(),
            covalent_atomnames: names.iter().map(|s| s.to_string()).collect(),
            noncovalent: "CC".to_string(),
            noncovalent_atomnames: vec!["C1".to_string(), "C2".to_string()],
            constraint: None,
        }
    }

    #[test]
    fn builtin_catalog_keeps_file_order() {
        let catalog = DefinitionCatalog::builtin();
        let names: Vec<_> = catalog.warheads().iter().map(|w| w.name.as_str()).collect();
        assert_eq!(
            names,
            ["nitrile", "acrylamide", "chloroacetamide", "vinylsulfonamide"]
        );
        assert!(catalog.residue("cys").is_some());
        assert!(catalog.residue("SER").is_none());
    }

    #[test]
    fn priority_warhead_is_tried_first() {
        let catalog = DefinitionCatalog::builtin()
            .with_priority_warhead(warhead("custom", "CC*", &["CY", "CX", "CONN1"]))
            .unwrap();
        assert_eq!(catalog.warheads()[0].name, "custom");
        assert_eq!(catalog.warheads()[1].name, "nitrile");
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        let result = DefinitionCatalog::default().with_warhead(warhead("bad", "CC*", &["CX"]));
        assert!(matches!(result, Err(CatalogError::Definition { name, .. }) if name == "bad"));
    }

    #[test]
    fn duplicate_residue_codes_are_rejected() {
        let cys = DefinitionCatalog::builtin().residues()[0].as_ref().clone();
        let result = DefinitionCatalog::builtin().with_residue(cys);
        assert!(matches!(result, Err(CatalogError::DuplicateResidue(code)) if code == "CYS"));
    }

    #[test]
    fn load_reads_a_catalog_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[warhead]]
name = "nitrile"
covalent = "C(=N)*"
covalent_atomnames = ["CX", "NX", "CONN1"]
noncovalent = "C(#N)"
noncovalent_atomnames = ["CX", "NX"]
constraint = "AtomPair NX 1B SG 145A HARMONIC 3.0 0.5\n"
"#
        )
        .unwrap();
        let catalog = DefinitionCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.warheads().len(), 1);
        assert!(catalog.residues().is_empty());
        assert!(catalog.warheads()[0].constraint.is_some());
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        let result = DefinitionCatalog::from_toml_str("[[warhead]]\nname = \"x\"\nfoo = 1\n");
        assert!(matches!(result, Err(CatalogError::Toml(_))));
    }
}
