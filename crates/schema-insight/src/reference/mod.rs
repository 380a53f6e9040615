//! Reference tables every scoring call resolves against: the canonical schema
//! mapping and the mode library. Both are parsed once at composition time and
//! are read-only afterwards.

mod mapping;
mod modes;
mod normalizer;

pub use mapping::{CanonicalSchemaMapping, LeadershipPersona, SchemaDomain, SchemaMappingEntry};
pub use modes::{Mode, ModeLibrary};

pub(crate) use normalizer::normalize_key;

use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

pub const MAPPING_FILE: &str = "schema_mapping.json";
pub const MODES_FILE: &str = "modes.json";

const BUNDLED_MAPPING: &str = include_str!("../../data/schema_mapping.json");
const BUNDLED_MODES: &str = include_str!("../../data/modes.json");

/// Reference data is a build artifact; any of these is a deployment defect.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceDataError {
    #[error("failed to read reference table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("reference table {table} is not valid JSON: {source}")]
    Json {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{table} row {row} has a blank {field}")]
    BlankField {
        table: &'static str,
        row: usize,
        field: &'static str,
    },
    #[error("schema mapping contains no entries")]
    EmptyMapping,
    #[error("clinical id '{0}' appears more than once")]
    DuplicateClinicalId(String),
    #[error("variable id '{0}' appears more than once")]
    DuplicateVariableId(String),
    #[error("leadership id '{0}' appears more than once")]
    DuplicateLeadershipId(String),
    #[error("label '{label}' resolves to both '{first}' and '{second}'")]
    AmbiguousLabel {
        label: String,
        first: String,
        second: String,
    },
    #[error("identifier '{identifier}' names both '{first}' and '{second}'")]
    AmbiguousIdentifier {
        identifier: String,
        first: String,
        second: String,
    },
    #[error("domain {domain_id} is named both '{first}' and '{second}'")]
    InconsistentDomain {
        domain_id: u8,
        first: String,
        second: String,
    },
    #[error("mode id '{0}' appears more than once")]
    DuplicateModeId(String),
}

/// The immutable pair of tables handed to every scoring component.
#[derive(Debug, Clone)]
pub struct ReferenceLibrary {
    mapping: CanonicalSchemaMapping,
    modes: ModeLibrary,
}

impl ReferenceLibrary {
    pub fn new(mapping: CanonicalSchemaMapping, modes: ModeLibrary) -> Self {
        Self { mapping, modes }
    }

    /// Parses the tables compiled into the crate.
    pub fn bundled() -> Result<Self, ReferenceDataError> {
        let library = Self::from_json(BUNDLED_MAPPING, BUNDLED_MODES)?;
        info!(
            schemas = library.mapping.len(),
            modes = library.modes.len(),
            "loaded bundled reference data"
        );
        Ok(library)
    }

    pub fn from_json(mapping: &str, modes: &str) -> Result<Self, ReferenceDataError> {
        let mapping = CanonicalSchemaMapping::from_json(mapping)?;
        let modes = ModeLibrary::from_json(modes, &mapping)?;
        Ok(Self { mapping, modes })
    }

    pub fn from_readers<M: Read, R: Read>(
        mapping: M,
        modes: R,
    ) -> Result<Self, ReferenceDataError> {
        let mapping = CanonicalSchemaMapping::from_reader(mapping)?;
        let modes = ModeLibrary::from_reader(modes, &mapping)?;
        Ok(Self { mapping, modes })
    }

    /// Loads `schema_mapping.json` and `modes.json` from a directory.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, ReferenceDataError> {
        let dir = dir.as_ref();
        let mapping_path = dir.join(MAPPING_FILE);
        let modes_path = dir.join(MODES_FILE);

        let mapping = open(&mapping_path)?;
        let modes = open(&modes_path)?;
        let library = Self::from_readers(mapping, modes)?;

        info!(
            dir = %dir.display(),
            schemas = library.mapping.len(),
            modes = library.modes.len(),
            "loaded reference data from disk"
        );
        Ok(library)
    }

    pub fn mapping(&self) -> &CanonicalSchemaMapping {
        &self.mapping
    }

    pub fn modes(&self) -> &ModeLibrary {
        &self.modes
    }
}

fn open(path: &Path) -> Result<std::fs::File, ReferenceDataError> {
    std::fs::File::open(path).map_err(|source| ReferenceDataError::Io {
        path: path.to_path_buf(),
        source,
    })
}
