//! CSV assessment exports into canonical [`SchemaScore`]s.

mod parser;

use crate::reference::CanonicalSchemaMapping;
use crate::scoring::SchemaScore;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum AssessmentImportError {
    #[error("failed to read assessment export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid assessment CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("assessment export is missing the '{0}' column")]
    MissingColumn(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownSchema,
    InvalidScore,
    Duplicate,
}

/// A row left out of the import; never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub identifier: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedAssessment {
    pub scores: Vec<SchemaScore>,
    pub assessed_on: Option<NaiveDate>,
    pub skipped: Vec<SkippedRow>,
}

pub struct AssessmentImporter;

impl AssessmentImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        mapping: &CanonicalSchemaMapping,
    ) -> Result<ImportedAssessment, AssessmentImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, mapping)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        mapping: &CanonicalSchemaMapping,
    ) -> Result<ImportedAssessment, AssessmentImportError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut scores = Vec::new();
        let mut skipped = Vec::new();
        let mut assessed_on = None;

        for record in parser::parse_records(reader)? {
            let reason = match (mapping.resolve(&record.identifier), record.z_score) {
                (None, _) => SkipReason::UnknownSchema,
                (Some(entry), _) if seen.contains(entry.clinical_id.as_str()) => {
                    SkipReason::Duplicate
                }
                (Some(entry), None) => {
                    seen.insert(entry.clinical_id.as_str());
                    SkipReason::InvalidScore
                }
                (Some(entry), Some(z_score)) => {
                    seen.insert(entry.clinical_id.as_str());
                    scores.push(SchemaScore::new(entry.clinical_id.clone(), z_score));
                    assessed_on = assessed_on.or(record.assessed_on);
                    continue;
                }
            };

            debug!(row = record.row, identifier = %record.identifier, ?reason, "skipping assessment row");
            skipped.push(SkippedRow {
                row: record.row,
                identifier: record.identifier,
                reason,
            });
        }

        info!(
            imported = scores.len(),
            skipped = skipped.len(),
            "assessment export imported"
        );

        Ok(ImportedAssessment {
            scores,
            assessed_on,
            skipped,
        })
    }
}
