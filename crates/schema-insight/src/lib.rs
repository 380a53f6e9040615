//! Scoring core for coaching assessments: canonical schema identity,
//! activation tiering, display gating, and coping-style aggregation.

pub mod config;
pub mod error;
pub mod import;
pub mod reference;
pub mod scoring;
pub mod telemetry;

pub use import::{AssessmentImportError, AssessmentImporter, ImportedAssessment};
pub use reference::{CanonicalSchemaMapping, ModeLibrary, ReferenceDataError, ReferenceLibrary};
pub use scoring::{
    ActivationTier, AssessmentProfile, CopingAggregate, CopingStrategy, DisplayPolicy, RawScore,
    SchemaScore, ScoringEngine, ThresholdConfig, ViewMode, THRESHOLDS,
};
