pub mod coping;
pub mod display;
mod engine;
pub mod thresholds;
pub mod tier;

pub use coping::{
    aggregate, softmax, CopingAggregate, CopingProbabilities, CopingStrategy, RawCopingScores,
};
pub use display::{
    is_visible_in_view_mode, policy_for, DetailLevel, Disclaimer, DisplayPolicy, ViewMode,
};
pub use engine::{
    AssessmentProfile, CanonicalScores, MalformedScore, RawScore, SchemaScore, ScoredSchema,
    ScoringEngine,
};
pub use thresholds::{ClinicalBands, ThresholdConfig, ThresholdError, TierRangeBands, THRESHOLDS};
pub use tier::{
    classify, clinical_significance, tier_range, ActivationTier, ClinicalSignificance, TierRange,
};
