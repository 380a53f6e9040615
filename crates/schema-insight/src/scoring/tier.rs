//! Three independent banding functions over one [`ThresholdConfig`].
//!
//! They share cut points in places (60 is both `active` and `at_risk`) but
//! answer different questions and evolve separately: activation tiers gate
//! clinical reliability, clinical significance gives fine banding for reports,
//! and tier ranges label score ranges in the UI. Every band is inclusive of
//! its lower bound and the highest qualifying band wins. NaN qualifies for
//! no band and lands in the lowest one.

use super::thresholds::ThresholdConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationTier {
    Active,
    Subthreshold,
    None,
}

impl ActivationTier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Subthreshold => "subthreshold",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalSignificance {
    VeryHigh,
    High,
    Moderate,
    Low,
    VeryLow,
}

impl ClinicalSignificance {
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryHigh => "very_high",
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
            Self::VeryLow => "very_low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierRange {
    Clinical,
    AtRisk,
    Moderate,
    Low,
}

impl TierRange {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Clinical => "Clinical",
            Self::AtRisk => "At Risk",
            Self::Moderate => "Moderate",
            Self::Low => "Low",
        }
    }
}

pub fn classify(t_score: f64, thresholds: &ThresholdConfig) -> ActivationTier {
    if t_score >= thresholds.active {
        ActivationTier::Active
    } else if t_score >= thresholds.subthreshold_min {
        ActivationTier::Subthreshold
    } else {
        ActivationTier::None
    }
}

pub fn clinical_significance(t_score: f64, thresholds: &ThresholdConfig) -> ClinicalSignificance {
    let bands = &thresholds.clinical;
    if t_score >= bands.very_high {
        ClinicalSignificance::VeryHigh
    } else if t_score >= bands.high {
        ClinicalSignificance::High
    } else if t_score >= bands.moderate {
        ClinicalSignificance::Moderate
    } else if t_score >= bands.low {
        ClinicalSignificance::Low
    } else {
        ClinicalSignificance::VeryLow
    }
}

pub fn tier_range(t_score: f64, thresholds: &ThresholdConfig) -> TierRange {
    let bands = &thresholds.tier_ranges;
    if t_score >= bands.clinical {
        TierRange::Clinical
    } else if t_score >= bands.at_risk {
        TierRange::AtRisk
    } else if t_score >= bands.moderate {
        TierRange::Moderate
    } else {
        TierRange::Low
    }
}
