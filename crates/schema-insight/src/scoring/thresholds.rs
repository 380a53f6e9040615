//! Versioned cut points shared by every classifier.
//!
//! No other module hardcodes a threshold: changing [`THRESHOLDS`] changes
//! classification everywhere.

use super::display::ViewMode;
use serde::Serialize;

/// The release currently in force.
pub const THRESHOLDS: ThresholdConfig = ThresholdConfig {
    version: "2024.2",
    active: 60.0,
    subthreshold_min: 50.0,
    clinical: ClinicalBands {
        very_high: 75.0,
        high: 65.0,
        moderate: 55.0,
        low: 40.0,
    },
    tier_ranges: TierRangeBands {
        clinical: 70.0,
        at_risk: 60.0,
        moderate: 50.0,
    },
    secondary_count: 2,
    coach_toggle_default: true,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdConfig {
    pub version: &'static str,
    /// Minimum T-score for a clinically reliable pattern.
    pub active: f64,
    /// Minimum T-score for an emerging pattern.
    pub subthreshold_min: f64,
    pub clinical: ClinicalBands,
    pub tier_ranges: TierRangeBands,
    /// Top-ranked schemas always surfaced in the secondary section.
    pub secondary_count: usize,
    /// `true` opens coach views in exploratory mode.
    pub coach_toggle_default: bool,
}

/// Lower bounds of the five clinical significance bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClinicalBands {
    pub very_high: f64,
    pub high: f64,
    pub moderate: f64,
    pub low: f64,
}

/// Lower bounds of the coarse UI range labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierRangeBands {
    pub clinical: f64,
    pub at_risk: f64,
    pub moderate: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("threshold '{0}' must be a finite number")]
    NotFinite(&'static str),
    #[error("threshold '{upper}' must be greater than '{lower}'")]
    OutOfOrder {
        upper: &'static str,
        lower: &'static str,
    },
}

impl ThresholdConfig {
    pub const fn current() -> Self {
        THRESHOLDS
    }

    pub fn default_view_mode(&self) -> ViewMode {
        ViewMode::from_exploratory_toggle(self.coach_toggle_default)
    }

    /// Checks every cut point is finite and each band sits strictly above
    /// the next one down.
    pub fn validate(&self) -> Result<(), ThresholdError> {
        let ladders: [&[(&'static str, f64)]; 3] = [
            &[
                ("active", self.active),
                ("subthreshold_min", self.subthreshold_min),
            ],
            &[
                ("clinical.very_high", self.clinical.very_high),
                ("clinical.high", self.clinical.high),
                ("clinical.moderate", self.clinical.moderate),
                ("clinical.low", self.clinical.low),
            ],
            &[
                ("tier_ranges.clinical", self.tier_ranges.clinical),
                ("tier_ranges.at_risk", self.tier_ranges.at_risk),
                ("tier_ranges.moderate", self.tier_ranges.moderate),
            ],
        ];

        for ladder in ladders {
            if let Some(&(name, _)) = ladder.iter().find(|(_, value)| !value.is_finite()) {
                return Err(ThresholdError::NotFinite(name));
            }
            for pair in ladder.windows(2) {
                let (upper, upper_value) = pair[0];
                let (lower, lower_value) = pair[1];
                if upper_value <= lower_value {
                    return Err(ThresholdError::OutOfOrder { upper, lower });
                }
            }
        }

        Ok(())
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        THRESHOLDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_release_matches_published_cut_points() {
        let config = ThresholdConfig::current();
        assert_eq!(config.active, 60.0);
        assert_eq!(config.subthreshold_min, 50.0);
        assert_eq!(config.clinical.very_high, 75.0);
        assert_eq!(config.clinical.low, 40.0);
        assert_eq!(config.tier_ranges.clinical, 70.0);
        assert_eq!(config.secondary_count, 2);
        assert_eq!(config.default_view_mode(), ViewMode::Exploratory);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_inverted_activation_cut_points() {
        let config = ThresholdConfig {
            subthreshold_min: 65.0,
            ..THRESHOLDS
        };
        assert_eq!(
            config.validate(),
            Err(ThresholdError::OutOfOrder {
                upper: "active",
                lower: "subthreshold_min",
            })
        );
    }

    #[test]
    fn validate_rejects_overlapping_bands_and_nan() {
        let mut config = THRESHOLDS;
        config.clinical.high = config.clinical.very_high;
        assert!(matches!(
            config.validate(),
            Err(ThresholdError::OutOfOrder {
                upper: "clinical.very_high",
                ..
            })
        ));

        let mut config = THRESHOLDS;
        config.tier_ranges.at_risk = f64::NAN;
        assert_eq!(
            config.validate(),
            Err(ThresholdError::NotFinite("tier_ranges.at_risk"))
        );
    }

    #[test]
    fn strict_toggle_default_is_respected() {
        let config = ThresholdConfig {
            coach_toggle_default: false,
            ..THRESHOLDS
        };
        assert_eq!(config.default_view_mode(), ViewMode::Strict);
    }
}
