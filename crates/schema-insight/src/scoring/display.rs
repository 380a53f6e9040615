use super::tier::ActivationTier;
use serde::{Deserialize, Serialize};

/// Coach-selected filter over which tiers are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Active tier only.
    Strict,
    /// Active and subthreshold tiers.
    Exploratory,
}

impl ViewMode {
    pub const fn from_exploratory_toggle(exploratory: bool) -> Self {
        if exploratory {
            Self::Exploratory
        } else {
            Self::Strict
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "exploratory" => Some(Self::Exploratory),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Exploratory => "exploratory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    Full,
    Brief,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disclaimer {
    None,
    Subthreshold,
}

/// How much of a schema a coach view may render.
///
/// A `DetailLevel::None` policy means render nothing for the schema; it is
/// never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayPolicy {
    pub detail_level: DetailLevel,
    pub disclaimer: Disclaimer,
}

impl DisplayPolicy {
    pub const HIDDEN: Self = Self {
        detail_level: DetailLevel::None,
        disclaimer: Disclaimer::None,
    };

    pub const fn renders(&self) -> bool {
        !matches!(self.detail_level, DetailLevel::None)
    }
}

pub fn policy_for(tier: ActivationTier, view_mode: ViewMode) -> DisplayPolicy {
    match (tier, view_mode) {
        (ActivationTier::Active, _) => DisplayPolicy {
            detail_level: DetailLevel::Full,
            disclaimer: Disclaimer::None,
        },
        (ActivationTier::Subthreshold, ViewMode::Exploratory) => DisplayPolicy {
            detail_level: DetailLevel::Brief,
            disclaimer: Disclaimer::Subthreshold,
        },
        (ActivationTier::Subthreshold, ViewMode::Strict) | (ActivationTier::None, _) => {
            DisplayPolicy::HIDDEN
        }
    }
}

pub fn is_visible_in_view_mode(tier: ActivationTier, view_mode: ViewMode) -> bool {
    match tier {
        ActivationTier::Active => true,
        ActivationTier::Subthreshold => view_mode == ViewMode::Exploratory,
        ActivationTier::None => false,
    }
}
