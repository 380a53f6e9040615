//! Coping-style breakdown: per-strategy weighted sums of schema z-scores,
//! normalized with a softmax.

use super::engine::SchemaScore;
use crate::reference::Mode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopingStrategy {
    Surrender,
    Avoidance,
    Overcompensation,
}

impl CopingStrategy {
    /// Bucket priority; the first listed wins a probability tie.
    pub const fn ordered() -> [Self; 3] {
        [Self::Surrender, Self::Avoidance, Self::Overcompensation]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Surrender => "S",
            Self::Avoidance => "A",
            Self::Overcompensation => "O",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Surrender => "Surrender",
            Self::Avoidance => "Avoidance",
            Self::Overcompensation => "Overcompensation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawCopingScores {
    #[serde(rename = "S")]
    pub surrender: f64,
    #[serde(rename = "A")]
    pub avoidance: f64,
    #[serde(rename = "O")]
    pub overcompensation: f64,
}

impl RawCopingScores {
    pub fn get(&self, strategy: CopingStrategy) -> f64 {
        match strategy {
            CopingStrategy::Surrender => self.surrender,
            CopingStrategy::Avoidance => self.avoidance,
            CopingStrategy::Overcompensation => self.overcompensation,
        }
    }

    fn add(&mut self, strategy: CopingStrategy, value: f64) {
        match strategy {
            CopingStrategy::Surrender => self.surrender += value,
            CopingStrategy::Avoidance => self.avoidance += value,
            CopingStrategy::Overcompensation => self.overcompensation += value,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        CopingStrategy::ordered().map(|strategy| self.get(strategy))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CopingProbabilities {
    #[serde(rename = "cS")]
    pub surrender: f64,
    #[serde(rename = "cA")]
    pub avoidance: f64,
    #[serde(rename = "cO")]
    pub overcompensation: f64,
}

impl CopingProbabilities {
    fn from_array([surrender, avoidance, overcompensation]: [f64; 3]) -> Self {
        Self {
            surrender,
            avoidance,
            overcompensation,
        }
    }

    pub fn get(&self, strategy: CopingStrategy) -> f64 {
        match strategy {
            CopingStrategy::Surrender => self.surrender,
            CopingStrategy::Avoidance => self.avoidance,
            CopingStrategy::Overcompensation => self.overcompensation,
        }
    }

    pub fn total(&self) -> f64 {
        self.surrender + self.avoidance + self.overcompensation
    }

    /// Highest probability; ties resolve in [`CopingStrategy::ordered`] order.
    pub fn dominant(&self) -> CopingStrategy {
        let mut best = CopingStrategy::Surrender;
        for strategy in CopingStrategy::ordered() {
            if self.get(strategy) > self.get(best) {
                best = strategy;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CopingAggregate {
    pub raw: RawCopingScores,
    pub probabilities: CopingProbabilities,
    pub dominant: CopingStrategy,
}

impl CopingAggregate {
    pub fn from_raw(raw: RawCopingScores) -> Self {
        let probabilities = CopingProbabilities::from_array(softmax(raw.as_array()));
        Self {
            raw,
            probabilities,
            dominant: probabilities.dominant(),
        }
    }
}

/// Sums linked schema z-scores into the bucket of each mode's strategy.
///
/// A schema linked by several modes of one strategy counts once per mode.
/// Missing and non-finite scores contribute zero, and a strategy with no
/// modes keeps a neutral raw total of zero. Modes without a strategy are
/// ignored. Duplicate score ids keep their first value.
pub fn aggregate(scores: &[SchemaScore], modes: &[Mode]) -> CopingAggregate {
    let mut lookup: HashMap<&str, f64> = HashMap::with_capacity(scores.len());
    for score in scores {
        lookup.entry(score.schema_id.as_str()).or_insert(score.z_score);
    }

    let mut raw = RawCopingScores::default();
    for mode in modes {
        let Some(strategy) = mode.coping_strategy else {
            continue;
        };
        for schema in &mode.linked_schemas {
            let contribution = lookup
                .get(schema.as_str())
                .copied()
                .filter(|z| z.is_finite())
                .unwrap_or(0.0);
            raw.add(strategy, contribution);
        }
    }

    CopingAggregate::from_raw(raw)
}

/// Max-shifted softmax that never yields NaN.
///
/// NaN inputs are treated as zero. If any input is `+inf` the infinite
/// entries split the mass evenly; if all are `-inf` the result is uniform.
pub fn softmax(raw: [f64; 3]) -> [f64; 3] {
    let values = raw.map(|value| if value.is_nan() { 0.0 } else { value });
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if !max.is_finite() {
        let winners = values.map(|value| value == max);
        let count = winners.iter().filter(|winner| **winner).count() as f64;
        return winners.map(|winner| if winner { 1.0 / count } else { 0.0 });
    }

    let exps = values.map(|value| (value - max).exp());
    let sum: f64 = exps.iter().sum();
    exps.map(|value| value / sum)
}
