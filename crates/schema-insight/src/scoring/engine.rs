use super::coping::{aggregate, CopingAggregate};
use super::display::{is_visible_in_view_mode, policy_for, DisplayPolicy, ViewMode};
use super::thresholds::ThresholdConfig;
use super::tier::{
    classify, clinical_significance, tier_range, ActivationTier, ClinicalSignificance, TierRange,
};
use crate::reference::ReferenceLibrary;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Canonical, immutable score for one schema in one assessment snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaScore {
    pub schema_id: String,
    pub z_score: f64,
}

impl SchemaScore {
    pub fn new(schema_id: impl Into<String>, z_score: f64) -> Self {
        Self {
            schema_id: schema_id.into(),
            z_score,
        }
    }

    /// T-score on the conventional mean-50, sd-10 scale.
    pub fn t_score(&self) -> f64 {
        50.0 + 10.0 * self.z_score
    }
}

/// Untrusted score as received from callers. Any identifier form is
/// accepted; values that are not finite numbers arrive as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScore {
    #[serde(default, alias = "schemaId", deserialize_with = "lenient_identifier")]
    pub schema_id: String,
    #[serde(default, alias = "zScore", deserialize_with = "lenient_score")]
    pub z_score: Option<f64>,
}

impl RawScore {
    pub fn new(schema_id: impl Into<String>, z_score: Option<f64>) -> Self {
        Self {
            schema_id: schema_id.into(),
            z_score,
        }
    }
}

impl From<SchemaScore> for RawScore {
    fn from(score: SchemaScore) -> Self {
        Self {
            schema_id: score.schema_id,
            z_score: Some(score.z_score),
        }
    }
}

/// Non-string identifiers keep their JSON text so they surface as unresolved.
fn lenient_identifier<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(raw) => raw,
        other => other.to_string(),
    })
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|score| score.is_finite()))
}

/// A resolvable schema whose score could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedScore {
    pub schema_id: String,
    pub submitted_as: String,
}

/// Scores keyed by canonical clinical id, plus what was set aside.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CanonicalScores {
    pub scores: Vec<SchemaScore>,
    pub unresolved: Vec<String>,
    pub malformed: Vec<MalformedScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredSchema {
    /// 1-based position by descending T-score.
    pub rank: usize,
    pub schema_id: String,
    pub variable_id: String,
    pub clinical_name: String,
    pub leadership_name: String,
    pub domain_id: u8,
    pub z_score: f64,
    pub t_score: f64,
    pub tier: ActivationTier,
    pub clinical_significance: ClinicalSignificance,
    pub tier_range: TierRange,
    pub policy: DisplayPolicy,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentProfile {
    pub threshold_version: &'static str,
    pub view_mode: ViewMode,
    pub schemas: Vec<ScoredSchema>,
    /// Active-tier schemas.
    pub primary: Vec<String>,
    /// Remaining visible schemas, topped up by rank to the configured minimum.
    pub secondary: Vec<String>,
    pub coping: CopingAggregate,
    pub unresolved: Vec<String>,
    pub malformed: Vec<MalformedScore>,
}

impl AssessmentProfile {
    pub fn schema(&self, schema_id: &str) -> Option<&ScoredSchema> {
        self.schemas
            .iter()
            .find(|schema| schema.schema_id == schema_id)
    }

    pub fn visible(&self) -> impl Iterator<Item = &ScoredSchema> {
        self.schemas.iter().filter(|schema| schema.visible)
    }
}

/// Stateless scorer over shared reference tables and one threshold release.
///
/// Cheap to clone and safe to share across threads; nothing is cached per
/// score, so a threshold change takes effect on the next call.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    library: Arc<ReferenceLibrary>,
    thresholds: ThresholdConfig,
}

impl ScoringEngine {
    pub fn new(library: Arc<ReferenceLibrary>, thresholds: ThresholdConfig) -> Self {
        Self {
            library,
            thresholds,
        }
    }

    pub fn library(&self) -> &ReferenceLibrary {
        &self.library
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    pub fn canonicalize<I>(&self, raw: I) -> CanonicalScores
    where
        I: IntoIterator<Item = RawScore>,
    {
        let mapping = self.library.mapping();
        let mut seen = HashSet::new();
        let mut canonical = CanonicalScores::default();

        for RawScore { schema_id, z_score } in raw {
            let Some(entry) = mapping.resolve(&schema_id) else {
                debug!(schema = %schema_id, "skipping score for unknown schema");
                canonical.unresolved.push(schema_id);
                continue;
            };

            if !seen.insert(entry.clinical_id.as_str()) {
                debug!(schema = %entry.clinical_id, "ignoring repeated score");
                continue;
            }

            match z_score.filter(|score| score.is_finite()) {
                Some(z_score) => canonical
                    .scores
                    .push(SchemaScore::new(entry.clinical_id.clone(), z_score)),
                None => canonical.malformed.push(MalformedScore {
                    schema_id: entry.clinical_id.clone(),
                    submitted_as: schema_id,
                }),
            }
        }

        canonical
    }

    /// Resolves, tiers, gates and aggregates one assessment. `None` uses the
    /// coach default from the threshold release.
    pub fn assess<I>(&self, raw: I, view_mode: Option<ViewMode>) -> AssessmentProfile
    where
        I: IntoIterator<Item = RawScore>,
    {
        let view_mode = view_mode.unwrap_or_else(|| self.thresholds.default_view_mode());
        let CanonicalScores {
            scores,
            unresolved,
            malformed,
        } = self.canonicalize(raw);

        let schemas = self.rank(&scores, view_mode);
        let (primary, secondary) = self.sections(&schemas);
        let coping = aggregate(&scores, self.library.modes().modes());

        AssessmentProfile {
            threshold_version: self.thresholds.version,
            view_mode,
            schemas,
            primary,
            secondary,
            coping,
            unresolved,
            malformed,
        }
    }

    pub fn assess_scores(
        &self,
        scores: Vec<SchemaScore>,
        view_mode: Option<ViewMode>,
    ) -> AssessmentProfile {
        self.assess(scores.into_iter().map(RawScore::from), view_mode)
    }

    fn rank(&self, scores: &[SchemaScore], view_mode: ViewMode) -> Vec<ScoredSchema> {
        let mapping = self.library.mapping();
        let mut ordered: Vec<(usize, &SchemaScore)> = scores
            .iter()
            .filter_map(|score| {
                mapping
                    .position(&score.schema_id)
                    .map(|position| (position, score))
            })
            .collect();
        ordered.sort_by(|(left_pos, left), (right_pos, right)| {
            right
                .t_score()
                .total_cmp(&left.t_score())
                .then_with(|| left_pos.cmp(right_pos))
        });

        ordered
            .into_iter()
            .enumerate()
            .map(|(index, (position, score))| {
                let entry = &mapping.entries()[position];
                let t_score = score.t_score();
                let tier = classify(t_score, &self.thresholds);
                ScoredSchema {
                    rank: index + 1,
                    schema_id: entry.clinical_id.clone(),
                    variable_id: entry.variable_id.clone(),
                    clinical_name: entry.clinical_name.clone(),
                    leadership_name: entry.leadership_name.clone(),
                    domain_id: entry.domain_id,
                    z_score: score.z_score,
                    t_score,
                    tier,
                    clinical_significance: clinical_significance(t_score, &self.thresholds),
                    tier_range: tier_range(t_score, &self.thresholds),
                    policy: policy_for(tier, view_mode),
                    visible: is_visible_in_view_mode(tier, view_mode),
                }
            })
            .collect()
    }

    fn sections(&self, schemas: &[ScoredSchema]) -> (Vec<String>, Vec<String>) {
        let (active, rest): (Vec<&ScoredSchema>, Vec<&ScoredSchema>) = schemas
            .iter()
            .partition(|schema| schema.tier == ActivationTier::Active);

        let primary = active
            .iter()
            .map(|schema| schema.schema_id.clone())
            .collect();

        let mut secondary: Vec<String> = rest
            .iter()
            .filter(|schema| schema.visible)
            .map(|schema| schema.schema_id.clone())
            .collect();
        let shortfall = self.thresholds.secondary_count.saturating_sub(secondary.len());
        secondary.extend(
            rest.iter()
                .filter(|schema| !schema.visible)
                .take(shortfall)
                .map(|schema| schema.schema_id.clone()),
        );

        (primary, secondary)
    }
}
