use super::mapping::CanonicalSchemaMapping;
use super::{ReferenceDataError, MODES_FILE};
use crate::scoring::coping::CopingStrategy;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use tracing::warn;

/// A state or coping expression linked to one or more schemas.
///
/// Child, parent and healthy modes carry no coping strategy and therefore
/// feed no coping bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mode_type: String,
    pub linked_schemas: BTreeSet<String>,
    /// Required key; `null` for modes outside the coping buckets.
    #[serde(deserialize_with = "nullable_strategy")]
    pub coping_strategy: Option<CopingStrategy>,
    pub category: String,
    pub is_adaptive: bool,
}

fn nullable_strategy<'de, D>(deserializer: D) -> Result<Option<CopingStrategy>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<CopingStrategy>::deserialize(deserializer)
}

/// Mode table with linkage rewritten onto canonical clinical ids.
#[derive(Debug, Clone, Default)]
pub struct ModeLibrary {
    modes: Vec<Mode>,
    index: HashMap<String, usize>,
}

impl ModeLibrary {
    pub fn from_modes(
        modes: Vec<Mode>,
        mapping: &CanonicalSchemaMapping,
    ) -> Result<Self, ReferenceDataError> {
        let mut index = HashMap::with_capacity(modes.len());
        let mut canonical = Vec::with_capacity(modes.len());

        for (row, mut mode) in modes.into_iter().enumerate() {
            if mode.id.trim().is_empty() {
                return Err(ReferenceDataError::BlankField {
                    table: MODES_FILE,
                    row,
                    field: "id",
                });
            }
            if mode.name.trim().is_empty() {
                return Err(ReferenceDataError::BlankField {
                    table: MODES_FILE,
                    row,
                    field: "name",
                });
            }
            if index.insert(mode.id.clone(), row).is_some() {
                return Err(ReferenceDataError::DuplicateModeId(mode.id));
            }

            let mut linked = BTreeSet::new();
            for identifier in &mode.linked_schemas {
                match mapping.resolve(identifier) {
                    Some(entry) => {
                        linked.insert(entry.clinical_id.clone());
                    }
                    None => warn!(
                        mode = %mode.id,
                        schema = %identifier,
                        "dropping mode link to unknown schema"
                    ),
                }
            }
            mode.linked_schemas = linked;
            canonical.push(mode);
        }

        Ok(Self {
            modes: canonical,
            index,
        })
    }

    pub fn from_json(
        raw: &str,
        mapping: &CanonicalSchemaMapping,
    ) -> Result<Self, ReferenceDataError> {
        let modes = serde_json::from_str(raw).map_err(|source| ReferenceDataError::Json {
            table: MODES_FILE,
            source,
        })?;
        Self::from_modes(modes, mapping)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        mapping: &CanonicalSchemaMapping,
    ) -> Result<Self, ReferenceDataError> {
        let modes = serde_json::from_reader(reader).map_err(|source| ReferenceDataError::Json {
            table: MODES_FILE,
            source,
        })?;
        Self::from_modes(modes, mapping)
    }

    pub fn modes(&self) -> &[Mode] {
        &self.modes
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    pub fn by_id(&self, id: &str) -> Option<&Mode> {
        self.index.get(id.trim()).map(|&position| &self.modes[position])
    }

    pub fn with_strategy(&self, strategy: CopingStrategy) -> impl Iterator<Item = &Mode> {
        self.modes
            .iter()
            .filter(move |mode| mode.coping_strategy == Some(strategy))
    }

    /// Modes whose linkage includes the given canonical clinical id.
    pub fn linked_to<'a>(&'a self, clinical_id: &'a str) -> impl Iterator<Item = &'a Mode> + 'a {
        self.modes
            .iter()
            .filter(move |mode| mode.linked_schemas.contains(clinical_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceLibrary;

    fn mapping() -> CanonicalSchemaMapping {
        ReferenceLibrary::bundled()
            .expect("bundled data is valid")
            .mapping()
            .clone()
    }

    #[test]
    fn linkage_is_canonicalized_and_unknown_links_dropped() {
        let raw = r#"[
            {
                "id": "detached_protector",
                "name": "Detached Protector",
                "type": "coping",
                "linked_schemas": ["EI", "Social Isolation", "imposter_syndrome"],
                "coping_strategy": "avoidance",
                "category": "maladaptive_coping",
                "is_adaptive": false
            }
        ]"#;

        let library = ModeLibrary::from_json(raw, &mapping()).expect("modes load");
        let mode = library.by_id("detached_protector").expect("mode present");
        let linked: Vec<&str> = mode.linked_schemas.iter().map(String::as_str).collect();
        assert_eq!(
            linked,
            vec!["emotional_inhibition", "social_isolation_alienation"]
        );
        assert_eq!(mode.coping_strategy, Some(CopingStrategy::Avoidance));
    }

    #[test]
    fn null_strategy_is_accepted() {
        let raw = r#"[{"id": "healthy_adult", "name": "Healthy Adult", "type": "healthy",
            "linked_schemas": [], "coping_strategy": null, "category": "healthy",
            "is_adaptive": true}]"#;
        let library = ModeLibrary::from_json(raw, &mapping()).expect("modes load");
        let mode = library.by_id("healthy_adult").expect("mode present");
        assert!(mode.coping_strategy.is_none());
        assert!(mode.linked_schemas.is_empty());
        assert_eq!(library.with_strategy(CopingStrategy::Surrender).count(), 0);
    }

    #[test]
    fn rows_missing_required_keys_fail_to_load() {
        let missing_strategy = r#"[{"id": "healthy_adult", "name": "Healthy Adult",
            "type": "healthy", "linked_schemas": [], "category": "healthy",
            "is_adaptive": true}]"#;
        let error =
            ModeLibrary::from_json(missing_strategy, &mapping()).expect_err("missing key rejected");
        assert!(matches!(error, ReferenceDataError::Json { table: MODES_FILE, .. }));

        let camel_case = r#"[{"id": "compliant_surrenderer", "name": "Compliant Surrenderer",
            "type": "coping", "linkedSchemas": ["abandonment_instability"],
            "copingStrategy": "surrender", "category": "maladaptive_coping",
            "isAdaptive": false}]"#;
        let error =
            ModeLibrary::from_json(camel_case, &mapping()).expect_err("camelCase keys rejected");
        assert!(matches!(error, ReferenceDataError::Json { .. }));
    }

    #[test]
    fn rejects_duplicate_mode_ids() {
        let raw = r#"[
            {"id": "bully_and_attack", "name": "Bully and Attack", "type": "coping",
             "linked_schemas": [], "coping_strategy": "overcompensation",
             "category": "maladaptive_coping", "is_adaptive": false},
            {"id": "bully_and_attack", "name": "Bully", "type": "coping",
             "linked_schemas": [], "coping_strategy": "overcompensation",
             "category": "maladaptive_coping", "is_adaptive": false}
        ]"#;
        let error = ModeLibrary::from_json(raw, &mapping()).expect_err("duplicate rejected");
        assert!(matches!(error, ReferenceDataError::DuplicateModeId(id) if id == "bully_and_attack"));
    }

    #[test]
    fn rejects_unknown_coping_strategy() {
        let raw = r#"[{"id": "x", "name": "X", "type": "coping", "linked_schemas": [],
            "coping_strategy": "denial", "category": "maladaptive_coping",
            "is_adaptive": false}]"#;
        let error = ModeLibrary::from_json(raw, &mapping()).expect_err("strategy rejected");
        assert!(matches!(error, ReferenceDataError::Json { .. }));
    }

    #[test]
    fn bundled_modes_cover_every_strategy() {
        let library = ReferenceLibrary::bundled().expect("bundled data is valid");
        for strategy in CopingStrategy::ordered() {
            assert!(library.modes().with_strategy(strategy).count() > 0);
        }
        assert!(library
            .modes()
            .linked_to("abandonment_instability")
            .any(|mode| mode.id == "vulnerable_child"));
    }
}
