use super::normalizer::normalize_key;
use super::{ReferenceDataError, MAPPING_FILE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::Read;

/// One row of the canonical schema table, carrying every naming convention
/// upstream data sources use for the same construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaMappingEntry {
    pub variable_id: String,
    pub clinical_id: String,
    /// Label as it appears in raw assessment files.
    pub file_label: String,
    pub clinical_name: String,
    pub leadership_id: String,
    pub leadership_name: String,
    pub healthy_persona_name: String,
    pub domain_id: u8,
    pub domain_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDomain {
    pub id: u8,
    pub name: String,
}

/// Coach-facing naming for a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeadershipPersona<'a> {
    pub clinical_id: &'a str,
    pub leadership_id: &'a str,
    pub leadership_name: &'a str,
    pub healthy_persona_name: &'a str,
}

/// Single source of truth for schema identity.
///
/// Every lookup folds case and whitespace, and a given identifier resolves to
/// at most one entry. Misses return `None`; callers skip the input.
#[derive(Debug, Clone)]
pub struct CanonicalSchemaMapping {
    entries: Vec<SchemaMappingEntry>,
    domains: BTreeMap<u8, SchemaDomain>,
    by_clinical: HashMap<String, usize>,
    by_variable: HashMap<String, usize>,
    by_label: HashMap<String, usize>,
}

impl CanonicalSchemaMapping {
    pub fn from_entries(entries: Vec<SchemaMappingEntry>) -> Result<Self, ReferenceDataError> {
        if entries.is_empty() {
            return Err(ReferenceDataError::EmptyMapping);
        }

        let mut domains: BTreeMap<u8, SchemaDomain> = BTreeMap::new();
        let mut by_clinical = HashMap::with_capacity(entries.len());
        let mut by_variable = HashMap::with_capacity(entries.len());
        let mut by_label = HashMap::with_capacity(entries.len() * 2);
        let mut leadership_ids = HashMap::with_capacity(entries.len());
        let mut identifiers: HashMap<String, usize> = HashMap::with_capacity(entries.len() * 4);

        for (row, entry) in entries.iter().enumerate() {
            check_blank(row, entry)?;

            let clinical_key = normalize_key(&entry.clinical_id);
            if by_clinical.insert(clinical_key, row).is_some() {
                return Err(ReferenceDataError::DuplicateClinicalId(
                    entry.clinical_id.clone(),
                ));
            }

            let variable_key = normalize_key(&entry.variable_id);
            if by_variable.insert(variable_key, row).is_some() {
                return Err(ReferenceDataError::DuplicateVariableId(
                    entry.variable_id.clone(),
                ));
            }

            if leadership_ids
                .insert(normalize_key(&entry.leadership_id), row)
                .is_some()
            {
                return Err(ReferenceDataError::DuplicateLeadershipId(
                    entry.leadership_id.clone(),
                ));
            }

            for label in [&entry.file_label, &entry.clinical_name] {
                let key = normalize_key(label);
                match by_label.get(&key) {
                    Some(&existing) if existing != row => {
                        let first: &SchemaMappingEntry = &entries[existing];
                        return Err(ReferenceDataError::AmbiguousLabel {
                            label: label.clone(),
                            first: first.clinical_id.clone(),
                            second: entry.clinical_id.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        by_label.insert(key, row);
                    }
                }
            }

            for identifier in [
                &entry.clinical_id,
                &entry.variable_id,
                &entry.file_label,
                &entry.clinical_name,
            ] {
                let existing = *identifiers.entry(normalize_key(identifier)).or_insert(row);
                if existing != row {
                    return Err(ReferenceDataError::AmbiguousIdentifier {
                        identifier: identifier.clone(),
                        first: entries[existing].clinical_id.clone(),
                        second: entry.clinical_id.clone(),
                    });
                }
            }

            match domains.get(&entry.domain_id) {
                Some(domain) if domain.name != entry.domain_name => {
                    return Err(ReferenceDataError::InconsistentDomain {
                        domain_id: entry.domain_id,
                        first: domain.name.clone(),
                        second: entry.domain_name.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    domains.insert(
                        entry.domain_id,
                        SchemaDomain {
                            id: entry.domain_id,
                            name: entry.domain_name.clone(),
                        },
                    );
                }
            }
        }

        Ok(Self {
            entries,
            domains,
            by_clinical,
            by_variable,
            by_label,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, ReferenceDataError> {
        let entries = serde_json::from_str(raw).map_err(|source| ReferenceDataError::Json {
            table: MAPPING_FILE,
            source,
        })?;
        Self::from_entries(entries)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReferenceDataError> {
        let entries =
            serde_json::from_reader(reader).map_err(|source| ReferenceDataError::Json {
                table: MAPPING_FILE,
                source,
            })?;
        Self::from_entries(entries)
    }

    pub fn entries(&self) -> &[SchemaMappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_variable_id(&self, variable_id: &str) -> Option<&SchemaMappingEntry> {
        self.lookup(&self.by_variable, variable_id)
    }

    pub fn by_clinical_id(&self, clinical_id: &str) -> Option<&SchemaMappingEntry> {
        self.lookup(&self.by_clinical, clinical_id)
    }

    /// Matches either the raw file label or the clinical name.
    pub fn by_label(&self, label: &str) -> Option<&SchemaMappingEntry> {
        self.lookup(&self.by_label, label)
    }

    /// Resolves any identifier form: clinical id, then variable id, then label.
    pub fn resolve(&self, identifier: &str) -> Option<&SchemaMappingEntry> {
        self.by_clinical_id(identifier)
            .or_else(|| self.by_variable_id(identifier))
            .or_else(|| self.by_label(identifier))
    }

    /// Table order of a canonical clinical id.
    pub fn position(&self, clinical_id: &str) -> Option<usize> {
        self.by_clinical.get(&normalize_key(clinical_id)).copied()
    }

    pub fn leadership_info(&self, identifier: &str) -> Option<LeadershipPersona<'_>> {
        self.resolve(identifier).map(|entry| LeadershipPersona {
            clinical_id: &entry.clinical_id,
            leadership_id: &entry.leadership_id,
            leadership_name: &entry.leadership_name,
            healthy_persona_name: &entry.healthy_persona_name,
        })
    }

    pub fn domain_info(&self, identifier: &str) -> Option<&SchemaDomain> {
        self.resolve(identifier)
            .and_then(|entry| self.domains.get(&entry.domain_id))
    }

    pub fn domain(&self, domain_id: u8) -> Option<&SchemaDomain> {
        self.domains.get(&domain_id)
    }

    pub fn domains(&self) -> impl Iterator<Item = &SchemaDomain> {
        self.domains.values()
    }

    pub fn grouped_by_domain(&self) -> BTreeMap<u8, Vec<&SchemaMappingEntry>> {
        let mut grouped: BTreeMap<u8, Vec<&SchemaMappingEntry>> = BTreeMap::new();
        for entry in &self.entries {
            grouped.entry(entry.domain_id).or_default().push(entry);
        }
        grouped
    }

    pub fn variable_to_clinical(&self) -> BTreeMap<&str, &str> {
        self.entries
            .iter()
            .map(|entry| (entry.variable_id.as_str(), entry.clinical_id.as_str()))
            .collect()
    }

    /// Membership test against canonical clinical ids only.
    pub fn contains(&self, clinical_id: &str) -> bool {
        self.by_clinical_id(clinical_id).is_some()
    }

    pub fn clinical_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.clinical_id.as_str())
    }

    fn lookup(&self, index: &HashMap<String, usize>, key: &str) -> Option<&SchemaMappingEntry> {
        index
            .get(&normalize_key(key))
            .map(|&position| &self.entries[position])
    }
}

fn check_blank(row: usize, entry: &SchemaMappingEntry) -> Result<(), ReferenceDataError> {
    let fields: [(&'static str, &str); 8] = [
        ("variable_id", &entry.variable_id),
        ("clinical_id", &entry.clinical_id),
        ("file_label", &entry.file_label),
        ("clinical_name", &entry.clinical_name),
        ("leadership_id", &entry.leadership_id),
        ("leadership_name", &entry.leadership_name),
        ("healthy_persona_name", &entry.healthy_persona_name),
        ("domain_name", &entry.domain_name),
    ];

    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some(&(field, _)) => Err(ReferenceDataError::BlankField {
            table: MAPPING_FILE,
            row,
            field,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceLibrary;

    fn bundled() -> CanonicalSchemaMapping {
        ReferenceLibrary::bundled()
            .expect("bundled data is valid")
            .mapping()
            .clone()
    }

    fn entry(variable_id: &str, clinical_id: &str, label: &str) -> SchemaMappingEntry {
        SchemaMappingEntry {
            variable_id: variable_id.to_string(),
            clinical_id: clinical_id.to_string(),
            file_label: label.to_string(),
            clinical_name: format!("{label} (clinical)"),
            leadership_id: format!("{clinical_id}_lead"),
            leadership_name: format!("The {label} Leader"),
            healthy_persona_name: format!("The Healthy {label}"),
            domain_id: 1,
            domain_name: "Disconnection & Rejection".to_string(),
        }
    }

    #[test]
    fn every_entry_round_trips_between_variable_and_clinical_ids() {
        let mapping = bundled();
        for entry in mapping.entries() {
            let by_variable = mapping
                .by_variable_id(&entry.variable_id)
                .expect("variable id resolves");
            assert_eq!(by_variable.clinical_id, entry.clinical_id);

            let by_clinical = mapping
                .by_clinical_id(&entry.clinical_id)
                .expect("clinical id resolves");
            assert_eq!(by_clinical.variable_id, entry.variable_id);
        }
    }

    #[test]
    fn label_lookup_ignores_case() {
        let mapping = bundled();
        let upper = mapping.by_label("ABANDONMENT").expect("upper resolves");
        let lower = mapping.by_label("abandonment").expect("lower resolves");
        assert_eq!(upper, lower);
        assert_eq!(upper.clinical_id, "abandonment_instability");

        let clinical = mapping
            .by_label("abandonment/instability")
            .expect("clinical name resolves");
        assert_eq!(clinical, upper);
    }

    #[test]
    fn unresolvable_identifiers_return_none() {
        let mapping = bundled();
        assert!(mapping.by_variable_id("ZZ").is_none());
        assert!(mapping.by_clinical_id("not_a_schema").is_none());
        assert!(mapping.by_label("").is_none());
        assert!(mapping.resolve("Imposter Syndrome").is_none());
        assert!(mapping.leadership_info("unknown").is_none());
        assert!(mapping.domain_info("unknown").is_none());
        assert!(!mapping.contains("unknown"));
    }

    #[test]
    fn resolve_accepts_every_naming_convention() {
        let mapping = bundled();
        for identifier in ["defectiveness_shame", "DS", "Defectiveness", "Defectiveness/Shame"] {
            let entry = mapping.resolve(identifier).expect("identifier resolves");
            assert_eq!(entry.clinical_id, "defectiveness_shame");
        }
    }

    #[test]
    fn contains_only_matches_clinical_ids() {
        let mapping = bundled();
        assert!(mapping.contains("failure"));
        assert!(!mapping.contains("FA"));
    }

    #[test]
    fn derived_accessors_follow_the_table() {
        let mapping = bundled();

        let persona = mapping
            .leadership_info("US")
            .expect("persona available");
        assert_eq!(persona.clinical_id, "unrelenting_standards");
        assert_eq!(persona.leadership_name, "The Perfectionist Driver");

        let domain = mapping.domain_info("subjugation").expect("domain known");
        assert_eq!(domain.id, 4);
        assert_eq!(mapping.domain(4), Some(domain));

        let grouped = mapping.grouped_by_domain();
        assert_eq!(grouped.len(), 5);
        assert_eq!(grouped.values().map(Vec::len).sum::<usize>(), mapping.len());
        assert_eq!(grouped[&3].len(), 2);

        let table = mapping.variable_to_clinical();
        assert_eq!(table.len(), mapping.len());
        assert_eq!(table["ED"], "emotional_deprivation");

        let ids: Vec<&str> = mapping.clinical_ids().collect();
        assert_eq!(ids.len(), 18);
        assert_eq!(ids[0], "abandonment_instability");
        assert_eq!(mapping.position("abandonment_instability"), Some(0));
    }

    #[test]
    fn rejects_duplicate_clinical_ids() {
        let error = CanonicalSchemaMapping::from_entries(vec![
            entry("AA", "alpha", "Alpha"),
            entry("BB", "ALPHA", "Beta"),
        ])
        .expect_err("duplicate rejected");
        assert!(matches!(error, ReferenceDataError::DuplicateClinicalId(id) if id == "ALPHA"));
    }

    #[test]
    fn rejects_labels_shared_between_entries() {
        let error = CanonicalSchemaMapping::from_entries(vec![
            entry("AA", "alpha", "Shared"),
            entry("BB", "beta", "shared"),
        ])
        .expect_err("ambiguous label rejected");
        match error {
            ReferenceDataError::AmbiguousLabel { first, second, .. } => {
                assert_eq!(first, "alpha");
                assert_eq!(second, "beta");
            }
            other => panic!("expected ambiguous label, got {other:?}"),
        }
    }

    #[test]
    fn rejects_identifiers_shared_across_lookup_forms() {
        let error = CanonicalSchemaMapping::from_entries(vec![
            entry("AA", "alpha", "First"),
            entry("ALPHA", "beta", "Second"),
        ])
        .expect_err("clinical id reused as variable id");
        match error {
            ReferenceDataError::AmbiguousIdentifier {
                identifier,
                first,
                second,
            } => {
                assert_eq!(identifier, "ALPHA");
                assert_eq!(first, "alpha");
                assert_eq!(second, "beta");
            }
            other => panic!("expected ambiguous identifier, got {other:?}"),
        }

        let error = CanonicalSchemaMapping::from_entries(vec![
            entry("AA", "alpha", "First"),
            entry("BB", "beta", "aa"),
        ])
        .expect_err("variable id reused as label");
        assert!(matches!(
            error,
            ReferenceDataError::AmbiguousIdentifier { ref first, .. } if first == "alpha"
        ));
    }

    #[test]
    fn rejects_blank_fields_and_inconsistent_domains() {
        let mut blank = entry("AA", "alpha", "Alpha");
        blank.leadership_name = "  ".to_string();
        let error = CanonicalSchemaMapping::from_entries(vec![blank]).expect_err("blank rejected");
        assert!(matches!(
            error,
            ReferenceDataError::BlankField {
                field: "leadership_name",
                row: 0,
                ..
            }
        ));

        let mut renamed = entry("BB", "beta", "Beta");
        renamed.domain_name = "Something Else".to_string();
        let error = CanonicalSchemaMapping::from_entries(vec![entry("AA", "alpha", "Alpha"), renamed])
            .expect_err("inconsistent domain rejected");
        assert!(matches!(
            error,
            ReferenceDataError::InconsistentDomain { domain_id: 1, .. }
        ));
    }

    #[test]
    fn rejects_empty_tables() {
        assert!(matches!(
            CanonicalSchemaMapping::from_entries(Vec::new()),
            Err(ReferenceDataError::EmptyMapping)
        ));
    }
}
