use chrono::NaiveDate;
use schema_insight::import::SkipReason;
use schema_insight::scoring::{ActivationTier, ViewMode};
use schema_insight::{AssessmentImporter, ReferenceLibrary, ScoringEngine, THRESHOLDS};
use std::path::PathBuf;
use std::sync::Arc;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("assessment_export.csv")
}

#[test]
fn imports_vendor_export_and_scores_it() {
    let library = Arc::new(ReferenceLibrary::bundled().expect("bundled reference data loads"));
    let imported = AssessmentImporter::from_path(fixture_path(), library.mapping())
        .expect("fixture export imports");

    assert_eq!(imported.scores.len(), 17);
    assert_eq!(imported.assessed_on, NaiveDate::from_ymd_opt(2025, 2, 3));

    let reasons: Vec<(&str, SkipReason)> = imported
        .skipped
        .iter()
        .map(|row| (row.identifier.as_str(), row.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("Negativity", SkipReason::InvalidScore),
            ("Workaholism", SkipReason::UnknownSchema),
        ]
    );

    let engine = ScoringEngine::new(library, THRESHOLDS);
    let profile = engine.assess_scores(imported.scores, Some(ViewMode::Exploratory));

    assert_eq!(profile.schemas.len(), 17);
    assert!(profile.unresolved.is_empty());
    assert_eq!(profile.schemas[0].schema_id, "abandonment_instability");
    assert_eq!(
        profile.primary,
        vec![
            "abandonment_instability",
            "self_sacrifice",
            "entitlement_grandiosity",
            "unrelenting_standards",
        ]
    );
    assert!(profile
        .schemas
        .iter()
        .filter(|schema| schema.tier == ActivationTier::Subthreshold)
        .all(|schema| schema.visible));
}

#[test]
fn missing_file_is_an_io_error() {
    let library = ReferenceLibrary::bundled().expect("bundled reference data loads");
    let error = AssessmentImporter::from_path("does/not/exist.csv", library.mapping())
        .expect_err("missing file fails");

    assert!(matches!(
        error,
        schema_insight::AssessmentImportError::Io(_)
    ));
}
