use crate::infra::{parse_view_mode, ReferenceSource};
use chrono::NaiveDate;
use clap::Args;
use schema_insight::config::AppConfig;
use schema_insight::error::AppError;
use schema_insight::import::{SkipReason, SkippedRow};
use schema_insight::reference::CanonicalSchemaMapping;
use schema_insight::scoring::{AssessmentProfile, CopingStrategy, DetailLevel, ViewMode};
use schema_insight::{telemetry, AssessmentImporter, ScoringEngine, THRESHOLDS};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Assessment CSV export with `Schema` and `Z Score` columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Override the coach view mode (strict or exploratory)
    #[arg(long, value_parser = parse_view_mode)]
    pub(crate) view_mode: Option<ViewMode>,
    /// Print the profile as JSON instead of a text report
    #[arg(long)]
    pub(crate) json: bool,
    /// Load reference tables from this directory instead of the bundled set
    #[arg(long)]
    pub(crate) reference_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct SchemasArgs {
    /// Print the table as JSON
    #[arg(long)]
    pub(crate) json: bool,
    /// Load reference tables from this directory instead of the bundled set
    #[arg(long)]
    pub(crate) reference_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreReport {
    pub(crate) source: PathBuf,
    pub(crate) assessed_on: Option<NaiveDate>,
    pub(crate) skipped: Vec<SkippedRow>,
    pub(crate) profile: AssessmentProfile,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        csv,
        view_mode,
        json,
        reference_dir,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, true)?;

    let source = ReferenceSource::from_config(reference_dir.or(config.reference.data_dir));
    let engine = ScoringEngine::new(Arc::new(source.load()?), THRESHOLDS);
    let imported = AssessmentImporter::from_path(&csv, engine.library().mapping())?;
    let profile = engine.assess_scores(imported.scores, view_mode);

    let report = ScoreReport {
        source: csv,
        assessed_on: imported.assessed_on,
        skipped: imported.skipped,
        profile,
    };

    let mut stdout = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut stdout, &report).map_err(io::Error::from)?;
        writeln!(stdout)?;
    } else {
        render_score_report(&mut stdout, &report)?;
    }
    Ok(())
}

pub(crate) fn run_schemas(args: SchemasArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, true)?;

    let source = ReferenceSource::from_config(args.reference_dir.or(config.reference.data_dir));
    let library = source.load()?;

    let mut stdout = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, library.mapping().entries())
            .map_err(io::Error::from)?;
        writeln!(stdout)?;
    } else {
        render_schema_table(&mut stdout, library.mapping())?;
    }
    Ok(())
}

pub(crate) fn render_score_report<W: Write>(out: &mut W, report: &ScoreReport) -> io::Result<()> {
    let profile = &report.profile;

    writeln!(out, "Schema profile: {}", report.source.display())?;
    writeln!(
        out,
        "Thresholds {} | {} view",
        profile.threshold_version,
        profile.view_mode.label()
    )?;
    if let Some(date) = report.assessed_on {
        writeln!(out, "Assessed on {date}")?;
    }

    render_section(out, "Primary", &profile.primary, profile)?;
    render_section(out, "Secondary", &profile.secondary, profile)?;

    writeln!(out)?;
    writeln!(out, "Coping tendencies:")?;
    for strategy in CopingStrategy::ordered() {
        let marker = if strategy == profile.coping.dominant {
            "*"
        } else {
            " "
        };
        writeln!(
            out,
            " {marker} [{}] {:<17} raw {:>7.2}  share {:>5.1}%",
            strategy.code(),
            strategy.label(),
            profile.coping.raw.get(strategy),
            profile.coping.probabilities.get(strategy) * 100.0
        )?;
    }

    if !report.skipped.is_empty() {
        writeln!(out)?;
        writeln!(out, "Skipped rows:")?;
        for row in &report.skipped {
            writeln!(
                out,
                "  row {:>3}  {:<28} {}",
                row.row,
                row.identifier,
                skip_reason_label(row.reason)
            )?;
        }
    }

    if !profile.unresolved.is_empty() {
        writeln!(out, "Unresolved identifiers: {}", profile.unresolved.join(", "))?;
    }

    Ok(())
}

fn render_section<W: Write>(
    out: &mut W,
    title: &str,
    schema_ids: &[String],
    profile: &AssessmentProfile,
) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{title} schemas:")?;
    if schema_ids.is_empty() {
        writeln!(out, "  (none)")?;
        return Ok(());
    }

    for schema in schema_ids.iter().filter_map(|id| profile.schema(id)) {
        let note = match schema.policy.detail_level {
            DetailLevel::Full => "",
            DetailLevel::Brief => " [subthreshold, exploratory only]",
            DetailLevel::None => " [hidden in this view]",
        };
        writeln!(
            out,
            "  {:>2}. {:<42} T {:>5.1}  {:<12} {:<9} {}{note}",
            schema.rank,
            schema.clinical_name,
            schema.t_score,
            schema.tier.label(),
            schema.clinical_significance.label(),
            schema.leadership_name,
        )?;
    }
    Ok(())
}

pub(crate) fn render_schema_table<W: Write>(
    out: &mut W,
    mapping: &CanonicalSchemaMapping,
) -> io::Result<()> {
    for (domain_id, entries) in mapping.grouped_by_domain() {
        let name = mapping
            .domain(domain_id)
            .map(|domain| domain.name.as_str())
            .unwrap_or("Unknown domain");
        writeln!(out, "Domain {domain_id}: {name}")?;
        for entry in entries {
            writeln!(
                out,
                "  {:<3} {:<32} {:<42} {}",
                entry.variable_id, entry.clinical_id, entry.clinical_name, entry.leadership_name
            )?;
        }
    }
    Ok(())
}

fn skip_reason_label(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::UnknownSchema => "unknown schema",
        SkipReason::InvalidScore => "invalid score",
        SkipReason::Duplicate => "duplicate row",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_insight::scoring::RawScore;
    use schema_insight::ReferenceLibrary;

    fn sample_report(view_mode: ViewMode) -> ScoreReport {
        let engine = ScoringEngine::new(
            Arc::new(ReferenceLibrary::bundled().expect("bundled loads")),
            THRESHOLDS,
        );
        let profile = engine.assess(
            vec![
                RawScore::new("AB", Some(2.1)),
                RawScore::new("MA", Some(0.6)),
                RawScore::new("DS", Some(-0.5)),
            ],
            Some(view_mode),
        );
        ScoreReport {
            source: PathBuf::from("export.csv"),
            assessed_on: NaiveDate::from_ymd_opt(2025, 2, 3),
            skipped: vec![SkippedRow {
                row: 4,
                identifier: "Workaholism".to_string(),
                reason: SkipReason::UnknownSchema,
            }],
            profile,
        }
    }

    fn render(report: &ScoreReport) -> String {
        let mut buffer = Vec::new();
        render_score_report(&mut buffer, report).expect("renders");
        String::from_utf8(buffer).expect("utf8 output")
    }

    #[test]
    fn text_report_lists_sections_and_coping() {
        let report = sample_report(ViewMode::Exploratory);
        let output = render(&report);
        let dominant = report.profile.coping.dominant;
        let dominant = format!("* [{}] {}", dominant.code(), dominant.label());

        assert!(output.contains("Assessed on 2025-02-03"));
        assert!(output.contains("exploratory view"));
        assert!(output.contains("Abandonment/Instability"));
        assert!(output.contains("[subthreshold, exploratory only]"));
        assert!(output.contains(&dominant));
        assert!(output.contains("Workaholism"));
    }

    #[test]
    fn strict_report_marks_padding_as_hidden() {
        let output = render(&sample_report(ViewMode::Strict));

        assert!(output.contains("strict view"));
        assert!(output.contains("[hidden in this view]"));
        assert!(!output.contains("exploratory only"));
    }

    #[test]
    fn schema_table_groups_by_domain() {
        let library = ReferenceLibrary::bundled().expect("bundled loads");
        let mut buffer = Vec::new();
        render_schema_table(&mut buffer, library.mapping()).expect("renders");
        let output = String::from_utf8(buffer).expect("utf8 output");

        assert_eq!(output.matches("Domain ").count(), 5);
        assert!(output.starts_with("Domain 1: Disconnection & Rejection"));
        assert!(output.contains("unrelenting_standards"));
    }
}
