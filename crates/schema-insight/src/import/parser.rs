use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::AssessmentImportError;

pub(crate) const SCHEMA_COLUMN: &str = "Schema";
pub(crate) const SCORE_COLUMN: &str = "Z Score";

#[derive(Debug)]
pub(crate) struct AssessmentRecord {
    pub(crate) row: usize,
    pub(crate) identifier: String,
    pub(crate) z_score: Option<f64>,
    pub(crate) assessed_on: Option<NaiveDate>,
}

pub(crate) fn parse_records<R: Read>(
    reader: R,
) -> Result<Vec<AssessmentRecord>, AssessmentImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for required in [SCHEMA_COLUMN, SCORE_COLUMN] {
        if !headers.iter().any(|header| header == required) {
            return Err(AssessmentImportError::MissingColumn(required));
        }
    }

    let mut records = Vec::new();
    for (index, record) in csv_reader.deserialize::<AssessmentRow>().enumerate() {
        let row = record?;
        records.push(AssessmentRecord {
            row: index + 1,
            z_score: row.z_score.as_deref().and_then(parse_score),
            assessed_on: row.assessed_at.as_deref().and_then(parse_date),
            identifier: row.schema,
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct AssessmentRow {
    #[serde(rename = "Schema")]
    schema: String,
    #[serde(rename = "Z Score", default, deserialize_with = "empty_string_as_none")]
    z_score: Option<String>,
    #[serde(
        rename = "Assessed At",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    assessed_at: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_score(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|score| score.is_finite())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc().date());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

#[cfg(test)]
pub(crate) fn parse_date_for_tests(value: &str) -> Option<NaiveDate> {
    parse_date(value)
}

#[cfg(test)]
pub(crate) fn parse_score_for_tests(value: &str) -> Option<f64> {
    parse_score(value)
}
