use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::NaiveDate;
use schema_insight::error::AppError;
use schema_insight::import::SkippedRow;
use schema_insight::reference::{Mode, SchemaDomain, SchemaMappingEntry};
use schema_insight::scoring::{AssessmentProfile, RawScore, ThresholdConfig, ViewMode};
use schema_insight::AssessmentImporter;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::atomic::Ordering;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileRequest {
    pub(crate) scores: Vec<RawScore>,
    #[serde(default)]
    pub(crate) view_mode: Option<ViewMode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImportRequest {
    pub(crate) csv: String,
    #[serde(default)]
    pub(crate) view_mode: Option<ViewMode>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportResponse {
    pub(crate) assessed_on: Option<NaiveDate>,
    pub(crate) skipped: Vec<SkippedRow>,
    pub(crate) profile: AssessmentProfile,
}

#[derive(Debug, Serialize)]
pub(crate) struct SchemaCatalog {
    pub(crate) domains: Vec<SchemaDomain>,
    pub(crate) schemas: Vec<SchemaMappingEntry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SchemaDetail {
    pub(crate) schema: SchemaMappingEntry,
    pub(crate) domain: Option<SchemaDomain>,
    pub(crate) modes: Vec<Mode>,
}

pub(crate) fn with_scoring_routes() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/thresholds", get(thresholds_endpoint))
        .route("/api/v1/schemas", get(schemas_endpoint))
        .route("/api/v1/schemas/:identifier", get(schema_endpoint))
        .route("/api/v1/assessments/profile", post(profile_endpoint))
        .route("/api/v1/assessments/import", post(import_endpoint))
        .route("/api/v1/reference/reload", post(reload_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn thresholds_endpoint(
    Extension(state): Extension<AppState>,
) -> Json<ThresholdConfig> {
    Json(*state.store.engine().thresholds())
}

pub(crate) async fn schemas_endpoint(Extension(state): Extension<AppState>) -> Json<SchemaCatalog> {
    let engine = state.store.engine();
    let mapping = engine.library().mapping();
    Json(SchemaCatalog {
        domains: mapping.domains().cloned().collect(),
        schemas: mapping.entries().to_vec(),
    })
}

pub(crate) async fn schema_endpoint(
    Extension(state): Extension<AppState>,
    Path(identifier): Path<String>,
) -> Response {
    let engine = state.store.engine();
    let library = engine.library();
    let Some(entry) = library.mapping().resolve(&identifier) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown schema '{identifier}'") })),
        )
            .into_response();
    };

    Json(SchemaDetail {
        schema: entry.clone(),
        domain: library.mapping().domain(entry.domain_id).cloned(),
        modes: library
            .modes()
            .linked_to(&entry.clinical_id)
            .cloned()
            .collect(),
    })
    .into_response()
}

pub(crate) async fn profile_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ProfileRequest>,
) -> Json<AssessmentProfile> {
    let ProfileRequest { scores, view_mode } = payload;
    let submitted = scores.len();
    let profile = state.store.engine().assess(scores, view_mode);

    info!(
        submitted,
        scored = profile.schemas.len(),
        unresolved = profile.unresolved.len(),
        view_mode = profile.view_mode.label(),
        "assessment profile built"
    );
    Json(profile)
}

pub(crate) async fn import_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<ImportRequest>,
) -> Result<Json<ImportResponse>, AppError> {
    let ImportRequest { csv, view_mode } = payload;
    let engine = state.store.engine();

    let reader = Cursor::new(csv.into_bytes());
    let imported = AssessmentImporter::from_reader(reader, engine.library().mapping())?;
    let profile = engine.assess_scores(imported.scores, view_mode);

    Ok(Json(ImportResponse {
        assessed_on: imported.assessed_on,
        skipped: imported.skipped,
        profile,
    }))
}

pub(crate) async fn reload_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !state.environment.allows_reference_reload() {
        return Err(AppError::ReloadDisabled);
    }

    let engine = state.store.reload()?;
    Ok(Json(json!({
        "status": "reloaded",
        "schemas": engine.library().mapping().len(),
        "modes": engine.library().modes().len(),
    })))
}
