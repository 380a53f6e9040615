use crate::cli::ServeArgs;
use crate::infra::{AppState, ReferenceSource, ReferenceStore};
use crate::routes::with_scoring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use schema_insight::config::AppConfig;
use schema_insight::error::AppError;
use schema_insight::{telemetry, THRESHOLDS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, false)?;

    let source = ReferenceSource::from_config(config.reference.data_dir.clone());
    let store = ReferenceStore::load(source, THRESHOLDS)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        store: Arc::new(store),
        environment: config.environment,
    };

    let app = with_scoring_routes()
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        thresholds = THRESHOLDS.version,
        "schema scoring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
