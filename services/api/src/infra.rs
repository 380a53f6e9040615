use metrics_exporter_prometheus::PrometheusHandle;
use schema_insight::config::AppEnvironment;
use schema_insight::scoring::{ThresholdConfig, ViewMode};
use schema_insight::{ReferenceDataError, ReferenceLibrary, ScoringEngine};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: Arc<ReferenceStore>,
    pub(crate) environment: AppEnvironment,
}

/// Where the reference tables come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReferenceSource {
    Bundled,
    Directory(PathBuf),
}

impl ReferenceSource {
    pub(crate) fn from_config(data_dir: Option<PathBuf>) -> Self {
        data_dir.map_or(Self::Bundled, Self::Directory)
    }

    pub(crate) fn load(&self) -> Result<ReferenceLibrary, ReferenceDataError> {
        match self {
            Self::Bundled => ReferenceLibrary::bundled(),
            Self::Directory(dir) => ReferenceLibrary::from_dir(dir),
        }
    }
}

/// Holds the engine every request scores against.
///
/// Requests take a snapshot `Arc` so an in-flight assessment keeps the
/// tables it started with while a reload swaps in new ones.
pub(crate) struct ReferenceStore {
    source: ReferenceSource,
    thresholds: ThresholdConfig,
    engine: RwLock<Arc<ScoringEngine>>,
}

impl ReferenceStore {
    pub(crate) fn load(
        source: ReferenceSource,
        thresholds: ThresholdConfig,
    ) -> Result<Self, ReferenceDataError> {
        let library = source.load()?;
        let engine = ScoringEngine::new(Arc::new(library), thresholds);
        Ok(Self {
            source,
            thresholds,
            engine: RwLock::new(Arc::new(engine)),
        })
    }

    pub(crate) fn engine(&self) -> Arc<ScoringEngine> {
        self.engine
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-reads the tables from the original source. A failed load leaves
    /// the current engine in place.
    pub(crate) fn reload(&self) -> Result<Arc<ScoringEngine>, ReferenceDataError> {
        let library = self.source.load()?;
        let engine = Arc::new(ScoringEngine::new(Arc::new(library), self.thresholds));
        *self.engine.write().unwrap_or_else(PoisonError::into_inner) = engine.clone();

        info!(
            schemas = engine.library().mapping().len(),
            modes = engine.library().modes().len(),
            "reference data reloaded"
        );
        Ok(engine)
    }
}

pub(crate) fn parse_view_mode(raw: &str) -> Result<ViewMode, String> {
    ViewMode::parse(raw)
        .ok_or_else(|| format!("unknown view mode '{raw}' (expected strict or exploratory)"))
}
