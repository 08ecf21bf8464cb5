use std::sync::Arc;
use std::time::Instant;

use crate::analyzers::AnalyzerEngine;
use crate::auditor::PredictionStore;
use crate::config::Settings;
use crate::engine::Engine;
use crate::overrides::OverrideKey;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub settings: Arc<Settings>,
    pub predictions: Arc<PredictionStore>,
    pub allowed_origins: Vec<axum::http::HeaderValue>,
    pub started_at: Arc<Instant>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, settings: Arc<Settings>) -> Self {
        let predictions = Arc::new(PredictionStore::new(settings.predictions_path.clone()));
        let allowed_origins = settings
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        Self { engine, settings, predictions, allowed_origins, started_at: Arc::new(Instant::now()) }
    }

    /// Resolves an analyzer by name, honoring the configured trustworthy-ratio floor.
    pub fn analyzer(&self, name: &str) -> Option<Box<dyn crate::analyzers::Analyzer>> {
        AnalyzerEngine::get_analyzer(name, self.settings.trustworthy_ratio_min)
    }

    pub fn override_key(&self, adapter_name: &str, url: &str, date: &str) -> OverrideKey {
        OverrideKey { adapter_name: adapter_name.to_string(), url: url.to_string(), date: date.to_string() }
    }
}
