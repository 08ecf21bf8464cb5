//! The adapter framework (spec §4.2): a uniform contract for source-specific
//! scrapers, wrapped by the shared resilience layer. Concrete adapters only
//! implement `fetch_data`/`parse_races`; everything else — circuit
//! breaking, rate limiting, retry, post-parse validation, metrics — lives
//! in [`base::run_adapter`].

pub mod base;
pub mod http;
pub mod roster;

mod at_the_races;
mod at_the_races_greyhound;
mod at_the_races_results;
mod equibase;
mod equibase_results;
mod gbgb_api;
mod harness;
mod racingpost;
mod timeform;
mod tvg;
mod twinspires;

pub use at_the_races::AtTheRacesAdapter;
pub use at_the_races_greyhound::AtTheRacesGreyhoundAdapter;
pub use at_the_races_results::AtTheRacesResultsAdapter;
pub use equibase::EquibaseAdapter;
pub use equibase_results::EquibaseResultsAdapter;
pub use gbgb_api::GbgbApiAdapter;
pub use harness::HarnessAdapter;
pub use racingpost::RacingPostAdapter;
pub use timeform::TimeformAdapter;
pub use tvg::TvgAdapter;
pub use twinspires::TwinSpiresAdapter;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Race, ResultRace};
use crate::error::PaddockError;
use crate::fetch::Fetcher;
use crate::resilience::{CircuitBreaker, HealthMonitor, RateLimiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    Discovery,
    Results,
}

/// Raw payload handed from `fetch_data` to `parse_races`. Most adapters use
/// `Text`; a few JSON APIs use `Json` directly to skip a re-parse.
pub enum RawPayload {
    Text(String),
    Json(Value),
}

/// Per-adapter shared resilience handles, owned by the engine and cloned
/// (via `Arc`) into each adapter at construction.
pub struct AdapterContext {
    pub fetcher: Arc<Fetcher>,
    pub rate_limiter: Arc<RateLimiter>,
    pub circuit_breaker: Arc<CircuitBreaker>,
    pub health_monitor: Arc<HealthMonitor>,
    pub overrides: Arc<crate::overrides::ManualOverrideManager>,
}

#[async_trait]
pub trait Adapter: Send + Sync {
    fn source_name(&self) -> &str;
    fn adapter_type(&self) -> AdapterType;
    fn preferred_engine(&self) -> Option<crate::fetch::Engine> {
        None
    }

    async fn fetch_data(&self, date: &str) -> Result<RawPayload, PaddockError>;
    fn parse_races(&self, raw: &RawPayload) -> Result<Vec<Race>, PaddockError>;

    /// Results adapters override this; discovery adapters keep the default
    /// (their `parse_races` already returns the real data).
    fn parse_results(&self, _raw: &RawPayload) -> Result<Vec<ResultRace>, PaddockError> {
        Ok(Vec::new())
    }

    /// The public entry point: runs the shared orchestration in
    /// [`base::run_adapter`] around this adapter's `fetch_data`/`parse_races`.
    async fn get_races(&self, ctx: &AdapterContext, date: &str) -> Vec<Race> {
        base::run_adapter(self, ctx, date).await
    }

    /// Same shared retry/circuit-breaking policy, but for the results-table
    /// parse path used by the auditor (spec §4.8).
    async fn get_results(&self, ctx: &AdapterContext, date: &str) -> Vec<ResultRace> {
        base::run_results_adapter(self, ctx, date).await
    }
}
