//! The fetch orchestrator (spec §4.3): tiered healthy → degraded → stale
//! execution under a global concurrency cap, with short-TTL response
//! caching and a stale-data fallback when every live adapter fails.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::adapters::roster::Roster;
use crate::adapters::{Adapter, AdapterContext};
use crate::config::Settings;
use crate::dedupe::Deduplicator;
use crate::domain::{Race, ResultRace};
use crate::error::PaddockError;
use crate::overrides::ManualOverrideManager;
use crate::resilience::{Health, StaleCache};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub adapter: String,
    pub status: FetchStatus,
    pub races_fetched: usize,
    pub fetch_duration_ms: u64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResponse {
    pub date: String,
    pub races: Vec<Race>,
    pub errors: Vec<String>,
    pub source_info: Vec<SourceInfo>,
    pub data_freshness: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

struct CacheEntry {
    response: AggregatedResponse,
    stored_at: Instant,
}

pub struct Engine {
    roster: Roster,
    global_semaphore: Arc<Semaphore>,
    response_cache: RwLock<HashMap<String, CacheEntry>>,
    stale_cache: StaleCache<AggregatedResponse>,
    cache_ttl: Duration,
    min_required_adapters: usize,
}

impl Engine {
    pub fn new(settings: &Settings) -> Self {
        Self {
            roster: Roster::build(settings),
            global_semaphore: Arc::new(Semaphore::new(settings.max_concurrent_requests)),
            response_cache: RwLock::new(HashMap::new()),
            stale_cache: StaleCache::with_default_ttl(),
            cache_ttl: Duration::from_secs(settings.cache_ttl_seconds),
            min_required_adapters: settings.min_required_adapters,
        }
    }

    pub fn health_monitor(&self) -> &Arc<crate::resilience::HealthMonitor> {
        &self.roster.health_monitor
    }

    pub fn overrides(&self) -> &Arc<ManualOverrideManager> {
        &self.roster.overrides
    }

    /// Runs every results adapter for `date`, used by the auditor's matching
    /// pass (spec §4.8). Adapter-level failures are swallowed to empty, same
    /// propagation policy as the discovery side.
    pub async fn fetch_results(&self, date: &str) -> Vec<ResultRace> {
        let mut handles = Vec::new();
        for (adapter, ctx) in &self.roster.results {
            handles.push(adapter.get_results(ctx, date));
        }
        futures_join_all(handles).await.into_iter().flatten().collect()
    }

    pub async fn fetch_all_odds(&self, date: &str, source_filter: Option<&[String]>) -> AggregatedResponse {
        let cache_key = Self::cache_key(date, source_filter);
        if let Some(cached) = self.cached_response(&cache_key) {
            return cached;
        }

        let eligible: Vec<usize> = self
            .roster
            .discovery
            .iter()
            .enumerate()
            .filter(|(_, (a, _))| source_filter.map_or(true, |names| names.iter().any(|n| n == a.source_name())))
            .map(|(i, _)| i)
            .collect();

        let mut source_info = Vec::new();
        let mut payloads: Vec<Vec<Race>> = Vec::new();

        let healthy: Vec<usize> = eligible
            .iter()
            .copied()
            .filter(|&i| self.roster.health_monitor.classify(self.roster.discovery[i].0.source_name()) == Health::Healthy)
            .collect();
        self.run_tier(&healthy, date, &mut payloads, &mut source_info).await;

        if payloads.iter().filter(|p| !p.is_empty()).count() < self.min_required_adapters {
            let degraded: Vec<usize> = eligible
                .iter()
                .copied()
                .filter(|&i| !healthy.contains(&i))
                .filter(|&i| self.roster.health_monitor.classify(self.roster.discovery[i].0.source_name()) == Health::Degraded)
                .collect();
            self.run_tier(&degraded, date, &mut payloads, &mut source_info).await;
        }

        let all_empty = payloads.iter().all(|p| p.is_empty());
        if all_empty {
            if let Some(mut stale) = self.stale_cache.get(date) {
                warn!(date, "all adapters failed, serving stale cache");
                stale.data_freshness = "stale".to_string();
                stale.errors.push("serving stale data: no adapter succeeded this cycle".to_string());
                return stale;
            }
        }

        let merged = Deduplicator::merge(payloads.into_iter().flatten().collect());
        let errors = source_info
            .iter()
            .filter(|s| matches!(s.status, FetchStatus::Failed))
            .filter_map(|s| s.error_message.clone())
            .collect();

        let response = AggregatedResponse {
            date: date.to_string(),
            races: merged,
            errors,
            source_info,
            data_freshness: "live".to_string(),
            metadata: HashMap::new(),
        };

        self.response_cache.write().insert(cache_key, CacheEntry { response: response.clone(), stored_at: Instant::now() });
        self.stale_cache.put(date.to_string(), response.clone());

        response
    }

    async fn run_tier(&self, indices: &[usize], date: &str, payloads: &mut Vec<Vec<Race>>, source_info: &mut Vec<SourceInfo>) {
        let mut handles = Vec::new();
        for &i in indices {
            let semaphore = self.global_semaphore.clone();
            let date = date.to_string();
            handles.push(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                self.fetch_one_with_semaphore(i, &date).await
            });
        }
        let results: Vec<(Vec<Race>, SourceInfo)> = futures_join_all(handles).await;
        for (races, info) in results {
            payloads.push(races);
            source_info.push(info);
        }
    }

    async fn fetch_one_with_semaphore(&self, adapter_idx: usize, date: &str) -> (Vec<Race>, SourceInfo) {
        let (adapter, ctx): &(Arc<dyn Adapter>, AdapterContext) = &self.roster.discovery[adapter_idx];
        let name = adapter.source_name().to_string();
        let start = Instant::now();

        let races = adapter.get_races(ctx, date).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let status = if races.is_empty() { FetchStatus::Failed } else { FetchStatus::Success };
        let error_message = match status {
            FetchStatus::Failed => Some(format!("{name}: no races returned")),
            FetchStatus::Success => None,
        };

        info!(adapter = %name, races_fetched = races.len(), duration_ms, "fetch_one_with_semaphore complete");

        (races, SourceInfo { adapter: name, status, races_fetched: races.len(), fetch_duration_ms: duration_ms, error_message })
    }

    fn cached_response(&self, key: &str) -> Option<AggregatedResponse> {
        let cache = self.response_cache.read();
        let entry = cache.get(key)?;
        if entry.stored_at.elapsed() <= self.cache_ttl {
            Some(entry.response.clone())
        } else {
            None
        }
    }

    fn cache_key(date: &str, source_filter: Option<&[String]>) -> String {
        match source_filter {
            Some(names) => {
                let mut sorted = names.to_vec();
                sorted.sort();
                format!("{date}|{}", sorted.join(","))
            }
            None => date.to_string(),
        }
    }

    pub fn adapter_statuses(&self) -> Vec<AdapterStatusView> {
        self.roster
            .discovery
            .iter()
            .map(|(a, _)| {
                let name = a.source_name();
                let metrics = self.roster.health_monitor.metrics_for(name);
                AdapterStatusView {
                    name: name.to_string(),
                    health: self.roster.health_monitor.classify(name),
                    success_rate_24h: metrics.success_rate_24h(),
                    consecutive_failures: metrics.consecutive_failures(),
                    avg_response_time_ms: metrics.avg_response_time_ms(),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterStatusView {
    pub name: String,
    pub health: Health,
    pub success_rate_24h: f64,
    pub consecutive_failures: u32,
    pub avg_response_time_ms: f64,
}

async fn futures_join_all<F: std::future::Future>(futures: Vec<F>) -> Vec<F::Output> {
    futures_util::future::join_all(futures).await
}

impl PaddockError {
    pub fn engine_fatal(reason: impl Into<String>) -> Self {
        PaddockError::EngineFatal(reason.into())
    }
}
