//! Wires the concrete adapter roster (spec §4.2a) together with one
//! [`AdapterContext`] per adapter, sharing a single [`Fetcher`] and
//! [`ManualOverrideManager`] across all of them.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Settings;
use crate::fetch::Fetcher;
use crate::overrides::ManualOverrideManager;
use crate::resilience::{CircuitBreaker, HealthMonitor, RateLimiter};

use super::{
    Adapter, AdapterContext, AtTheRacesAdapter, AtTheRacesGreyhoundAdapter, AtTheRacesResultsAdapter, EquibaseAdapter,
    EquibaseResultsAdapter, GbgbApiAdapter, HarnessAdapter, RacingPostAdapter, TimeformAdapter, TvgAdapter,
    TwinSpiresAdapter,
};

pub struct Roster {
    pub discovery: Vec<(Arc<dyn Adapter>, AdapterContext)>,
    pub results: Vec<(Arc<dyn Adapter>, AdapterContext)>,
    pub health_monitor: Arc<HealthMonitor>,
    pub overrides: Arc<ManualOverrideManager>,
}

impl Roster {
    pub fn build(settings: &Settings) -> Self {
        let fetcher = Arc::new(Fetcher::with_all_engines(settings.http_pool_connections, settings.http_max_keepalive));
        let health_monitor = Arc::new(HealthMonitor::default());
        let overrides = Arc::new(ManualOverrideManager::with_default_max_age());

        let make_ctx = |fetcher: &Arc<Fetcher>, health_monitor: &Arc<HealthMonitor>, overrides: &Arc<ManualOverrideManager>| AdapterContext {
            fetcher: fetcher.clone(),
            rate_limiter: Arc::new(RateLimiter::new(10.0)),
            circuit_breaker: Arc::new(CircuitBreaker::new("adapter")),
            health_monitor: health_monitor.clone(),
            overrides: overrides.clone(),
        };

        let discovery: Vec<(Arc<dyn Adapter>, AdapterContext)> = vec![
            (Arc::new(AtTheRacesAdapter::new()), make_ctx(&fetcher, &health_monitor, &overrides)),
            (Arc::new(AtTheRacesGreyhoundAdapter::new()), make_ctx(&fetcher, &health_monitor, &overrides)),
            (Arc::new(RacingPostAdapter::new()), make_ctx(&fetcher, &health_monitor, &overrides)),
            (Arc::new(EquibaseAdapter::new()), make_ctx(&fetcher, &health_monitor, &overrides)),
            (Arc::new(TwinSpiresAdapter::new()), make_ctx(&fetcher, &health_monitor, &overrides)),
            (Arc::new(TvgAdapter::new(settings.tvg_api_key.clone())), make_ctx(&fetcher, &health_monitor, &overrides)),
            (Arc::new(GbgbApiAdapter::new()), make_ctx(&fetcher, &health_monitor, &overrides)),
            (Arc::new(HarnessAdapter::new()), make_ctx(&fetcher, &health_monitor, &overrides)),
            (Arc::new(TimeformAdapter::new()), make_ctx(&fetcher, &health_monitor, &overrides)),
        ];

        let results: Vec<(Arc<dyn Adapter>, AdapterContext)> = vec![
            (Arc::new(EquibaseResultsAdapter::new()), make_ctx(&fetcher, &health_monitor, &overrides)),
            (Arc::new(AtTheRacesResultsAdapter::new()), make_ctx(&fetcher, &health_monitor, &overrides)),
        ];

        Self { discovery, results, health_monitor, overrides }
    }

    pub fn discovery_names(&self) -> Vec<String> {
        self.discovery.iter().map(|(a, _)| a.source_name().to_string()).collect()
    }

    pub fn names_to_adapters(&self) -> HashMap<String, usize> {
        self.discovery
            .iter()
            .enumerate()
            .map(|(i, (a, _))| (a.source_name().to_string(), i))
            .collect()
    }
}
