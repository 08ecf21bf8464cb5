//! Per-adapter rolling metrics and health classification (spec §4.5).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone)]
struct Sample {
    at: Instant,
    success: bool,
    latency_ms: u64,
}

/// Running counters for one adapter, with a bounded rolling window used to
/// compute the 24h success rate and average latency.
pub struct AdapterMetrics {
    samples: RwLock<Vec<Sample>>,
    total: RwLock<u64>,
    successful: RwLock<u64>,
    failed: RwLock<u64>,
    total_latency_ms: RwLock<u64>,
    consecutive_failures: RwLock<u32>,
    last_failure_reason: RwLock<Option<String>>,
}

const WINDOW: Duration = Duration::from_secs(24 * 3600);

impl Default for AdapterMetrics {
    fn default() -> Self {
        Self {
            samples: RwLock::new(Vec::new()),
            total: RwLock::new(0),
            successful: RwLock::new(0),
            failed: RwLock::new(0),
            total_latency_ms: RwLock::new(0),
            consecutive_failures: RwLock::new(0),
            last_failure_reason: RwLock::new(None),
        }
    }
}

impl AdapterMetrics {
    pub fn record_success(&self, latency_ms: u64) {
        *self.total.write() += 1;
        *self.successful.write() += 1;
        *self.total_latency_ms.write() += latency_ms;
        *self.consecutive_failures.write() = 0;
        self.push_sample(Sample { at: Instant::now(), success: true, latency_ms });
    }

    pub fn record_failure(&self, latency_ms: u64, reason: impl Into<String>) {
        *self.total.write() += 1;
        *self.failed.write() += 1;
        *self.total_latency_ms.write() += latency_ms;
        *self.consecutive_failures.write() += 1;
        *self.last_failure_reason.write() = Some(reason.into());
        self.push_sample(Sample { at: Instant::now(), success: false, latency_ms });
    }

    fn push_sample(&self, sample: Sample) {
        let mut samples = self.samples.write();
        samples.push(sample);
        let cutoff = Instant::now() - WINDOW;
        samples.retain(|s| s.at >= cutoff);
    }

    pub fn consecutive_failures(&self) -> u32 {
        *self.consecutive_failures.read()
    }

    pub fn success_rate_24h(&self) -> f64 {
        let samples = self.samples.read();
        if samples.is_empty() {
            return 1.0;
        }
        let successes = samples.iter().filter(|s| s.success).count();
        successes as f64 / samples.len() as f64
    }

    pub fn avg_response_time_ms(&self) -> f64 {
        let samples = self.samples.read();
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().map(|s| s.latency_ms as f64).sum::<f64>() / samples.len() as f64
    }

    pub fn total(&self) -> u64 {
        *self.total.read()
    }

    pub fn successful(&self) -> u64 {
        *self.successful.read()
    }

    pub fn failed(&self) -> u64 {
        *self.failed.read()
    }
}

/// Registry of [`AdapterMetrics`] keyed by adapter name, plus the
/// classification rule from spec §4.5.
#[derive(Default)]
pub struct HealthMonitor {
    metrics: RwLock<HashMap<String, std::sync::Arc<AdapterMetrics>>>,
}

impl HealthMonitor {
    pub fn metrics_for(&self, adapter: &str) -> std::sync::Arc<AdapterMetrics> {
        if let Some(m) = self.metrics.read().get(adapter) {
            return m.clone();
        }
        let mut write = self.metrics.write();
        write
            .entry(adapter.to_string())
            .or_insert_with(|| std::sync::Arc::new(AdapterMetrics::default()))
            .clone()
    }

    pub fn classify(&self, adapter: &str) -> Health {
        let metrics = self.metrics_for(adapter);
        if metrics.consecutive_failures() >= 3 || metrics.success_rate_24h() < 0.3 {
            return Health::Unhealthy;
        }
        if metrics.success_rate_24h() < 0.7 || metrics.avg_response_time_ms() > 10_000.0 {
            return Health::Degraded;
        }
        Health::Healthy
    }

    /// Returns `names` partitioned: adapters classified as `tier` first,
    /// original relative order preserved within the partition.
    pub fn filter_by_tier<'a>(&self, names: &'a [String], tier: Health) -> Vec<&'a str> {
        names.iter().map(String::as_str).filter(|n| self.classify(n) == tier).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unclassified_adapter_is_healthy() {
        let monitor = HealthMonitor::default();
        assert_eq!(monitor.classify("new_adapter"), Health::Healthy);
    }

    #[test]
    fn three_consecutive_failures_is_unhealthy() {
        let monitor = HealthMonitor::default();
        let metrics = monitor.metrics_for("flaky");
        metrics.record_failure(100, "boom");
        metrics.record_failure(100, "boom");
        metrics.record_failure(100, "boom");
        assert_eq!(monitor.classify("flaky"), Health::Unhealthy);
    }

    #[test]
    fn low_success_rate_is_degraded_not_unhealthy() {
        let monitor = HealthMonitor::default();
        let metrics = monitor.metrics_for("so_so");
        for _ in 0..6 {
            metrics.record_success(50);
        }
        for _ in 0..4 {
            metrics.record_failure(50, "err");
        }
        metrics.record_success(50);
        assert_eq!(monitor.classify("so_so"), Health::Degraded);
    }
}
