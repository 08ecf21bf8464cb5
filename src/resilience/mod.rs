//! Per-adapter resilience primitives (spec §4.5): rate limiting, circuit
//! breaking, health classification, and the stale-data fallback cache.

pub mod circuit_breaker;
pub mod health;
pub mod rate_limiter;
pub mod stale_cache;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use health::{AdapterMetrics, Health, HealthMonitor};
pub use rate_limiter::RateLimiter;
pub use stale_cache::StaleCache;
