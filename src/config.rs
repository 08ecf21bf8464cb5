//! Configuration loading (spec §6.4, expanded in SPEC_FULL.md §4.9).

use std::env;

use anyhow::{bail, Result};

const INSECURE_API_KEYS: &[&str] = &["test", "changeme", "default", "secret", "password", "admin"];

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub bind_addr: String,
    pub port: u16,

    pub max_concurrent_requests: usize,
    pub cache_ttl_seconds: u64,
    pub default_timeout_secs: u64,
    pub http_pool_connections: usize,
    pub http_max_keepalive: usize,
    pub allowed_origins: Vec<String>,

    pub min_required_adapters: usize,
    pub trustworthy_ratio_min: f64,

    pub predictions_path: String,

    pub the_racing_api_key: Option<String>,
    pub tvg_api_key: Option<String>,
    pub racing_and_sports_token: Option<String>,
    pub pointsbet_api_key: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_key = env::var("API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            bail!("API_KEY must be set");
        }
        if INSECURE_API_KEYS.contains(&api_key.to_lowercase().as_str()) {
            bail!(
                "API_KEY '{}' is on the list of insecure default values and is not allowed",
                api_key
            );
        }

        Ok(Self {
            api_key,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT", 8080),
            max_concurrent_requests: env_parse("MAX_CONCURRENT_REQUESTS", 5),
            cache_ttl_seconds: env_parse("CACHE_TTL_SECONDS", 300),
            default_timeout_secs: env_parse("DEFAULT_TIMEOUT", 30),
            http_pool_connections: env_parse("HTTP_POOL_CONNECTIONS", 100),
            http_max_keepalive: env_parse("HTTP_MAX_KEEPALIVE", 50),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|_| {
                    vec![
                        "http://localhost:3000".to_string(),
                        "http://localhost:3001".to_string(),
                    ]
                }),
            min_required_adapters: env_parse("MIN_REQUIRED_ADAPTERS", 2),
            trustworthy_ratio_min: env_parse_f64("TRUSTWORTHY_RATIO_MIN", 0.7),
            predictions_path: env::var("PREDICTIONS_PATH")
                .unwrap_or_else(|_| "./predictions.jsonl".to_string()),
            the_racing_api_key: env::var("THE_RACING_API_KEY").ok(),
            tvg_api_key: env::var("TVG_API_KEY").ok(),
            racing_and_sports_token: env::var("RACING_AND_SPORTS_TOKEN").ok(),
            pointsbet_api_key: env::var("POINTSBET_API_KEY").ok(),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_parse_f64(key: &str, default: f64) -> f64 {
    env_parse(key, default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_insecure_default_keys() {
        std::env::set_var("API_KEY", "changeme");
        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("insecure"));
        std::env::remove_var("API_KEY");
    }
}
