//! Manual bot-block fallback (spec §4.6): when an adapter's fetch dies with
//! a recognized bot-block indicator, register a pending request a human can
//! later satisfy by submitting raw HTML through the API.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideKey {
    pub adapter_name: String,
    pub url: String,
    pub date: String,
}

struct PendingRequest {
    registered_at: Instant,
    html: Option<String>,
}

/// Registry of pending bot-blocked requests, keyed by `(adapter, url, date)`.
pub struct ManualOverrideManager {
    pending: Mutex<HashMap<OverrideKey, PendingRequest>>,
    max_age: Duration,
}

impl ManualOverrideManager {
    pub fn new(max_age_hours: u64) -> Self {
        Self { pending: Mutex::new(HashMap::new()), max_age: Duration::from_secs(max_age_hours * 3600) }
    }

    pub fn with_default_max_age() -> Self {
        Self::new(24)
    }

    pub fn register(&self, key: OverrideKey) {
        let mut pending = self.pending.lock();
        pending.entry(key).or_insert_with(|| PendingRequest { registered_at: Instant::now(), html: None });
    }

    /// A human operator submits the raw page for a pending key.
    pub fn submit(&self, key: &OverrideKey, html: String) -> bool {
        let mut pending = self.pending.lock();
        match pending.get_mut(key) {
            Some(entry) => {
                entry.html = Some(html);
                true
            }
            None => false,
        }
    }

    /// The adapter base class calls this before `fetch_data`; if a human
    /// has supplied content, consume it and feed it straight to `parse_races`.
    pub fn take_submitted(&self, key: &OverrideKey) -> Option<String> {
        let mut pending = self.pending.lock();
        let html = pending.get_mut(key).and_then(|entry| entry.html.take());
        if html.is_some() {
            pending.remove(key);
        }
        html
    }

    pub fn purge_expired(&self) {
        let max_age = self.max_age;
        self.pending.lock().retain(|_, entry| entry.registered_at.elapsed() <= max_age);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
