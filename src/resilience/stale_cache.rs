//! Last-known-good cache the engine falls back to when every adapter fails
//! (spec §4.3 step 5). Keyed by date only, independent of the short-TTL
//! response cache.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

pub struct StaleCache<T> {
    entries: RwLock<HashMap<String, Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone> StaleCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(24 * 3600))
    }

    pub fn put(&self, key: impl Into<String>, value: T) {
        self.entries.write().insert(key.into(), Entry { value, stored_at: Instant::now() });
    }

    /// Returns the cached value if present and within TTL; prunes it if expired.
    pub fn get(&self, key: &str) -> Option<T> {
        let expired = {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.stored_at.elapsed() <= self.ttl => return Some(entry.value.clone()),
                Some(_) => true,
                None => return None,
            }
        };
        if expired {
            self.entries.write().remove(key);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_fresh_value() {
        let cache: StaleCache<u32> = StaleCache::new(Duration::from_secs(60));
        cache.put("2026-07-30", 42);
        assert_eq!(cache.get("2026-07-30"), Some(42));
    }

    #[test]
    fn expires_after_ttl() {
        let cache: StaleCache<u32> = StaleCache::new(Duration::from_millis(1));
        cache.put("2026-07-30", 42);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("2026-07-30"), None);
    }

    #[test]
    fn missing_key_is_none() {
        let cache: StaleCache<u32> = StaleCache::new(Duration::from_secs(60));
        assert_eq!(cache.get("nope"), None);
    }
}
