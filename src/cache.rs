//! In-memory weather cache keyed by normalized city name.
//!
//! Entries are never evicted. An expired entry stops being served as fresh
//! but stays readable, since it is the fallback when the provider is down.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use crate::weather::{CityKey, ForecastSeries, WeatherSnapshot};

/// Default time-to-live for direct serving.
pub const DEFAULT_TTL_SECS: i64 = 600;

/// Last successful fetch for a city.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CityKey,
    pub weather: WeatherSnapshot,
    pub forecast: ForecastSeries,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Time since the fetch, never negative.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).max(Duration::zero())
    }
}

/// Fresh means strictly younger than `ttl`.
pub fn is_fresh(entry: &CacheEntry, now: DateTime<Utc>, ttl: Duration) -> bool {
    now - entry.fetched_at < ttl
}

pub struct CacheStore {
    entries: RwLock<HashMap<CityKey, CacheEntry>>,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &CityKey) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let hit = entries.get(key).cloned();
        debug!("Cache {} for '{}'", if hit.is_some() { "hit" } else { "miss" }, key);
        hit
    }

    /// Store a fetch result, replacing any previous entry for the key.
    /// `fetched_at` never moves backwards for a key.
    pub fn put(
        &self,
        key: CityKey,
        weather: WeatherSnapshot,
        forecast: ForecastSeries,
        now: DateTime<Utc>,
    ) -> CacheEntry {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let fetched_at = match entries.get(&key) {
            Some(previous) if previous.fetched_at > now => previous.fetched_at,
            _ => now,
        };
        let entry = CacheEntry {
            key: key.clone(),
            weather,
            forecast,
            fetched_at,
        };
        entries.insert(key, entry.clone());
        debug!("Cached '{}' ({} entries total)", entry.key, entries.len());
        entry
    }

    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        is_fresh(entry, now, self.ttl)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }
}
