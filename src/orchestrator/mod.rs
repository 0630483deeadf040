//! Cache-first weather resolution with stale fallback.
//!
//! `resolve` serves a fresh cache entry when one exists, otherwise fetches
//! current conditions and the forecast together. A failed or timed-out fetch
//! falls back to whatever the cache still holds for the city, however old.

pub mod warnings;

use chrono::{DateTime, Utc};
use futures_util::future::try_join;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStore};
use crate::clock::Clock;
use crate::content::{ContentGenerator, ContentRequest, LifestyleContent};
use crate::error::{AppError, ProviderError};
use crate::weather::{CityKey, ForecastEntry, ForecastSeries, WeatherClient, WeatherSnapshot};

pub use warnings::{derive_warning, Warning};

/// Days shown in the forecast strip.
pub const FORECAST_DAYS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Fetched during this call
    Live,
    /// Served from a cache entry younger than the TTL
    Cached,
    /// Provider failed, expired cache entry served instead
    Offline,
}

/// Everything the presentation layer needs for one city.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub snapshot: WeatherSnapshot,
    pub forecast: Vec<ForecastEntry>,
    pub source: DataSource,
    pub fetched_at: DateTime<Utc>,
    pub age_secs: i64,
    pub warning: Option<Warning>,
    pub lifestyle: LifestyleContent,
}

impl Resolution {
    /// Whole minutes since the data was fetched.
    pub fn age_minutes(&self) -> i64 {
        self.age_secs / 60
    }
}

pub struct Orchestrator {
    client: Arc<dyn WeatherClient>,
    content: ContentGenerator,
    cache: CacheStore,
    clock: Arc<dyn Clock>,
    resolve_timeout: std::time::Duration,
    in_flight: Mutex<HashMap<CityKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn WeatherClient>,
        content: ContentGenerator,
        cache: CacheStore,
        clock: Arc<dyn Clock>,
        resolve_timeout: std::time::Duration,
    ) -> Self {
        Self {
            client,
            content,
            cache,
            clock,
            resolve_timeout,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub async fn resolve(&self, city: &str) -> Result<Resolution, AppError> {
        let key = CityKey::parse(city)?;

        if let Some(entry) = self.fresh_entry(&key) {
            return Ok(self.serve(entry, DataSource::Cached).await);
        }

        let (entry, source) = {
            let lock = self.key_lock(&key);
            let _guard = lock.lock().await;

            // Someone else may have fetched while we waited
            if let Some(entry) = self.fresh_entry(&key) {
                (entry, DataSource::Cached)
            } else {
                match self.fetch(city.trim()).await {
                    Ok((weather, forecast)) => {
                        let entry = self.cache.put(key, weather, forecast, self.clock.now());
                        (entry, DataSource::Live)
                    }
                    Err(e) => match self.cache.get(&key) {
                        Some(stale) => {
                            warn!(
                                "Fetch for '{}' failed ({}), serving data from {} mins ago",
                                key,
                                e,
                                stale.age(self.clock.now()).num_minutes()
                            );
                            (stale, DataSource::Offline)
                        }
                        None => {
                            warn!("Fetch for '{}' failed with nothing cached: {}", key, e);
                            return Err(e.into());
                        }
                    },
                }
            }
        };

        Ok(self.serve(entry, source).await)
    }

    fn fresh_entry(&self, key: &CityKey) -> Option<CacheEntry> {
        let now = self.clock.now();
        self.cache
            .get(key)
            .filter(|entry| self.cache.is_fresh(entry, now))
    }

    fn key_lock(&self, key: &CityKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(key.clone()).or_default().clone()
    }

    /// Current conditions and forecast together; either failing fails both.
    async fn fetch(&self, city: &str) -> Result<(WeatherSnapshot, ForecastSeries), ProviderError> {
        let started = Instant::now();
        let pair = try_join(self.client.fetch_current(city), self.client.fetch_forecast(city));

        let result = match tokio::time::timeout(self.resolve_timeout, pair).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.resolve_timeout)),
        };

        debug!(
            "Fetch for '{}' took {:.3}s ({})",
            city,
            started.elapsed().as_secs_f64(),
            if result.is_ok() { "ok" } else { "failed" }
        );
        result
    }

    async fn serve(&self, entry: CacheEntry, source: DataSource) -> Resolution {
        let now = self.clock.now();
        let age_secs = match source {
            DataSource::Live => 0,
            DataSource::Cached | DataSource::Offline => entry.age(now).num_seconds(),
        };

        let warning = derive_warning(&entry.weather);
        let request = ContentRequest::for_snapshot(&entry.weather, now);
        let lifestyle = self.content.generate(&request).await;
        let forecast = entry
            .forecast
            .daily_view(entry.weather.utc_offset_secs, FORECAST_DAYS);

        info!(
            "Resolved {}: {:.1}°C {} [{:?}, {}s old]",
            entry.weather.city,
            entry.weather.temperature_c,
            entry.weather.condition,
            source,
            age_secs
        );

        Resolution {
            snapshot: entry.weather,
            forecast,
            source,
            fetched_at: entry.fetched_at,
            age_secs,
            warning,
            lifestyle,
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::weather::testing::series;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

    /// Weather client returning a template snapshot, renamed after the query.
    pub struct FakeClient {
        template: Mutex<WeatherSnapshot>,
        pub current_calls: AtomicUsize,
        pub forecast_calls: AtomicUsize,
        pub offline: AtomicBool,
        pub fail_forecast: AtomicBool,
        pub delay_ms: AtomicU64,
    }

    impl FakeClient {
        pub fn new(template: WeatherSnapshot) -> Self {
            Self {
                template: Mutex::new(template),
                current_calls: AtomicUsize::new(0),
                forecast_calls: AtomicUsize::new(0),
                offline: AtomicBool::new(false),
                fail_forecast: AtomicBool::new(false),
                delay_ms: AtomicU64::new(0),
            }
        }

        pub fn set_temperature(&self, temperature_c: f64) {
            self.template.lock().unwrap().temperature_c = temperature_c;
        }

        pub fn current_calls(&self) -> usize {
            self.current_calls.load(Ordering::SeqCst)
        }

        async fn pause(&self) {
            let ms = self.delay_ms.load(Ordering::SeqCst);
            if ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
            }
        }
    }

    #[async_trait]
    impl WeatherClient for FakeClient {
        async fn fetch_current(&self, city: &str) -> Result<WeatherSnapshot, ProviderError> {
            self.current_calls.fetch_add(1, Ordering::SeqCst);
            self.pause().await;
            if self.offline.load(Ordering::SeqCst) {
                return Err(ProviderError::Network("connection refused".to_string()));
            }
            let mut snap = self.template.lock().unwrap().clone();
            snap.city = city.to_string();
            Ok(snap)
        }

        async fn fetch_forecast(&self, _city: &str) -> Result<ForecastSeries, ProviderError> {
            self.forecast_calls.fetch_add(1, Ordering::SeqCst);
            self.pause().await;
            if self.offline.load(Ordering::SeqCst) || self.fail_forecast.load(Ordering::SeqCst) {
                return Err(ProviderError::Status(503));
            }
            Ok(series(6))
        }
    }
}
