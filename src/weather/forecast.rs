use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One 3-hourly forecast point. Temperature in Celsius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,
    pub temp_c: f64,
    pub condition: String,
    pub icon: String,
}

/// Provider forecast, ordered by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub entries: Vec<ForecastEntry>,
}

impl ForecastSeries {
    /// One entry per local calendar day: the one closest to local noon.
    ///
    /// Days come out in date order and the list is capped at `max_days`.
    /// On a tie the earlier entry wins.
    pub fn daily_view(&self, utc_offset_secs: i32, max_days: usize) -> Vec<ForecastEntry> {
        let offset = Duration::seconds(i64::from(utc_offset_secs));
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();

        let mut best: BTreeMap<NaiveDate, (i64, &ForecastEntry)> = BTreeMap::new();
        for entry in &self.entries {
            let local = (entry.timestamp + offset).naive_utc();
            let distance = (local.time() - noon).num_seconds().abs();
            match best.get(&local.date()) {
                Some((current, _)) if *current <= distance => {}
                _ => {
                    best.insert(local.date(), (distance, entry));
                }
            }
        }

        let days: Vec<ForecastEntry> = best
            .into_values()
            .take(max_days)
            .map(|(_, entry)| entry.clone())
            .collect();

        debug!(
            "Daily view: {} of {} forecast points selected",
            days.len(),
            self.entries.len()
        );
        days
    }
}
