pub mod forecast;
pub mod openweather;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, ProviderError};

pub use forecast::{ForecastEntry, ForecastSeries};

/// Cache identity for a city: trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CityKey(String);

impl CityKey {
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("empty city"));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

}

impl fmt::Display for CityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current conditions for one city. Always metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: String,
    /// Temperature in Celsius
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity: u8,
    /// Atmospheric pressure in hPa
    pub pressure_hpa: f64,
    /// Wind speed in m/s
    pub wind_speed: f64,
    pub wind_gust: f64,
    /// Provider condition group, e.g. "Clear", "Rain". Open set.
    pub condition: String,
    pub description: String,
    pub icon: String,
    pub sunrise: i64,
    pub sunset: i64,
    /// Shift from UTC in seconds for the city
    pub utc_offset_secs: i32,
    /// Observation time (epoch seconds)
    pub observed_at: i64,
}

impl WeatherSnapshot {
    /// Wall-clock time in the city for a UTC instant.
    pub fn local_time(&self, at: DateTime<Utc>) -> NaiveDateTime {
        (at + Duration::seconds(i64::from(self.utc_offset_secs))).naive_utc()
    }

    /// Wall-clock time in the city for an epoch timestamp from the provider.
    pub fn local_epoch(&self, epoch: i64) -> Option<NaiveDateTime> {
        DateTime::from_timestamp(epoch, 0).map(|at| self.local_time(at))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TempUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            TempUnit::Celsius => "°C",
            TempUnit::Fahrenheit => "°F",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TempUnit::Celsius => TempUnit::Fahrenheit,
            TempUnit::Fahrenheit => TempUnit::Celsius,
        }
    }

    /// Express a Celsius reading in this unit.
    pub fn from_celsius(self, celsius: f64) -> f64 {
        match self {
            TempUnit::Celsius => celsius,
            TempUnit::Fahrenheit => c_to_f(celsius),
        }
    }
}

/// Convert Celsius to Fahrenheit
pub fn c_to_f(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

/// Remote weather provider. Both lookups are by free-text city name.
#[async_trait]
pub trait WeatherClient: Send + Sync {
    async fn fetch_current(&self, city: &str) -> Result<WeatherSnapshot, ProviderError>;
    async fn fetch_forecast(&self, city: &str) -> Result<ForecastSeries, ProviderError>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_city_key_normalizes_case_and_whitespace() {
        let a = CityKey::parse("  Paris ").unwrap();
        let b = CityKey::parse("PARIS").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "paris");
    }

    #[test]
    fn test_city_key_rejects_blank() {
        assert!(matches!(CityKey::parse("   "), Err(AppError::Validation(_))));
        assert!(matches!(CityKey::parse(""), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_c_to_f() {
        assert!((c_to_f(20.0) - 68.0).abs() < 1e-9);
        assert!((c_to_f(-40.0) + 40.0).abs() < 1e-9);
        assert!((TempUnit::Celsius.from_celsius(20.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_unit_toggle_and_symbol() {
        assert_eq!(TempUnit::Celsius.toggled(), TempUnit::Fahrenheit);
        assert_eq!(TempUnit::Fahrenheit.toggled(), TempUnit::Celsius);
        assert_eq!(TempUnit::Fahrenheit.symbol(), "°F");
        assert!((TempUnit::Fahrenheit.from_celsius(100.0) - 212.0).abs() < 1e-9);
    }

    #[test]
    fn test_local_time_applies_offset() {
        let mut snap = testing::snapshot("Tokyo", 20.0, 3.0, "Clear");
        snap.utc_offset_secs = 9 * 3600;
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 20, 30, 0).unwrap();
        let local = snap.local_time(at);
        assert_eq!(local.hour(), 5);
        assert_eq!(local.minute(), 30);
    }
}
