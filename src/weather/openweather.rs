use async_trait::async_trait;
use chrono::DateTime;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{ForecastEntry, ForecastSeries, WeatherClient, WeatherSnapshot};
use crate::error::ProviderError;

/// Provider unit system. Snapshots are stored metric, so this never changes.
const UNITS: &str = "metric";

/// OpenWeatherMap client (current weather + 5 day / 3 hour forecast)
pub struct OpenWeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    #[serde(default)]
    weather: Vec<ConditionData>,
    main: MainData,
    #[serde(default)]
    wind: WindData,
    #[serde(default)]
    dt: i64,
    #[serde(default)]
    sys: SysData,
    #[serde(default)]
    timezone: i32,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct ConditionData {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct MainData {
    temp: f64,
    #[serde(default)]
    feels_like: Option<f64>,
    #[serde(default)]
    pressure: f64,
    #[serde(default)]
    humidity: u8,
}

#[derive(Debug, Default, Deserialize)]
struct WindData {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    gust: f64,
}

#[derive(Debug, Default, Deserialize)]
struct SysData {
    #[serde(default)]
    country: String,
    #[serde(default)]
    sunrise: i64,
    #[serde(default)]
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastItem>,
}

#[derive(Debug, Deserialize)]
struct ForecastItem {
    dt: i64,
    main: MainData,
    #[serde(default)]
    weather: Vec<ConditionData>,
}

impl CurrentResponse {
    fn into_snapshot(self) -> WeatherSnapshot {
        let condition = self.weather.into_iter().next().unwrap_or_default();
        WeatherSnapshot {
            city: self.name,
            country: self.sys.country,
            temperature_c: self.main.temp,
            feels_like_c: self.main.feels_like.unwrap_or(self.main.temp),
            humidity: self.main.humidity,
            pressure_hpa: self.main.pressure,
            wind_speed: self.wind.speed,
            wind_gust: self.wind.gust,
            condition: condition.main,
            description: condition.description,
            icon: if condition.icon.is_empty() { "01d".to_string() } else { condition.icon },
            sunrise: self.sys.sunrise,
            sunset: self.sys.sunset,
            utc_offset_secs: self.timezone,
            observed_at: self.dt,
        }
    }
}

impl ForecastResponse {
    fn into_series(self) -> Result<ForecastSeries, ProviderError> {
        let mut entries = Vec::with_capacity(self.list.len());
        for item in self.list {
            let timestamp = DateTime::from_timestamp(item.dt, 0).ok_or_else(|| {
                ProviderError::Malformed(format!("invalid forecast timestamp {}", item.dt))
            })?;
            let condition = item.weather.into_iter().next().unwrap_or_default();
            entries.push(ForecastEntry {
                timestamp,
                temp_c: item.main.temp,
                condition: condition.main,
                icon: condition.icon,
            });
        }
        entries.sort_by_key(|e| e.timestamp);
        Ok(ForecastSeries { entries })
    }
}

impl OpenWeatherClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("skycast/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, city: &str) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("OpenWeather request: {} q={}", url, city);
        let started = Instant::now();

        let resp = self
            .http
            .get(&url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", UNITS)])
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.without_url().to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            warn!("OpenWeather does not know '{}'", city);
            return Err(ProviderError::UnknownCity(city.to_string()));
        }
        if status == StatusCode::UNAUTHORIZED {
            warn!("OpenWeather rejected the API key (HTTP 401)");
            return Err(ProviderError::Unauthorized);
        }
        if !status.is_success() {
            warn!("OpenWeather {} returned {}", endpoint, status);
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = resp
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Malformed(e.without_url().to_string()))?;

        debug!(
            "OpenWeather {} for {} answered in {:.3}s",
            endpoint,
            city,
            started.elapsed().as_secs_f64()
        );
        Ok(body)
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn fetch_current(&self, city: &str) -> Result<WeatherSnapshot, ProviderError> {
        let resp: CurrentResponse = self.get("weather", city).await?;
        let snapshot = resp.into_snapshot();
        info!(
            "  {} current: {:.1}°C {} (wind {:.1} m/s)",
            snapshot.city, snapshot.temperature_c, snapshot.condition, snapshot.wind_speed
        );
        Ok(snapshot)
    }

    async fn fetch_forecast(&self, city: &str) -> Result<ForecastSeries, ProviderError> {
        let resp: ForecastResponse = self.get("forecast", city).await?;
        let series = resp.into_series()?;
        info!("  {} forecast: {} points", city, series.entries.len());
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn london_current() -> serde_json::Value {
        json!({
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
            "main": {"temp": 14.2, "feels_like": 13.5, "pressure": 1009, "humidity": 81},
            "wind": {"speed": 5.1, "deg": 240, "gust": 9.3},
            "dt": 1748779200,
            "sys": {"country": "GB", "sunrise": 1748749500, "sunset": 1748808900},
            "timezone": 3600,
            "name": "London",
            "cod": 200
        })
    }

    fn client(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_current_maps_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "London"))
            .and(query_param("units", "metric"))
            .and(query_param("appid", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_current()))
            .mount(&server)
            .await;

        let snap = client(&server).fetch_current("London").await.unwrap();
        assert_eq!(snap.city, "London");
        assert_eq!(snap.country, "GB");
        assert_eq!(snap.condition, "Rain");
        assert_eq!(snap.description, "light rain");
        assert_eq!(snap.humidity, 81);
        assert_eq!(snap.utc_offset_secs, 3600);
        assert!((snap.temperature_c - 14.2).abs() < 1e-9);
        assert!((snap.wind_gust - 9.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_gust_defaults_to_zero() {
        let server = MockServer::start().await;
        let mut body = london_current();
        body["wind"] = json!({"speed": 2.0});
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let snap = client(&server).fetch_current("London").await.unwrap();
        assert_eq!(snap.wind_gust, 0.0);
    }

    #[tokio::test]
    async fn test_unknown_city_is_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).fetch_current("Atlantis").await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownCity(ref c) if c == "Atlantis"));
    }

    #[tokio::test]
    async fn test_server_error_maps_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client(&server).fetch_forecast("London").await.unwrap_err();
        assert!(matches!(err, ProviderError::Status(500)));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server).fetch_current("London").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_current("London").await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_fetch_forecast_orders_entries() {
        let server = MockServer::start().await;
        let body = json!({
            "cod": "200",
            "list": [
                {"dt": 1748790000, "main": {"temp": 17.0}, "weather": [{"main": "Clouds", "icon": "04d"}], "dt_txt": "2025-06-01 15:00:00"},
                {"dt": 1748779200, "main": {"temp": 15.5}, "weather": [{"main": "Clear", "icon": "01d"}], "dt_txt": "2025-06-01 12:00:00"}
            ],
            "city": {"name": "London", "timezone": 3600}
        });
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let series = client(&server).fetch_forecast("London").await.unwrap();
        assert_eq!(series.entries.len(), 2);
        assert_eq!(series.entries[0].condition, "Clear");
        assert!(series.entries[0].timestamp < series.entries[1].timestamp);
    }
}
