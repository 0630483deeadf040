use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::AppError;

pub const DEFAULT_GEOLOCATION_URL: &str = "https://ipapi.co/json/";

const NO_CITY: &str = "Could not detect your city name.";
const NO_LOCATION: &str = "Could not detect your location.";

#[derive(Debug, Deserialize)]
struct IpLocation {
    #[serde(default)]
    city: Option<String>,
}

/// IP-based city lookup
pub struct Geolocator {
    http: reqwest::Client,
    url: String,
}

impl Geolocator {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("skycast/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.to_string(),
        })
    }

    /// City name for the caller's public IP.
    pub async fn detect_city(&self) -> Result<String, AppError> {
        debug!("Geolocating via {}", self.url);
        let location = self.fetch().await.map_err(|e| {
            warn!("Geolocation failed: {}", e.without_url());
            AppError::Geolocation(NO_LOCATION.to_string())
        })?;

        match location.city.map(|c| c.trim().to_string()) {
            Some(city) if !city.is_empty() => {
                info!("Detected city: {}", city);
                Ok(city)
            }
            _ => Err(AppError::Geolocation(NO_CITY.to_string())),
        }
    }

    async fn fetch(&self) -> Result<IpLocation, reqwest::Error> {
        self.http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}
