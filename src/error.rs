use std::time::Duration;
use thiserror::Error;

/// Failures from the weather provider. Recoverable by serving stale cache.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),
    #[error("city not found: {0}")]
    UnknownCity(String),
    #[error("provider rejected the API key")]
    Unauthorized,
    #[error("provider returned HTTP {0}")]
    Status(u16),
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else if let Some(status) = e.status() {
            ProviderError::Status(status.as_u16())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Errors that can reach the user.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("location detection failed: {0}")]
    Geolocation(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Short human message. Never includes raw transport error text.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(message) if message == "empty city" => {
                "Please enter a city name".to_string()
            }
            AppError::Validation(message) => format!("Invalid input: {}", message),
            AppError::Provider(ProviderError::UnknownCity(city)) => {
                format!("City '{}' not found. Check the spelling and try again.", city)
            }
            AppError::Provider(ProviderError::Unauthorized) => {
                "The weather service rejected the API key. Check OPENWEATHER_API_KEY.".to_string()
            }
            AppError::Provider(ProviderError::Timeout(_)) => {
                "The weather service took too long to answer. Try again later.".to_string()
            }
            AppError::Provider(_) => {
                "Unable to reach the weather service. Check your internet connection.".to_string()
            }
            AppError::Geolocation(message) => message.clone(),
            AppError::Config(message) => format!("Configuration error: {}", message),
        }
    }
}
