//! Weather Lookup
//!
//! Current conditions for a city, shown next to the crop recommendations.
//! Weather is garnish: any failure is logged and rendered as missing values,
//! never as an error page.

mod fixed;
mod openweather;

pub use fixed::FixedWeatherProvider;
pub use openweather::{OpenWeatherClient, DEFAULT_WEATHER_API_URL};

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Error type for weather lookups.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    RequestFailed(String),

    #[error("weather provider returned code {code:?}: {message}")]
    ProviderError { code: Option<i64>, message: String },

    #[error("failed to parse weather response: {0}")]
    ParseError(String),

    #[error("weather provider not configured: {0}")]
    NotConfigured(String),
}

/// Current conditions; every field is absent when the lookup failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherReading {
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Relative humidity, percent
    pub humidity: Option<f64>,
    pub description: Option<String>,
}

impl WeatherReading {
    pub fn new(temperature: f64, humidity: f64, description: impl Into<String>) -> Self {
        Self {
            temperature: Some(temperature),
            humidity: Some(humidity),
            description: Some(description.into()),
        }
    }

    /// The reading used whenever the provider cannot answer.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none() && self.description.is_none()
    }
}

/// Trait for weather providers.
///
/// `lookup` reports failures explicitly; `fetch_weather` is where they are
/// collapsed into an absent reading.
#[async_trait]
pub trait WeatherProvider: Send + Sync + fmt::Debug {
    /// One remote lookup for `city`. No retries.
    async fn lookup(&self, city: &str) -> Result<WeatherReading, WeatherError>;
}

/// Weather for an optional city, degrading to `WeatherReading::absent()`.
///
/// A missing or blank city skips the provider entirely.
pub async fn fetch_weather(provider: &dyn WeatherProvider, city: Option<&str>) -> WeatherReading {
    let Some(city) = city.map(str::trim).filter(|c| !c.is_empty()) else {
        tracing::debug!("No city given, skipping weather lookup");
        return WeatherReading::absent();
    };

    match provider.lookup(city).await {
        Ok(reading) => reading,
        Err(e) => {
            tracing::warn!("Error fetching weather data for '{}': {}", city, e);
            WeatherReading::absent()
        }
    }
}
