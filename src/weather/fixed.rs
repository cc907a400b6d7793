//! Fixed weather provider for testing.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{WeatherError, WeatherProvider, WeatherReading};

/// Answers every lookup with the same reading (or the same failure) and
/// remembers the last city it was asked about.
#[derive(Debug)]
pub struct FixedWeatherProvider {
    reading: Option<WeatherReading>,
    last_city: Mutex<Option<String>>,
}

impl FixedWeatherProvider {
    pub fn available(reading: WeatherReading) -> Self {
        Self {
            reading: Some(reading),
            last_city: Mutex::new(None),
        }
    }

    /// Every lookup fails as if the provider were down.
    pub fn unavailable() -> Self {
        Self {
            reading: None,
            last_city: Mutex::new(None),
        }
    }

    pub fn last_city(&self) -> Option<String> {
        self.last_city
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl WeatherProvider for FixedWeatherProvider {
    async fn lookup(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        if let Ok(mut guard) = self.last_city.lock() {
            *guard = Some(city.to_string());
        }

        self.reading
            .clone()
            .ok_or_else(|| WeatherError::RequestFailed("provider unavailable".to_string()))
    }
}
