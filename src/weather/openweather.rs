//! OpenWeatherMap current-weather client.

use async_trait::async_trait;
use serde_json::Value;

use super::{WeatherError, WeatherProvider, WeatherReading};

/// Default endpoint for current conditions
pub const DEFAULT_WEATHER_API_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn lookup(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        if !self.is_configured() {
            return Err(WeatherError::NotConfigured("WEATHER_API_KEY not set".to_string()));
        }

        let response = self
            .client
            .get(&self.url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| WeatherError::RequestFailed(e.to_string()))?;

        let status = response.status();
        // Error responses still carry a JSON body with `cod` and `message`
        let payload: Value = response
            .json()
            .await
            .map_err(|e| WeatherError::ParseError(format!("HTTP {}: {}", status, e)))?;

        parse_current_weather(&payload)
    }
}

/// Extract temperature, humidity and description from a current-weather payload.
///
/// `cod` is a number on success and a string on errors ("404"); both are read.
fn parse_current_weather(payload: &Value) -> Result<WeatherReading, WeatherError> {
    let code = match &payload["cod"] {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    if code != Some(200) {
        let message = payload["message"]
            .as_str()
            .unwrap_or("no message")
            .to_string();
        return Err(WeatherError::ProviderError { code, message });
    }

    let temperature = payload["main"]["temp"]
        .as_f64()
        .ok_or_else(|| WeatherError::ParseError("missing main.temp".to_string()))?;
    let humidity = payload["main"]["humidity"]
        .as_f64()
        .ok_or_else(|| WeatherError::ParseError("missing main.humidity".to_string()))?;
    let description = payload["weather"][0]["description"]
        .as_str()
        .ok_or_else(|| WeatherError::ParseError("missing weather[0].description".to_string()))?;

    Ok(WeatherReading::new(temperature, humidity, description))
}
