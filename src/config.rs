//! Server configuration from environment variables
//!
//! Defaults target local development (`cargo run --bin api_server` from the
//! repo root). Deployments override them through the service environment.

use std::path::PathBuf;

use crate::weather::DEFAULT_WEATHER_API_URL;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Crop/fertilizer recommendation dataset
    pub crop_csv_path: PathBuf,
    /// ONNX export of the soil classifier
    pub model_path: PathBuf,
    /// Where uploaded images are written and served from
    pub upload_dir: PathBuf,
    pub weather_api_url: String,
    /// Empty disables weather lookups
    pub weather_api_key: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            crop_csv_path: PathBuf::from("data/Crop_recommendation.csv"),
            model_path: PathBuf::from("models/soil_classification_model_mobilenet.onnx"),
            upload_dir: PathBuf::from("uploads"),
            weather_api_url: DEFAULT_WEATHER_API_URL.to_string(),
            weather_api_key: String::new(),
            port: 5000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// Variables: CROP_CSV_PATH, MODEL_PATH, UPLOAD_DIR, WEATHER_API_URL,
    /// WEATHER_API_KEY, PORT, MAX_UPLOAD_BYTES
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset or unparseable values
    /// fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            crop_csv_path: get("CROP_CSV_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.crop_csv_path),
            model_path: get("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            weather_api_url: get("WEATHER_API_URL").unwrap_or(defaults.weather_api_url),
            weather_api_key: get("WEATHER_API_KEY").unwrap_or(defaults.weather_api_key),
            port: get("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            max_upload_bytes: get("MAX_UPLOAD_BYTES")
                .and_then(|b| b.trim().parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
        }
    }

    /// Log the active configuration without the API key.
    pub fn log_summary(&self) {
        tracing::info!("Configuration:");
        tracing::info!("  CROP_CSV_PATH: {}", self.crop_csv_path.display());
        tracing::info!("  MODEL_PATH: {}", self.model_path.display());
        tracing::info!("  UPLOAD_DIR: {}", self.upload_dir.display());
        tracing::info!("  WEATHER_API_URL: {}", self.weather_api_url);
        tracing::info!(
            "  WEATHER_API_KEY: {}",
            if self.weather_api_key.is_empty() { "<unset>" } else { "<set>" }
        );
        tracing::info!("  PORT: {}", self.port);
        tracing::info!("  MAX_UPLOAD_BYTES: {}", self.max_upload_bytes);
    }
}
