//! Soil Sense
//!
//! Soil image classification with crop and fertilizer recommendations.
//!
//! - `imaging`: upload storage and image-to-tensor preprocessing
//! - `classifier`: soil classifier trait, ONNX backend and label table
//! - `data`: crop recommendation table loaded with Polars
//! - `weather`: current conditions for the recommendation page
//! - `api_server` / `web`: Axum routes and Askama pages (feature `api`)

pub mod utils;
pub mod config;
pub mod data;
pub mod imaging;
pub mod classifier;
pub mod weather;

#[cfg(feature = "api")]
pub mod api_server;
#[cfg(feature = "api")]
pub mod web;

// Re-export commonly used types
pub use classifier::{ClassifierError, FixedClassifier, OnnxClassifier, Prediction, SoilClassifier};
pub use config::AppConfig;
pub use data::{CropRecommendation, RecommendationTable};
pub use imaging::{DecodeError, ImageInput, ImageTensor, UploadStore};
pub use weather::{fetch_weather, FixedWeatherProvider, OpenWeatherClient, WeatherProvider, WeatherReading};

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
