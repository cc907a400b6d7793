// Page handlers for HTML rendering with Askama

use axum::response::{Html, IntoResponse};
use askama::Template;

use crate::data::CropRecommendation;
use crate::utils::title_case;
use crate::weather::WeatherReading;

const APP_TITLE: &str = "SoilSense";

// ============================================================================
// View Models
// ============================================================================

/// Soil prediction plus everything shown next to it
pub struct PredictionView {
    /// Title-cased for display
    pub soil_type: String,
    /// Normalized key posted back to /crop_details
    pub soil_key: String,
    pub crops: Vec<String>,
    /// Stored upload name, percent-encoded as a single path segment
    pub uploaded_image: Option<String>,
    pub city: Option<String>,
    pub temperature: String,
    pub humidity: String,
    pub description: String,
}

impl PredictionView {
    pub fn new(
        soil_key: &str,
        crops: Vec<String>,
        uploaded_image: Option<String>,
        city: Option<String>,
        weather: &WeatherReading,
    ) -> Self {
        Self {
            soil_type: title_case(soil_key),
            soil_key: soil_key.to_string(),
            crops,
            uploaded_image: uploaded_image.map(|name| urlencoding::encode(&name).into_owned()),
            city,
            temperature: display_or_missing(weather.temperature.map(|t| format!("{} °C", t))),
            humidity: display_or_missing(weather.humidity.map(|h| format!("{}%", h))),
            description: display_or_missing(weather.description.clone()),
        }
    }
}

/// Full recommendation record, as labelled rows in display order
pub struct CropInfoView {
    pub fields: Vec<(&'static str, String)>,
}

impl CropInfoView {
    pub fn new(soil_type: &str, record: &CropRecommendation) -> Self {
        Self {
            fields: vec![
                ("Soil Type", title_case(soil_type)),
                ("Crop Type", record.crop_type.clone()),
                ("Temperature", record.temperature.to_string()),
                ("Humidity", record.humidity.to_string()),
                ("Nitrogen", record.nitrogen.to_string()),
                ("Phosphorous", record.phosphorous.to_string()),
                ("Potassium", record.potassium.to_string()),
                ("Fertilizer Name", record.fertilizer.clone()),
            ],
        }
    }
}

fn display_or_missing(value: Option<String>) -> String {
    value.unwrap_or_else(|| "N/A".to_string())
}

// ============================================================================
// Index Page (landing, prediction result, crop details)
// ============================================================================

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub error: Option<String>,
    pub prediction: Option<PredictionView>,
    pub crop_info: Option<CropInfoView>,
}

impl IndexTemplate {
    pub fn landing() -> Self {
        Self {
            title: APP_TITLE.to_string(),
            error: None,
            prediction: None,
            crop_info: None,
        }
    }

    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::landing()
        }
    }

    pub fn with_prediction(prediction: PredictionView) -> Self {
        Self {
            prediction: Some(prediction),
            ..Self::landing()
        }
    }

    pub fn with_crop_info(crop_info: CropInfoView) -> Self {
        Self {
            crop_info: Some(crop_info),
            ..Self::landing()
        }
    }
}

/// Render any page template, falling back to the error text on failure.
pub fn render_page<T: Template>(template: &T) -> Html<String> {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template error: {}", e);
        format!("Template error: {}", e)
    }))
}

pub async fn home_page() -> impl IntoResponse {
    render_page(&IndexTemplate::landing())
}
