// Axum Server Module
//
// Purpose: HTML form endpoints for soil classification + crop recommendations
// State: recommendation table and classifier are loaded once and shared read-only

use axum::{
    async_trait,
    extract::{rejection::FormRejection, DefaultBodyLimit, Form, FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};

use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::classifier::{OnnxClassifier, SoilClassifier};
use crate::config::AppConfig;
use crate::data::RecommendationTable;
use crate::imaging::{self, DecodeError, ImageInput, UploadStore};
use crate::utils::normalize_key;
use crate::weather::{fetch_weather, OpenWeatherClient, WeatherProvider};
use crate::web::handlers::{home_page, render_page, CropInfoView, IndexTemplate, PredictionView};

pub const NO_INPUT_MESSAGE: &str = "No file or captured image provided";
pub const CROP_NOT_FOUND_MESSAGE: &str = "Crop details not found";

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// ============================================================================
// Application State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationTable>,
    pub classifier: Arc<dyn SoilClassifier>,
    pub weather: Arc<dyn WeatherProvider>,
    pub uploads: Arc<UploadStore>,
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Load everything the handlers share.
    ///
    /// A broken dataset degrades to an empty table; a missing model or an
    /// unwritable upload directory is fatal.
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading crop recommendations...");
        let recommendations = RecommendationTable::load(&config.crop_csv_path);
        if recommendations.is_empty() {
            tracing::warn!("Recommendation table is empty; every prediction will report missing data");
        }

        tracing::info!("Loading soil classifier...");
        let model_path = config.model_path.clone();
        let classifier = tokio::task::spawn_blocking(move || OnnxClassifier::load(&model_path))
            .await
            .context("Soil classifier loading task failed")??;

        tracing::info!("Preparing upload directory...");
        let uploads = UploadStore::new(config.upload_dir.clone());
        uploads
            .ensure_dir()
            .await
            .with_context(|| format!("Failed to create upload directory: {}", config.upload_dir.display()))?;

        let weather = OpenWeatherClient::new(&config.weather_api_url, &config.weather_api_key);
        if !weather.is_configured() {
            tracing::warn!("WEATHER_API_KEY not set; weather will always be unavailable");
        }

        Ok(Self::from_parts(
            recommendations,
            Arc::new(classifier),
            Arc::new(weather),
            uploads,
        )
        .with_max_upload_bytes(config.max_upload_bytes))
    }

    /// Assemble state from already-built components.
    pub fn from_parts(
        recommendations: RecommendationTable,
        classifier: Arc<dyn SoilClassifier>,
        weather: Arc<dyn WeatherProvider>,
        uploads: UploadStore,
    ) -> Self {
        Self {
            recommendations: Arc::new(recommendations),
            classifier,
            weather,
            uploads: Arc::new(uploads),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    let uploads_dir = state.uploads.dir().to_path_buf();
    let body_limit = state.max_upload_bytes;

    Router::new()
        // Pages
        .route("/", get(home_page))
        .route("/predict", post(predict))
        .route("/crop_details", post(crop_details))

        // Uploaded images, referenced from the prediction page
        .nest_service("/uploads", ServeDir::new(uploads_dir))

        // Health check
        .route("/health", get(health_check))

        // Middleware (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

// ============================================================================
// Form Extraction
// ============================================================================

/// `/predict` submission with the image source already resolved.
///
/// Accepts multipart (file upload form) and urlencoded bodies (camera-only
/// submissions carry no file part).
#[derive(Debug)]
pub struct PredictForm {
    pub image: Option<ImageInput>,
    pub city: Option<String>,
}

impl PredictForm {
    /// An uploaded file wins over a captured image; blank values count as absent.
    fn resolve(
        file: Option<(String, Vec<u8>)>,
        captured_image: Option<String>,
        city: Option<String>,
    ) -> Self {
        let uploaded = file
            .filter(|(file_name, _)| !file_name.is_empty())
            .map(|(file_name, bytes)| ImageInput::UploadedFile { file_name, bytes });
        let captured = captured_image
            .filter(|data| !data.trim().is_empty())
            .map(ImageInput::InlineImageData);

        Self {
            image: uploaded.or(captured),
            city: city
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        }
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut file = None;
        let mut captured_image = None;
        let mut city = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::rejected(e.status(), e.body_text()))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
                    file = Some((file_name, bytes.to_vec()));
                }
                Some("captured_image") => {
                    captured_image = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| AppError::rejected(e.status(), e.body_text()))?,
                    );
                }
                Some("city") => {
                    city = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| AppError::rejected(e.status(), e.body_text()))?,
                    );
                }
                _ => {}
            }
        }

        Ok(Self::resolve(file, captured_image, city))
    }
}

#[async_trait]
impl<S> FromRequest<S> for PredictForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        let Form(mut fields) = Form::<HashMap<String, String>>::from_request(req, state)
            .await
            .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;

        Ok(Self::resolve(
            None,
            fields.remove("captured_image"),
            fields.remove("city"),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct CropDetailsForm {
    #[serde(default)]
    pub crop_type: Option<String>,
    #[serde(default)]
    pub soil_type: Option<String>,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "soil_types": state.recommendations.len(),
        "classifier": state.classifier.name(),
    }))
}

/// Classify the submitted soil image and show matching crops and weather.
async fn predict(
    State(state): State<AppState>,
    form: PredictForm,
) -> Result<Response, AppError> {
    let Some(input) = form.image else {
        tracing::info!("Prediction requested without an image");
        return Ok(render_page(&IndexTemplate::with_error(NO_INPUT_MESSAGE)).into_response());
    };

    let prepared = match imaging::prepare(input, &state.uploads).await {
        Ok(prepared) => prepared,
        Err(e) if is_client_error(&e) => {
            tracing::warn!("Rejected soil image: {}", e);
            let page = IndexTemplate::with_error(format!("Could not read the provided image: {}", e));
            return Ok((StatusCode::BAD_REQUEST, render_page(&page)).into_response());
        }
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    let start = std::time::Instant::now();
    let classifier = Arc::clone(&state.classifier);
    let tensor = prepared.tensor;
    let prediction = tokio::task::spawn_blocking(move || classifier.predict(&tensor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(
        "Predicted soil type '{}' (confidence {:.3}) in {:?}",
        prediction.label,
        prediction.confidence,
        start.elapsed()
    );

    let crops = state.recommendations.crop_names(&prediction.label);
    if crops.is_empty() {
        let message = format!("No data available for soil type: {}", prediction.label);
        return Ok(render_page(&IndexTemplate::with_error(message)).into_response());
    }

    let weather = fetch_weather(state.weather.as_ref(), form.city.as_deref()).await;

    let view = PredictionView::new(
        &prediction.label,
        crops,
        prepared.uploaded_file,
        form.city,
        &weather,
    );
    Ok(render_page(&IndexTemplate::with_prediction(view)).into_response())
}

/// Show the full recommendation record for one crop under one soil type.
async fn crop_details(
    State(state): State<AppState>,
    form: Result<Form<CropDetailsForm>, FormRejection>,
) -> Result<Response, AppError> {
    let Form(form) = form.map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
    let soil_type = form.soil_type.as_deref().map(normalize_key).unwrap_or_default();
    let crop_type = form.crop_type.unwrap_or_default();

    let Some(record) = state.recommendations.find_crop(&soil_type, &crop_type) else {
        tracing::debug!("No crop '{}' under soil type '{}'", crop_type, soil_type);
        return Err(AppError::NotFound(CROP_NOT_FOUND_MESSAGE.to_string()));
    };

    let page = IndexTemplate::with_crop_info(CropInfoView::new(&soil_type, record));
    Ok(render_page(&page).into_response())
}

/// Bad input from the user, as opposed to a server-side failure.
fn is_client_error(err: &DecodeError) -> bool {
    matches!(
        err,
        DecodeError::EmptyPayload
            | DecodeError::InvalidFileName(_)
            | DecodeError::InvalidBase64(_)
            | DecodeError::Image(_)
    )
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(String),
    NotFound(String),
    PayloadTooLarge(String),
}

impl AppError {
    /// Map an extractor rejection, keeping the body-limit status.
    fn rejected(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(message)
        } else {
            AppError::BadRequest(message)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
