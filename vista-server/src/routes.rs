use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use vista_core::{GenerationError, ImageGenerator};

pub const LIVENESS_MESSAGE: &str = "Text-to-Image API is running!";

#[derive(Deserialize, Debug)]
pub struct GenerateBody {
    pub prompt: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct GenerateResponse {
    pub image_path: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct StatusResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Error returned to HTTP clients as `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}

// Application state holding the generator and, through it, the shared pipeline.
#[derive(Clone)]
pub struct AppState(pub Arc<ImageGenerator>);

pub fn router(generator: Arc<ImageGenerator>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/generate", post(generate_handler))
        .with_state(AppState(generator))
}

async fn root_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: LIVENESS_MESSAGE.to_string(),
    })
}

async fn generate_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    // Parsed by hand so clients that omit `Content-Type` are still served.
    let body: GenerateBody = serde_json::from_slice(&body)?;
    let prompt = body.prompt.unwrap_or_default();

    match state.0.generate_image(&prompt).await {
        Ok(path) => {
            let image_path = path.display().to_string();
            info!(%image_path, "Generated image");
            Ok(Json(GenerateResponse { image_path }))
        }
        Err(e) => {
            if !e.is_client_error() {
                error!("Error generating image: {e}");
            }
            Err(e.into())
        }
    }
}
