//! Route handlers

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::types::request::PredictionRequest;
use crate::types::response::PredictionResponse;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

pub const LIVENESS_MESSAGE: &str = "Alzheimer's Predictor Backend is running!";
pub const FEATURE_IMPORTANCE_PLACEHOLDER: &str = "Feature importance route is a placeholder.";

/// `GET /`
pub async fn home() -> &'static str {
    LIVENESS_MESSAGE
}

/// `GET /feature_importance`
pub async fn feature_importance() -> &'static str {
    FEATURE_IMPORTANCE_PLACEHOLDER
}

/// `OPTIONS /predict` without CORS preflight headers
pub async fn predict_options() -> StatusCode {
    StatusCode::OK
}

/// `POST /predict`
///
/// The body is taken as raw bytes so that the pipeline check runs first and
/// a non-JSON content type or malformed JSON maps onto the service's own
/// error envelope.
pub async fn predict(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Some(pipeline) = state.pipeline.pipeline().cloned() else {
        error!("Prediction attempted but pipeline is not loaded");
        return Err(ApiError::ModelNotLoaded);
    };

    if !is_json_content_type(&headers) {
        error!(
            content_type = ?headers.get(header::CONTENT_TYPE),
            "Error in prediction route: body is not declared as JSON"
        );
        return Err(ApiError::Unexpected);
    }

    let body: Value = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "Error in prediction route: body is not valid JSON");
        ApiError::Unexpected
    })?;

    let request = PredictionRequest::from_json(&body).map_err(|e| {
        warn!(error = %e, "Rejected prediction request");
        ApiError::from(e)
    })?;

    let record = state.extractor.extract(&request);
    info!(input = ?record, "Prediction request received");

    let probability = tokio::task::spawn_blocking(move || pipeline.predict_proba(&record))
        .await
        .map_err(|e| {
            error!(error = %e, "Prediction worker panicked");
            ApiError::PredictionFailed
        })?
        .map_err(|e| {
            error!(error = %format!("{:#}", e), "Error in prediction function");
            ApiError::PredictionFailed
        })?;

    if !probability.is_finite() {
        error!(probability, "Pipeline produced a non-finite probability");
        return Err(ApiError::PredictionFailed);
    }

    let response = PredictionResponse::from_probability(probability, Utc::now());
    info!(risk = response.risk, "Prediction successful");

    Ok(Json(response))
}

/// `application/json` or any `+json` media type, parameters ignored
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let essence = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}
