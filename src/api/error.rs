//! Request-path errors and their JSON envelopes

use crate::types::request::RequestError;
use crate::types::response::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Every failure `/predict` can report.
///
/// The `Display` text is exactly what the client sees in `{"error": ...}`;
/// internal causes are logged where the error is raised.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Model not loaded")]
    ModelNotLoaded,
    #[error("Missing required fields")]
    MissingFields,
    #[error("Invalid input data: {0}")]
    InvalidInput(String),
    #[error("Prediction failed")]
    PredictionFailed,
    #[error("An unexpected error occurred")]
    Unexpected,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::ModelNotLoaded | Self::PredictionFailed | Self::Unexpected => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::MissingFields => Self::MissingFields,
            RequestError::Invalid(detail) => Self::InvalidInput(detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}
