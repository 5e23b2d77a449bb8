//! HTTP surface: router construction and shared state

pub mod error;
pub mod handlers;

use crate::feature_extractor::FeatureExtractor;
use crate::models::PipelineHandle;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// State shared by every request; cloned per request
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineHandle,
    pub extractor: Arc<FeatureExtractor>,
}

impl AppState {
    pub fn new(pipeline: PipelineHandle) -> Self {
        Self {
            pipeline,
            extractor: Arc::new(FeatureExtractor::new()),
        }
    }
}

/// Build the application router.
///
/// Cross-origin requests are allowed from any origin on `/predict` only.
pub fn construct_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let predict = Router::new()
        .route(
            "/predict",
            post(handlers::predict).options(handlers::predict_options),
        )
        .layer(cors);

    Router::new()
        .route("/", get(handlers::home))
        .route("/feature_importance", get(handlers::feature_importance))
        .merge(predict)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
