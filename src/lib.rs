//! Alzheimer's Risk Predictor Backend Library
//!
//! Loads a pre-trained preprocessing + classification pipeline at startup and
//! serves positive-class probabilities as risk percentages over HTTP.

pub mod api;
pub mod artifact;
pub mod config;
pub mod feature_extractor;
pub mod logging;
pub mod models;
pub mod types;

pub use api::{construct_router, AppState};
pub use config::AppConfig;
pub use feature_extractor::FeatureExtractor;
pub use models::{OnnxPipeline, PipelineHandle, RiskPipeline};
pub use types::{PredictionRequest, PredictionResponse};
