//! Type definitions for the risk prediction API

pub mod request;
pub mod response;

pub use request::{PredictionRequest, RequestError, REQUIRED_FIELDS};
pub use response::{ErrorResponse, PredictionResponse};
