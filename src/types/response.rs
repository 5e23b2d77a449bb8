//! Response payloads returned by the HTTP API

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// Successful prediction
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    /// Positive-class probability scaled to a percentage (not clamped)
    pub risk: f64,
    /// When the prediction was produced
    #[serde(serialize_with = "serialize_iso8601")]
    pub timestamp: DateTime<Utc>,
}

impl PredictionResponse {
    /// Build a response from a raw model probability
    pub fn from_probability(probability: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            risk: probability * 100.0,
            timestamp,
        }
    }
}

/// Error envelope: `{"error": "..."}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// ISO-8601 with microsecond precision, e.g. `2024-05-01T09:30:00.123456Z`
fn serialize_iso8601<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    #[test]
    fn test_risk_is_scaled_percentage() {
        let response = PredictionResponse::from_probability(0.4321, Utc::now());
        assert!((response.risk - 43.21).abs() < 1e-9);
    }

    #[test]
    fn test_risk_is_not_clamped() {
        let response = PredictionResponse::from_probability(1.25, Utc::now());
        assert_eq!(response.risk, 125.0);
    }

    #[test]
    fn test_serializes_only_risk_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let response = PredictionResponse::from_probability(0.5, at);

        let json = serde_json::to_value(&response).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 2);
        assert_eq!(object["risk"], Value::from(50.0));
        assert_eq!(object["timestamp"], "2024-05-01T09:30:00.000000Z");
    }

    #[test]
    fn test_error_envelope() {
        let json = serde_json::to_string(&ErrorResponse::new("Model not loaded")).unwrap();
        assert_eq!(json, r#"{"error":"Model not loaded"}"#);
    }
}
