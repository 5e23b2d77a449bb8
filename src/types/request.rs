//! Prediction request parsing and coercion

use serde_json::{Map, Value};
use thiserror::Error;

/// JSON keys every prediction request must carry
pub const REQUIRED_FIELDS: [&str; 5] = [
    "snpRiskAllele",
    "pValue",
    "orBeta",
    "riskAlleleFrequency",
    "pValueMlog",
];

/// Reasons a request body cannot be turned into a [`PredictionRequest`]
#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    /// Body is not an object or lacks one of [`REQUIRED_FIELDS`]
    #[error("Missing required fields")]
    MissingFields,
    /// A field is present but cannot be coerced to its type
    #[error("{0}")]
    Invalid(String),
}

/// Validated prediction request with numeric fields already coerced
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    /// Strongest SNP risk allele, e.g. `rs429358-C`
    pub snp_risk_allele: String,
    pub p_value: f64,
    /// Odds ratio or beta coefficient
    pub or_beta: f64,
    pub risk_allele_frequency: f64,
    /// Negative log10 of the p-value
    pub p_value_mlog: f64,
}

impl PredictionRequest {
    /// Validate a decoded JSON body.
    ///
    /// Presence of all fields is checked before any coercion, so a body with a
    /// missing key reports [`RequestError::MissingFields`] even when other
    /// fields are malformed.
    pub fn from_json(body: &Value) -> Result<Self, RequestError> {
        let fields = body.as_object().ok_or(RequestError::MissingFields)?;
        if !REQUIRED_FIELDS.iter().all(|key| fields.contains_key(*key)) {
            return Err(RequestError::MissingFields);
        }

        Ok(Self {
            snp_risk_allele: coerce_string(field(fields, "snpRiskAllele"), "snpRiskAllele")?,
            p_value: coerce_float(field(fields, "pValue"), "pValue")?,
            or_beta: coerce_float(field(fields, "orBeta"), "orBeta")?,
            risk_allele_frequency: coerce_float(
                field(fields, "riskAlleleFrequency"),
                "riskAlleleFrequency",
            )?,
            p_value_mlog: coerce_float(field(fields, "pValueMlog"), "pValueMlog")?,
        })
    }
}

fn field<'a>(fields: &'a Map<String, Value>, key: &str) -> &'a Value {
    fields.get(key).unwrap_or(&Value::Null)
}

/// Coerce a JSON value to `f64`: numbers as-is, numeric strings parsed, booleans as 1/0
pub fn coerce_float(value: &Value, name: &str) -> Result<f64, RequestError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| RequestError::Invalid(format!("{name} is out of range: {n}"))),
        Value::String(s) => parse_float(s),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Err(RequestError::Invalid(format!(
            "{name} must be a number or a numeric string, not null"
        ))),
        Value::Array(_) | Value::Object(_) => Err(RequestError::Invalid(format!(
            "{name} must be a number or a numeric string"
        ))),
    }
}

fn parse_float(raw: &str) -> Result<f64, RequestError> {
    // Surrounding whitespace is tolerated; "inf", "infinity" and "nan" parse in any case.
    raw.trim()
        .parse::<f64>()
        .map_err(|_| RequestError::Invalid(format!("could not convert string to float: '{raw}'")))
}

fn coerce_string(value: &Value, name: &str) -> Result<String, RequestError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(RequestError::Invalid(format!("{name} must be a string"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "snpRiskAllele": "rs429358-C",
            "pValue": "1e-200",
            "orBeta": "3.685",
            "riskAlleleFrequency": "0.15",
            "pValueMlog": "200"
        })
    }

    #[test]
    fn test_parses_string_fields() {
        let request = PredictionRequest::from_json(&sample()).unwrap();
        assert_eq!(request.snp_risk_allele, "rs429358-C");
        assert_eq!(request.p_value, 1e-200);
        assert_eq!(request.or_beta, 3.685);
        assert_eq!(request.risk_allele_frequency, 0.15);
        assert_eq!(request.p_value_mlog, 200.0);
    }

    #[test]
    fn test_accepts_numbers_and_padding() {
        let body = json!({
            "snpRiskAllele": "rs7412-T",
            "pValue": 0.001,
            "orBeta": " 0.62 ",
            "riskAlleleFrequency": 1,
            "pValueMlog": true
        });
        let request = PredictionRequest::from_json(&body).unwrap();
        assert_eq!(request.p_value, 0.001);
        assert_eq!(request.or_beta, 0.62);
        assert_eq!(request.risk_allele_frequency, 1.0);
        assert_eq!(request.p_value_mlog, 1.0);
    }

    #[test]
    fn test_each_missing_field_is_reported() {
        for key in REQUIRED_FIELDS {
            let mut body = sample();
            body.as_object_mut().unwrap().remove(key);
            assert_eq!(
                PredictionRequest::from_json(&body),
                Err(RequestError::MissingFields),
                "removing {key}"
            );
        }
    }

    #[test]
    fn test_missing_wins_over_invalid() {
        let body = json!({ "snpRiskAllele": "rs1", "pValue": "abc" });
        assert_eq!(
            PredictionRequest::from_json(&body),
            Err(RequestError::MissingFields)
        );
    }

    #[test]
    fn test_non_object_body_is_missing_fields() {
        assert_eq!(
            PredictionRequest::from_json(&json!(["snpRiskAllele"])),
            Err(RequestError::MissingFields)
        );
    }

    #[test]
    fn test_unparseable_number() {
        let mut body = sample();
        body["orBeta"] = json!("abc");
        assert_eq!(
            PredictionRequest::from_json(&body),
            Err(RequestError::Invalid(
                "could not convert string to float: 'abc'".to_string()
            ))
        );
    }

    #[test]
    fn test_null_and_nested_values_are_invalid() {
        let mut body = sample();
        body["pValue"] = Value::Null;
        assert!(matches!(
            PredictionRequest::from_json(&body),
            Err(RequestError::Invalid(_))
        ));

        let mut body = sample();
        body["snpRiskAllele"] = json!({ "id": "rs429358" });
        assert!(matches!(
            PredictionRequest::from_json(&body),
            Err(RequestError::Invalid(_))
        ));
    }

    #[test]
    fn test_special_float_spellings() {
        assert!(coerce_float(&json!("inf"), "x").unwrap().is_infinite());
        assert!(coerce_float(&json!("NaN"), "x").unwrap().is_nan());
        assert_eq!(coerce_float(&json!("-2.5E3"), "x").unwrap(), -2500.0);
    }
}
