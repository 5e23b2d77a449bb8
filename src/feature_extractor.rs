//! Feature extraction for risk pipeline inference.
//!
//! Maps a validated prediction request onto the named feature columns the
//! trained pipeline was fitted on.

use crate::types::request::PredictionRequest;

/// Column names in the order the pipeline was trained with
pub const FEATURE_NAMES: [&str; 5] = [
    "STRONGEST SNP-RISK ALLELE",
    "P-VALUE",
    "OR or BETA",
    "RISK ALLELE FREQUENCY",
    "PVALUE_MLOG",
];

/// Value of a single feature column
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    /// Encoded by the pipeline's own preprocessor
    Categorical(String),
    Numeric(f64),
}

/// Named feature column
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub name: &'static str,
    pub value: FeatureValue,
}

/// Single-row input for the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    features: Vec<Feature>,
}

impl FeatureRecord {
    /// Columns in training order
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Look up a column by name
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.features
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }
}

/// Feature extractor that turns prediction requests into pipeline input.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract the single-row feature record for a request.
    pub fn extract(&self, request: &PredictionRequest) -> FeatureRecord {
        let features = vec![
            Feature {
                name: FEATURE_NAMES[0],
                value: FeatureValue::Categorical(request.snp_risk_allele.clone()),
            },
            Feature {
                name: FEATURE_NAMES[1],
                value: FeatureValue::Numeric(request.p_value),
            },
            Feature {
                name: FEATURE_NAMES[2],
                value: FeatureValue::Numeric(request.or_beta),
            },
            Feature {
                name: FEATURE_NAMES[3],
                value: FeatureValue::Numeric(request.risk_allele_frequency),
            },
            Feature {
                name: FEATURE_NAMES[4],
                value: FeatureValue::Numeric(request.p_value_mlog),
            },
        ];

        FeatureRecord { features }
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Get feature names in training order.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}
