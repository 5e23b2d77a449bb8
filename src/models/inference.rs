//! ONNX Runtime inference for the risk pipeline

use crate::config::ModelConfig;
use crate::feature_extractor::{FeatureRecord, FeatureValue};
use crate::models::loader::{InputBinding, InputKind, LoadedModel, ModelLoader};
use crate::models::pipeline::RiskPipeline;
use anyhow::{anyhow, bail, Context, Result};
use ort::memory::Allocator;
use ort::session::SessionInputValue;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// Risk pipeline backed by an ONNX Runtime session
pub struct OnnxPipeline {
    name: String,
    /// Session runs need exclusive access
    model: Mutex<LoadedModel>,
    /// Class label whose probability is returned
    positive_class: i64,
}

impl OnnxPipeline {
    /// Load the pipeline file with the given model settings
    pub fn load<P: AsRef<Path>>(path: P, config: &ModelConfig) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline".to_string());

        let loader = ModelLoader::with_threads(config.onnx_threads)?;
        let model = loader.load_model(path, &name)?;

        Ok(Self::from_model(model, config.positive_class))
    }

    /// Wrap an already loaded model
    pub fn from_model(model: LoadedModel, positive_class: i64) -> Self {
        Self {
            name: model.name.clone(),
            model: Mutex::new(model),
            positive_class,
        }
    }

    fn run(&self, record: &FeatureRecord) -> Result<f64> {
        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?;

        let mut inputs: Vec<(String, SessionInputValue<'static>)> =
            Vec::with_capacity(model.inputs.len());
        for binding in &model.inputs {
            inputs.push((binding.input_name.clone(), build_input(binding, record)?));
        }

        let output_name = model.output_name.clone();
        let outputs = model.session.run(inputs)?;

        self.extract_probability(&outputs, &output_name)
    }

    /// Extract the positive-class probability from the session outputs.
    /// Handles tensor outputs and seq(map) outputs (sklearn ZipMap).
    fn extract_probability(
        &self,
        outputs: &ort::session::SessionOutputs,
        output_name: &str,
    ) -> Result<f64> {
        if let Some(output) = outputs.get(output_name) {
            if let Some(prob) = self.probability_from_value(&output)? {
                return Ok(prob);
            }
        }

        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Some(prob) = self.probability_from_value(&output)? {
                debug!(model = %self.name, output = %name, "Extracted probability (fallback output)");
                return Ok(prob);
            }
        }

        bail!("No probability output found for model {}", self.name)
    }

    fn probability_from_value(&self, output: &ort::value::DynValue) -> Result<Option<f64>> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let values: Vec<f64> = data.iter().map(|&v| f64::from(v)).collect();
            return class_probability_from_tensor(&dims, &values, self.positive_class).map(Some);
        }

        if let Ok((shape, data)) = output.try_extract_tensor::<f64>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return class_probability_from_tensor(&dims, data, self.positive_class).map(Some);
        }

        if DynSequenceValueType::can_downcast(&output.dtype()) {
            return self.prob_from_sequence_map(output).map(Some);
        }

        Ok(None)
    }

    /// Probability from seq(map(int64, float)), one map per row
    fn prob_from_sequence_map(&self, output: &ort::value::DynValue) -> Result<f64> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
        let row = maps.first().ok_or_else(|| anyhow!("Empty sequence"))?;

        let kv_pairs = row.try_extract_key_values::<i64, f32>()?;
        class_probability_from_map(&kv_pairs, self.positive_class)
    }
}

/// Positive-class probability from a `[1, n_classes]`, `[n_classes]` or `[1, 1]` tensor
pub fn class_probability_from_tensor(
    dims: &[i64],
    values: &[f64],
    positive_class: i64,
) -> Result<f64> {
    let num_classes = dims.last().copied().unwrap_or(values.len() as i64);

    if num_classes == 1 {
        // Single column holds the positive-class probability
        return values
            .first()
            .copied()
            .ok_or_else(|| anyhow!("Empty probability tensor"));
    }

    let index = usize::try_from(positive_class)
        .context("Positive class must be a non-negative index for tensor outputs")?;
    values
        .get(index)
        .copied()
        .ok_or_else(|| anyhow!("Class {} out of range for output shape {:?}", index, dims))
}

/// Positive-class probability from one ZipMap row of `(class, probability)` pairs
pub fn class_probability_from_map(pairs: &[(i64, f32)], positive_class: i64) -> Result<f64> {
    pairs
        .iter()
        .find(|(class_id, _)| *class_id == positive_class)
        .map(|(_, prob)| f64::from(*prob))
        .ok_or_else(|| anyhow!("Class {} missing from probability map", positive_class))
}

impl RiskPipeline for OnnxPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, record: &FeatureRecord) -> Result<f64> {
        self.run(record)
    }
}

/// Build a `[1, 1]` tensor for one graph input from its feature column
fn build_input(binding: &InputBinding, record: &FeatureRecord) -> Result<SessionInputValue<'static>> {
    let feature = record
        .features()
        .get(binding.column)
        .ok_or_else(|| anyhow!("Feature column {} missing from record", binding.column))?;
    let shape = vec![1_i64, 1];

    let value: SessionInputValue<'static> = match (&feature.value, binding.kind) {
        (FeatureValue::Categorical(s), InputKind::String) => {
            Tensor::from_string_array((shape, &[s.clone()][..]))?.into()
        }
        (FeatureValue::Numeric(x), InputKind::Float32) => {
            Tensor::from_array((shape, vec![*x as f32]))?.into()
        }
        (FeatureValue::Numeric(x), InputKind::Float64) => {
            Tensor::from_array((shape, vec![*x]))?.into()
        }
        (FeatureValue::Numeric(x), InputKind::String) => {
            Tensor::from_string_array((shape, &[x.to_string()][..]))?.into()
        }
        (FeatureValue::Categorical(_), kind) => bail!(
            "Feature '{}' is categorical but input '{}' expects {:?}",
            feature.name,
            binding.input_name,
            kind
        ),
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_class_tensor_selects_positive_class() {
        let prob = class_probability_from_tensor(&[1, 2], &[0.3, 0.7], 1).unwrap();
        assert_eq!(prob, 0.7);

        let prob = class_probability_from_tensor(&[1, 2], &[0.3, 0.7], 0).unwrap();
        assert_eq!(prob, 0.3);
    }

    #[test]
    fn test_single_column_tensor() {
        let prob = class_probability_from_tensor(&[1, 1], &[0.42], 1).unwrap();
        assert_eq!(prob, 0.42);
    }

    #[test]
    fn test_flat_tensor() {
        let prob = class_probability_from_tensor(&[3], &[0.2, 0.5, 0.3], 2).unwrap();
        assert_eq!(prob, 0.3);
    }

    #[test]
    fn test_out_of_range_class() {
        let err = class_probability_from_tensor(&[1, 2], &[0.3, 0.7], 2).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_negative_class_on_tensor() {
        assert!(class_probability_from_tensor(&[1, 2], &[0.3, 0.7], -1).is_err());
    }

    #[test]
    fn test_empty_single_column_tensor() {
        assert!(class_probability_from_tensor(&[1, 1], &[], 1).is_err());
    }

    #[test]
    fn test_map_selects_positive_class() {
        let pairs = [(0_i64, 0.25_f32), (1, 0.75)];
        assert_eq!(class_probability_from_map(&pairs, 1).unwrap(), 0.75);
        assert_eq!(class_probability_from_map(&pairs, 0).unwrap(), 0.25);
    }

    #[test]
    fn test_map_supports_negative_labels() {
        let pairs = [(-1_i64, 0.6_f32), (1, 0.4)];
        assert_eq!(class_probability_from_map(&pairs, -1).unwrap(), f64::from(0.6_f32));
    }

    #[test]
    fn test_map_missing_class() {
        let pairs = [(0_i64, 1.0_f32)];
        assert!(class_probability_from_map(&pairs, 1).is_err());
    }
}
