//! ONNX pipeline loader

use crate::feature_extractor::FEATURE_NAMES;
use anyhow::{bail, Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::tensor::TensorElementType;
use ort::value::ValueType;
use std::path::Path;
use tracing::{debug, info};

/// Element type a graph input expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    String,
    Float32,
    Float64,
}

/// Graph input bound to one of the feature columns
#[derive(Debug, Clone)]
pub struct InputBinding {
    /// Input name as declared by the graph
    pub input_name: String,
    /// Index into [`FEATURE_NAMES`]
    pub column: usize,
    pub kind: InputKind,
}

/// Loaded ONNX pipeline with metadata
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// One binding per graph input
    pub inputs: Vec<InputBinding>,
    /// Output name for probabilities
    pub output_name: String,
}

/// Loader for ONNX pipelines
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a pipeline from file and bind its inputs to the feature columns
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX pipeline");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load pipeline from {}", path.display()))?;

        let mut inputs = Vec::with_capacity(session.inputs.len());
        for input in &session.inputs {
            let column = bind_column(&input.name).with_context(|| {
                format!(
                    "Pipeline input '{}' does not match any feature column {:?}",
                    input.name, FEATURE_NAMES
                )
            })?;
            let kind = match &input.input_type {
                ValueType::Tensor { ty, .. } => input_kind(*ty)
                    .with_context(|| format!("Unsupported element type {ty:?} for '{}'", input.name))?,
                other => bail!("Pipeline input '{}' is not a tensor: {other:?}", input.name),
            };
            debug!(input = %input.name, column = FEATURE_NAMES[column], kind = ?kind, "Bound pipeline input");
            inputs.push(InputBinding {
                input_name: input.name.clone(),
                column,
                kind,
            });
        }

        if inputs.is_empty() {
            bail!("Pipeline at {} declares no inputs", path.display());
        }

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "output_probability".to_string())
            });

        info!(
            model = %name,
            inputs = inputs.len(),
            output = %output_name,
            "Pipeline loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            inputs,
            output_name,
        })
    }
}

fn input_kind(ty: TensorElementType) -> Option<InputKind> {
    match ty {
        TensorElementType::String => Some(InputKind::String),
        TensorElementType::Float32 => Some(InputKind::Float32),
        TensorElementType::Float64 => Some(InputKind::Float64),
        _ => None,
    }
}

/// Match a graph input name to a feature column.
///
/// Exporters often sanitise column names (`P-VALUE` -> `p_value`), so names are
/// compared after lowercasing and collapsing non-alphanumeric runs to `_`.
pub fn bind_column(input_name: &str) -> Option<usize> {
    FEATURE_NAMES
        .iter()
        .position(|column| *column == input_name)
        .or_else(|| {
            let wanted = normalize(input_name);
            FEATURE_NAMES.iter().position(|column| normalize(column) == wanted)
        })
}

fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}
