//! Pipeline abstraction shared by the request path

use crate::feature_extractor::FeatureRecord;
use anyhow::Result;
use std::fmt;
use std::sync::Arc;

/// A fitted preprocessing + classification pipeline.
///
/// Implementations are immutable after construction and shared by every
/// request, so they must be `Send + Sync`.
pub trait RiskPipeline: Send + Sync {
    /// Human-readable identifier used in logs
    fn name(&self) -> &str;

    /// Probability of the positive class for a single-row record
    fn predict_proba(&self, record: &FeatureRecord) -> Result<f64>;
}

/// Outcome of startup loading, injected into the router as state
#[derive(Clone)]
pub enum PipelineHandle {
    Available(Arc<dyn RiskPipeline>),
    Unavailable { reason: Arc<str> },
}

impl PipelineHandle {
    pub fn available<P: RiskPipeline + 'static>(pipeline: P) -> Self {
        Self::Available(Arc::new(pipeline))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into().into(),
        }
    }

    /// The loaded pipeline, if any
    pub fn pipeline(&self) -> Option<&Arc<dyn RiskPipeline>> {
        match self {
            Self::Available(pipeline) => Some(pipeline),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(pipeline) => f
                .debug_tuple("Available")
                .field(&pipeline.name())
                .finish(),
            Self::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}
