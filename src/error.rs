//! Error taxonomy for the inference path

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the predictor to its callers.
///
/// Artifact errors are detected once at first load and remembered by the
/// cache, so the type is `Clone` to allow re-raising the stored failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictorError {
    /// Artifact file is missing or unreadable
    #[error("model file not found: {} ({reason})", .path.display())]
    ModelNotFound { path: PathBuf, reason: String },

    /// Artifact exists but does not decode into a usable classifier
    #[error("model file is corrupt: {} ({reason})", .path.display())]
    ModelCorrupt { path: PathBuf, reason: String },

    /// Every feature was zero, no clinically meaningful input supplied
    #[error("no input supplied: all eight measurements are zero")]
    EmptyInput,

    /// A field was missing, unknown, negative, non-finite or not integral
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// The model call failed or produced output violating its contract
    #[error("inference engine error: {0}")]
    InferenceEngine(String),
}

impl PredictorError {
    /// Fatal errors stop request handling for the rest of the process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PredictorError::ModelNotFound { .. } | PredictorError::ModelCorrupt { .. }
        )
    }

    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PredictorError::ModelNotFound { .. } => "model_not_found",
            PredictorError::ModelCorrupt { .. } => "model_corrupt",
            PredictorError::EmptyInput => "empty_input",
            PredictorError::InvalidInput { .. } => "invalid_input",
            PredictorError::InferenceEngine(_) => "inference_engine",
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        PredictorError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, PredictorError>;
