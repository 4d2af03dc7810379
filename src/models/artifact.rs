//! Classifier capabilities and the loaded artifact

use crate::feature_builder::FeatureVector;
use anyhow::Result;

/// A model that assigns a class id (0 or 1) to each row.
///
/// Implementations must be safe for concurrent read-only use; the cached
/// artifact is shared by every request.
pub trait Classifier: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Predict one class id per row
    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>>;
}

/// A classifier that also reports a per-class probability distribution.
pub trait ProbabilisticClassifier: Classifier {
    /// Predict one distribution per row, indexed by class id
    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<Vec<f64>>>;
}

/// Deserialized classifier, with its capability fixed at load time.
pub enum ModelArtifact {
    /// Emits labels only
    ClassifierOnly(Box<dyn Classifier>),
    /// Emits labels and class probabilities
    Probabilistic(Box<dyn ProbabilisticClassifier>),
}

impl ModelArtifact {
    pub fn name(&self) -> &str {
        match self {
            ModelArtifact::ClassifierOnly(model) => model.name(),
            ModelArtifact::Probabilistic(model) => model.name(),
        }
    }

    pub fn supports_probability(&self) -> bool {
        matches!(self, ModelArtifact::Probabilistic(_))
    }

    /// Variant name for logs
    pub fn variant(&self) -> &'static str {
        match self {
            ModelArtifact::ClassifierOnly(_) => "classifier_only",
            ModelArtifact::Probabilistic(_) => "probabilistic",
        }
    }

    pub fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
        match self {
            ModelArtifact::ClassifierOnly(model) => model.predict(rows),
            ModelArtifact::Probabilistic(model) => model.predict(rows),
        }
    }
}

impl std::fmt::Debug for ModelArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifact")
            .field("name", &self.name())
            .field("variant", &self.variant())
            .finish()
    }
}
