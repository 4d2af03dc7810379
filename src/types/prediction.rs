//! Prediction output handed back to the front end

use serde::{Deserialize, Serialize};

/// Binary outcome of the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// Diabetes not predicted
    Negative,
    /// Diabetes predicted
    Positive,
}

impl Label {
    /// Map a raw class id (0 or 1) to a label
    pub fn from_class(class_id: i64) -> Option<Self> {
        match class_id {
            0 => Some(Label::Negative),
            1 => Some(Label::Positive),
            _ => None,
        }
    }

    pub fn is_positive(&self) -> bool {
        matches!(self, Label::Positive)
    }
}

/// Result of a single prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted class
    pub label: Label,
    /// Positive-class probability, absent when the model only emits labels
    pub probability: Option<f64>,
}

impl PredictionResult {
    pub fn new(label: Label, probability: Option<f64>) -> Self {
        Self { label, probability }
    }

    /// Probability mass assigned to the predicted label.
    ///
    /// `None` when the model has no probability output; callers omit the
    /// confidence display in that case.
    pub fn confidence(&self) -> Option<f64> {
        self.probability.map(|p| match self.label {
            Label::Positive => p,
            Label::Negative => 1.0 - p,
        })
    }
}
