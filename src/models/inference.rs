//! Inference engine: cached model in, decision out

use crate::error::{PredictorError, Result};
use crate::feature_builder::FeatureVector;
use crate::models::artifact::ModelArtifact;
use crate::models::cache::ModelCache;
use crate::types::prediction::{Label, PredictionResult};
use std::slice;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Runs the cached classifier and reduces its output to a [`PredictionResult`].
///
/// Patient values never reach the logs; only timings, the model variant and
/// error text do.
pub struct InferenceEngine {
    cache: Arc<ModelCache>,
}

impl InferenceEngine {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache }
    }

    /// The cache this engine reads its model from
    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    /// Predict one vector with the cached model
    pub fn predict(&self, vector: &FeatureVector) -> Result<PredictionResult> {
        let model = self.cache.get_model()?;
        Self::predict_with(&model, vector)
    }

    /// Predict each vector independently; one failure does not stop the rest
    pub fn predict_batch(&self, vectors: &[FeatureVector]) -> Vec<Result<PredictionResult>> {
        match self.cache.get_model() {
            Ok(model) => vectors
                .iter()
                .map(|v| Self::predict_with(&model, v))
                .collect(),
            Err(e) => vectors.iter().map(|_| Err(e.clone())).collect(),
        }
    }

    /// Predict one vector with an explicit model
    pub fn predict_with(model: &ModelArtifact, vector: &FeatureVector) -> Result<PredictionResult> {
        let start = Instant::now();
        let rows = slice::from_ref(vector);

        let labels = model.predict(rows).map_err(|e| engine_error(model, "predict", e))?;
        let label = match labels.as_slice() {
            [class_id] => Label::from_class(*class_id).ok_or_else(|| {
                engine_failure(model, format!("label {} is not a binary class id", class_id))
            })?,
            other => {
                return Err(engine_failure(
                    model,
                    format!("expected 1 label, model returned {}", other.len()),
                ))
            }
        };

        let probability = match model {
            ModelArtifact::ClassifierOnly(_) => None,
            ModelArtifact::Probabilistic(classifier) => {
                let distributions = classifier
                    .predict_proba(rows)
                    .map_err(|e| engine_error(model, "predict_proba", e))?;
                let positive = distributions
                    .first()
                    .and_then(|d| d.get(1))
                    .copied()
                    .ok_or_else(|| {
                        engine_failure(model, "distribution has no positive-class entry".to_string())
                    })?;
                if !(0.0..=1.0).contains(&positive) {
                    return Err(engine_failure(
                        model,
                        format!("probability {} outside [0, 1]", positive),
                    ));
                }
                Some(positive)
            }
        };

        debug!(
            model = %model.name(),
            variant = model.variant(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Inference complete"
        );

        Ok(PredictionResult::new(label, probability))
    }
}

fn engine_error(model: &ModelArtifact, call: &str, error: anyhow::Error) -> PredictorError {
    engine_failure(model, format!("{} failed: {:#}", call, error))
}

fn engine_failure(model: &ModelArtifact, message: String) -> PredictorError {
    warn!(model = %model.name(), error = %message, "Model inference failed");
    PredictorError::InferenceEngine(message)
}
