//! ONNX Runtime backend for exported scikit-learn classifiers

use crate::feature_builder::{FeatureVector, FEATURE_COUNT};
use crate::models::artifact::{Classifier, ModelArtifact, ProbabilisticClassifier};
use anyhow::{anyhow, Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier backed by an ONNX Runtime session.
///
/// The session needs exclusive access per run, so it sits behind a mutex.
pub struct OnnxClassifier {
    name: String,
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    proba_output: Option<String>,
}

impl OnnxClassifier {
    /// Build a session from the serialized graph
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ort::init().commit()?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_memory(bytes)
            .context("Failed to build ONNX session")?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| anyhow!("ONNX graph has no inputs"))?;

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let label_output = output_names
            .iter()
            .find(|n| n.contains("label"))
            .or_else(|| output_names.first())
            .cloned()
            .ok_or_else(|| anyhow!("ONNX graph has no outputs"))?;
        let proba_output = output_names
            .iter()
            .find(|n| **n != label_output && n.contains("prob"))
            .or_else(|| output_names.iter().find(|n| **n != label_output))
            .cloned();

        info!(
            input = %input_name,
            label_output = %label_output,
            proba_output = ?proba_output,
            "ONNX session ready"
        );

        Ok(Self {
            name: "onnx_classifier".to_string(),
            session: Mutex::new(session),
            input_name,
            label_output,
            proba_output,
        })
    }

    /// Single-output graphs only emit labels
    pub fn into_artifact(self) -> ModelArtifact {
        if self.proba_output.is_some() {
            ModelArtifact::Probabilistic(Box::new(self))
        } else {
            ModelArtifact::ClassifierOnly(Box::new(self))
        }
    }

    fn run<T>(
        &self,
        rows: &[FeatureVector],
        extract: impl FnOnce(&SessionOutputs) -> Result<T>,
    ) -> Result<T> {
        let data: Vec<f32> = rows.iter().flat_map(|r| r.to_f32_array()).collect();
        let shape = vec![rows.len() as i64, FEATURE_COUNT as i64];
        let input_tensor =
            Tensor::from_array((shape, data)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?;
        let outputs = session.run(ort::inputs![&self.input_name => input_tensor])?;
        extract(&outputs)
    }

    /// Distributions from a `[batch, classes]` float tensor
    fn distributions_from_tensor(output: &DynValue, rows: usize) -> Result<Vec<Vec<f64>>> {
        let (shape, data) = output.try_extract_tensor::<f32>()?;
        let dims: Vec<i64> = shape.iter().copied().collect();
        let classes = match dims.as_slice() {
            [_, classes] => *classes as usize,
            [classes] if rows == 1 => *classes as usize,
            _ => return Err(anyhow!("unexpected probability shape {:?}", dims)),
        };
        if classes == 0 || data.len() != classes * rows {
            return Err(anyhow!("unexpected probability shape {:?}", dims));
        }
        Ok(data
            .chunks(classes)
            .map(|row| row.iter().map(|&p| p as f64).collect())
            .collect())
    }

    /// Distributions from `seq(map(int64, float))`, the zipmap export format
    fn distributions_from_sequence_map(output: &DynValue) -> Result<Vec<Vec<f64>>> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow!("Failed to downcast to sequence: {}", e))?;
        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

        maps.iter()
            .map(|map_value| -> Result<Vec<f64>> {
                let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
                let width = kv_pairs
                    .iter()
                    .map(|(class_id, _)| *class_id)
                    .max()
                    .ok_or_else(|| anyhow!("Empty probability map"))?;
                let mut distribution = vec![0.0; width.max(0) as usize + 1];
                for (class_id, prob) in &kv_pairs {
                    if *class_id >= 0 {
                        distribution[*class_id as usize] = *prob as f64;
                    }
                }
                Ok(distribution)
            })
            .collect()
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
        self.run(rows, |outputs| {
            let output = outputs
                .get(self.label_output.as_str())
                .ok_or_else(|| anyhow!("missing output {}", self.label_output))?;
            let (_, labels) = output.try_extract_tensor::<i64>()?;
            debug!(model = %self.name, rows = labels.len(), "Extracted labels");
            Ok(labels.to_vec())
        })
    }
}

impl ProbabilisticClassifier for OnnxClassifier {
    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<Vec<f64>>> {
        let proba_output = self
            .proba_output
            .as_deref()
            .ok_or_else(|| anyhow!("{} has no probability output", self.name))?;

        self.run(rows, |outputs| {
            let output = outputs
                .get(proba_output)
                .ok_or_else(|| anyhow!("missing output {}", proba_output))?;
            let dtype = output.dtype();

            if DynSequenceValueType::can_downcast(&dtype) {
                Self::distributions_from_sequence_map(output)
            } else {
                Self::distributions_from_tensor(output, rows.len())
            }
        })
    }
}
