//! Native scikit-learn style pipelines decoded from JSON
//!
//! An exported pipeline is an optional standard scaler followed by one
//! estimator. Parameters are validated once at decode time so prediction
//! itself cannot fail on shape.

use crate::feature_builder::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::models::artifact::{Classifier, ModelArtifact, ProbabilisticClassifier};
use anyhow::{bail, ensure, Result};
use serde::Deserialize;

/// Serialized pipeline as written by the export script
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportedPipeline {
    /// Model name for logs
    #[serde(default = "default_model_name")]
    pub name: String,
    /// Column order the model was trained on, checked against ours
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// Standardization applied before the estimator
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    pub estimator: Estimator,
}

fn default_model_name() -> String {
    "diabetes_pipeline".to_string()
}

/// `(x - mean) / scale` per feature
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform(&self, row: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut out = *row;
        for (i, value) in out.iter_mut().enumerate() {
            *value = (*value - self.mean[i]) / self.scale[i];
        }
        out
    }
}

/// Final estimator of the pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression {
        coef: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    LinearSvc {
        coef: Vec<f64>,
        intercept: f64,
    },
    Svc {
        kernel: Kernel,
        support_vectors: Vec<Vec<f64>>,
        dual_coef: Vec<f64>,
        intercept: f64,
        /// Platt scaling parameters; without them the SVC emits labels only
        #[serde(default)]
        platt: Option<PlattScaling>,
    },
}

fn default_threshold() -> f64 {
    0.5
}

/// SVC kernel function
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
    Poly { degree: i32, gamma: f64, coef0: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    fn apply(&self, x: &[f64], sv: &[f64]) -> f64 {
        match *self {
            Kernel::Linear => dot(x, sv),
            Kernel::Rbf { gamma } => {
                let dist: f64 = x.iter().zip(sv).map(|(a, b)| (a - b).powi(2)).sum();
                (-gamma * dist).exp()
            }
            Kernel::Poly {
                degree,
                gamma,
                coef0,
            } => (gamma * dot(x, sv) + coef0).powi(degree),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * dot(x, sv) + coef0).tanh(),
        }
    }

    fn params(&self) -> Vec<f64> {
        match *self {
            Kernel::Linear => Vec::new(),
            Kernel::Rbf { gamma } => vec![gamma],
            Kernel::Poly {
                degree,
                gamma,
                coef0,
            } => vec![degree as f64, gamma, coef0],
            Kernel::Sigmoid { gamma, coef0 } => vec![gamma, coef0],
        }
    }
}

/// Sigmoid calibration of the SVC decision value
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

impl PlattScaling {
    fn probability(&self, decision: f64) -> f64 {
        1.0 / (1.0 + (self.a * decision + self.b).exp())
    }
}

impl Estimator {
    fn supports_probability(&self) -> bool {
        match self {
            Estimator::LogisticRegression { .. } => true,
            Estimator::LinearSvc { .. } => false,
            Estimator::Svc { platt, .. } => platt.is_some(),
        }
    }

    fn decision(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        match self {
            Estimator::LogisticRegression {
                coef, intercept, ..
            }
            | Estimator::LinearSvc { coef, intercept } => dot(x, coef) + intercept,
            Estimator::Svc {
                kernel,
                support_vectors,
                dual_coef,
                intercept,
                ..
            } => {
                support_vectors
                    .iter()
                    .zip(dual_coef)
                    .map(|(sv, alpha)| alpha * kernel.apply(x, sv))
                    .sum::<f64>()
                    + intercept
            }
        }
    }
}

/// Pipeline ready for inference
#[derive(Debug, Clone)]
pub struct NativePipeline {
    name: String,
    scaler: Option<StandardScaler>,
    estimator: Estimator,
}

impl NativePipeline {
    /// Decode and validate a pipeline from JSON bytes
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let export: ExportedPipeline = serde_json::from_slice(bytes)?;
        Self::from_export(export)
    }

    pub fn from_export(export: ExportedPipeline) -> Result<Self> {
        if let Some(names) = &export.feature_names {
            ensure!(
                names.iter().map(String::as_str).eq(FEATURE_NAMES.iter().copied()),
                "feature order {:?} does not match {:?}",
                names,
                FEATURE_NAMES
            );
        }

        if let Some(scaler) = &export.scaler {
            check_params("scaler.mean", &scaler.mean)?;
            check_params("scaler.scale", &scaler.scale)?;
            ensure!(
                scaler.scale.iter().all(|&s| s != 0.0),
                "scaler.scale contains zero"
            );
        }

        match &export.estimator {
            Estimator::LogisticRegression {
                coef,
                intercept,
                threshold,
            } => {
                check_params("coef", coef)?;
                check_finite("intercept", *intercept)?;
                ensure!(
                    (0.0..=1.0).contains(threshold),
                    "threshold {} outside [0, 1]",
                    threshold
                );
            }
            Estimator::LinearSvc { coef, intercept } => {
                check_params("coef", coef)?;
                check_finite("intercept", *intercept)?;
            }
            Estimator::Svc {
                kernel,
                support_vectors,
                dual_coef,
                intercept,
                platt,
            } => {
                ensure!(!support_vectors.is_empty(), "svc has no support vectors");
                ensure!(
                    support_vectors.len() == dual_coef.len(),
                    "{} support vectors but {} dual coefficients",
                    support_vectors.len(),
                    dual_coef.len()
                );
                for sv in support_vectors {
                    check_params("support_vectors", sv)?;
                }
                ensure!(
                    dual_coef.iter().all(|c| c.is_finite()),
                    "dual_coef is not finite"
                );
                ensure!(
                    kernel.params().iter().all(|p| p.is_finite()),
                    "kernel parameters are not finite"
                );
                check_finite("intercept", *intercept)?;
                if let Some(platt) = platt {
                    check_finite("platt.a", platt.a)?;
                    check_finite("platt.b", platt.b)?;
                }
            }
        }

        Ok(Self {
            name: export.name,
            scaler: export.scaler,
            estimator: export.estimator,
        })
    }

    /// Wrap into the artifact variant matching the estimator's capability
    pub fn into_artifact(self) -> ModelArtifact {
        if self.estimator.supports_probability() {
            ModelArtifact::Probabilistic(Box::new(self))
        } else {
            ModelArtifact::ClassifierOnly(Box::new(self))
        }
    }

    fn transform(&self, row: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let x = row.to_array();
        match &self.scaler {
            Some(scaler) => scaler.transform(&x),
            None => x,
        }
    }

    /// Decision value, rejected when the arithmetic overflowed
    fn decision(&self, x: &[f64; FEATURE_COUNT]) -> Result<f64> {
        let decision = self.estimator.decision(x);
        ensure!(
            decision.is_finite(),
            "{} produced a non-finite decision value",
            self.name
        );
        Ok(decision)
    }

    fn positive_probability(&self, x: &[f64; FEATURE_COUNT]) -> Result<f64> {
        let decision = self.decision(x)?;
        match &self.estimator {
            Estimator::LogisticRegression { .. } => Ok(sigmoid(decision)),
            Estimator::Svc {
                platt: Some(platt), ..
            } => Ok(platt.probability(decision)),
            _ => bail!("{} has no probability output", self.name),
        }
    }
}

impl Classifier for NativePipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
        rows.iter()
            .map(|row| -> Result<i64> {
                let x = self.transform(row);
                let positive = match &self.estimator {
                    Estimator::LogisticRegression { threshold, .. } => {
                        self.positive_probability(&x)? >= *threshold
                    }
                    _ => self.decision(&x)? > 0.0,
                };
                Ok(positive as i64)
            })
            .collect()
    }
}

impl ProbabilisticClassifier for NativePipeline {
    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Vec<Vec<f64>>> {
        rows.iter()
            .map(|row| -> Result<Vec<f64>> {
                let p = self.positive_probability(&self.transform(row))?;
                Ok(vec![1.0 - p, p])
            })
            .collect()
    }
}

fn check_params(what: &str, values: &[f64]) -> Result<()> {
    ensure!(
        values.len() == FEATURE_COUNT,
        "{} has {} entries, expected {}",
        what,
        values.len(),
        FEATURE_COUNT
    );
    ensure!(
        values.iter().all(|v| v.is_finite()),
        "{} is not finite",
        what
    );
    Ok(())
}

fn check_finite(what: &str, value: f64) -> Result<()> {
    ensure!(value.is_finite(), "{} is not finite", what);
    Ok(())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
