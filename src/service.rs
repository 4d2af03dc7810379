//! Predictor service wiring the builder, the model cache and the engine

use crate::config::AppConfig;
use crate::error::Result;
use crate::feature_builder::{FeatureVector, FeatureVectorBuilder};
use crate::metrics::InferenceMetrics;
use crate::models::artifact::ModelArtifact;
use crate::models::cache::ModelCache;
use crate::models::inference::InferenceEngine;
use crate::models::loader::{ArtifactSource, ModelLoader};
use crate::types::patient::PatientInput;
use crate::types::prediction::PredictionResult;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// The single prediction service of the process.
///
/// Construct once at startup and share as `Arc<DiabetesPredictor>` with every
/// request handler. All state is read-only after the first model load.
pub struct DiabetesPredictor {
    builder: FeatureVectorBuilder,
    engine: InferenceEngine,
    metrics: InferenceMetrics,
}

impl DiabetesPredictor {
    /// Create a predictor reading its artifact from the filesystem
    pub fn new(config: &AppConfig) -> Self {
        Self::from_loader(config, ModelLoader::new(config.model.format))
    }

    /// Create a predictor over a custom artifact source
    pub fn with_source(config: &AppConfig, source: Box<dyn ArtifactSource>) -> Self {
        Self::from_loader(
            config,
            ModelLoader::with_source(source, config.model.format),
        )
    }

    fn from_loader(config: &AppConfig, loader: ModelLoader) -> Self {
        let cache = Arc::new(ModelCache::new(config.model.path.clone(), loader));
        let builder = FeatureVectorBuilder::with_zero_guard(config.input.reject_all_zero);

        info!(
            model_path = %config.model.path.display(),
            reject_all_zero = builder.rejects_all_zero(),
            "Predictor initialized"
        );

        Self {
            builder,
            engine: InferenceEngine::new(cache),
            metrics: InferenceMetrics::new(),
        }
    }

    /// Force the model load so artifact errors surface before serving.
    pub fn warm_up(&self) -> Result<Arc<ModelArtifact>> {
        self.engine.cache().get_model()
    }

    /// Validate, assemble and predict one patient record
    pub fn predict(&self, input: &PatientInput) -> Result<PredictionResult> {
        self.observe(|| {
            let vector = self.builder.build(input)?;
            self.engine.predict(&vector)
        })
    }

    /// Predict from a name/value mapping of the eight measurements
    pub fn predict_fields<'a, I>(&self, fields: I) -> Result<PredictionResult>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.observe(|| {
            let vector = self.builder.build_from_fields(fields)?;
            self.engine.predict(&vector)
        })
    }

    /// Predict an already validated vector
    pub fn predict_vector(&self, vector: &FeatureVector) -> Result<PredictionResult> {
        self.observe(|| self.engine.predict(vector))
    }

    pub fn builder(&self) -> &FeatureVectorBuilder {
        &self.builder
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &InferenceMetrics {
        &self.metrics
    }

    fn observe(&self, call: impl FnOnce() -> Result<PredictionResult>) -> Result<PredictionResult> {
        let start = Instant::now();
        let result = call();
        match &result {
            Ok(prediction) => self.metrics.record_prediction(start.elapsed(), prediction),
            Err(e) => self.metrics.record_error(e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictorError;
    use crate::models::cache::CacheState;
    use crate::types::prediction::Label;
    use std::io;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LOGISTIC: &str = r#"{"estimator": {"kind": "logistic_regression", "coef": [0,0.1,0,0,0,0,0,0], "intercept": -12.0}}"#;

    struct StaticSource {
        reads: Arc<AtomicUsize>,
    }

    impl ArtifactSource for StaticSource {
        fn read(&self, _path: &Path) -> io::Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(LOGISTIC.as_bytes().to_vec())
        }
    }

    fn predictor(config: &AppConfig) -> (DiabetesPredictor, Arc<AtomicUsize>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let source = StaticSource {
            reads: reads.clone(),
        };
        (DiabetesPredictor::with_source(config, Box::new(source)), reads)
    }

    #[test]
    fn test_predict_record() {
        let (predictor, reads) = predictor(&AppConfig::default());
        let input = PatientInput::new(2.0, 150.0, 80.0, 30.0, 100.0, 32.5, 0.6, 45.0);

        let result = predictor.predict(&input).unwrap();
        assert_eq!(result.label, Label::Positive);
        assert!(result.probability.unwrap() > 0.5);

        predictor.predict(&input).unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(predictor.metrics().predictions.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_empty_input_never_reaches_model() {
        let (predictor, reads) = predictor(&AppConfig::default());
        let zeros = PatientInput::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

        assert_eq!(predictor.predict(&zeros), Err(PredictorError::EmptyInput));
        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert_eq!(predictor.engine().cache().state(), CacheState::Unloaded);
        assert_eq!(predictor.metrics().empty_inputs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_zero_guard_disabled_by_config() {
        let mut config = AppConfig::default();
        config.input.reject_all_zero = false;
        let (predictor, _) = predictor(&config);
        let zeros = PatientInput::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

        let result = predictor.predict(&zeros).unwrap();
        assert_eq!(result.label, Label::Negative);
    }

    #[test]
    fn test_warm_up_loads_once() {
        let (predictor, reads) = predictor(&AppConfig::default());

        let model = predictor.warm_up().unwrap();
        assert!(model.supports_probability());
        assert_eq!(predictor.engine().cache().state(), CacheState::Loaded);

        predictor
            .predict_fields([
                ("Age", 45.0),
                ("BMI", 32.5),
                ("Glucose", 150.0),
                ("Insulin", 100.0),
                ("Pregnancies", 2.0),
                ("BloodPressure", 80.0),
                ("SkinThickness", 30.0),
                ("DiabetesPedigreeFunction", 0.6),
            ])
            .unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_model_is_fatal() {
        let mut config = AppConfig::default();
        config.model.path = "does/not/exist.json".into();
        let predictor = DiabetesPredictor::new(&config);

        let err = predictor.warm_up().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
