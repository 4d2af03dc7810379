//! Regression checks against the shipped reference artifact

use diabetes_inference::config::AppConfig;
use diabetes_inference::models::{CacheState, InferenceEngine};
use diabetes_inference::{DiabetesPredictor, Label, PatientInput, PredictorError};
use std::path::PathBuf;
use std::sync::Arc;

fn reference_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.model.path =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models/diabetes_svm_pipeline.json");
    config
}

fn golden_patient() -> PatientInput {
    PatientInput::new(2.0, 150.0, 80.0, 30.0, 100.0, 32.5, 0.6, 45.0)
}

#[test]
fn golden_output_matches_recorded_values() {
    let predictor = DiabetesPredictor::new(&reference_config());
    let result = predictor.predict(&golden_patient()).unwrap();

    assert_eq!(result.label, Label::Positive);
    let probability = result.probability.expect("reference artifact is probabilistic");
    assert!((probability - 0.690_045_348_429_528_2).abs() < 1e-12);
}

#[test]
fn recorded_negative_and_positive_cases() {
    let predictor = DiabetesPredictor::new(&reference_config());

    let negative = predictor
        .predict(&PatientInput::new(1.0, 89.0, 66.0, 23.0, 94.0, 28.1, 0.167, 21.0))
        .unwrap();
    assert_eq!(negative.label, Label::Negative);
    assert!((negative.probability.unwrap() - 0.055_521_199_679_507_7).abs() < 1e-12);

    let positive = predictor
        .predict(&PatientInput::new(6.0, 148.0, 72.0, 35.0, 0.0, 33.6, 0.627, 50.0))
        .unwrap();
    assert_eq!(positive.label, Label::Positive);
    assert!((positive.probability.unwrap() - 0.752_527_003_673_924_8).abs() < 1e-12);
}

#[test]
fn label_agrees_with_probability_threshold() {
    let predictor = DiabetesPredictor::new(&reference_config());

    for glucose in [60.0, 95.0, 120.0, 145.0, 180.0] {
        for bmi in [19.5, 27.0, 35.0, 44.0] {
            for age in [22.0, 38.0, 61.0] {
                let input = PatientInput::new(3.0, glucose, 72.0, 25.0, 90.0, bmi, 0.45, age);
                let result = predictor.predict(&input).unwrap();
                let p = result.probability.unwrap();

                assert!((0.0..=1.0).contains(&p));
                assert_eq!(result.label == Label::Positive, p >= 0.5);
            }
        }
    }
}

#[test]
fn repeated_predictions_are_bit_identical() {
    let predictor = DiabetesPredictor::new(&reference_config());
    let vector = predictor.builder().build(&golden_patient()).unwrap();

    let first = predictor.predict_vector(&vector).unwrap();
    let second = predictor.predict_vector(&vector).unwrap();

    assert_eq!(first.label, second.label);
    assert_eq!(
        first.probability.map(f64::to_bits),
        second.probability.map(f64::to_bits)
    );
}

#[test]
fn all_zero_record_is_rejected_before_loading() {
    let predictor = DiabetesPredictor::new(&reference_config());
    let zeros = PatientInput::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

    assert_eq!(predictor.predict(&zeros), Err(PredictorError::EmptyInput));
    assert_eq!(predictor.engine().cache().state(), CacheState::Unloaded);
}

#[test]
fn shared_predictor_serves_concurrent_requests() {
    let predictor = Arc::new(DiabetesPredictor::new(&reference_config()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let predictor = predictor.clone();
            std::thread::spawn(move || predictor.predict(&golden_patient()).unwrap())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(predictor.engine().cache().state(), CacheState::Loaded);
}

#[test]
fn missing_artifact_error_is_stable() {
    let mut config = AppConfig::default();
    config.model.path = PathBuf::from("models/not_deployed.json");
    let predictor = DiabetesPredictor::new(&config);

    let first = predictor.predict(&golden_patient()).unwrap_err();
    let second = predictor.predict(&golden_patient()).unwrap_err();

    assert!(first.is_fatal());
    assert!(first.to_string().contains("models/not_deployed.json"));
    assert_eq!(first, second);
    assert_eq!(predictor.engine().cache().state(), CacheState::Failed);
}

#[test]
fn batch_prediction_keeps_items_independent() {
    let predictor = DiabetesPredictor::new(&reference_config());
    let builder = diabetes_inference::FeatureVectorBuilder::without_zero_guard();
    let vectors = vec![
        builder.build(&golden_patient()).unwrap(),
        builder
            .build(&PatientInput::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0))
            .unwrap(),
    ];

    let engine: &InferenceEngine = predictor.engine();
    let results = engine.predict_batch(&vectors);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap().label, Label::Positive);
    assert_eq!(results[1].as_ref().unwrap().label, Label::Negative);
}
