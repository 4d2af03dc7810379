//! Diabetes Inference Library
//!
//! Single-request diabetes risk prediction over one cached classifier
//! artifact: feature validation, load-once model caching, and inference
//! with a typed label and optional positive-class probability.

pub mod config;
pub mod error;
pub mod feature_builder;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use error::PredictorError;
pub use feature_builder::{FeatureVector, FeatureVectorBuilder, FEATURE_NAMES};
pub use models::inference::InferenceEngine;
pub use service::DiabetesPredictor;
pub use types::{patient::PatientInput, prediction::Label, prediction::PredictionResult};
