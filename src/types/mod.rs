//! Request and response types

pub mod patient;
pub mod prediction;

pub use patient::PatientInput;
pub use prediction::{Label, PredictionResult};
