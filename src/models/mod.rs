//! Model artifact, caching and inference components

pub mod artifact;
pub mod cache;
pub mod inference;
pub mod loader;
pub mod native;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use artifact::ModelArtifact;
pub use cache::{CacheState, ModelCache};
pub use inference::InferenceEngine;
pub use loader::{ArtifactFormat, ArtifactSource, ModelLoader};
