//! Model artifact loader

use crate::error::PredictorError;
use crate::models::artifact::ModelArtifact;
use crate::models::native::NativePipeline;
use serde::Deserialize;
use std::io;
use std::path::Path;
use tracing::{error, info};

/// Serialization format of the model artifact
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Pick by file extension: `.onnx` is ONNX, anything else JSON
    #[default]
    Auto,
    /// JSON-exported pipeline
    Json,
    /// ONNX graph (requires the `onnx` feature)
    Onnx,
}

impl ArtifactFormat {
    fn resolve(self, path: &Path) -> ArtifactFormat {
        match self {
            ArtifactFormat::Auto => {
                let is_onnx = path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("onnx"))
                    .unwrap_or(false);
                if is_onnx {
                    ArtifactFormat::Onnx
                } else {
                    ArtifactFormat::Json
                }
            }
            other => other,
        }
    }
}

/// Byte storage holding the artifact
pub trait ArtifactSource: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads artifacts from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsArtifactSource;

impl ArtifactSource for FsArtifactSource {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Reads and decodes model artifacts
pub struct ModelLoader {
    source: Box<dyn ArtifactSource>,
    format: ArtifactFormat,
}

impl ModelLoader {
    /// Create a loader reading from the filesystem
    pub fn new(format: ArtifactFormat) -> Self {
        Self::with_source(Box::new(FsArtifactSource), format)
    }

    /// Create a loader over a custom byte source
    pub fn with_source(source: Box<dyn ArtifactSource>, format: ArtifactFormat) -> Self {
        Self { source, format }
    }

    /// Read the artifact at `path` and decode it into a model.
    ///
    /// Storage failures map to `ModelNotFound`, decode failures to
    /// `ModelCorrupt`.
    pub fn load(&self, path: &Path) -> Result<ModelArtifact, PredictorError> {
        let format = self.format.resolve(path);
        info!(path = %path.display(), format = ?format, "Loading model artifact");

        let bytes = self.source.read(path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Model file not readable");
            PredictorError::ModelNotFound {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let artifact = decode(format, &bytes).map_err(|e| {
            error!(path = %path.display(), error = %e, "Model file could not be decoded");
            PredictorError::ModelCorrupt {
                path: path.to_path_buf(),
                reason: format!("{:#}", e),
            }
        })?;

        info!(
            model = %artifact.name(),
            variant = artifact.variant(),
            size_bytes = bytes.len(),
            "Model loaded successfully"
        );

        Ok(artifact)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(ArtifactFormat::Auto)
    }
}

fn decode(format: ArtifactFormat, bytes: &[u8]) -> anyhow::Result<ModelArtifact> {
    match format {
        ArtifactFormat::Onnx => decode_onnx(bytes),
        _ => Ok(NativePipeline::from_json(bytes)?.into_artifact()),
    }
}

#[cfg(feature = "onnx")]
fn decode_onnx(bytes: &[u8]) -> anyhow::Result<ModelArtifact> {
    crate::models::onnx::OnnxClassifier::from_bytes(bytes).map(|m| m.into_artifact())
}

#[cfg(not(feature = "onnx"))]
fn decode_onnx(_bytes: &[u8]) -> anyhow::Result<ModelArtifact> {
    anyhow::bail!("ONNX artifacts require building with the `onnx` feature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const LINEAR_SVC: &str = r#"{"estimator": {"kind": "linear_svc", "coef": [0,0.05,0,0,0,0,0,0], "intercept": -6.0}}"#;

    #[test]
    fn test_format_resolution() {
        assert_eq!(
            ArtifactFormat::Auto.resolve(Path::new("models/m.onnx")),
            ArtifactFormat::Onnx
        );
        assert_eq!(
            ArtifactFormat::Auto.resolve(Path::new("models/m.json")),
            ArtifactFormat::Json
        );
        assert_eq!(
            ArtifactFormat::Json.resolve(Path::new("models/m.onnx")),
            ArtifactFormat::Json
        );
    }

    #[test]
    fn test_load_json_artifact() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(LINEAR_SVC.as_bytes()).unwrap();

        let artifact = ModelLoader::default().load(file.path()).unwrap();
        assert_eq!(artifact.variant(), "classifier_only");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        match ModelLoader::default().load(&path) {
            Err(PredictorError::ModelNotFound { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected ModelNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_corrupt_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(b"\x80\x04\x95 not a json pipeline").unwrap();

        let err = ModelLoader::default().load(file.path()).unwrap_err();
        assert_eq!(err.kind(), "model_corrupt");
        assert!(err.is_fatal());
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_without_feature_is_corrupt() {
        let mut file = tempfile::Builder::new().suffix(".onnx").tempfile().unwrap();
        file.write_all(b"onnx bytes").unwrap();

        let err = ModelLoader::default().load(file.path()).unwrap_err();
        assert!(err.to_string().contains("onnx"));
    }
}
