//! Model persistence
//!
//! Two files are produced from a trained pipeline:
//! - `Speechrec_<Classifier>.json`: the primary artifact, restorable into a
//!   pipeline that can predict without retraining
//! - `MLSpeech_<Classifier>.json`: a self-describing inference package for
//!   consumers outside this crate (input/output descriptions, class labels,
//!   per-dimension feature names and the model parameters)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::classifier::{ClassifierModel, EmotionClassifier};
use crate::analysis::features::AudioConfig;
use crate::analysis::Emotion;
use crate::error::PipelineError;

/// Version written into every artifact; older/newer versions are rejected
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Identifier of the portable inference package format
pub const PORTABLE_FORMAT: &str = "speech_emotion.portable";

/// Persisted trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub classifier: ClassifierModel,
    pub audio_config: AudioConfig,
    /// Run emotions, in the order used for confusion-matrix rows
    pub emotions: Vec<Emotion>,
    pub feature_dim: usize,
}

fn persistence_error(path: &Path, reason: impl Into<String>) -> PipelineError {
    PipelineError::Persistence {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Write `contents` next to `path` and rename it into place
fn write_atomically(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path).map_err(|err| {
        let _ = fs::remove_file(&tmp_path);
        err
    })
}

impl ModelArtifact {
    pub fn new(classifier: ClassifierModel, audio_config: AudioConfig, emotions: Vec<Emotion>) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            classifier,
            feature_dim: audio_config.dimension(),
            audio_config,
            emotions,
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| persistence_error(path, format!("failed to serialize: {err}")))?;
        write_atomically(path, &json)
            .map_err(|err| persistence_error(path, format!("failed to write: {err}")))?;
        log::info!("[Model] Saved {} to {}", self.classifier.name(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let contents = fs::read_to_string(path)
            .map_err(|err| persistence_error(path, format!("failed to read: {err}")))?;
        let artifact: ModelArtifact = serde_json::from_str(&contents)
            .map_err(|err| persistence_error(path, format!("failed to parse: {err}")))?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(persistence_error(
                path,
                format!(
                    "unsupported format_version {} (expected {})",
                    artifact.format_version, ARTIFACT_FORMAT_VERSION
                ),
            ));
        }
        if !artifact.classifier.is_fitted() {
            return Err(persistence_error(path, "classifier is not fitted"));
        }
        Ok(artifact)
    }
}

/// Input tensor description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescription {
    pub name: String,
    pub element_type: String,
    pub shape: Vec<usize>,
    pub feature_names: Vec<String>,
}

/// Output description; `probabilities` is absent when the classifier has none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDescription {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<String>,
}

/// Self-describing inference package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableModel {
    pub format: String,
    pub format_version: u32,
    pub description: String,
    pub input: InputDescription,
    pub output: OutputDescription,
    pub class_labels: Vec<Emotion>,
    pub audio_config: AudioConfig,
    pub model: ClassifierModel,
}

impl PortableModel {
    pub fn from_artifact(artifact: &ModelArtifact) -> Self {
        let classifier = &artifact.classifier;
        Self {
            format: PORTABLE_FORMAT.to_string(),
            format_version: ARTIFACT_FORMAT_VERSION,
            description: format!(
                "{} speech emotion classifier over {}",
                classifier.name(),
                artifact.audio_config
            ),
            input: InputDescription {
                name: "features".to_string(),
                element_type: "float32".to_string(),
                shape: vec![artifact.feature_dim],
                feature_names: artifact.audio_config.feature_names(),
            },
            output: OutputDescription {
                label: "string".to_string(),
                probabilities: classifier
                    .supports_probabilities()
                    .then(|| "map<string, float32>".to_string()),
            },
            class_labels: classifier.classes().to_vec(),
            audio_config: artifact.audio_config,
            model: classifier.clone(),
        }
    }

    /// Write the package; any failure is an `ExportFailed` error
    pub fn write(&self, path: &Path) -> Result<PathBuf, PipelineError> {
        let export_error = |reason: String| PipelineError::ExportFailed {
            path: path.to_path_buf(),
            reason,
        };

        if self.input.feature_names.len() != self.input.shape.iter().product::<usize>() {
            return Err(export_error(format!(
                "{} feature names for input shape {:?}",
                self.input.feature_names.len(),
                self.input.shape
            )));
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|err| export_error(format!("failed to serialize: {err}")))?;
        write_atomically(path, &json).map_err(|err| export_error(format!("failed to write: {err}")))?;
        log::info!("[Model] Exported portable model to {}", path.display());
        Ok(path.to_path_buf())
    }
}
