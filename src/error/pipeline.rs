// Pipeline orchestration error types and constants

use crate::error::{ClassifierError, DatasetError, ErrorCode, FeatureError};
use log::error;
use std::fmt;
use std::path::PathBuf;

/// Pipeline error code constants
///
/// Error code range: 5001-5010
pub struct PipelineErrorCodes {}

impl PipelineErrorCodes {
    /// Run configuration references a label outside the vocabulary
    pub const UNKNOWN_EMOTION: i32 = 5001;

    /// Run configuration is unusable (e.g. no feature kinds)
    pub const CONFIG: i32 = 5002;

    /// Feature extraction failed for a prediction input
    pub const FEATURE: i32 = 5003;

    /// Dataset indexing or assembly failed
    pub const DATASET: i32 = 5004;

    /// Classifier rejected its input
    pub const CLASSIFIER: i32 = 5005;

    /// Training data absent after load
    pub const DATA_NOT_LOADED: i32 = 5006;

    /// Operation requires a trained model
    pub const MODEL_NOT_TRAINED: i32 = 5007;

    /// Operation not supported by the configured classifier
    pub const UNSUPPORTED_OPERATION: i32 = 5008;

    /// Model artifact could not be written or read
    pub const PERSISTENCE: i32 = 5009;

    /// Portable export failed (primary artifact untouched)
    pub const EXPORT_FAILED: i32 = 5010;
}

/// Log a pipeline error with structured context
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        "Pipeline error in {}: code={}, component=Pipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors surfaced by the pipeline orchestrator
///
/// State-machine errors (`DataNotLoaded`, `ModelNotTrained`) are fatal to
/// the call only; the caller may retry after completing the prerequisite.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Emotion outside the fixed vocabulary
    UnknownEmotion { label: String },

    /// Invalid run configuration
    Config { reason: String },

    /// Feature extraction failed for a single prediction input
    Feature(FeatureError),

    /// Indexing or assembly failure
    Dataset(DatasetError),

    /// Classifier failure
    Classifier(ClassifierError),

    /// No training data after load
    DataNotLoaded,

    /// Model used before training
    ModelNotTrained,

    /// Probability query on a classifier without probability estimates
    UnsupportedOperation { operation: String, reason: String },

    /// Model artifact write/read failure
    Persistence { path: PathBuf, reason: String },

    /// Portable model export failure
    ExportFailed { path: PathBuf, reason: String },
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::UnknownEmotion { .. } => PipelineErrorCodes::UNKNOWN_EMOTION,
            PipelineError::Config { .. } => PipelineErrorCodes::CONFIG,
            PipelineError::Feature(_) => PipelineErrorCodes::FEATURE,
            PipelineError::Dataset(_) => PipelineErrorCodes::DATASET,
            PipelineError::Classifier(_) => PipelineErrorCodes::CLASSIFIER,
            PipelineError::DataNotLoaded => PipelineErrorCodes::DATA_NOT_LOADED,
            PipelineError::ModelNotTrained => PipelineErrorCodes::MODEL_NOT_TRAINED,
            PipelineError::UnsupportedOperation { .. } => PipelineErrorCodes::UNSUPPORTED_OPERATION,
            PipelineError::Persistence { .. } => PipelineErrorCodes::PERSISTENCE,
            PipelineError::ExportFailed { .. } => PipelineErrorCodes::EXPORT_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::UnknownEmotion { label } => {
                format!("Emotion '{}' is not recognized", label)
            }
            PipelineError::Config { reason } => format!("Invalid run configuration: {}", reason),
            PipelineError::Feature(err) => err.message(),
            PipelineError::Dataset(err) => err.message(),
            PipelineError::Classifier(err) => err.message(),
            PipelineError::DataNotLoaded => {
                "Training data is not loaded. Run load() and check the metadata tables.".to_string()
            }
            PipelineError::ModelNotTrained => {
                "Model has not been trained yet. Call train() first.".to_string()
            }
            PipelineError::UnsupportedOperation { operation, reason } => {
                format!("{} is not supported: {}", operation, reason)
            }
            PipelineError::Persistence { path, reason } => {
                format!("Model artifact {}: {}", path.display(), reason)
            }
            PipelineError::ExportFailed { path, reason } => {
                format!("Portable export to {} failed: {}", path.display(), reason)
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PipelineError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Feature(err) => Some(err),
            PipelineError::Dataset(err) => Some(err),
            PipelineError::Classifier(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FeatureError> for PipelineError {
    fn from(err: FeatureError) -> Self {
        match err {
            FeatureError::EmptyConfig => PipelineError::Config {
                reason: err.message(),
            },
            other => PipelineError::Feature(other),
        }
    }
}

impl From<DatasetError> for PipelineError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::UnknownEmotion { label } => PipelineError::UnknownEmotion { label },
            DatasetError::Feature(FeatureError::EmptyConfig) => PipelineError::Config {
                reason: FeatureError::EmptyConfig.message(),
            },
            other => PipelineError::Dataset(other),
        }
    }
}

impl From<ClassifierError> for PipelineError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::NotFitted => PipelineError::ModelNotTrained,
            other => PipelineError::Classifier(other),
        }
    }
}
