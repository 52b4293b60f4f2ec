// Dataset indexing and assembly error types and constants

use crate::error::{ErrorCode, FeatureError};
use log::error;
use std::fmt;
use std::path::PathBuf;

/// Dataset error code constants
///
/// Error code range: 4001-4006
pub struct DatasetErrorCodes {}

impl DatasetErrorCodes {
    /// Label outside the fixed emotion vocabulary
    pub const UNKNOWN_EMOTION: i32 = 4001;

    /// Feature extraction failed for a row (strict mode)
    pub const FEATURE: i32 = 4002;

    /// Extracted vector length differs from the first vector of the dataset
    pub const FEATURE_MISMATCH: i32 = 4003;

    /// A split has no rows left after filtering/balancing
    pub const EMPTY_DATASET: i32 = 4004;

    /// The same file path appears in both train and test
    pub const SPLIT_OVERLAP: i32 = 4005;

    /// Metadata table could not be read or written
    pub const METADATA: i32 = 4006;
}

/// Log a dataset error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_dataset_error(err: &DatasetError, context: &str) {
    error!(
        "Dataset error in {}: code={}, component=DatasetAssembler, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Dataset-related errors
///
/// These errors cover metadata indexing, metadata table I/O and the
/// assembly of train/test matrices.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetError {
    /// Label is not part of the emotion vocabulary
    UnknownEmotion { label: String },

    /// Feature extraction failed and the policy made it fatal
    Feature(FeatureError),

    /// Inconsistent feature vector length within one dataset
    FeatureMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// Split is empty after filtering/balancing
    EmptyDataset { split: String },

    /// Path is present in both splits
    SplitOverlap { path: PathBuf },

    /// Metadata table I/O or parse failure
    Metadata { path: PathBuf, reason: String },
}

impl ErrorCode for DatasetError {
    fn code(&self) -> i32 {
        match self {
            DatasetError::UnknownEmotion { .. } => DatasetErrorCodes::UNKNOWN_EMOTION,
            DatasetError::Feature(_) => DatasetErrorCodes::FEATURE,
            DatasetError::FeatureMismatch { .. } => DatasetErrorCodes::FEATURE_MISMATCH,
            DatasetError::EmptyDataset { .. } => DatasetErrorCodes::EMPTY_DATASET,
            DatasetError::SplitOverlap { .. } => DatasetErrorCodes::SPLIT_OVERLAP,
            DatasetError::Metadata { .. } => DatasetErrorCodes::METADATA,
        }
    }

    fn message(&self) -> String {
        match self {
            DatasetError::UnknownEmotion { label } => {
                format!("Emotion '{}' is not recognized", label)
            }
            DatasetError::Feature(err) => err.message(),
            DatasetError::FeatureMismatch {
                path,
                expected,
                actual,
            } => format!(
                "Feature vector for {} has length {} but the dataset uses {} (mixed audio configs?)",
                path.display(),
                actual,
                expected
            ),
            DatasetError::EmptyDataset { split } => {
                format!("The {} split is empty after filtering/balancing", split)
            }
            DatasetError::SplitOverlap { path } => {
                format!("{} appears in both train and test splits", path.display())
            }
            DatasetError::Metadata { path, reason } => {
                format!("Metadata table {}: {}", path.display(), reason)
            }
        }
    }
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DatasetError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DatasetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatasetError::Feature(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FeatureError> for DatasetError {
    fn from(err: FeatureError) -> Self {
        DatasetError::Feature(err)
    }
}
