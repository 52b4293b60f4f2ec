// Classifier error types and constants

use crate::error::ErrorCode;
use std::fmt;

/// Classifier error code constants
///
/// Error code range: 6001-6003
pub struct ClassifierErrorCodes {}

impl ClassifierErrorCodes {
    /// Classifier used before `fit`
    pub const NOT_FITTED: i32 = 6001;

    /// Training matrix and labels are unusable
    pub const INVALID_TRAINING_DATA: i32 = 6002;

    /// Input vector dimension differs from the fitted dimension
    pub const DIMENSION_MISMATCH: i32 = 6003;
}

/// Errors raised by classifier implementations
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// Classifier has not been fitted yet
    NotFitted,

    /// Training data rejected (empty, ragged, label count mismatch)
    InvalidTrainingData { reason: String },

    /// Input vector length differs from the training dimension
    DimensionMismatch { expected: usize, actual: usize },
}

impl ErrorCode for ClassifierError {
    fn code(&self) -> i32 {
        match self {
            ClassifierError::NotFitted => ClassifierErrorCodes::NOT_FITTED,
            ClassifierError::InvalidTrainingData { .. } => {
                ClassifierErrorCodes::INVALID_TRAINING_DATA
            }
            ClassifierError::DimensionMismatch { .. } => ClassifierErrorCodes::DIMENSION_MISMATCH,
        }
    }

    fn message(&self) -> String {
        match self {
            ClassifierError::NotFitted => "Classifier has not been fitted".to_string(),
            ClassifierError::InvalidTrainingData { reason } => {
                format!("Invalid training data: {}", reason)
            }
            ClassifierError::DimensionMismatch { expected, actual } => format!(
                "Feature vector has {} dimensions, classifier expects {}",
                actual, expected
            ),
        }
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClassifierError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ClassifierError {}
