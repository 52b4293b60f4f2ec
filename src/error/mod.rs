// Error types for the speech emotion pipeline
//
// This module defines custom error types for feature extraction, dataset
// assembly, classifier fitting and pipeline orchestration, providing
// structured error handling with numeric codes for CLI reporting.

mod classifier;
mod dataset;
mod feature;
mod pipeline;

pub use classifier::{ClassifierError, ClassifierErrorCodes};
pub use dataset::{log_dataset_error, DatasetError, DatasetErrorCodes};
pub use feature::{FeatureError, FeatureErrorCodes};
pub use pipeline::{log_pipeline_error, PipelineError, PipelineErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and the command-line front end.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
