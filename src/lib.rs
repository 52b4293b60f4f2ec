// Speech Emotion Core - classical emotion recognition from short speech clips
// Feature extraction, dataset assembly, training, evaluation and model export

// Module declarations
pub mod analysis;
pub mod config;
pub mod dataset;
pub mod error;
pub mod model;
pub mod pipeline;

// Re-exports for convenience
pub use analysis::classifier::{ClassifierKind, ClassifierModel, EmotionClassifier};
pub use analysis::features::{AudioConfig, FeatureExtractor, FeatureKind, FeatureVector};
pub use analysis::Emotion;
pub use config::RunConfig;
pub use dataset::SourceDataset;
pub use error::{ErrorCode, PipelineError};
pub use pipeline::{Pipeline, PipelineStage};
