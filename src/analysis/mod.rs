// Analysis module - features, classifiers and metrics for emotion recognition
//
// Module organization:
// - emotion: closed label vocabulary
// - features: per-clip acoustic feature vectors
// - scaler: per-dimension standardization
// - classifier: EmotionClassifier trait and built-in classifiers
// - metrics: accuracy, weighted F-beta, confusion matrix, report

pub mod classifier;
pub mod emotion;
pub mod features;
pub mod metrics;
pub mod scaler;

pub use emotion::Emotion;
