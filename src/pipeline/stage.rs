// Pipeline stage - lifecycle of one training run

use std::fmt;

/// Progress of a pipeline, ordered from least to most complete
///
/// Operations that need a later stage either advance the pipeline
/// themselves (`load`, `train`) or fail with a stage error (`predict`,
/// `evaluate`). Reconfiguring always returns to `Unconfigured`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PipelineStage {
    Unconfigured,
    /// Emotions and features validated, metadata tables in place
    Configured,
    /// Train/test matrices assembled
    Loaded,
    /// Classifier fitted
    Trained,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Unconfigured => "unconfigured",
            PipelineStage::Configured => "configured",
            PipelineStage::Loaded => "loaded",
            PipelineStage::Trained => "trained",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
