// Pipeline - orchestrates indexing, assembly, training, evaluation and export
//
// The pipeline owns its RunConfig and everything derived from it. State moves
// forward through PipelineStage:
//
//   Unconfigured --prepare--> Configured --load--> Loaded --train--> Trained
//
// `load` and `train` run their prerequisites on demand. `reconfigure` drops
// all derived state and returns to Unconfigured.

mod stage;

pub use stage::PipelineStage;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analysis::classifier::{ClassifierModel, EmotionClassifier};
use crate::analysis::features::{AudioConfig, FeatureExtractor, FeatureKind};
use crate::analysis::metrics::{accuracy, f1_weighted, ClassificationReport, ConfusionMatrix};
use crate::analysis::Emotion;
use crate::config::RunConfig;
use crate::dataset::{
    read_table, AssembledDataset, AudioSample, DatasetAssembler, DatasetIndexer, MetadataTables,
    SourceDataset,
};
use crate::error::{log_dataset_error, log_pipeline_error, DatasetError, ErrorCode, PipelineError};
use crate::model::{ModelArtifact, PortableModel};

/// Values fixed by `prepare` (or by restoring an artifact)
struct Prepared {
    emotions: Vec<Emotion>,
    audio_config: AudioConfig,
    tables: Vec<(SourceDataset, MetadataTables)>,
}

/// Training pipeline for one run configuration
///
/// # Example
/// ```ignore
/// let mut pipeline = Pipeline::new(RunConfig::load_from_file("run.json"));
/// pipeline.train(None)?;
/// let (accuracy, f1) = pipeline.evaluate()?;
/// println!("{}", pipeline.confusion_matrix(true)?);
/// ```
pub struct Pipeline {
    config: RunConfig,
    stage: PipelineStage,
    prepared: Option<Prepared>,
    data: Option<AssembledDataset>,
    classifier: ClassifierModel,
    extractor: Option<FeatureExtractor>,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        let classifier = config.build_classifier();
        Self {
            config,
            stage: PipelineStage::Unconfigured,
            prepared: None,
            data: None,
            classifier,
            extractor: None,
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn classifier(&self) -> &ClassifierModel {
        &self.classifier
    }

    /// Assembled data, present from `Loaded` on (absent after `restore`)
    pub fn data(&self) -> Option<&AssembledDataset> {
        self.data.as_ref()
    }

    /// Validated run emotions, in configured order
    pub fn emotions(&self) -> Option<&[Emotion]> {
        self.prepared.as_ref().map(|p| p.emotions.as_slice())
    }

    pub fn audio_config(&self) -> Option<AudioConfig> {
        self.prepared.as_ref().map(|p| p.audio_config)
    }

    /// Metadata tables written or reused by `prepare`
    pub fn metadata_tables(&self) -> Vec<&MetadataTables> {
        self.prepared
            .iter()
            .flat_map(|p| p.tables.iter().map(|(_, tables)| tables))
            .collect()
    }

    /// Validate the configuration and make sure metadata tables exist
    ///
    /// Emotion names and feature kinds are checked before any file I/O.
    /// Re-running `prepare` discards loaded data and any trained model.
    pub fn prepare(&mut self) -> Result<(), PipelineError> {
        let emotions = self.config.emotion_subset()?;
        let audio_config = self.config.audio_config()?;

        let indexer = DatasetIndexer::new(&self.config.data_root, &self.config.metadata_dir);
        let mut tables = Vec::new();
        for (source, name) in self.config.enabled_sources() {
            let source_tables =
                indexer.ensure_tables(source, name, &emotions, self.config.override_metadata)?;
            tables.push((source, source_tables));
        }
        if tables.is_empty() {
            log::warn!("[Pipeline] No source datasets enabled");
        }

        log::info!(
            "[Pipeline] Prepared: emotions {:?}, features {}",
            emotions,
            audio_config
        );
        self.extractor = Some(FeatureExtractor::new(audio_config)?);
        self.prepared = Some(Prepared {
            emotions,
            audio_config,
            tables,
        });
        self.data = None;
        self.classifier = self.config.build_classifier();
        self.stage = PipelineStage::Configured;
        Ok(())
    }

    /// Assemble train/test matrices from the metadata tables
    ///
    /// No-op once data is loaded; prepares first when unconfigured.
    pub fn load(&mut self) -> Result<(), PipelineError> {
        if self.stage >= PipelineStage::Loaded {
            return Ok(());
        }
        if self.stage == PipelineStage::Unconfigured {
            self.prepare()?;
        }
        let prepared = self.prepared.as_ref().ok_or(PipelineError::DataNotLoaded)?;

        let mut train_rows = Vec::new();
        let mut test_rows = Vec::new();
        for (source, tables) in &prepared.tables {
            train_rows.extend(read_table(&tables.train, *source)?);
            test_rows.extend(read_table(&tables.test, *source)?);
        }
        let train_rows = retain_emotions(train_rows, &prepared.emotions);
        let test_rows = retain_emotions(test_rows, &prepared.emotions);

        let assembler = DatasetAssembler::new(prepared.audio_config, self.config.assembly_options())?;
        let data = assembler
            .assemble(&train_rows, &test_rows)
            .map_err(|err| {
                log_dataset_error(&err, "load");
                err
            })?;

        log::info!(
            "[Pipeline] Loaded {} train / {} test vectors of dimension {}",
            data.train.len(),
            data.test.len(),
            data.feature_dimension()
        );
        self.data = Some(data);
        self.stage = PipelineStage::Loaded;
        Ok(())
    }

    /// Fit a classifier on the training split
    ///
    /// # Arguments
    /// * `classifier` - Classifier to fit; `None` fits the configured one
    pub fn train(&mut self, classifier: Option<ClassifierModel>) -> Result<(), PipelineError> {
        self.load()?;
        let data = self.data.as_ref().ok_or(PipelineError::DataNotLoaded)?;
        if data.train.is_empty() {
            return Err(PipelineError::DataNotLoaded);
        }

        let mut model = classifier.unwrap_or_else(|| self.classifier.clone());
        model.fit(&data.train.features, &data.train.labels)?;
        tracing::info!(
            "[Pipeline] Trained {} on {} vectors, classes {:?}",
            model.name(),
            data.train.len(),
            model.classes()
        );

        self.classifier = model;
        self.stage = PipelineStage::Trained;
        Ok(())
    }

    fn require_trained(&self) -> Result<(), PipelineError> {
        if self.stage < PipelineStage::Trained {
            return Err(PipelineError::ModelNotTrained);
        }
        Ok(())
    }

    fn extract(&self, path: &Path) -> Result<Vec<f32>, PipelineError> {
        let extractor = self.extractor.as_ref().ok_or(PipelineError::ModelNotTrained)?;
        Ok(extractor.extract(path)?)
    }

    /// Predict the emotion of one audio file
    pub fn predict(&self, path: &Path) -> Result<Emotion, PipelineError> {
        self.require_trained()?;
        let features = self.extract(path)?;
        Ok(self.classifier.predict(&features)?)
    }

    /// Probability per trained emotion for one audio file
    pub fn predict_proba(&self, path: &Path) -> Result<BTreeMap<Emotion, f32>, PipelineError> {
        self.require_trained()?;
        if !self.classifier.supports_probabilities() {
            return Err(PipelineError::UnsupportedOperation {
                operation: "predict_proba".to_string(),
                reason: format!("{} has no probability estimates", self.classifier.name()),
            });
        }
        let features = self.extract(path)?;
        self.classifier
            .predict_proba(&features)?
            .ok_or_else(|| PipelineError::UnsupportedOperation {
                operation: "predict_proba".to_string(),
                reason: format!("{} returned no probabilities", self.classifier.name()),
            })
    }

    /// True and predicted labels over the test split
    fn test_predictions(&self) -> Result<(&[Emotion], Vec<Emotion>), PipelineError> {
        self.require_trained()?;
        let data = self.data.as_ref().ok_or(PipelineError::DataNotLoaded)?;
        let predicted = self.classifier.predict_batch(&data.test.features)?;
        Ok((&data.test.labels, predicted))
    }

    /// Accuracy and support-weighted F1 on the test split
    pub fn evaluate(&self) -> Result<(f32, f32), PipelineError> {
        let (truth, predicted) = self.test_predictions()?;
        let scores = (accuracy(truth, &predicted), f1_weighted(truth, &predicted));
        tracing::info!(
            "[Pipeline] Evaluation: accuracy {:.3}, weighted F1 {:.3}",
            scores.0,
            scores.1
        );
        Ok(scores)
    }

    /// Test-split confusion matrix over the run emotions
    ///
    /// # Arguments
    /// * `normalize` - Express each row as percentages of its true-label total
    pub fn confusion_matrix(&self, normalize: bool) -> Result<ConfusionMatrix, PipelineError> {
        let (truth, predicted) = self.test_predictions()?;
        let labels = self.emotions().unwrap_or_default();
        let matrix = ConfusionMatrix::from_predictions(labels, truth, &predicted);
        Ok(if normalize { matrix.normalize() } else { matrix })
    }

    /// Per-emotion precision/recall/F1 on the test split
    pub fn classification_report(&self) -> Result<ClassificationReport, PipelineError> {
        let (truth, predicted) = self.test_predictions()?;
        Ok(ClassificationReport::new(truth, &predicted))
    }

    /// Replace the run configuration and drop everything derived from the old one
    pub fn reconfigure(&mut self, config: RunConfig) {
        if self.stage > PipelineStage::Unconfigured {
            log::info!(
                "[Pipeline] Reconfigured from stage {}; prepare must run again",
                self.stage
            );
        }
        *self = Pipeline::new(config);
    }

    fn artifact(&self) -> Result<ModelArtifact, PipelineError> {
        self.require_trained()?;
        let prepared = self.prepared.as_ref().ok_or(PipelineError::ModelNotTrained)?;
        Ok(ModelArtifact::new(
            self.classifier.clone(),
            prepared.audio_config,
            prepared.emotions.clone(),
        ))
    }

    /// Default location of the persisted model for the current classifier
    pub fn default_model_path(&self) -> PathBuf {
        self.config.model_path(self.classifier.name())
    }

    /// Default location of the portable model for the current classifier
    pub fn default_portable_path(&self) -> PathBuf {
        self.config.portable_model_path(self.classifier.name())
    }

    /// Persist the trained classifier with its audio config and emotions
    pub fn save_model(&self, path: &Path) -> Result<(), PipelineError> {
        self.artifact()?.save(path)
    }

    /// Build a trained pipeline from a persisted artifact
    ///
    /// Features are extracted with the artifact's own audio config, which
    /// also replaces `config.features`. Pass `expected_features` to reject an
    /// artifact whose layout differs from an explicitly requested one. The
    /// restored pipeline predicts without retraining; it holds no dataset,
    /// so `evaluate` reports `DataNotLoaded`.
    pub fn restore(
        mut config: RunConfig,
        path: &Path,
        expected_features: Option<&[FeatureKind]>,
    ) -> Result<Self, PipelineError> {
        let artifact = ModelArtifact::load(path)?;

        if let Some(kinds) = expected_features {
            let expected = AudioConfig::from_kinds(kinds);
            if !expected.is_empty() && expected != artifact.audio_config {
                return Err(DatasetError::FeatureMismatch {
                    path: path.to_path_buf(),
                    expected: artifact.feature_dim,
                    actual: expected.dimension(),
                }
                .into());
            }
        }
        config.features = artifact.audio_config.enabled_kinds();

        log::info!(
            "[Pipeline] Restored {} ({} dims) from {}",
            artifact.classifier.name(),
            artifact.feature_dim,
            path.display()
        );
        let mut pipeline = Pipeline::new(config);
        pipeline.extractor = Some(FeatureExtractor::new(artifact.audio_config)?);
        pipeline.prepared = Some(Prepared {
            emotions: artifact.emotions,
            audio_config: artifact.audio_config,
            tables: Vec::new(),
        });
        pipeline.classifier = artifact.classifier;
        pipeline.stage = PipelineStage::Trained;
        Ok(pipeline)
    }

    /// Write the portable inference package
    ///
    /// Failures are logged and returned as `ExportFailed`; the persisted
    /// artifact is never modified.
    pub fn export_portable(&self, path: &Path) -> Result<PathBuf, PipelineError> {
        let result = self
            .artifact()
            .map_err(|err| PipelineError::ExportFailed {
                path: path.to_path_buf(),
                reason: err.message(),
            })
            .and_then(|artifact| PortableModel::from_artifact(&artifact).write(path));
        if let Err(err) = &result {
            log_pipeline_error(err, "export_portable");
        }
        result
    }
}

fn retain_emotions(rows: Vec<AudioSample>, emotions: &[Emotion]) -> Vec<AudioSample> {
    let before = rows.len();
    let kept: Vec<AudioSample> = rows
        .into_iter()
        .filter(|row| emotions.contains(&row.emotion))
        .collect();
    if kept.len() < before {
        log::debug!(
            "[Pipeline] Ignored {} table rows outside the run emotions",
            before - kept.len()
        );
    }
    kept
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
