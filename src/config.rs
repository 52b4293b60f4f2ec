//! Run configuration for the training pipeline
//!
//! A run is described by a single JSON document (every field optional,
//! missing fields take their defaults) that the CLI can further override
//! with flags. Emotion names stay as strings here and are validated when
//! the pipeline is prepared.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::classifier::{ClassifierKind, ClassifierModel, DEFAULT_K};
use crate::analysis::features::{AudioConfig, FeatureKind};
use crate::analysis::Emotion;
use crate::dataset::{AssemblyOptions, SourceDataset};
use crate::error::PipelineError;

/// Which source datasets take part in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub tess_ravdess: bool,
    pub emodb: bool,
    pub custom: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            tess_ravdess: true,
            emodb: true,
            custom: true,
        }
    }
}

/// Metadata table names per source (`train_<name>.csv` / `test_<name>.csv`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetNames {
    pub tess_ravdess: String,
    pub emodb: String,
    pub custom: String,
}

impl Default for DatasetNames {
    fn default() -> Self {
        Self {
            tess_ravdess: SourceDataset::TessRavdess.default_name().to_string(),
            emodb: SourceDataset::Emodb.default_name().to_string(),
            custom: SourceDataset::Custom.default_name().to_string(),
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Emotion subset to train on (validated at prepare time)
    pub emotions: Vec<String>,
    /// Feature kinds; concatenation order is canonical regardless of this order
    pub features: Vec<FeatureKind>,
    pub sources: SourcesConfig,
    pub dataset_names: DatasetNames,
    /// Downsample each split to its rarest label
    pub balance: bool,
    pub shuffle: bool,
    pub seed: u64,
    /// Regenerate metadata tables even when they already exist
    pub override_metadata: bool,
    /// Abort assembly on the first undecodable file instead of skipping it
    pub strict_decode: bool,
    pub data_root: PathBuf,
    pub metadata_dir: PathBuf,
    /// Directory receiving the persisted and portable model files
    pub model_dir: PathBuf,
    pub classifier: ClassifierKind,
    /// Neighbour count when `classifier` is knn
    pub knn_k: usize,
    pub verbose: bool,
    pub debug: bool,
}

impl Default for RunConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            emotions: vec!["sad".to_string(), "happy".to_string()],
            features: vec![FeatureKind::Mfcc, FeatureKind::Chroma, FeatureKind::Mel],
            sources: SourcesConfig::default(),
            dataset_names: DatasetNames::default(),
            balance: true,
            shuffle: true,
            seed: 42,
            override_metadata: true,
            strict_decode: false,
            data_root: PathBuf::from("data"),
            metadata_dir: PathBuf::from("."),
            model_dir: PathBuf::from("."),
            classifier: ClassifierKind::default(),
            knn_k: DEFAULT_K,
            verbose: true,
            debug: false,
        }
    }
}

impl RunConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults when the file is missing or
    /// invalid (a warning is logged).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Validated emotion subset, deduplicated in configured order
    pub fn emotion_subset(&self) -> Result<Vec<Emotion>, PipelineError> {
        let emotions = Emotion::parse_subset(&self.emotions)?;
        if emotions.is_empty() {
            return Err(PipelineError::Config {
                reason: "no emotions selected".to_string(),
            });
        }
        Ok(emotions)
    }

    /// Audio config derived from the feature list
    pub fn audio_config(&self) -> Result<AudioConfig, PipelineError> {
        let config = AudioConfig::from_kinds(&self.features);
        if config.is_empty() {
            return Err(PipelineError::Config {
                reason: "no feature kinds selected".to_string(),
            });
        }
        Ok(config)
    }

    /// Enabled sources with their metadata names, in fixed source order
    pub fn enabled_sources(&self) -> Vec<(SourceDataset, &str)> {
        SourceDataset::ALL
            .into_iter()
            .filter_map(|source| match source {
                SourceDataset::TessRavdess => self
                    .sources
                    .tess_ravdess
                    .then_some((source, self.dataset_names.tess_ravdess.as_str())),
                SourceDataset::Emodb => self
                    .sources
                    .emodb
                    .then_some((source, self.dataset_names.emodb.as_str())),
                SourceDataset::Custom => self
                    .sources
                    .custom
                    .then_some((source, self.dataset_names.custom.as_str())),
            })
            .collect()
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            balance: self.balance,
            shuffle: self.shuffle,
            seed: self.seed,
            strict_decode: self.strict_decode,
        }
    }

    /// Unfitted classifier of the configured kind
    pub fn build_classifier(&self) -> ClassifierModel {
        ClassifierModel::new(self.classifier, self.knn_k)
    }

    /// `Speechrec_<Classifier>.json` inside the model directory
    pub fn model_path(&self, classifier_name: &str) -> PathBuf {
        self.model_dir.join(format!("Speechrec_{classifier_name}.json"))
    }

    /// `MLSpeech_<Classifier>.json` inside the model directory
    pub fn portable_model_path(&self, classifier_name: &str) -> PathBuf {
        self.model_dir.join(format!("MLSpeech_{classifier_name}.json"))
    }
}
