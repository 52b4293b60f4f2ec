// Dataset module - labeled audio discovery and train/test assembly
//
// Module organization:
// - metadata: `path,emotion` CSV tables
// - indexer: per-source file discovery and table caching
// - assembler: feature extraction, balancing and shuffling per split

pub mod assembler;
pub mod indexer;
pub mod metadata;

pub use assembler::{AssembledDataset, AssemblyOptions, AssemblyReport, DatasetAssembler, SplitData};
pub use indexer::{DatasetIndexer, IndexedSplits, MetadataTables};
pub use metadata::{read_table, write_table};

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analysis::Emotion;

/// Source datasets, each with its own directory layout and label convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDataset {
    /// TESS + RAVDESS: `training|validation/Actor_*/*_<emotion>.wav`
    TessRavdess,
    /// Berlin EmoDB: `emodb/wav/*.wav`, label coded in the file name
    Emodb,
    /// User recordings: `train-custom|test-custom/*_<emotion>.wav`
    Custom,
}

impl SourceDataset {
    pub const ALL: [SourceDataset; 3] = [
        SourceDataset::TessRavdess,
        SourceDataset::Emodb,
        SourceDataset::Custom,
    ];

    /// Default metadata name (`train_<name>.csv` / `test_<name>.csv`)
    pub fn default_name(&self) -> &'static str {
        match self {
            SourceDataset::TessRavdess => "tess_ravdess",
            SourceDataset::Emodb => "emodb",
            SourceDataset::Custom => "custom",
        }
    }
}

impl fmt::Display for SourceDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_name())
    }
}

/// Train or test side of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    /// Offset added to the run seed so each split draws its own sequence
    pub fn seed_offset(&self) -> u64 {
        match self {
            Split::Train => 0,
            Split::Test => 1,
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled audio file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSample {
    pub path: PathBuf,
    pub emotion: Emotion,
    pub source: SourceDataset,
}

impl AudioSample {
    pub fn new(path: impl Into<PathBuf>, emotion: Emotion, source: SourceDataset) -> Self {
        Self {
            path: path.into(),
            emotion,
            source,
        }
    }
}
