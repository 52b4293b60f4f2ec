// Dataset assembler - metadata rows to train/test feature matrices
//
// Assembly runs in a fixed order per dataset:
// 1. Reject any path present in both splits
// 2. Extract every row in parallel (rayon keeps row order)
// 3. Apply the decode policy (skip + warn, or abort at the earliest failing row)
// 4. Check that every vector has the dataset's dimension
// 5. Balance and shuffle each split with its own seeded RNG

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::analysis::features::{AudioConfig, FeatureExtractor, FeatureVector};
use crate::analysis::Emotion;
use crate::dataset::{AudioSample, Split};
use crate::error::DatasetError;

/// Balancing, shuffling and decode policy for one assembly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyOptions {
    pub balance: bool,
    pub shuffle: bool,
    pub seed: u64,
    pub strict_decode: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            balance: true,
            shuffle: true,
            seed: 42,
            strict_decode: false,
        }
    }
}

/// Row-aligned features, labels and source paths of one split
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitData {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<Emotion>,
    pub paths: Vec<PathBuf>,
}

impl SplitData {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows per label, in emotion order
    pub fn label_counts(&self) -> BTreeMap<Emotion, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(*label).or_insert(0) += 1;
        }
        counts
    }

    fn push(&mut self, features: FeatureVector, label: Emotion, path: PathBuf) {
        self.features.push(features);
        self.labels.push(label);
        self.paths.push(path);
    }

    /// Keep only the rows at `indices`, in the given order
    fn select(self, indices: &[usize]) -> SplitData {
        let mut features: Vec<Option<FeatureVector>> =
            self.features.into_iter().map(Some).collect();
        let mut selected = SplitData::default();
        for &idx in indices {
            if let Some(vector) = features[idx].take() {
                selected.push(vector, self.labels[idx], self.paths[idx].clone());
            }
        }
        selected
    }
}

/// Downsample every label present to the rarest label's count
///
/// Kept rows are chosen at random and retain their relative order, so
/// balancing an already balanced split returns it unchanged.
pub fn balance(data: SplitData, rng: &mut StdRng) -> SplitData {
    let counts = data.label_counts();
    let Some(&target) = counts.values().min() else {
        return data;
    };

    let mut keep = vec![false; data.len()];
    for label in counts.keys() {
        let mut indices: Vec<usize> = data
            .labels
            .iter()
            .enumerate()
            .filter(|(_, l)| *l == label)
            .map(|(i, _)| i)
            .collect();
        indices.shuffle(rng);
        for &idx in indices.iter().take(target) {
            keep[idx] = true;
        }
    }

    let kept: Vec<usize> = (0..data.len()).filter(|&i| keep[i]).collect();
    data.select(&kept)
}

/// Jointly permute features, labels and paths
pub fn shuffle(data: SplitData, rng: &mut StdRng) -> SplitData {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.shuffle(rng);
    data.select(&order)
}

/// Per-split outcome counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitReport {
    pub indexed: usize,
    pub skipped: usize,
    pub dropped_by_balance: usize,
    pub label_counts: BTreeMap<Emotion, usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyReport {
    pub train: SplitReport,
    pub test: SplitReport,
}

/// Assembled train/test splits plus the report describing how they were built
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledDataset {
    pub train: SplitData,
    pub test: SplitData,
    pub report: AssemblyReport,
}

impl AssembledDataset {
    pub fn feature_dimension(&self) -> usize {
        self.train.features.first().map(Vec::len).unwrap_or(0)
    }
}

/// Builds feature matrices from metadata rows
pub struct DatasetAssembler {
    extractor: FeatureExtractor,
    options: AssemblyOptions,
}

impl DatasetAssembler {
    pub fn new(audio_config: AudioConfig, options: AssemblyOptions) -> Result<Self, DatasetError> {
        Ok(Self {
            extractor: FeatureExtractor::new(audio_config)?,
            options,
        })
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    pub fn assemble(
        &self,
        train_rows: &[AudioSample],
        test_rows: &[AudioSample],
    ) -> Result<AssembledDataset, DatasetError> {
        check_disjoint(train_rows, test_rows)?;

        let (train, train_skipped) = self.extract_split(train_rows)?;
        let (test, test_skipped) = self.extract_split(test_rows)?;

        let expected = train
            .features
            .first()
            .or(test.features.first())
            .map(Vec::len)
            .unwrap_or_else(|| self.extractor.dimension());
        for split in [&train, &test] {
            for (vector, path) in split.features.iter().zip(&split.paths) {
                if vector.len() != expected {
                    return Err(DatasetError::FeatureMismatch {
                        path: path.clone(),
                        expected,
                        actual: vector.len(),
                    });
                }
            }
        }

        let (train, train_report) =
            self.finish_split(Split::Train, train, train_rows.len(), train_skipped)?;
        let (test, test_report) =
            self.finish_split(Split::Test, test, test_rows.len(), test_skipped)?;

        let report = AssemblyReport {
            train: train_report,
            test: test_report,
        };
        log::info!(
            "[Assembler] train: {} rows {:?}, test: {} rows {:?}, dimension {}",
            train.len(),
            report.train.label_counts,
            test.len(),
            report.test.label_counts,
            expected
        );

        Ok(AssembledDataset {
            train,
            test,
            report,
        })
    }

    /// Extract all rows of a split, returning the data and the skip count
    ///
    /// In strict mode the lowest failing row index is tracked across
    /// workers; rows after it are not decoded, and the error reported is
    /// always the one of the earliest failing row.
    fn extract_split(&self, rows: &[AudioSample]) -> Result<(SplitData, usize), DatasetError> {
        let strict = self.options.strict_decode;
        let first_failure = AtomicUsize::new(usize::MAX);

        let results: Vec<Option<_>> = rows
            .par_iter()
            .enumerate()
            .map(|(index, row)| {
                if strict && index > first_failure.load(Ordering::Relaxed) {
                    return None;
                }
                let result = self.extractor.extract(&row.path);
                if strict && result.is_err() {
                    first_failure.fetch_min(index, Ordering::Relaxed);
                }
                Some(result)
            })
            .collect();

        let mut data = SplitData::default();
        let mut skipped = 0;
        for (row, result) in rows.iter().zip(results) {
            // Only rows after a strict failure are abandoned
            let Some(result) = result else { continue };
            match result {
                Ok(vector) => data.push(vector, row.emotion, row.path.clone()),
                Err(err) if strict => return Err(err.into()),
                Err(err) => {
                    tracing::warn!("[Assembler] Skipping {}: {}", row.path.display(), err);
                    skipped += 1;
                }
            }
        }
        Ok((data, skipped))
    }

    fn finish_split(
        &self,
        split: Split,
        data: SplitData,
        indexed: usize,
        skipped: usize,
    ) -> Result<(SplitData, SplitReport), DatasetError> {
        let mut rng = StdRng::seed_from_u64(self.options.seed.wrapping_add(split.seed_offset()));

        let before = data.len();
        let data = if self.options.balance {
            balance(data, &mut rng)
        } else {
            data
        };
        let dropped_by_balance = before - data.len();
        let data = if self.options.shuffle {
            shuffle(data, &mut rng)
        } else {
            data
        };

        if data.is_empty() {
            return Err(DatasetError::EmptyDataset {
                split: split.as_str().to_string(),
            });
        }

        let report = SplitReport {
            indexed,
            skipped,
            dropped_by_balance,
            label_counts: data.label_counts(),
        };
        Ok((data, report))
    }
}

/// Fail on the first test path that also appears in train
fn check_disjoint(train_rows: &[AudioSample], test_rows: &[AudioSample]) -> Result<(), DatasetError> {
    let train_paths: HashSet<&PathBuf> = train_rows.iter().map(|row| &row.path).collect();
    match test_rows.iter().find(|row| train_paths.contains(&row.path)) {
        Some(row) => Err(DatasetError::SplitOverlap {
            path: row.path.clone(),
        }),
        None => Ok(()),
    }
}
