// Dataset indexer - discovers labeled audio per source and caches metadata tables

use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::Emotion;
use crate::dataset::metadata::write_table;
use crate::dataset::{AudioSample, SourceDataset};
use crate::error::DatasetError;

/// Share of EmoDB rows (after filtering, in path order) used for training
const EMODB_TRAIN_FRACTION: f64 = 0.8;

/// Discovered rows for one source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexedSplits {
    pub train: Vec<AudioSample>,
    pub test: Vec<AudioSample>,
}

/// Locations of a source's train/test metadata tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTables {
    pub train: PathBuf,
    pub test: PathBuf,
}

impl MetadataTables {
    /// `train_<name>.csv` / `test_<name>.csv` inside `metadata_dir`
    pub fn for_name(metadata_dir: &Path, name: &str) -> Self {
        let stem = name.strip_suffix(".csv").unwrap_or(name);
        Self {
            train: metadata_dir.join(format!("train_{stem}.csv")),
            test: metadata_dir.join(format!("test_{stem}.csv")),
        }
    }

    pub fn exist(&self) -> bool {
        self.train.is_file() && self.test.is_file()
    }
}

/// Discovers audio files under a data root and writes metadata tables
pub struct DatasetIndexer {
    data_root: PathBuf,
    metadata_dir: PathBuf,
}

impl DatasetIndexer {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(data_root: P, metadata_dir: Q) -> Self {
        Self {
            data_root: data_root.into(),
            metadata_dir: metadata_dir.into(),
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    /// Discover train/test rows for a source, keeping only `emotions`
    ///
    /// Missing directories yield no rows. Files are visited in path order so
    /// repeated runs produce identical tables.
    pub fn discover(
        &self,
        source: SourceDataset,
        emotions: &[Emotion],
    ) -> Result<IndexedSplits, DatasetError> {
        let splits = match source {
            SourceDataset::TessRavdess => IndexedSplits {
                train: self.discover_actor_dirs(&self.data_root.join("training"), emotions)?,
                test: self.discover_actor_dirs(&self.data_root.join("validation"), emotions)?,
            },
            SourceDataset::Emodb => self.discover_emodb(emotions)?,
            SourceDataset::Custom => IndexedSplits {
                train: suffix_labeled(
                    &self.data_root.join("train-custom"),
                    source,
                    emotions,
                )?,
                test: suffix_labeled(&self.data_root.join("test-custom"), source, emotions)?,
            },
        };

        log::info!(
            "[Indexer] {}: {} train / {} test rows",
            source,
            splits.train.len(),
            splits.test.len()
        );
        Ok(splits)
    }

    /// Make sure a source's tables exist, regenerating them when asked to
    ///
    /// Existing tables are reused untouched unless `override_existing` is set.
    pub fn ensure_tables(
        &self,
        source: SourceDataset,
        name: &str,
        emotions: &[Emotion],
        override_existing: bool,
    ) -> Result<MetadataTables, DatasetError> {
        let tables = MetadataTables::for_name(&self.metadata_dir, name);
        if tables.exist() && !override_existing {
            log::info!(
                "[Indexer] Reusing {} and {}",
                tables.train.display(),
                tables.test.display()
            );
            return Ok(tables);
        }

        let splits = self.discover(source, emotions)?;
        write_table(&tables.train, &splits.train)?;
        write_table(&tables.test, &splits.test)?;
        Ok(tables)
    }

    fn discover_actor_dirs(
        &self,
        split_root: &Path,
        emotions: &[Emotion],
    ) -> Result<Vec<AudioSample>, DatasetError> {
        let mut samples = Vec::new();
        for dir in sorted_entries(split_root)? {
            let is_actor = dir
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("Actor_"));
            if is_actor && dir.is_dir() {
                samples.extend(suffix_labeled(&dir, SourceDataset::TessRavdess, emotions)?);
            }
        }
        Ok(samples)
    }

    fn discover_emodb(&self, emotions: &[Emotion]) -> Result<IndexedSplits, DatasetError> {
        let wav_dir = self.data_root.join("emodb").join("wav");
        let mut samples = Vec::new();
        for path in wav_files(&wav_dir)? {
            let code = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.chars().nth(5));
            match code.and_then(emodb_emotion) {
                Some(emotion) if emotions.contains(&emotion) => {
                    samples.push(AudioSample::new(path, emotion, SourceDataset::Emodb));
                }
                Some(_) => {}
                None => log::debug!("[Indexer] No EmoDB label in {}", path.display()),
            }
        }

        let n_train = (samples.len() as f64 * EMODB_TRAIN_FRACTION).floor() as usize;
        let test = samples.split_off(n_train);
        Ok(IndexedSplits {
            train: samples,
            test,
        })
    }
}

/// EmoDB emotion letter (German initial) to label
pub fn emodb_emotion(code: char) -> Option<Emotion> {
    match code {
        'W' => Some(Emotion::Angry),
        'L' => Some(Emotion::Boredom),
        'E' => Some(Emotion::Disgust),
        'A' => Some(Emotion::Fearful),
        'F' => Some(Emotion::Happy),
        'T' => Some(Emotion::Sad),
        'N' => Some(Emotion::Neutral),
        _ => None,
    }
}

/// Label carried after the last `_` of a file stem (`03-01_sad` -> sad)
pub fn suffix_emotion(path: &Path) -> Option<Emotion> {
    let stem = path.file_stem()?.to_str()?;
    let (_, suffix) = stem.rsplit_once('_')?;
    suffix.parse().ok()
}

fn suffix_labeled(
    dir: &Path,
    source: SourceDataset,
    emotions: &[Emotion],
) -> Result<Vec<AudioSample>, DatasetError> {
    let mut samples = Vec::new();
    for path in wav_files(dir)? {
        match suffix_emotion(&path) {
            Some(emotion) if emotions.contains(&emotion) => {
                samples.push(AudioSample::new(path, emotion, source));
            }
            Some(_) => {}
            None => log::debug!("[Indexer] No label suffix in {}", path.display()),
        }
    }
    Ok(samples)
}

/// Directory entries sorted by path; a missing directory is empty
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    if !dir.exists() {
        log::debug!("[Indexer] {} does not exist, skipping", dir.display());
        return Ok(Vec::new());
    }

    let read_err = |err: std::io::Error| DatasetError::Metadata {
        path: dir.to_path_buf(),
        reason: format!("failed to list directory: {err}"),
    };
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        entries.push(entry.map_err(read_err)?.path());
    }
    entries.sort();
    Ok(entries)
}

fn wav_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    Ok(sorted_entries(dir)?
        .into_iter()
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .collect())
}
