// Metadata tables - `path,emotion` CSV files cached per source and split

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::Emotion;
use crate::dataset::{AudioSample, SourceDataset};
use crate::error::DatasetError;

#[derive(Debug, Serialize, Deserialize)]
struct TableRecord {
    path: String,
    emotion: String,
}

fn metadata_error(path: &Path, reason: impl Into<String>) -> DatasetError {
    DatasetError::Metadata {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Write samples as a `path,emotion` table, creating parent directories
pub fn write_table(path: &Path, samples: &[AudioSample]) -> Result<(), DatasetError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| metadata_error(path, format!("failed to create directory: {err}")))?;
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|err| metadata_error(path, format!("failed to create: {err}")))?;
    for sample in samples {
        writer
            .serialize(TableRecord {
                path: sample.path.to_string_lossy().into_owned(),
                emotion: sample.emotion.as_str().to_string(),
            })
            .map_err(|err| metadata_error(path, format!("failed to write row: {err}")))?;
    }
    writer
        .flush()
        .map_err(|err| metadata_error(path, format!("failed to flush: {err}")))?;

    log::debug!("[Metadata] Wrote {} rows to {}", samples.len(), path.display());
    Ok(())
}

/// Read a `path,emotion` table
///
/// Every label must belong to the emotion vocabulary; an unknown label is an
/// `UnknownEmotion` error rather than a silently dropped row.
pub fn read_table(path: &Path, source: SourceDataset) -> Result<Vec<AudioSample>, DatasetError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|err| metadata_error(path, format!("failed to open: {err}")))?;

    let mut samples = Vec::new();
    for (line, record) in reader.deserialize::<TableRecord>().enumerate() {
        let record = record
            .map_err(|err| metadata_error(path, format!("row {}: {err}", line + 1)))?;
        let emotion: Emotion = record.emotion.parse()?;
        samples.push(AudioSample::new(PathBuf::from(record.path), emotion, source));
    }
    Ok(samples)
}
