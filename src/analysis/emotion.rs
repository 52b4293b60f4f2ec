// Emotion - closed label vocabulary shared by every pipeline stage

use crate::error::DatasetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Emotion labels recognized by the pipeline
///
/// The vocabulary is fixed; a run selects a subset. Dataset-specific
/// spellings ("fear", "ps") are accepted as aliases when parsing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Calm,
    Happy,
    Sad,
    Angry,
    #[serde(alias = "fear")]
    Fearful,
    Disgust,
    #[serde(alias = "ps")]
    Surprised,
    Boredom,
}

impl Emotion {
    /// Full vocabulary in canonical order
    pub const ALL: [Emotion; 9] = [
        Emotion::Neutral,
        Emotion::Calm,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgust,
        Emotion::Surprised,
        Emotion::Boredom,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Calm => "calm",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fearful => "fearful",
            Emotion::Disgust => "disgust",
            Emotion::Surprised => "surprised",
            Emotion::Boredom => "boredom",
        }
    }

    /// Parse and validate a requested subset
    ///
    /// Duplicates are dropped while keeping first-seen order, which is the
    /// order used for confusion-matrix rows and columns.
    pub fn parse_subset<S: AsRef<str>>(labels: &[S]) -> Result<Vec<Emotion>, DatasetError> {
        let mut emotions = Vec::with_capacity(labels.len());
        for label in labels {
            let emotion: Emotion = label.as_ref().parse()?;
            if !emotions.contains(&emotion) {
                emotions.push(emotion);
            }
        }
        Ok(emotions)
    }
}

impl FromStr for Emotion {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neutral" => Ok(Emotion::Neutral),
            "calm" => Ok(Emotion::Calm),
            "happy" => Ok(Emotion::Happy),
            "sad" => Ok(Emotion::Sad),
            "angry" => Ok(Emotion::Angry),
            "fearful" | "fear" => Ok(Emotion::Fearful),
            "disgust" => Ok(Emotion::Disgust),
            "surprised" | "ps" => Ok(Emotion::Surprised),
            "boredom" => Ok(Emotion::Boredom),
            _ => Err(DatasetError::UnknownEmotion {
                label: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
