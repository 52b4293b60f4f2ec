// Types module - feature kinds and the audio config that selects them
//
// The audio config fully determines the feature-vector layout: each enabled
// kind contributes a fixed number of values and kinds are always
// concatenated in canonical order (mfcc, chroma, mel, contrast, tonnetz).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of MFCC coefficients kept per frame
pub const N_MFCC: usize = 40;

/// Number of pitch classes in a chroma vector
pub const N_CHROMA: usize = 12;

/// Number of mel bands
pub const N_MELS: usize = 128;

/// Number of spectral contrast octave bands (plus one residual band)
pub const N_CONTRAST_BANDS: usize = 6;

/// Tonal centroid dimensions (fifths, minor thirds, major thirds; x/y each)
pub const N_TONNETZ: usize = 6;

/// Acoustic descriptor family with a fixed output dimensionality
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Mfcc,
    Chroma,
    Mel,
    Contrast,
    Tonnetz,
}

impl FeatureKind {
    /// Canonical concatenation order
    pub const ORDERED: [FeatureKind; 5] = [
        FeatureKind::Mfcc,
        FeatureKind::Chroma,
        FeatureKind::Mel,
        FeatureKind::Contrast,
        FeatureKind::Tonnetz,
    ];

    /// Values contributed to the feature vector
    pub fn dimension(&self) -> usize {
        match self {
            FeatureKind::Mfcc => N_MFCC,
            FeatureKind::Chroma => N_CHROMA,
            FeatureKind::Mel => N_MELS,
            FeatureKind::Contrast => N_CONTRAST_BANDS + 1,
            FeatureKind::Tonnetz => N_TONNETZ,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Mfcc => "mfcc",
            FeatureKind::Chroma => "chroma",
            FeatureKind::Mel => "mel",
            FeatureKind::Contrast => "contrast",
            FeatureKind::Tonnetz => "tonnetz",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enabled feature kinds for a run
///
/// Two configs with the same flags always produce vectors of the same
/// length and layout, whatever order the kinds were requested in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub mfcc: bool,
    #[serde(default)]
    pub chroma: bool,
    #[serde(default)]
    pub mel: bool,
    #[serde(default)]
    pub contrast: bool,
    #[serde(default)]
    pub tonnetz: bool,
}

impl AudioConfig {
    /// Build a config from a list of requested kinds
    pub fn from_kinds(kinds: &[FeatureKind]) -> Self {
        let mut config = Self::default();
        for kind in kinds {
            match kind {
                FeatureKind::Mfcc => config.mfcc = true,
                FeatureKind::Chroma => config.chroma = true,
                FeatureKind::Mel => config.mel = true,
                FeatureKind::Contrast => config.contrast = true,
                FeatureKind::Tonnetz => config.tonnetz = true,
            }
        }
        config
    }

    pub fn is_enabled(&self, kind: FeatureKind) -> bool {
        match kind {
            FeatureKind::Mfcc => self.mfcc,
            FeatureKind::Chroma => self.chroma,
            FeatureKind::Mel => self.mel,
            FeatureKind::Contrast => self.contrast,
            FeatureKind::Tonnetz => self.tonnetz,
        }
    }

    /// Enabled kinds in canonical order
    pub fn enabled_kinds(&self) -> Vec<FeatureKind> {
        FeatureKind::ORDERED
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled_kinds().is_empty()
    }

    /// Total feature-vector length
    pub fn dimension(&self) -> usize {
        self.enabled_kinds().iter().map(FeatureKind::dimension).sum()
    }

    /// Per-position names (`mfcc_0`, ..., `tonnetz_5`) matching the vector layout
    pub fn feature_names(&self) -> Vec<String> {
        self.enabled_kinds()
            .into_iter()
            .flat_map(|kind| (0..kind.dimension()).map(move |i| format!("{}_{}", kind, i)))
            .collect()
    }
}

impl fmt::Display for AudioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.enabled_kinds().iter().map(|k| k.as_str()).collect();
        write!(f, "[{}] ({} dims)", names.join(", "), self.dimension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_is_sum_of_kinds() {
        let config = AudioConfig::from_kinds(&[FeatureKind::Mfcc, FeatureKind::Chroma, FeatureKind::Mel]);
        assert_eq!(config.dimension(), 40 + 12 + 128);

        let all = AudioConfig::from_kinds(&FeatureKind::ORDERED);
        assert_eq!(all.dimension(), 193);
    }

    #[test]
    fn test_request_order_does_not_change_layout() {
        let a = AudioConfig::from_kinds(&[FeatureKind::Tonnetz, FeatureKind::Mfcc]);
        let b = AudioConfig::from_kinds(&[FeatureKind::Mfcc, FeatureKind::Tonnetz]);
        assert_eq!(a, b);
        assert_eq!(a.enabled_kinds(), vec![FeatureKind::Mfcc, FeatureKind::Tonnetz]);
    }

    #[test]
    fn test_feature_names_match_dimension() {
        let config = AudioConfig::from_kinds(&[FeatureKind::Chroma, FeatureKind::Contrast]);
        let names = config.feature_names();
        assert_eq!(names.len(), config.dimension());
        assert_eq!(names[0], "chroma_0");
        assert_eq!(names[12], "contrast_0");
        assert_eq!(names.last().map(String::as_str), Some("contrast_6"));
    }

    #[test]
    fn test_empty_config() {
        let config = AudioConfig::default();
        assert!(config.is_empty());
        assert_eq!(config.dimension(), 0);
    }
}
