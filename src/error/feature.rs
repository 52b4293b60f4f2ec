// Feature extraction error types and constants

use crate::error::ErrorCode;
use std::fmt;
use std::path::PathBuf;

/// Feature extraction error code constants
///
/// Error code range: 3001-3002
pub struct FeatureErrorCodes {}

impl FeatureErrorCodes {
    /// Audio file could not be opened or decoded
    pub const DECODE: i32 = 3001;

    /// Audio config selects no feature kinds
    pub const EMPTY_CONFIG: i32 = 3002;
}

/// Errors raised while turning one audio file into a feature vector
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureError {
    /// The file could not be decoded as audio
    Decode { path: PathBuf, reason: String },

    /// The audio config has no enabled feature kinds
    EmptyConfig,
}

impl ErrorCode for FeatureError {
    fn code(&self) -> i32 {
        match self {
            FeatureError::Decode { .. } => FeatureErrorCodes::DECODE,
            FeatureError::EmptyConfig => FeatureErrorCodes::EMPTY_CONFIG,
        }
    }

    fn message(&self) -> String {
        match self {
            FeatureError::Decode { path, reason } => {
                format!("Failed to decode {}: {}", path.display(), reason)
            }
            FeatureError::EmptyConfig => {
                "Audio config selects no feature kinds (enable at least one of mfcc, chroma, mel, contrast, tonnetz)".to_string()
            }
        }
    }
}

impl fmt::Display for FeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FeatureError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for FeatureError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_error_codes() {
        let decode = FeatureError::Decode {
            path: PathBuf::from("a.wav"),
            reason: "bad header".to_string(),
        };
        assert_eq!(decode.code(), 3001);
        assert_eq!(FeatureError::EmptyConfig.code(), 3002);
    }

    #[test]
    fn test_decode_message_names_path() {
        let err = FeatureError::Decode {
            path: PathBuf::from("data/training/Actor_01/x_sad.wav"),
            reason: "no RIFF tag found".to_string(),
        };
        assert!(err.message().contains("Actor_01/x_sad.wav"));
        assert!(err.to_string().contains("code 3001"));
    }
}
