// FeatureExtractor - fixed-length acoustic feature vectors for emotion classification
//
// This module turns one decoded speech clip into a feature vector whose
// layout is determined entirely by the AudioConfig. Every enabled kind is
// computed per STFT frame and averaged across frames, so clip duration never
// changes the vector length.
//
// Module organization:
// - types: FeatureKind, AudioConfig and per-kind dimensionalities
// - decode: WAV decoding to mono f32
// - fft: STFT with Hann windowing
// - spectral: mel, MFCC, chroma, contrast and tonnetz frame descriptors
// - mod.rs: Coordinator (FeatureExtractor)

mod decode;
mod fft;
mod spectral;
mod types;

pub use decode::{read_wav, DecodedAudio};
pub use types::{
    AudioConfig, FeatureKind, N_CHROMA, N_CONTRAST_BANDS, N_MELS, N_MFCC, N_TONNETZ,
};

use std::path::Path;

use fft::{StftProcessor, FRAME_SIZE};
use spectral::SpectralFeatures;

use crate::error::FeatureError;

/// Fixed-length ordered feature values for one clip
pub type FeatureVector = Vec<f32>;

/// FeatureExtractor coordinates decoding, STFT and per-kind descriptors
///
/// The STFT plan is shared; the spectral tables depend on the clip's sample
/// rate and are built per call.
pub struct FeatureExtractor {
    config: AudioConfig,
    stft: StftProcessor,
}

impl FeatureExtractor {
    /// Create an extractor for an audio config
    ///
    /// # Returns
    /// * `Err(FeatureError::EmptyConfig)` - No feature kind is enabled
    pub fn new(config: AudioConfig) -> Result<Self, FeatureError> {
        if config.is_empty() {
            return Err(FeatureError::EmptyConfig);
        }
        Ok(Self {
            config,
            stft: StftProcessor::default(),
        })
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Length of every vector this extractor produces
    pub fn dimension(&self) -> usize {
        self.config.dimension()
    }

    /// Decode a file and extract its feature vector
    pub fn extract(&self, path: &Path) -> Result<FeatureVector, FeatureError> {
        let audio = read_wav(path)?;
        log::debug!(
            "[Features] {} -> {} samples @ {} Hz",
            path.display(),
            audio.samples.len(),
            audio.sample_rate
        );
        Ok(self.extract_samples(&audio.samples, audio.sample_rate))
    }

    /// Extract a feature vector from an in-memory mono waveform
    ///
    /// This method coordinates the entire feature extraction pipeline:
    /// 1. Compute the magnitude spectrogram (zero-padded to one frame minimum)
    /// 2. Compute each enabled descriptor per frame
    /// 3. Average every descriptor across frames
    /// 4. Concatenate in canonical kind order
    pub fn extract_samples(&self, samples: &[f32], sample_rate: u32) -> FeatureVector {
        let spectrogram = self.stft.spectrogram(samples);
        let spectral = SpectralFeatures::new(sample_rate, FRAME_SIZE);
        let mut vector = Vec::with_capacity(self.dimension());

        let needs_mel = self.config.mfcc || self.config.mel;
        let mel_frames: Vec<Vec<f32>> = if needs_mel {
            spectrogram
                .power()
                .iter()
                .map(|frame| spectral.compute_mel(frame))
                .collect()
        } else {
            Vec::new()
        };

        let needs_chroma = self.config.chroma || self.config.tonnetz;
        let chroma_frames: Vec<Vec<f32>> = if needs_chroma {
            spectrogram
                .frames
                .iter()
                .map(|frame| spectral.compute_chroma(frame))
                .collect()
        } else {
            Vec::new()
        };

        for kind in self.config.enabled_kinds() {
            let frames: Vec<Vec<f32>> = match kind {
                FeatureKind::Mfcc => spectral.compute_mfcc(&mel_frames),
                FeatureKind::Chroma => chroma_frames.clone(),
                FeatureKind::Mel => mel_frames.clone(),
                FeatureKind::Contrast => spectrogram
                    .frames
                    .iter()
                    .map(|frame| spectral.compute_contrast(frame))
                    .collect(),
                FeatureKind::Tonnetz => chroma_frames
                    .iter()
                    .map(|chroma| spectral.compute_tonnetz(chroma))
                    .collect(),
            };
            vector.extend(mean_over_frames(&frames, kind.dimension()));
        }

        vector
    }
}

/// Column means of a frames x dims matrix
fn mean_over_frames(frames: &[Vec<f32>], dims: usize) -> Vec<f32> {
    let mut sums = vec![0.0f64; dims];
    for frame in frames {
        for (sum, &value) in sums.iter_mut().zip(frame) {
            *sum += value as f64;
        }
    }
    let count = frames.len().max(1) as f64;
    sums.into_iter().map(|sum| (sum / count) as f32).collect()
}

/// Extract one file's feature vector under an audio config
///
/// Convenience wrapper for one-off extraction; batch callers should reuse a
/// `FeatureExtractor`.
pub fn extract(path: &Path, config: &AudioConfig) -> Result<FeatureVector, FeatureError> {
    FeatureExtractor::new(*config)?.extract(path)
}
