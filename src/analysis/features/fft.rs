// FFT module - short-time Fourier transform
//
// This module frames the decoded waveform, applies a Hann window to reduce
// spectral leakage and computes magnitude spectra for every frame. The
// spectrogram is shared by all spectral feature kinds.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// STFT frame size in samples
pub const FRAME_SIZE: usize = 2048;

/// Hop between consecutive frames in samples
pub const HOP_SIZE: usize = 512;

/// Number of non-negative frequency bins per frame
pub const N_BINS: usize = FRAME_SIZE / 2 + 1;

/// Magnitude spectrogram (frames x bins)
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
}

impl Spectrogram {
    /// Power spectrogram derived from the magnitudes
    pub fn power(&self) -> Vec<Vec<f32>> {
        self.frames
            .iter()
            .map(|frame| frame.iter().map(|mag| mag * mag).collect())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// STFT processor with a pre-planned FFT
///
/// The plan is immutable after construction so a single processor can be
/// shared across extraction workers.
pub struct StftProcessor {
    fft: Arc<dyn Fft<f32>>,
    frame_size: usize,
    hop_size: usize,
    /// Hann window (pre-computed)
    window: Vec<f32>,
}

impl StftProcessor {
    /// Create a new STFT processor
    ///
    /// # Arguments
    /// * `frame_size` - FFT window size
    /// * `hop_size` - Samples between frame starts
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        let window = (0..frame_size)
            .map(|i| {
                0.5 * (1.0
                    - ((2.0 * std::f32::consts::PI * i as f32) / (frame_size as f32 - 1.0)).cos())
            })
            .collect();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);

        Self {
            fft,
            frame_size,
            hop_size,
            window,
        }
    }

    /// Compute the magnitude spectrogram of a signal
    ///
    /// Signals shorter than one frame are zero-padded to exactly one frame,
    /// so the result always has at least one frame.
    pub fn spectrogram(&self, signal: &[f32]) -> Spectrogram {
        let n_frames = if signal.len() <= self.frame_size {
            1
        } else {
            1 + (signal.len() - self.frame_size) / self.hop_size
        };

        let frames = (0..n_frames)
            .map(|frame_idx| {
                let start = frame_idx * self.hop_size;
                let end = (start + self.frame_size).min(signal.len());
                self.magnitude_spectrum(&signal[start.min(end)..end])
            })
            .collect();

        Spectrogram { frames }
    }

    /// Magnitude spectrum of one (possibly short) frame
    fn magnitude_spectrum(&self, audio: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = Vec::with_capacity(self.frame_size);

        for (i, &sample) in audio.iter().take(self.frame_size).enumerate() {
            buffer.push(Complex::new(sample * self.window[i], 0.0));
        }

        // Pad with zeros if needed
        buffer.resize(self.frame_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer[..self.frame_size / 2 + 1]
            .iter()
            .map(|c| c.norm())
            .collect()
    }
}

impl Default for StftProcessor {
    fn default() -> Self {
        Self::new(FRAME_SIZE, HOP_SIZE)
    }
}
