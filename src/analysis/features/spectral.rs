// Spectral module - frame-level descriptors computed from the STFT
//
// All descriptors take one magnitude (or power) frame and return a fixed
// number of values. Averaging across frames happens in the coordinator.
//
// References:
// - Slaney, M. (1998). Auditory Toolbox (mel scale, filter normalization)
// - Jiang, D. et al. (2002). Music type classification by spectral contrast
// - Harte, C. et al. (2006). Detecting harmonic change in musical audio (tonnetz)

use super::types::{N_CHROMA, N_CONTRAST_BANDS, N_MELS, N_MFCC, N_TONNETZ};

/// Floor applied before taking logarithms
const AMIN: f32 = 1e-10;

/// Dynamic range kept by the dB conversion used for MFCCs
const TOP_DB: f32 = 80.0;

/// Lowest edge of the first spectral contrast band (Hz)
const CONTRAST_FMIN: f32 = 200.0;

/// Fraction of bins averaged for contrast peaks/valleys
const CONTRAST_QUANTILE: f32 = 0.02;

/// Lowest frequency mapped onto a pitch class (A0)
const CHROMA_FMIN: f32 = 27.5;

fn hz_to_mel(hz: f32) -> f32 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = (6.4f32).ln() / 27.0;
    if hz >= min_log_hz {
        min_log_mel + (hz / min_log_hz).ln() / logstep
    } else {
        hz / f_sp
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = (6.4f32).ln() / 27.0;
    if mel >= min_log_mel {
        min_log_hz * (logstep * (mel - min_log_mel)).exp()
    } else {
        f_sp * mel
    }
}

/// Frame-level spectral descriptors for one sample rate
pub struct SpectralFeatures {
    /// Mel filter weights (N_MELS x bins), area-normalized
    mel_basis: Vec<Vec<f32>>,
    /// Orthonormal DCT-II rows (N_MFCC x N_MELS)
    dct_basis: Vec<Vec<f32>>,
    /// Pitch class per frequency bin (None below CHROMA_FMIN)
    chroma_map: Vec<Option<usize>>,
    /// Inclusive bin ranges for each contrast band
    contrast_bands: Vec<Option<(usize, usize)>>,
}

impl SpectralFeatures {
    /// Create descriptor tables for a sample rate and FFT size
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `fft_size` - FFT window size
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        let n_bins = fft_size / 2 + 1;
        let bin_width = sample_rate as f32 / fft_size as f32;
        let bin_freqs: Vec<f32> = (0..n_bins).map(|i| i as f32 * bin_width).collect();

        Self {
            mel_basis: Self::build_mel_basis(sample_rate, &bin_freqs),
            dct_basis: Self::build_dct_basis(),
            chroma_map: Self::build_chroma_map(&bin_freqs),
            contrast_bands: Self::build_contrast_bands(sample_rate, &bin_freqs),
        }
    }

    fn build_mel_basis(sample_rate: u32, bin_freqs: &[f32]) -> Vec<Vec<f32>> {
        let fmax = sample_rate as f32 / 2.0;
        let mel_max = hz_to_mel(fmax);
        let mel_points: Vec<f32> = (0..N_MELS + 2)
            .map(|i| mel_to_hz(mel_max * i as f32 / (N_MELS + 1) as f32))
            .collect();

        (0..N_MELS)
            .map(|m| {
                let (lower, center, upper) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
                let enorm = 2.0 / (upper - lower);
                bin_freqs
                    .iter()
                    .map(|&f| {
                        let rising = (f - lower) / (center - lower);
                        let falling = (upper - f) / (upper - center);
                        rising.min(falling).max(0.0) * enorm
                    })
                    .collect()
            })
            .collect()
    }

    fn build_dct_basis() -> Vec<Vec<f32>> {
        let n = N_MELS as f32;
        (0..N_MFCC)
            .map(|k| {
                let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
                (0..N_MELS)
                    .map(|i| {
                        scale
                            * (std::f32::consts::PI * k as f32 * (2.0 * i as f32 + 1.0) / (2.0 * n))
                                .cos()
                    })
                    .collect()
            })
            .collect()
    }

    fn build_chroma_map(bin_freqs: &[f32]) -> Vec<Option<usize>> {
        bin_freqs
            .iter()
            .map(|&f| {
                if f < CHROMA_FMIN {
                    return None;
                }
                let midi = 69.0 + 12.0 * (f / 440.0).log2();
                Some((midi.round() as i64).rem_euclid(N_CHROMA as i64) as usize)
            })
            .collect()
    }

    fn build_contrast_bands(sample_rate: u32, bin_freqs: &[f32]) -> Vec<Option<(usize, usize)>> {
        let nyquist = sample_rate as f32 / 2.0;
        let last_bin = bin_freqs.len() - 1;
        let mut edges = vec![0.0f32];
        edges.extend((0..=N_CONTRAST_BANDS).map(|k| CONTRAST_FMIN * 2f32.powi(k as i32)));

        (0..=N_CONTRAST_BANDS)
            .map(|band| {
                let (low, high) = (edges[band], edges[band + 1]);
                if low >= nyquist {
                    return None;
                }
                let start = bin_freqs.iter().position(|&f| f >= low)?;
                let end = if band == N_CONTRAST_BANDS {
                    last_bin
                } else {
                    bin_freqs.iter().rposition(|&f| f < high).unwrap_or(start)
                };
                let start = if band > 0 { start.saturating_sub(1) } else { start };
                (end >= start).then_some((start, end))
            })
            .collect()
    }

    /// Mel band energies from a power frame
    pub fn compute_mel(&self, power: &[f32]) -> Vec<f32> {
        self.mel_basis
            .iter()
            .map(|filter| filter.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }

    /// MFCCs for every frame of a mel spectrogram
    ///
    /// The dB floor is relative to the loudest mel cell of the whole clip,
    /// so this works on the full spectrogram rather than a single frame.
    pub fn compute_mfcc(&self, mel_frames: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let db_frames: Vec<Vec<f32>> = mel_frames
            .iter()
            .map(|frame| frame.iter().map(|&p| 10.0 * p.max(AMIN).log10()).collect())
            .collect();
        let peak = db_frames
            .iter()
            .flatten()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - TOP_DB;

        db_frames
            .iter()
            .map(|frame| {
                let clipped: Vec<f32> = frame.iter().map(|&db| db.max(floor)).collect();
                self.dct_basis
                    .iter()
                    .map(|row| row.iter().zip(&clipped).map(|(c, x)| c * x).sum())
                    .collect()
            })
            .collect()
    }

    /// Pitch-class energies from a magnitude frame, max-normalized
    pub fn compute_chroma(&self, magnitude: &[f32]) -> Vec<f32> {
        let mut chroma = vec![0.0f32; N_CHROMA];
        for (mag, class) in magnitude.iter().zip(&self.chroma_map) {
            if let Some(class) = class {
                chroma[*class] += mag * mag;
            }
        }
        let max = chroma.iter().copied().fold(0.0f32, f32::max);
        if max > AMIN {
            chroma.iter_mut().for_each(|value| *value /= max);
        }
        chroma
    }

    /// Spectral contrast (dB) per octave band from a magnitude frame
    pub fn compute_contrast(&self, magnitude: &[f32]) -> Vec<f32> {
        self.contrast_bands
            .iter()
            .map(|band| {
                let Some((start, end)) = *band else {
                    return 0.0;
                };
                let mut sub_band: Vec<f32> = magnitude[start..=end].to_vec();
                sub_band.sort_by(|a, b| a.total_cmp(b));
                let n = ((CONTRAST_QUANTILE * sub_band.len() as f32).round() as usize).max(1);
                let valley = sub_band[..n].iter().sum::<f32>() / n as f32;
                let peak = sub_band[sub_band.len() - n..].iter().sum::<f32>() / n as f32;
                10.0 * peak.max(AMIN).log10() - 10.0 * valley.max(AMIN).log10()
            })
            .collect()
    }

    /// Tonal centroid projection of a chroma frame
    pub fn compute_tonnetz(&self, chroma: &[f32]) -> Vec<f32> {
        let total: f32 = chroma.iter().map(|c| c.abs()).sum();
        if total <= AMIN {
            return vec![0.0; N_TONNETZ];
        }

        // (radius, angle step) for fifths, minor thirds, major thirds
        let axes = [
            (1.0f32, 7.0 * std::f32::consts::PI / 6.0),
            (1.0f32, 3.0 * std::f32::consts::PI / 2.0),
            (0.5f32, 2.0 * std::f32::consts::PI / 3.0),
        ];

        let mut tonnetz = Vec::with_capacity(N_TONNETZ);
        for (radius, step) in axes {
            let (mut x, mut y) = (0.0f32, 0.0f32);
            for (pitch_class, &value) in chroma.iter().enumerate() {
                let angle = pitch_class as f32 * step;
                let weight = value / total;
                x += radius * angle.sin() * weight;
                y += radius * angle.cos() * weight;
            }
            tonnetz.push(x);
            tonnetz.push(y);
        }
        tonnetz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FFT: usize = 2048;

    #[test]
    fn test_mel_scale_roundtrip() {
        for hz in [0.0, 440.0, 1000.0, 4000.0, 11025.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 0.5);
        }
    }

    #[test]
    fn test_table_shapes() {
        let features = SpectralFeatures::new(22_050, FFT);
        assert_eq!(features.mel_basis.len(), N_MELS);
        assert_eq!(features.dct_basis.len(), N_MFCC);
        assert_eq!(features.chroma_map.len(), FFT / 2 + 1);
        assert_eq!(features.contrast_bands.len(), N_CONTRAST_BANDS + 1);
    }

    #[test]
    fn test_contrast_bands_above_nyquist_are_empty() {
        // 11.025 kHz audio: Nyquist is below the 6.4 kHz edge of the top band
        let features = SpectralFeatures::new(11_025, FFT);
        assert!(features.contrast_bands[0].is_some());
        assert!(features.contrast_bands[N_CONTRAST_BANDS].is_none());
        let magnitude = vec![1.0; FFT / 2 + 1];
        let contrast = features.compute_contrast(&magnitude);
        assert_eq!(contrast.len(), N_CONTRAST_BANDS + 1);
        assert!(contrast.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_chroma_a440_peaks_on_a() {
        let features = SpectralFeatures::new(22_050, FFT);
        let mut magnitude = vec![0.0f32; FFT / 2 + 1];
        let bin = (440.0 / (22_050.0 / FFT as f32)).round() as usize;
        magnitude[bin] = 1.0;
        let chroma = features.compute_chroma(&magnitude);
        // A is pitch class 9 when C = 0
        assert_eq!(chroma[9], 1.0);
    }

    #[test]
    fn test_tonnetz_of_silence_is_zero() {
        let features = SpectralFeatures::new(22_050, FFT);
        assert_eq!(features.compute_tonnetz(&[0.0; N_CHROMA]), vec![0.0; N_TONNETZ]);
    }

    #[test]
    fn test_mfcc_dimensions() {
        let features = SpectralFeatures::new(22_050, FFT);
        let mel_frames = vec![vec![1.0f32; N_MELS]; 3];
        let mfcc = features.compute_mfcc(&mel_frames);
        assert_eq!(mfcc.len(), 3);
        assert!(mfcc.iter().all(|frame| frame.len() == N_MFCC));
    }
}
