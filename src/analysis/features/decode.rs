// Decode module - WAV loading into mono f32 PCM

use std::path::Path;

use crate::error::FeatureError;

/// Decoded mono waveform
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

fn decode_error(path: &Path, reason: impl Into<String>) -> FeatureError {
    FeatureError::Decode {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Read a WAV file, scale integer PCM to [-1, 1] and downmix to mono
pub fn read_wav(path: &Path) -> Result<DecodedAudio, FeatureError> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|err| decode_error(path, format!("failed to open: {err}")))?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(decode_error(path, "zero channels"));
    }
    if spec.sample_rate == 0 {
        return Err(decode_error(path, "zero sample rate"));
    }

    let read_err = |err: hound::Error| decode_error(path, format!("error reading samples: {err}"));

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => {
            let samples = reader
                .samples::<f32>()
                .map(|sample| sample.map_err(read_err))
                .collect::<Result<Vec<f32>, _>>()?;
            if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
                return Err(decode_error(
                    path,
                    format!("non-finite sample at index {}", index),
                ));
            }
            samples
        }
        hound::SampleFormat::Int => {
            let max = ((1i64 << (spec.bits_per_sample - 1)) - 1) as f32;
            match spec.bits_per_sample {
                8 => reader
                    .samples::<i8>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(read_err))
                    .collect::<Result<Vec<f32>, _>>()?,
                16 => reader
                    .samples::<i16>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(read_err))
                    .collect::<Result<Vec<f32>, _>>()?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|v| v as f32 / max).map_err(read_err))
                    .collect::<Result<Vec<f32>, _>>()?,
                bits => {
                    return Err(decode_error(
                        path,
                        format!("unsupported bits_per_sample={}", bits),
                    ))
                }
            }
        }
    };

    if spec.channels == 1 {
        return Ok(DecodedAudio {
            samples,
            sample_rate: spec.sample_rate,
        });
    }

    let channels = spec.channels as usize;
    let mono = samples
        .chunks(channels)
        .map(|chunk| chunk.iter().copied().sum::<f32>() / channels as f32)
        .collect();

    Ok(DecodedAudio {
        samples: mono,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, samples: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_read_mono_scales_to_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_wav(&path, 1, &[0, i16::MAX, -i16::MAX]);

        let audio = read_wav(&path).unwrap();
        assert_eq!(audio.sample_rate, 16_000);
        assert_eq!(audio.samples, vec![0.0, 1.0, -1.0]);
    }

    #[test]
    fn test_read_stereo_downmixes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, 2, &[i16::MAX, 0, 0, -i16::MAX]);

        let audio = read_wav(&path).unwrap();
        assert_eq!(audio.samples, vec![0.5, -0.5]);
    }

    #[test]
    fn test_non_finite_float_sample_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0.25f32, f32::NAN, 0.5] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        match read_wav(&path) {
            Err(FeatureError::Decode { reason, .. }) => {
                assert!(reason.contains("non-finite sample at index 1"), "{}", reason)
            }
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_wav_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();

        match read_wav(&path) {
            Err(FeatureError::Decode { path: err_path, .. }) => assert_eq!(err_path, path),
            other => panic!("Expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let err = read_wav(Path::new("/nonexistent/clip.wav")).unwrap_err();
        assert!(matches!(err, FeatureError::Decode { .. }));
    }
}
