//! Synthetic speech-dataset helpers shared by the integration tests.

use std::fs;
use std::path::Path;

use rand::{rngs::StdRng, Rng, SeedableRng};

pub const SAMPLE_RATE: u32 = 16_000;

/// Write a 0.3 s tone with a little seeded noise
pub fn write_clip(path: &Path, frequency: f32, seed: u64) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..4_800 {
        let t = i as f32 / SAMPLE_RATE as f32;
        let tone = (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.5;
        let noise: f32 = rng.gen_range(-0.02..0.02);
        writer
            .write_sample(((tone + noise) * i16::MAX as f32) as i16)
            .unwrap();
    }
    writer.finalize().unwrap();
}

/// Sad clips are low tones, happy clips are high tones
pub fn frequency_for(emotion: &str, variant: usize) -> f32 {
    match emotion {
        "sad" => 170.0 + variant as f32 * 10.0,
        "happy" => 1_900.0 + variant as f32 * 25.0,
        _ => 700.0 + variant as f32 * 20.0,
    }
}

/// Write `<dir>/<prefix><i>_<emotion>.wav` for each requested count
pub fn write_labeled(dir: &Path, prefix: &str, counts: &[(&str, usize)], seed: u64) {
    for (emotion, count) in counts {
        for i in 0..*count {
            let path = dir.join(format!("{prefix}{i}_{emotion}.wav"));
            write_clip(&path, frequency_for(emotion, i), seed + i as u64);
        }
    }
}
