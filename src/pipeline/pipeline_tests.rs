use super::*;
use crate::analysis::classifier::{ClassifierKind, Knn};
use crate::analysis::features::FeatureKind;
use crate::config::SourcesConfig;
use std::fs;
use tempfile::TempDir;

/// Write a 0.25 s 16 kHz tone
fn write_tone(path: &Path, frequency: f32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..4_000 {
        let t = i as f32 / 16_000.0;
        let value = (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.5;
        writer.write_sample((value * i16::MAX as f32) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn tone_for(emotion: &str, variant: usize) -> f32 {
    let base = if emotion == "sad" { 180.0 } else { 2_000.0 };
    base + variant as f32 * 15.0
}

/// Custom-layout dataset: low tones are sad, high tones are happy
fn custom_dataset() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (split, count) in [("train-custom", 4), ("test-custom", 2)] {
        for emotion in ["sad", "happy"] {
            for i in 0..count {
                let path = dir.path().join(split).join(format!("{split}{i}_{emotion}.wav"));
                write_tone(&path, tone_for(emotion, i));
            }
        }
    }
    dir
}

fn config_for(dir: &Path) -> RunConfig {
    RunConfig {
        emotions: vec!["sad".to_string(), "happy".to_string()],
        features: vec![FeatureKind::Mfcc],
        sources: SourcesConfig {
            tess_ravdess: false,
            emodb: false,
            custom: true,
        },
        data_root: dir.to_path_buf(),
        metadata_dir: dir.join("meta"),
        model_dir: dir.join("models"),
        ..RunConfig::default()
    }
}

#[test]
fn test_unknown_emotion_fails_before_io() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        emotions: vec!["sad".to_string(), "ecstatic".to_string()],
        ..config_for(dir.path())
    };
    let mut pipeline = Pipeline::new(config);

    assert_eq!(
        pipeline.prepare().unwrap_err(),
        PipelineError::UnknownEmotion {
            label: "ecstatic".to_string()
        }
    );
    assert!(!dir.path().join("meta").exists(), "no metadata written");
    assert_eq!(pipeline.stage(), PipelineStage::Unconfigured);
}

#[test]
fn test_empty_features_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        features: Vec::new(),
        ..config_for(dir.path())
    };
    let mut pipeline = Pipeline::new(config);
    assert!(matches!(pipeline.prepare(), Err(PipelineError::Config { .. })));
}

#[test]
fn test_prepare_writes_tables() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    pipeline.prepare().unwrap();

    assert_eq!(pipeline.stage(), PipelineStage::Configured);
    let tables = pipeline.metadata_tables();
    assert_eq!(tables.len(), 1);
    assert!(tables[0].train.ends_with("meta/train_custom.csv"));
    assert!(tables[0].train.is_file() && tables[0].test.is_file());
}

#[test]
fn test_predict_before_train_is_model_not_trained() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    let clip = dir.path().join("test-custom/test-custom0_sad.wav");

    assert_eq!(pipeline.predict(&clip).unwrap_err(), PipelineError::ModelNotTrained);
    pipeline.load().unwrap();
    assert_eq!(pipeline.predict(&clip).unwrap_err(), PipelineError::ModelNotTrained);
    assert_eq!(pipeline.evaluate().unwrap_err(), PipelineError::ModelNotTrained);
}

#[test]
fn test_train_from_unconfigured_prepares_and_loads() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    assert_eq!(pipeline.stage(), PipelineStage::Unconfigured);

    pipeline.train(None).unwrap();

    assert_eq!(pipeline.stage(), PipelineStage::Trained);
    let data = pipeline.data().unwrap();
    assert_eq!(data.train.len(), 8);
    assert_eq!(data.test.len(), 4);
    assert_eq!(data.feature_dimension(), 40);
}

#[test]
fn test_load_is_noop_once_loaded() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    pipeline.load().unwrap();
    let first = pipeline.data().cloned();

    pipeline.load().unwrap();
    assert_eq!(pipeline.data().cloned(), first);
    assert_eq!(pipeline.stage(), PipelineStage::Loaded);
}

#[test]
fn test_strict_load_failure_keeps_no_data() {
    let dir = custom_dataset();
    fs::write(dir.path().join("train-custom/zz_sad.wav"), b"RIFF?").unwrap();
    let config = RunConfig {
        strict_decode: true,
        ..config_for(dir.path())
    };
    let mut pipeline = Pipeline::new(config);

    match pipeline.load() {
        Err(PipelineError::Dataset(err)) => {
            assert_eq!(err.code(), crate::error::DatasetErrorCodes::FEATURE)
        }
        other => panic!("Expected dataset error, got {:?}", other),
    }
    assert_eq!(pipeline.stage(), PipelineStage::Configured);
    assert!(pipeline.data().is_none());
}

#[test]
fn test_evaluate_and_confusion_matrix() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    pipeline.train(None).unwrap();

    let (accuracy, f1) = pipeline.evaluate().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));
    assert!((0.0..=1.0).contains(&f1));

    let matrix = pipeline.confusion_matrix(true).unwrap();
    assert_eq!(matrix.labels, vec![Emotion::Sad, Emotion::Happy]);
    assert_eq!(matrix.row_labels(), vec!["true_sad", "true_happy"]);
    for row in &matrix.values {
        let total: f32 = row.iter().sum();
        assert!((total - 100.0).abs() < 1e-3, "row total {}", total);
    }

    let counts = pipeline.confusion_matrix(false).unwrap();
    let total: f32 = counts.values.iter().flatten().sum();
    assert_eq!(total, 4.0);

    let report = pipeline.classification_report().unwrap();
    assert_eq!(report.total_support, 4);
    assert_eq!(report.accuracy, accuracy);
}

#[test]
fn test_predict_separates_tones() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    pipeline.train(None).unwrap();

    let probe = dir.path().join("probe_happy.wav");
    write_tone(&probe, 2_020.0);
    assert_eq!(pipeline.predict(&probe).unwrap(), Emotion::Happy);

    let probabilities = pipeline.predict_proba(&probe).unwrap();
    let total: f32 = probabilities.values().sum();
    assert!((total - 1.0).abs() < 1e-4);
}

#[test]
fn test_train_with_supplied_classifier() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    pipeline
        .train(Some(ClassifierModel::Knn(Knn::new(3))))
        .unwrap();
    assert_eq!(pipeline.classifier().kind(), ClassifierKind::Knn);
    assert_eq!(pipeline.default_model_path(), dir.path().join("models/Speechrec_Knn.json"));
}

#[test]
fn test_predict_proba_unsupported() {
    let dir = custom_dataset();
    let config = RunConfig {
        classifier: ClassifierKind::NearestCentroid,
        ..config_for(dir.path())
    };
    let mut pipeline = Pipeline::new(config);
    pipeline.train(None).unwrap();

    let clip = dir.path().join("test-custom/test-custom0_sad.wav");
    assert!(pipeline.predict(&clip).is_ok());
    assert!(matches!(
        pipeline.predict_proba(&clip),
        Err(PipelineError::UnsupportedOperation { .. })
    ));
}

#[test]
fn test_reconfigure_returns_to_unconfigured() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    pipeline.train(None).unwrap();

    let config = RunConfig {
        features: vec![FeatureKind::Chroma],
        ..config_for(dir.path())
    };
    pipeline.reconfigure(config);

    assert_eq!(pipeline.stage(), PipelineStage::Unconfigured);
    assert!(pipeline.data().is_none());
    let clip = dir.path().join("test-custom/test-custom0_sad.wav");
    assert_eq!(pipeline.predict(&clip).unwrap_err(), PipelineError::ModelNotTrained);

    pipeline.load().unwrap();
    assert_eq!(pipeline.data().unwrap().feature_dimension(), 12);
}

#[test]
fn test_save_and_restore_predict_identically() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    pipeline.train(None).unwrap();

    let path = pipeline.default_model_path();
    pipeline.save_model(&path).unwrap();
    let restored = Pipeline::restore(config_for(dir.path()), &path, None).unwrap();

    assert_eq!(restored.stage(), PipelineStage::Trained);
    for clip in &pipeline.data().unwrap().test.paths {
        assert_eq!(restored.predict(clip).unwrap(), pipeline.predict(clip).unwrap());
    }
    assert_eq!(restored.evaluate().unwrap_err(), PipelineError::DataNotLoaded);
}

#[test]
fn test_restore_with_mismatched_features() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    pipeline.train(None).unwrap();
    let path = pipeline.default_model_path();
    pipeline.save_model(&path).unwrap();

    match Pipeline::restore(config_for(dir.path()), &path, Some(&[FeatureKind::Mel])) {
        Err(PipelineError::Dataset(DatasetError::FeatureMismatch {
            expected, actual, ..
        })) => {
            assert_eq!(expected, 40);
            assert_eq!(actual, 128);
        }
        Err(other) => panic!("Expected FeatureMismatch, got {:?}", other),
        Ok(_) => panic!("Expected FeatureMismatch, got a pipeline"),
    }
}

#[test]
fn test_restore_uses_artifact_features() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    pipeline.train(None).unwrap();
    let path = pipeline.default_model_path();
    pipeline.save_model(&path).unwrap();

    // Default config asks for mfcc+chroma+mel; the artifact was trained on mfcc
    let restored = Pipeline::restore(RunConfig::default(), &path, None).unwrap();
    assert_eq!(restored.config().features, vec![FeatureKind::Mfcc]);
    assert_eq!(restored.audio_config().unwrap().dimension(), 40);

    let clip = dir.path().join("test-custom/test-custom0_happy.wav");
    assert_eq!(restored.predict(&clip).unwrap(), pipeline.predict(&clip).unwrap());

    let matching = Pipeline::restore(RunConfig::default(), &path, Some(&[FeatureKind::Mfcc]));
    assert!(matching.is_ok());
}

#[test]
fn test_save_before_train_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(config_for(dir.path()));
    assert_eq!(
        pipeline.save_model(&dir.path().join("model.json")).unwrap_err(),
        PipelineError::ModelNotTrained
    );
}

#[test]
fn test_export_portable() {
    let dir = custom_dataset();
    let mut pipeline = Pipeline::new(config_for(dir.path()));
    pipeline.train(None).unwrap();

    let model_path = pipeline.default_model_path();
    pipeline.save_model(&model_path).unwrap();
    let saved = fs::read_to_string(&model_path).unwrap();

    let portable_path = pipeline.default_portable_path();
    assert_eq!(pipeline.export_portable(&portable_path).unwrap(), portable_path);
    let portable: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&portable_path).unwrap()).unwrap();
    assert_eq!(portable["input"]["shape"][0], 40);

    let blocked = model_path.join("MLSpeech_GaussianNb.json");
    assert!(matches!(
        pipeline.export_portable(&blocked),
        Err(PipelineError::ExportFailed { .. })
    ));
    assert_eq!(fs::read_to_string(&model_path).unwrap(), saved);
}

#[test]
fn test_export_before_train_is_export_failed() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(config_for(dir.path()));
    assert!(matches!(
        pipeline.export_portable(&dir.path().join("MLSpeech_GaussianNb.json")),
        Err(PipelineError::ExportFailed { .. })
    ));
}
