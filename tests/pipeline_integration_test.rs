//! End-to-end tests for the training pipeline
//!
//! Each test synthesizes a small dataset in a temporary directory using the
//! on-disk layouts of the supported sources, then drives the pipeline through
//! indexing, assembly, training, evaluation and persistence.

mod common;

use std::collections::HashSet;
use std::path::Path;

use speech_emotion::config::SourcesConfig;
use speech_emotion::dataset::{read_table, SourceDataset};
use speech_emotion::error::ErrorCode;
use speech_emotion::{Emotion, FeatureKind, Pipeline, PipelineError, PipelineStage, RunConfig};

use common::write_labeled;

/// TESS/RAVDESS and custom layouts with an imbalanced train split
fn two_source_dataset(root: &Path) {
    write_labeled(
        &root.join("training/Actor_01"),
        "t",
        &[("sad", 3), ("happy", 2), ("angry", 2)],
        1,
    );
    write_labeled(&root.join("validation/Actor_02"), "v", &[("sad", 1), ("happy", 1)], 100);
    write_labeled(&root.join("train-custom"), "c", &[("sad", 2), ("happy", 2)], 200);
    write_labeled(&root.join("test-custom"), "d", &[("sad", 1), ("happy", 2)], 300);
}

fn run_config(root: &Path) -> RunConfig {
    RunConfig {
        emotions: vec!["sad".to_string(), "happy".to_string()],
        features: vec![FeatureKind::Mfcc],
        sources: SourcesConfig {
            tess_ravdess: true,
            emodb: false,
            custom: true,
        },
        balance: true,
        shuffle: true,
        override_metadata: true,
        data_root: root.to_path_buf(),
        metadata_dir: root.join("meta"),
        model_dir: root.join("models"),
        ..RunConfig::default()
    }
}

#[test]
fn test_end_to_end_two_sources() {
    let dir = tempfile::tempdir().unwrap();
    two_source_dataset(dir.path());

    let mut pipeline = Pipeline::new(run_config(dir.path()));
    pipeline.train(None).expect("training should succeed");
    assert_eq!(pipeline.stage(), PipelineStage::Trained);

    let data = pipeline.data().unwrap();
    // 5 sad / 4 happy train rows balanced to 4 / 4; test 2 sad / 3 happy to 2 / 2
    assert_eq!(data.train.len(), 8);
    assert_eq!(data.test.len(), 4);
    assert_eq!(data.report.train.dropped_by_balance, 1);
    assert!(data.train.labels.iter().all(|e| *e != Emotion::Angry));

    let train_paths: HashSet<_> = data.train.paths.iter().collect();
    assert!(data.test.paths.iter().all(|p| !train_paths.contains(p)));
    assert_eq!(data.train.features.len(), data.train.labels.len());
    assert!(data.train.features.iter().all(|v| v.len() == 40));

    let (accuracy, f1) = pipeline.evaluate().unwrap();
    assert!((0.0..=1.0).contains(&accuracy), "accuracy {}", accuracy);
    assert!((0.0..=1.0).contains(&f1), "f1 {}", f1);

    let matrix = pipeline.confusion_matrix(true).unwrap();
    assert_eq!(matrix.values.len(), 2);
    for row in &matrix.values {
        assert_eq!(row.len(), 2);
        let total: f32 = row.iter().sum();
        assert!((total - 100.0).abs() < 0.01, "row total {}", total);
    }
}

#[test]
fn test_metadata_tables_hold_only_requested_emotions() {
    let dir = tempfile::tempdir().unwrap();
    two_source_dataset(dir.path());

    let mut pipeline = Pipeline::new(run_config(dir.path()));
    pipeline.prepare().unwrap();

    let train = read_table(
        &dir.path().join("meta/train_tess_ravdess.csv"),
        SourceDataset::TessRavdess,
    )
    .unwrap();
    assert_eq!(train.len(), 5);
    assert!(train.iter().all(|s| s.emotion != Emotion::Angry));
}

#[test]
fn test_same_seed_reproduces_assembly() {
    let dir = tempfile::tempdir().unwrap();
    two_source_dataset(dir.path());

    let mut first = Pipeline::new(run_config(dir.path()));
    first.load().unwrap();
    let mut second = Pipeline::new(run_config(dir.path()));
    second.load().unwrap();

    assert_eq!(first.data().unwrap().train.paths, second.data().unwrap().train.paths);
    assert_eq!(first.data().unwrap().test.labels, second.data().unwrap().test.labels);
}

#[test]
fn test_unknown_emotion_rejected_before_io() {
    let dir = tempfile::tempdir().unwrap();
    let config = RunConfig {
        emotions: vec!["sad".to_string(), "ecstatic".to_string()],
        ..run_config(dir.path())
    };
    let mut pipeline = Pipeline::new(config);

    let err = pipeline.prepare().unwrap_err();
    assert_eq!(
        err,
        PipelineError::UnknownEmotion {
            label: "ecstatic".to_string()
        }
    );
    assert_eq!(err.code(), 5001);
    assert!(!dir.path().join("meta").exists());
}

#[test]
fn test_missing_data_is_empty_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let mut pipeline = Pipeline::new(run_config(dir.path()));

    match pipeline.train(None) {
        Err(PipelineError::Dataset(err)) => assert_eq!(err.code(), 4004),
        other => panic!("Expected EmptyDataset, got {:?}", other),
    }
    assert_eq!(pipeline.stage(), PipelineStage::Configured);
}

#[test]
fn test_persist_restore_predicts_identically() {
    let dir = tempfile::tempdir().unwrap();
    two_source_dataset(dir.path());

    let mut pipeline = Pipeline::new(run_config(dir.path()));
    pipeline.train(None).unwrap();
    let model_path = pipeline.default_model_path();
    pipeline.save_model(&model_path).unwrap();
    assert!(model_path.ends_with("models/Speechrec_GaussianNb.json"));

    let restored = Pipeline::restore(run_config(dir.path()), &model_path, None).unwrap();
    for clip in &pipeline.data().unwrap().test.paths {
        assert_eq!(restored.predict(clip).unwrap(), pipeline.predict(clip).unwrap());
        assert_eq!(
            restored.predict_proba(clip).unwrap(),
            pipeline.predict_proba(clip).unwrap()
        );
    }
}

#[test]
fn test_undecodable_file_skipped_or_fatal() {
    let dir = tempfile::tempdir().unwrap();
    two_source_dataset(dir.path());
    std::fs::write(dir.path().join("train-custom/broken_sad.wav"), b"RIFF?").unwrap();

    let mut lenient = Pipeline::new(run_config(dir.path()));
    lenient.load().unwrap();
    assert_eq!(lenient.data().unwrap().report.train.skipped, 1);

    let strict_config = RunConfig {
        strict_decode: true,
        ..run_config(dir.path())
    };
    let mut strict = Pipeline::new(strict_config);
    match strict.load() {
        Err(PipelineError::Dataset(err)) => assert_eq!(err.code(), 4002),
        other => panic!("Expected decode failure, got {:?}", other),
    }
}
