mod common;

use std::path::Path;
use std::process::Command;

use serde_json::Value;

use common::write_labeled;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_emotion_cli"))
}

fn custom_dataset(root: &Path) {
    write_labeled(&root.join("train-custom"), "a", &[("sad", 3), ("happy", 3)], 10);
    write_labeled(&root.join("test-custom"), "b", &[("sad", 1), ("happy", 1)], 20);
}

fn base_args(root: &Path) -> Vec<String> {
    let mut args = location_args(root);
    args.extend(["--features".to_string(), "mfcc".to_string()]);
    args
}

/// Directories, sources and log level, without a feature selection
fn location_args(root: &Path) -> Vec<String> {
    vec![
        "--data-root".to_string(),
        root.display().to_string(),
        "--metadata-dir".to_string(),
        root.join("meta").display().to_string(),
        "--model-dir".to_string(),
        root.join("models").display().to_string(),
        "--no-tess-ravdess".to_string(),
        "--no-emodb".to_string(),
        "--quiet".to_string(),
    ]
}

#[test]
fn inspect_config_applies_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("run.json");
    std::fs::write(&config_path, r#"{"emotions": ["angry", "calm"], "seed": 9}"#).unwrap();

    let output = cli()
        .args(["inspect-config", "--config"])
        .arg(&config_path)
        .args(["--classifier", "knn", "--features", "chroma,tonnetz"])
        .output()
        .expect("failed to run emotion_cli inspect-config");
    assert!(output.status.success(), "exit {:?}", output.status.code());

    let json: Value = serde_json::from_slice(&output.stdout).expect("config JSON");
    assert_eq!(json["emotions"][0], "angry");
    assert_eq!(json["seed"], 9);
    assert_eq!(json["classifier"], "knn");
    assert_eq!(json["features"][1], "tonnetz");
}

#[test]
fn index_writes_tables() {
    let dir = tempfile::tempdir().unwrap();
    custom_dataset(dir.path());

    let output = cli()
        .arg("index")
        .args(base_args(dir.path()))
        .output()
        .expect("failed to run emotion_cli index");
    assert!(output.status.success(), "exit {:?}", output.status.code());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("train_custom.csv"));
    assert!(dir.path().join("meta/test_custom.csv").is_file());
}

#[test]
fn train_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    custom_dataset(dir.path());

    let output = cli()
        .arg("train")
        .args(base_args(dir.path()))
        .output()
        .expect("failed to run emotion_cli train");
    assert!(
        output.status.success(),
        "train failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("accuracy:"));
    assert!(stdout.contains("true_sad"));

    let model = dir.path().join("models/Speechrec_GaussianNb.json");
    assert!(model.is_file());
    assert!(dir.path().join("models/MLSpeech_GaussianNb.json").is_file());

    // No --features: the model's own mfcc layout is used, not the default set
    let clip = dir.path().join("test-custom/b0_happy.wav");
    let output = cli()
        .args(["predict", "--proba", "--model"])
        .arg(&model)
        .arg(&clip)
        .args(location_args(dir.path()))
        .output()
        .expect("failed to run emotion_cli predict");
    assert!(output.status.success(), "exit {:?}", output.status.code());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let first = stdout.lines().next().unwrap();
    assert!(first.ends_with("\thappy") || first.ends_with("\tsad"), "{}", first);

    let output = cli()
        .args(["predict", "--model"])
        .arg(&model)
        .arg(&clip)
        .args(location_args(dir.path()))
        .args(["--features", "chroma"])
        .output()
        .expect("failed to run emotion_cli predict");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("restoring model from"), "{}", stderr);
    assert!(stderr.contains("has length 12"), "{}", stderr);
}

#[test]
fn unknown_emotion_exits_with_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = cli()
        .arg("train")
        .args(base_args(dir.path()))
        .args(["--emotions", "sad,ecstatic"])
        .output()
        .expect("failed to run emotion_cli train");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ecstatic"), "{}", stderr);
}
