use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use speech_emotion::analysis::classifier::ClassifierKind;
use speech_emotion::analysis::features::FeatureKind;
use speech_emotion::config::RunConfig;
use speech_emotion::pipeline::Pipeline;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, Registry};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("emotion_cli error: {err:?}");
            ExitCode::from(1)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "emotion_cli",
    about = "Train, evaluate and export speech emotion classifiers"
)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover audio files and write the metadata tables.
    Index,
    /// Train, evaluate, save and export a model.
    Train(TrainArgs),
    /// Predict emotions for audio files with a saved model.
    Predict(PredictArgs),
    /// Print the resolved run configuration as JSON.
    InspectConfig,
}

/// Run configuration file plus per-field overrides.
#[derive(Args, Debug, Clone, Default)]
struct ConfigArgs {
    /// JSON run configuration (missing or invalid files fall back to defaults).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emotions to train on, comma separated.
    #[arg(long, global = true, value_delimiter = ',')]
    emotions: Option<Vec<String>>,
    /// Feature kinds, comma separated.
    #[arg(long, global = true, value_enum, value_delimiter = ',')]
    features: Option<Vec<FeatureKind>>,
    #[arg(long, global = true, value_enum)]
    classifier: Option<ClassifierKind>,
    /// Neighbour count for the knn classifier.
    #[arg(long, global = true)]
    knn_k: Option<usize>,
    #[arg(long, global = true)]
    data_root: Option<PathBuf>,
    #[arg(long, global = true)]
    metadata_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
    /// Seed for balancing and shuffling.
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[arg(long, global = true)]
    no_balance: bool,
    #[arg(long, global = true)]
    no_shuffle: bool,
    /// Reuse existing metadata tables instead of regenerating them.
    #[arg(long, global = true)]
    keep_metadata: bool,
    /// Abort on the first undecodable audio file.
    #[arg(long, global = true)]
    strict_decode: bool,
    #[arg(long, global = true)]
    no_tess_ravdess: bool,
    #[arg(long, global = true)]
    no_emodb: bool,
    #[arg(long, global = true)]
    no_custom: bool,
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Only log warnings and errors.
    #[arg(long, short, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[arg(long, global = true)]
    debug: bool,
}

impl ConfigArgs {
    fn resolve(&self) -> RunConfig {
        let mut config = match &self.config {
            Some(path) => RunConfig::load_from_file(path),
            None => RunConfig::default(),
        };

        if let Some(emotions) = &self.emotions {
            config.emotions = emotions.clone();
        }
        if let Some(features) = &self.features {
            config.features = features.clone();
        }
        if let Some(classifier) = self.classifier {
            config.classifier = classifier;
        }
        if let Some(k) = self.knn_k {
            config.knn_k = k;
        }
        if let Some(root) = &self.data_root {
            config.data_root = root.clone();
        }
        if let Some(dir) = &self.metadata_dir {
            config.metadata_dir = dir.clone();
        }
        if let Some(dir) = &self.model_dir {
            config.model_dir = dir.clone();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.balance &= !self.no_balance;
        config.shuffle &= !self.no_shuffle;
        config.override_metadata &= !self.keep_metadata;
        config.strict_decode |= self.strict_decode;
        config.sources.tess_ravdess &= !self.no_tess_ravdess;
        config.sources.emodb &= !self.no_emodb;
        config.sources.custom &= !self.no_custom;
        if self.verbose {
            config.verbose = true;
        }
        if self.quiet {
            config.verbose = false;
        }
        config.debug |= self.debug;
        config
    }
}

#[derive(Args, Debug, Clone)]
struct TrainArgs {
    /// Where to write the model (defaults to <model-dir>/Speechrec_<Classifier>.json).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Skip the portable MLSpeech export.
    #[arg(long)]
    no_export: bool,
    /// Print raw counts instead of row percentages in the confusion matrix.
    #[arg(long)]
    counts: bool,
}

#[derive(Args, Debug, Clone)]
struct PredictArgs {
    /// Saved model produced by `train`.
    #[arg(long)]
    model: PathBuf,
    /// Also print per-emotion probabilities.
    #[arg(long)]
    proba: bool,
    /// Audio files to classify.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl Cli {
    fn execute(self) -> Result<()> {
        // Warnings from reading the config file are shown before the
        // configured level is known.
        let log_level = init_logging();
        let config = self.overrides.resolve();
        let (level, log_filter) = level_for(&config);
        apply_log_level(&log_level, level);
        // `log` records are capped separately from the tracing filter
        log::set_max_level(log_filter);

        match self.command {
            Command::Index => index_command(config),
            Command::Train(args) => train_command(config, args),
            Command::Predict(args) => {
                predict_command(config, self.overrides.features.as_deref(), args)
            }
            Command::InspectConfig => inspect_command(&config),
        }
    }
}

fn init_logging() -> reload::Handle<LevelFilter, Registry> {
    let (filter, handle) = reload::Layer::new(LevelFilter::WARN);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
    handle
}

/// Swap the reloadable filter; returns false (with a warning) if it failed
fn apply_log_level(handle: &reload::Handle<LevelFilter, Registry>, level: LevelFilter) -> bool {
    match handle.modify(|filter| *filter = level) {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("[Cli] Failed to apply log level {}: {}", level, err);
            false
        }
    }
}

fn level_for(config: &RunConfig) -> (LevelFilter, log::LevelFilter) {
    if config.debug {
        (LevelFilter::DEBUG, log::LevelFilter::Debug)
    } else if config.verbose {
        (LevelFilter::INFO, log::LevelFilter::Info)
    } else {
        (LevelFilter::WARN, log::LevelFilter::Warn)
    }
}

fn index_command(config: RunConfig) -> Result<()> {
    let mut pipeline = Pipeline::new(config);
    pipeline.prepare().context("preparing metadata tables")?;
    for tables in pipeline.metadata_tables() {
        println!("{}", tables.train.display());
        println!("{}", tables.test.display());
    }
    Ok(())
}

fn train_command(config: RunConfig, args: TrainArgs) -> Result<()> {
    let mut pipeline = Pipeline::new(config);
    pipeline.train(None).context("training classifier")?;

    let (accuracy, f1) = pipeline.evaluate().context("evaluating on the test split")?;
    println!("accuracy: {:.4}", accuracy);
    println!("weighted f1: {:.4}", f1);

    let matrix = pipeline
        .confusion_matrix(!args.counts)
        .context("computing confusion matrix")?;
    println!("\n{matrix}");
    let report = pipeline
        .classification_report()
        .context("computing classification report")?;
    println!("{report}");

    let model_path = args
        .output
        .unwrap_or_else(|| pipeline.default_model_path());
    pipeline
        .save_model(&model_path)
        .with_context(|| format!("saving model to {}", model_path.display()))?;
    println!("model saved to {}", model_path.display());

    if !args.no_export {
        let portable_path = portable_path_for(&pipeline, &model_path);
        // Export failures are already logged; the saved model stays usable.
        if let Ok(path) = pipeline.export_portable(&portable_path) {
            println!("portable model saved to {}", path.display());
        }
    }
    Ok(())
}

/// Portable file goes next to the model file
fn portable_path_for(pipeline: &Pipeline, model_path: &Path) -> PathBuf {
    let default = pipeline.default_portable_path();
    match (model_path.parent(), default.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => default,
    }
}

/// The model's own feature layout is used unless `--features` is given, in
/// which case a different layout is rejected.
fn predict_command(
    config: RunConfig,
    explicit_features: Option<&[FeatureKind]>,
    args: PredictArgs,
) -> Result<()> {
    let pipeline = Pipeline::restore(config, &args.model, explicit_features)
        .with_context(|| format!("restoring model from {}", args.model.display()))?;

    for file in &args.files {
        let emotion = pipeline
            .predict(file)
            .with_context(|| format!("predicting {}", file.display()))?;
        println!("{}\t{}", file.display(), emotion);

        if args.proba {
            let probabilities = pipeline
                .predict_proba(file)
                .with_context(|| format!("probabilities for {}", file.display()))?;
            for (emotion, probability) in probabilities {
                println!("  {:<10} {:.4}", emotion.as_str(), probability);
            }
        }
    }
    Ok(())
}

fn inspect_command(config: &RunConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("serializing configuration")?;
    println!("{json}");
    Ok(())
}
