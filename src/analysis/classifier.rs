// Classifier - emotion classifiers fit on feature vectors
//
// The pipeline talks to classifiers through the EmotionClassifier trait.
// Four serializable implementations are provided:
//
// GaussianNb:      per-class Gaussian likelihoods, probabilistic (default)
// NearestCentroid: closest standardized class mean, labels only
// Knn:             k nearest standardized training vectors, vote fractions
// LinearSvm:       one-vs-rest hinge-loss margins, softmax over decision values
//
// ClassifierModel wraps them in one serde-tagged enum so a trained model can
// be persisted and restored without knowing its concrete type up front.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::emotion::Emotion;
use crate::analysis::scaler::StandardScaler;
use crate::error::ClassifierError;

/// Probability per class, ordered by emotion
pub type ClassProbabilities = BTreeMap<Emotion, f32>;

/// Fraction of the largest feature variance added to every variance
const VAR_SMOOTHING: f64 = 1e-9;

/// Default neighbour count for Knn
pub const DEFAULT_K: usize = 5;

/// Inverse regularization strength of LinearSvm
const SVM_C: f64 = 1.0;

/// Full-batch subgradient passes per one-vs-rest problem
const SVM_EPOCHS: usize = 300;

/// Common interface for emotion classifiers
pub trait EmotionClassifier: Send + Sync {
    /// Short identifier used in artifact file names
    fn name(&self) -> &'static str;

    /// Fit on a rectangular matrix with one label per row
    fn fit(&mut self, features: &[Vec<f32>], labels: &[Emotion]) -> Result<(), ClassifierError>;

    /// Predict a single label
    fn predict(&self, features: &[f32]) -> Result<Emotion, ClassifierError>;

    /// Probability per known class, or `None` when the classifier has no
    /// probability estimates
    fn predict_proba(&self, features: &[f32]) -> Result<Option<ClassProbabilities>, ClassifierError>;

    /// Classes seen during fit, in emotion order
    fn classes(&self) -> &[Emotion];

    fn supports_probabilities(&self) -> bool;

    fn is_fitted(&self) -> bool {
        !self.classes().is_empty()
    }

    /// Predict every row of a matrix
    fn predict_batch(&self, rows: &[Vec<f32>]) -> Result<Vec<Emotion>, ClassifierError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

/// Built-in classifier families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    GaussianNb,
    NearestCentroid,
    Knn,
    LinearSvm,
}

impl ClassifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassifierKind::GaussianNb => "gaussian_nb",
            ClassifierKind::NearestCentroid => "nearest_centroid",
            ClassifierKind::Knn => "knn",
            ClassifierKind::LinearSvm => "linear_svm",
        }
    }
}

impl Default for ClassifierKind {
    fn default() -> Self {
        ClassifierKind::GaussianNb
    }
}

impl std::fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validate training data and return (dimension, sorted class list)
fn validate_training(
    features: &[Vec<f32>],
    labels: &[Emotion],
) -> Result<(usize, Vec<Emotion>), ClassifierError> {
    if features.is_empty() {
        return Err(ClassifierError::InvalidTrainingData {
            reason: "no training rows".to_string(),
        });
    }
    if features.len() != labels.len() {
        return Err(ClassifierError::InvalidTrainingData {
            reason: format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            ),
        });
    }
    let dimension = features[0].len();
    if dimension == 0 {
        return Err(ClassifierError::InvalidTrainingData {
            reason: "feature vectors are empty".to_string(),
        });
    }
    if let Some((idx, row)) = features
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != dimension)
    {
        return Err(ClassifierError::InvalidTrainingData {
            reason: format!(
                "row {} has {} dimensions, expected {}",
                idx,
                row.len(),
                dimension
            ),
        });
    }

    let mut classes: Vec<Emotion> = labels.to_vec();
    classes.sort();
    classes.dedup();
    Ok((dimension, classes))
}

fn check_dimension(expected: usize, features: &[f32]) -> Result<(), ClassifierError> {
    if features.len() != expected {
        return Err(ClassifierError::DimensionMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of the highest score; ties go to the earlier (lower) class
fn argmax(scores: &[f64]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &s)| {
            if s > best.1 {
                (i, s)
            } else {
                best
            }
        })
        .0
}

/// Gaussian naive Bayes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GaussianNb {
    classes: Vec<Emotion>,
    log_priors: Vec<f64>,
    means: Vec<Vec<f64>>,
    variances: Vec<Vec<f64>>,
}

impl GaussianNb {
    pub fn new() -> Self {
        Self::default()
    }

    fn joint_log_likelihood(&self, features: &[f32]) -> Vec<f64> {
        self.classes
            .iter()
            .enumerate()
            .map(|(c, _)| {
                let mut log_likelihood = self.log_priors[c];
                for ((&x, &mean), &var) in features
                    .iter()
                    .zip(&self.means[c])
                    .zip(&self.variances[c])
                {
                    let d = x as f64 - mean;
                    log_likelihood -= 0.5 * (2.0 * std::f64::consts::PI * var).ln();
                    log_likelihood -= 0.5 * d * d / var;
                }
                log_likelihood
            })
            .collect()
    }
}

impl EmotionClassifier for GaussianNb {
    fn name(&self) -> &'static str {
        "GaussianNb"
    }

    fn fit(&mut self, features: &[Vec<f32>], labels: &[Emotion]) -> Result<(), ClassifierError> {
        let (dimension, classes) = validate_training(features, labels)?;

        // Largest per-feature variance over the whole training set
        let scaler = StandardScaler::fit(features);
        let max_variance = scaler
            .scale
            .iter()
            .map(|s| (*s as f64) * (*s as f64))
            .fold(0.0f64, f64::max);
        let epsilon = (VAR_SMOOTHING * max_variance).max(f64::MIN_POSITIVE);

        let n_total = features.len() as f64;
        let mut log_priors = Vec::with_capacity(classes.len());
        let mut means = Vec::with_capacity(classes.len());
        let mut variances = Vec::with_capacity(classes.len());

        for class in &classes {
            let rows: Vec<&Vec<f32>> = features
                .iter()
                .zip(labels)
                .filter(|(_, label)| *label == class)
                .map(|(row, _)| row)
                .collect();
            let n = rows.len() as f64;

            let mut mean = vec![0.0f64; dimension];
            for row in &rows {
                for (m, &v) in mean.iter_mut().zip(row.iter()) {
                    *m += v as f64;
                }
            }
            mean.iter_mut().for_each(|m| *m /= n);

            let mut var = vec![0.0f64; dimension];
            for row in &rows {
                for ((acc, &v), m) in var.iter_mut().zip(row.iter()).zip(&mean) {
                    let d = v as f64 - m;
                    *acc += d * d;
                }
            }
            var.iter_mut().for_each(|v| *v = *v / n + epsilon);

            log_priors.push((n / n_total).ln());
            means.push(mean);
            variances.push(var);
        }

        self.classes = classes;
        self.log_priors = log_priors;
        self.means = means;
        self.variances = variances;
        Ok(())
    }

    fn predict(&self, features: &[f32]) -> Result<Emotion, ClassifierError> {
        if !self.is_fitted() {
            return Err(ClassifierError::NotFitted);
        }
        check_dimension(self.means[0].len(), features)?;
        let jll = self.joint_log_likelihood(features);
        Ok(self.classes[argmax(&jll)])
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<ClassProbabilities>, ClassifierError> {
        if !self.is_fitted() {
            return Err(ClassifierError::NotFitted);
        }
        check_dimension(self.means[0].len(), features)?;
        let jll = self.joint_log_likelihood(features);

        // log-sum-exp normalization
        let max = jll.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = jll.iter().map(|l| (l - max).exp()).sum();
        let probabilities = self
            .classes
            .iter()
            .zip(&jll)
            .map(|(class, l)| (*class, ((l - max).exp() / sum) as f32))
            .collect();
        Ok(Some(probabilities))
    }

    fn classes(&self) -> &[Emotion] {
        &self.classes
    }

    fn supports_probabilities(&self) -> bool {
        true
    }
}

/// Nearest class centroid on standardized features
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroid {
    classes: Vec<Emotion>,
    scaler: Option<StandardScaler>,
    centroids: Vec<Vec<f32>>,
}

impl NearestCentroid {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EmotionClassifier for NearestCentroid {
    fn name(&self) -> &'static str {
        "NearestCentroid"
    }

    fn fit(&mut self, features: &[Vec<f32>], labels: &[Emotion]) -> Result<(), ClassifierError> {
        let (dimension, classes) = validate_training(features, labels)?;
        let scaler = StandardScaler::fit(features);

        let centroids = classes
            .iter()
            .map(|class| {
                let mut sum = vec![0.0f64; dimension];
                let mut count = 0usize;
                for (row, label) in features.iter().zip(labels) {
                    if label == class {
                        for (s, v) in sum.iter_mut().zip(scaler.transform(row)) {
                            *s += v as f64;
                        }
                        count += 1;
                    }
                }
                sum.into_iter().map(|s| (s / count as f64) as f32).collect()
            })
            .collect();

        self.classes = classes;
        self.scaler = Some(scaler);
        self.centroids = centroids;
        Ok(())
    }

    fn predict(&self, features: &[f32]) -> Result<Emotion, ClassifierError> {
        let scaler = self.scaler.as_ref().ok_or(ClassifierError::NotFitted)?;
        check_dimension(scaler.dimension(), features)?;
        let scaled = scaler.transform(features);
        let scores: Vec<f64> = self
            .centroids
            .iter()
            .map(|centroid| -(squared_distance(&scaled, centroid) as f64))
            .collect();
        Ok(self.classes[argmax(&scores)])
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<ClassProbabilities>, ClassifierError> {
        let scaler = self.scaler.as_ref().ok_or(ClassifierError::NotFitted)?;
        check_dimension(scaler.dimension(), features)?;
        Ok(None)
    }

    fn classes(&self) -> &[Emotion] {
        &self.classes
    }

    fn supports_probabilities(&self) -> bool {
        false
    }
}

/// k-nearest neighbours on standardized features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Knn {
    k: usize,
    classes: Vec<Emotion>,
    scaler: Option<StandardScaler>,
    points: Vec<Vec<f32>>,
    labels: Vec<Emotion>,
}

impl Knn {
    /// Create an unfitted Knn (k is clamped to at least 1)
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            classes: Vec::new(),
            scaler: None,
            points: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Per-class (votes, summed distance) among the k nearest points
    fn neighbour_votes(&self, scaled: &[f32]) -> Vec<(usize, f32)> {
        let mut distances: Vec<(f32, Emotion)> = self
            .points
            .iter()
            .zip(&self.labels)
            .map(|(point, label)| (squared_distance(scaled, point), *label))
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut votes = vec![(0usize, 0.0f32); self.classes.len()];
        for (distance, label) in distances.into_iter().take(self.k) {
            if let Ok(idx) = self.classes.binary_search(&label) {
                votes[idx].0 += 1;
                votes[idx].1 += distance;
            }
        }
        votes
    }

    fn fitted_scaler(&self, features: &[f32]) -> Result<&StandardScaler, ClassifierError> {
        let scaler = self.scaler.as_ref().ok_or(ClassifierError::NotFitted)?;
        check_dimension(scaler.dimension(), features)?;
        Ok(scaler)
    }
}

impl Default for Knn {
    fn default() -> Self {
        Self::new(DEFAULT_K)
    }
}

impl EmotionClassifier for Knn {
    fn name(&self) -> &'static str {
        "Knn"
    }

    fn fit(&mut self, features: &[Vec<f32>], labels: &[Emotion]) -> Result<(), ClassifierError> {
        let (_, classes) = validate_training(features, labels)?;
        let scaler = StandardScaler::fit(features);
        self.points = features.iter().map(|row| scaler.transform(row)).collect();
        self.labels = labels.to_vec();
        self.classes = classes;
        self.scaler = Some(scaler);
        Ok(())
    }

    fn predict(&self, features: &[f32]) -> Result<Emotion, ClassifierError> {
        let scaled = self.fitted_scaler(features)?.transform(features);
        let votes = self.neighbour_votes(&scaled);

        // Most votes wins; ties go to the class whose neighbours are closer
        let mut best = 0;
        for (idx, (count, distance)) in votes.iter().enumerate().skip(1) {
            let (best_count, best_distance) = votes[best];
            if *count > best_count || (*count == best_count && *distance < best_distance) {
                best = idx;
            }
        }
        Ok(self.classes[best])
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<ClassProbabilities>, ClassifierError> {
        let scaled = self.fitted_scaler(features)?.transform(features);
        let votes = self.neighbour_votes(&scaled);
        let total: usize = votes.iter().map(|(count, _)| count).sum();
        let probabilities = self
            .classes
            .iter()
            .zip(&votes)
            .map(|(class, (count, _))| (*class, *count as f32 / total.max(1) as f32))
            .collect();
        Ok(Some(probabilities))
    }

    fn classes(&self) -> &[Emotion] {
        &self.classes
    }

    fn supports_probabilities(&self) -> bool {
        true
    }
}

/// Linear support vector machine, one-vs-rest on standardized features
///
/// Each class gets a hinge-loss separator trained with Pegasos step sizes
/// over the full batch, so fitting is deterministic. Probabilities are a
/// softmax over the per-class decision values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearSvm {
    classes: Vec<Emotion>,
    scaler: Option<StandardScaler>,
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
}

impl LinearSvm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decision value per class for one input row
    fn decision_values(&self, features: &[f32]) -> Result<Vec<f64>, ClassifierError> {
        let scaler = self.scaler.as_ref().ok_or(ClassifierError::NotFitted)?;
        check_dimension(scaler.dimension(), features)?;
        let scaled = scaler.transform(features);
        Ok(self
            .weights
            .iter()
            .zip(&self.biases)
            .map(|(w, b)| dot(w, &scaled) + b)
            .collect())
    }
}

fn dot(weights: &[f64], row: &[f32]) -> f64 {
    weights.iter().zip(row).map(|(w, &x)| w * x as f64).sum()
}

/// Fit one binary separator; targets are +1 / -1
fn fit_binary_svm(rows: &[Vec<f32>], targets: &[f64], dimension: usize) -> (Vec<f64>, f64) {
    let n = rows.len() as f64;
    let lambda = 1.0 / (SVM_C * n);
    let mut weights = vec![0.0f64; dimension];
    let mut bias = 0.0f64;

    for epoch in 1..=SVM_EPOCHS {
        let eta = 1.0 / (lambda * epoch as f64);
        let mut grad = vec![0.0f64; dimension];
        let mut grad_bias = 0.0f64;
        for (row, &y) in rows.iter().zip(targets) {
            if y * (dot(&weights, row) + bias) < 1.0 {
                for (g, &x) in grad.iter_mut().zip(row) {
                    *g += y * x as f64;
                }
                grad_bias += y;
            }
        }
        let shrink = 1.0 - eta * lambda;
        for (w, g) in weights.iter_mut().zip(&grad) {
            *w = shrink * *w + eta * g / n;
        }
        bias += eta * grad_bias / n;
    }
    (weights, bias)
}

impl EmotionClassifier for LinearSvm {
    fn name(&self) -> &'static str {
        "LinearSvm"
    }

    fn fit(&mut self, features: &[Vec<f32>], labels: &[Emotion]) -> Result<(), ClassifierError> {
        let (dimension, classes) = validate_training(features, labels)?;
        let scaler = StandardScaler::fit(features);
        let scaled: Vec<Vec<f32>> = features.iter().map(|row| scaler.transform(row)).collect();

        let mut weights = Vec::with_capacity(classes.len());
        let mut biases = Vec::with_capacity(classes.len());
        for class in &classes {
            let targets: Vec<f64> = labels
                .iter()
                .map(|label| if label == class { 1.0 } else { -1.0 })
                .collect();
            let (w, b) = fit_binary_svm(&scaled, &targets, dimension);
            weights.push(w);
            biases.push(b);
        }

        self.classes = classes;
        self.scaler = Some(scaler);
        self.weights = weights;
        self.biases = biases;
        Ok(())
    }

    fn predict(&self, features: &[f32]) -> Result<Emotion, ClassifierError> {
        let scores = self.decision_values(features)?;
        Ok(self.classes[argmax(&scores)])
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<ClassProbabilities>, ClassifierError> {
        let scores = self.decision_values(features)?;
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = scores.iter().map(|s| (s - max).exp()).sum();
        let probabilities = self
            .classes
            .iter()
            .zip(&scores)
            .map(|(class, s)| (*class, ((s - max).exp() / sum) as f32))
            .collect();
        Ok(Some(probabilities))
    }

    fn classes(&self) -> &[Emotion] {
        &self.classes
    }

    fn supports_probabilities(&self) -> bool {
        true
    }
}

/// Serializable wrapper over the built-in classifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    GaussianNb(GaussianNb),
    NearestCentroid(NearestCentroid),
    Knn(Knn),
    LinearSvm(LinearSvm),
}

impl ClassifierModel {
    /// Create an unfitted classifier of the given kind
    pub fn new(kind: ClassifierKind, k: usize) -> Self {
        match kind {
            ClassifierKind::GaussianNb => ClassifierModel::GaussianNb(GaussianNb::new()),
            ClassifierKind::NearestCentroid => {
                ClassifierModel::NearestCentroid(NearestCentroid::new())
            }
            ClassifierKind::Knn => ClassifierModel::Knn(Knn::new(k)),
            ClassifierKind::LinearSvm => ClassifierModel::LinearSvm(LinearSvm::new()),
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            ClassifierModel::GaussianNb(_) => ClassifierKind::GaussianNb,
            ClassifierModel::NearestCentroid(_) => ClassifierKind::NearestCentroid,
            ClassifierModel::Knn(_) => ClassifierKind::Knn,
            ClassifierModel::LinearSvm(_) => ClassifierKind::LinearSvm,
        }
    }

    fn inner(&self) -> &dyn EmotionClassifier {
        match self {
            ClassifierModel::GaussianNb(model) => model,
            ClassifierModel::NearestCentroid(model) => model,
            ClassifierModel::Knn(model) => model,
            ClassifierModel::LinearSvm(model) => model,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn EmotionClassifier {
        match self {
            ClassifierModel::GaussianNb(model) => model,
            ClassifierModel::NearestCentroid(model) => model,
            ClassifierModel::Knn(model) => model,
            ClassifierModel::LinearSvm(model) => model,
        }
    }
}

impl Default for ClassifierModel {
    fn default() -> Self {
        ClassifierModel::GaussianNb(GaussianNb::new())
    }
}

impl EmotionClassifier for ClassifierModel {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn fit(&mut self, features: &[Vec<f32>], labels: &[Emotion]) -> Result<(), ClassifierError> {
        self.inner_mut().fit(features, labels)
    }

    fn predict(&self, features: &[f32]) -> Result<Emotion, ClassifierError> {
        self.inner().predict(features)
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Option<ClassProbabilities>, ClassifierError> {
        self.inner().predict_proba(features)
    }

    fn classes(&self) -> &[Emotion] {
        self.inner().classes()
    }

    fn supports_probabilities(&self) -> bool {
        self.inner().supports_probabilities()
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
