// Metrics - accuracy, weighted F-beta and confusion matrices
//
// Labels considered by every metric are the sorted union of true and
// predicted labels. Weighted averages weight each label by its support in the
// true labels; a label with no predictions (or no support) scores 0.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::emotion::Emotion;

/// Fraction of positions where prediction equals truth (0 for empty input)
pub fn accuracy(y_true: &[Emotion], y_pred: &[Emotion]) -> f32 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred)
        .filter(|(truth, pred)| truth == pred)
        .count();
    correct as f32 / y_true.len() as f32
}

/// Sorted union of labels appearing in either sequence
pub fn label_union(y_true: &[Emotion], y_pred: &[Emotion]) -> Vec<Emotion> {
    let mut labels: Vec<Emotion> = y_true.iter().chain(y_pred).copied().collect();
    labels.sort();
    labels.dedup();
    labels
}

/// Per-label precision, recall, F-beta and support
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelScores {
    pub precision: f32,
    pub recall: f32,
    pub f_score: f32,
    pub support: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f32 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f32 / denominator as f32
    }
}

fn f_beta(precision: f32, recall: f32, beta: f32) -> f32 {
    let beta2 = beta * beta;
    let denominator = beta2 * precision + recall;
    if denominator <= 0.0 {
        0.0
    } else {
        (1.0 + beta2) * precision * recall / denominator
    }
}

/// Scores for each label in `label_union(y_true, y_pred)`
pub fn per_label_scores(
    y_true: &[Emotion],
    y_pred: &[Emotion],
    beta: f32,
) -> BTreeMap<Emotion, LabelScores> {
    label_union(y_true, y_pred)
        .into_iter()
        .map(|label| {
            let true_positive = y_true
                .iter()
                .zip(y_pred)
                .filter(|(t, p)| **t == label && **p == label)
                .count();
            let predicted = y_pred.iter().filter(|p| **p == label).count();
            let support = y_true.iter().filter(|t| **t == label).count();

            let precision = ratio(true_positive, predicted);
            let recall = ratio(true_positive, support);
            (
                label,
                LabelScores {
                    precision,
                    recall,
                    f_score: f_beta(precision, recall, beta),
                    support,
                },
            )
        })
        .collect()
}

/// Support-weighted mean of per-label F-beta scores
pub fn fbeta_weighted(y_true: &[Emotion], y_pred: &[Emotion], beta: f32) -> f32 {
    let scores = per_label_scores(y_true, y_pred, beta);
    let total: usize = scores.values().map(|s| s.support).sum();
    if total == 0 {
        return 0.0;
    }
    scores
        .values()
        .map(|s| s.f_score * s.support as f32)
        .sum::<f32>()
        / total as f32
}

/// Support-weighted F1
pub fn f1_weighted(y_true: &[Emotion], y_pred: &[Emotion]) -> f32 {
    fbeta_weighted(y_true, y_pred, 1.0)
}

/// Confusion matrix with rows = true label and columns = predicted label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<Emotion>,
    pub values: Vec<Vec<f32>>,
    pub normalized: bool,
}

impl ConfusionMatrix {
    /// Count (true, predicted) pairs over the given label order
    ///
    /// Pairs whose labels are not in `labels` are ignored.
    pub fn from_predictions(labels: &[Emotion], y_true: &[Emotion], y_pred: &[Emotion]) -> Self {
        let n = labels.len();
        let mut values = vec![vec![0.0f32; n]; n];
        for (truth, pred) in y_true.iter().zip(y_pred) {
            let row = labels.iter().position(|l| l == truth);
            let col = labels.iter().position(|l| l == pred);
            if let (Some(row), Some(col)) = (row, col) {
                values[row][col] += 1.0;
            }
        }
        Self {
            labels: labels.to_vec(),
            values,
            normalized: false,
        }
    }

    /// Express each row as percentages of its total; empty rows stay 0
    pub fn normalize(mut self) -> Self {
        if self.normalized {
            return self;
        }
        for row in &mut self.values {
            let total: f32 = row.iter().sum();
            if total > 0.0 {
                row.iter_mut().for_each(|v| *v = *v / total * 100.0);
            }
        }
        self.normalized = true;
        self
    }

    pub fn row_labels(&self) -> Vec<String> {
        self.labels.iter().map(|l| format!("true_{}", l)).collect()
    }

    pub fn column_labels(&self) -> Vec<String> {
        self.labels
            .iter()
            .map(|l| format!("predicted_{}", l))
            .collect()
    }

    /// Cell value for a (true, predicted) pair
    pub fn get(&self, truth: Emotion, predicted: Emotion) -> Option<f32> {
        let row = self.labels.iter().position(|l| *l == truth)?;
        let col = self.labels.iter().position(|l| *l == predicted)?;
        Some(self.values[row][col])
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.row_labels();
        let columns = self.column_labels();
        let first_width = rows.iter().map(String::len).max().unwrap_or(0);

        write!(f, "{:width$}", "", width = first_width)?;
        for column in &columns {
            write!(f, "  {:>width$}", column, width = column.len())?;
        }
        writeln!(f)?;

        for (row_label, row) in rows.iter().zip(&self.values) {
            write!(f, "{:width$}", row_label, width = first_width)?;
            for (value, column) in row.iter().zip(&columns) {
                if self.normalized {
                    write!(f, "  {:>width$.2}", value, width = column.len())?;
                } else {
                    write!(f, "  {:>width$}", *value as u64, width = column.len())?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Per-label scores plus accuracy and weighted averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub per_label: BTreeMap<Emotion, LabelScores>,
    pub accuracy: f32,
    pub weighted_precision: f32,
    pub weighted_recall: f32,
    pub weighted_f1: f32,
    pub total_support: usize,
}

impl ClassificationReport {
    pub fn new(y_true: &[Emotion], y_pred: &[Emotion]) -> Self {
        let per_label = per_label_scores(y_true, y_pred, 1.0);
        let total_support: usize = per_label.values().map(|s| s.support).sum();
        let weighted = |pick: fn(&LabelScores) -> f32| -> f32 {
            if total_support == 0 {
                return 0.0;
            }
            per_label
                .values()
                .map(|s| pick(s) * s.support as f32)
                .sum::<f32>()
                / total_support as f32
        };

        Self {
            accuracy: accuracy(y_true, y_pred),
            weighted_precision: weighted(|s| s.precision),
            weighted_recall: weighted(|s| s.recall),
            weighted_f1: weighted(|s| s.f_score),
            per_label,
            total_support,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (label, scores) in &self.per_label {
            writeln!(
                f,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                label.as_str(),
                scores.precision,
                scores.recall,
                scores.f_score,
                scores.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.total_support
        )?;
        writeln!(
            f,
            "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            "weighted avg",
            self.weighted_precision,
            self.weighted_recall,
            self.weighted_f1,
            self.total_support
        )
    }
}
