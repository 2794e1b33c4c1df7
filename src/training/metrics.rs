//! Binary classification metrics
//!
//! Scores label vectors where the positive class is `1`. Labels are
//! float-encoded; values are bucketed with a 0.5 threshold so integer
//! labels survive float round-trips.

use crate::error::{CardioError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Evaluation scores for a binary classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Fraction of correct predictions
    pub accuracy: f64,
    /// tp / (tp + fp), 0.0 when nothing was predicted positive
    pub precision: f64,
    /// tp / (tp + fn), 0.0 when no actual positives exist
    pub recall: f64,
    /// Harmonic mean of precision and recall, 0.0 when both are 0
    pub f1: f64,
}

impl Evaluation {
    /// Metric name/value pairs in reporting order.
    pub fn named_values(&self) -> [(&'static str, f64); 4] {
        [
            ("accuracy", self.accuracy),
            ("precision", self.precision),
            ("recall", self.recall),
            ("f1_score", self.f1),
        ]
    }
}

/// Compute accuracy, precision, recall and F1 for binary labels.
///
/// Errors with [`CardioError::DimensionMismatch`] when the vectors differ
/// in length. Degenerate denominators yield 0.0 rather than NaN.
pub fn evaluate_binary(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Evaluation> {
    if y_true.len() != y_pred.len() {
        return Err(CardioError::DimensionMismatch {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }

    let n = y_true.len();
    let (tp, fp, tn, fn_) = confusion_counts(y_true, y_pred);

    let accuracy = if n > 0 {
        (tp + tn) as f64 / n as f64
    } else {
        0.0
    };

    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else {
        0.0
    };

    let recall = if tp + fn_ > 0 {
        tp as f64 / (tp + fn_) as f64
    } else {
        0.0
    };

    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(Evaluation {
        accuracy,
        precision,
        recall,
        f1,
    })
}

fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        let t_pos = *t > 0.5;
        let p_pos = *p > 0.5;

        match (t_pos, p_pos) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}
