//! Adaptive boosting over decision stumps
//!
//! Binary AdaBoost: each round fits the sample-weighted stump with the lowest
//! error, computes its vote weight alpha = lr * ln((1 - e) / e), and
//! upweights the rows that stump got wrong. Stump search sorts each feature
//! once and sweeps prefix weight sums, so a round costs O(features * n log n).

use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A one-split weak learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stump {
    feature_index: usize,
    threshold: f64,
    /// Label predicted when feature <= threshold; the other side gets the
    /// opposite label.
    left_label: f64,
}

impl Stump {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        if row[self.feature_index] <= self.threshold {
            self.left_label
        } else {
            1.0 - self.left_label
        }
    }
}

/// Best stump found for one feature: (threshold, left_label, weighted error).
type StumpCandidate = (f64, f64, f64);

/// Adaptive boosting binary classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaboostClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    stumps: Vec<Stump>,
    alphas: Vec<f64>,
}

impl Default for AdaboostClassifier {
    fn default() -> Self {
        Self::new(50)
    }
}

impl AdaboostClassifier {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            learning_rate: 1.0,
            stumps: Vec::new(),
            alphas: Vec::new(),
        }
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(CardioError::DimensionMismatch {
                expected: n_samples,
                actual: y.len(),
            });
        }
        if n_samples == 0 {
            return Err(CardioError::DataError("empty training set".to_string()));
        }

        self.stumps.clear();
        self.alphas.clear();

        let mut weights = Array1::from_elem(n_samples, 1.0 / n_samples as f64);

        for _ in 0..self.n_estimators {
            let stump = fit_stump(x, y, &weights);

            let mut error = 0.0;
            let mut misclassified = vec![false; n_samples];
            for i in 0..n_samples {
                let pred = stump.predict_row(x.row(i));
                if (pred - y[i]).abs() > 0.5 {
                    error += weights[i];
                    misclassified[i] = true;
                }
            }
            let error = error.clamp(1e-15, 1.0 - 1e-15);
            let alpha = self.learning_rate * ((1.0 - error) / error).ln();

            // A stump no better than chance contributes nothing further.
            if alpha <= 0.0 {
                if self.stumps.is_empty() {
                    self.stumps.push(stump);
                    self.alphas.push(0.0);
                }
                break;
            }

            for i in 0..n_samples {
                if misclassified[i] {
                    weights[i] *= alpha.exp();
                }
            }
            let total = weights.sum();
            if total > 0.0 {
                weights.mapv_inplace(|w| w / total);
            }

            self.stumps.push(stump);
            self.alphas.push(alpha);
        }

        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.stumps.is_empty() {
            return Err(CardioError::ModelNotFitted);
        }

        let preds = x
            .rows()
            .into_iter()
            .map(|row| {
                let mut vote_pos = 0.0;
                let mut vote_neg = 0.0;
                for (stump, &alpha) in self.stumps.iter().zip(self.alphas.iter()) {
                    if stump.predict_row(row) > 0.5 {
                        vote_pos += alpha;
                    } else {
                        vote_neg += alpha;
                    }
                }
                if vote_pos > vote_neg {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        Ok(preds)
    }
}

/// Find the stump minimizing weighted error across all features.
fn fit_stump(x: &Array2<f64>, y: &Array1<f64>, weights: &Array1<f64>) -> Stump {
    let n_features = x.ncols();

    let per_feature: Vec<(usize, StumpCandidate)> = (0..n_features)
        .into_par_iter()
        .map(|feature| (feature, best_stump_for_feature(x, y, weights, feature)))
        .collect();

    // Sequential scan keeps the winner deterministic under equal errors.
    let mut best_feature = 0;
    let mut best: StumpCandidate = (0.0, 0.0, f64::INFINITY);
    for (feature, candidate) in per_feature {
        if candidate.2 < best.2 {
            best_feature = feature;
            best = candidate;
        }
    }

    Stump {
        feature_index: best_feature,
        threshold: best.0,
        left_label: best.1,
    }
}

/// Sweep one feature in sorted order, tracking prefix weight sums per class.
/// Both stump orientations (left=0/right=1 and left=1/right=0) are evaluated
/// from the same prefix sums.
fn best_stump_for_feature(
    x: &Array2<f64>,
    y: &Array1<f64>,
    weights: &Array1<f64>,
    feature: usize,
) -> StumpCandidate {
    let n = x.nrows();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut w_pos_total = 0.0;
    let mut w_neg_total = 0.0;
    for i in 0..n {
        if y[i] > 0.5 {
            w_pos_total += weights[i];
        } else {
            w_neg_total += weights[i];
        }
    }

    // Degenerate stump sending everything right, as the starting candidate.
    let first_value = x[[order[0], feature]];
    let all_right_as_pos = w_neg_total;
    let all_right_as_neg = w_pos_total;
    let mut best: StumpCandidate = if all_right_as_pos <= all_right_as_neg {
        (first_value - 1.0, 0.0, all_right_as_pos)
    } else {
        (first_value - 1.0, 1.0, all_right_as_neg)
    };

    let mut w_pos_left = 0.0;
    let mut w_neg_left = 0.0;

    for pos in 0..n - 1 {
        let idx = order[pos];
        if y[idx] > 0.5 {
            w_pos_left += weights[idx];
        } else {
            w_neg_left += weights[idx];
        }

        let here = x[[idx, feature]];
        let next = x[[order[pos + 1], feature]];
        if (next - here).abs() < 1e-12 {
            continue;
        }
        let threshold = (here + next) / 2.0;

        // left=0, right=1: wrong when a positive falls left or a negative right
        let err_left_neg = w_pos_left + (w_neg_total - w_neg_left);
        // left=1, right=0: the mirror image
        let err_left_pos = w_neg_left + (w_pos_total - w_pos_left);

        if err_left_neg < best.2 {
            best = (threshold, 0.0, err_left_neg);
        }
        if err_left_pos < best.2 {
            best = (threshold, 1.0, err_left_pos);
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn stepped_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((20, 2), (0..40).map(|i| i as f64).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] >= 20.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_single_threshold_problem() {
        let (x, y) = stepped_data();
        let mut model = AdaboostClassifier::new(10);
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        assert_eq!(preds, y);
    }

    #[test]
    fn test_inverted_labels() {
        // Positive class on the low side forces the left_label=1 orientation.
        let x = Array2::from_shape_vec((10, 1), (0..10).map(|i| i as f64).collect()).unwrap();
        let y = array![1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0];

        let mut model = AdaboostClassifier::new(5);
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert_eq!(preds, y);
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let model = AdaboostClassifier::new(5);
        let x = array![[1.0]];
        assert!(matches!(
            model.predict(&x),
            Err(CardioError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_noisy_xor_needs_multiple_stumps() {
        // No single stump separates this; the ensemble should still fit the
        // majority structure.
        let x = array![
            [0.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.1, 0.1],
            [0.1, 0.9],
            [0.9, 0.1],
            [0.9, 0.9],
        ];
        let y = array![0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let mut model = AdaboostClassifier::new(50);
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count();
        assert!(correct >= 4, "correct = {}", correct);
    }

    #[test]
    fn test_mismatched_lengths() {
        let x = array![[1.0], [2.0]];
        let y = array![0.0];
        let mut model = AdaboostClassifier::new(5);
        assert!(matches!(
            model.fit(&x, &y),
            Err(CardioError::DimensionMismatch { .. })
        ));
    }
}
