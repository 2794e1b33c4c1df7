//! Second-order gradient boosting
//!
//! Boosting in the XGBoost style: both the gradient and the hessian of the
//! logistic loss drive tree construction, leaf weights are L2-regularized
//! (w* = -G / (H + lambda)), and splits are scored with the gain formula
//! 0.5 * [GL^2/(HL+l) + GR^2/(HR+l) - (GL+GR)^2/(HL+HR+l)] - gamma.

use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for second-order boosting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XgboostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub random_state: Option<u64>,
}

impl Default for XgboostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            gamma: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            random_state: Some(42),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum BoostNode {
    Leaf {
        weight: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<BoostNode>,
        right: Box<BoostNode>,
    },
}

impl BoostNode {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        match self {
            BoostNode::Leaf { weight } => *weight,
            BoostNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }
}

fn build_boost_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature_indices: &[usize],
    depth: usize,
    config: &XgboostConfig,
) -> BoostNode {
    let n = indices.len();

    let g_sum: f64 = indices.iter().map(|&i| grad[i]).sum();
    let h_sum: f64 = indices.iter().map(|&i| hess[i]).sum();
    let leaf_weight = -g_sum / (h_sum + config.reg_lambda);

    if depth >= config.max_depth || n < 2 || h_sum < config.min_child_weight {
        return BoostNode::Leaf {
            weight: leaf_weight,
        };
    }

    let best = feature_indices
        .par_iter()
        .filter_map(|&feature| best_split_for_feature(x, grad, hess, indices, feature, config))
        .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

    match best {
        Some((feature, threshold, gain)) if gain > config.gamma => {
            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
                indices.iter().partition(|&&i| x[[i, feature]] <= threshold);

            if left_idx.is_empty() || right_idx.is_empty() {
                return BoostNode::Leaf {
                    weight: leaf_weight,
                };
            }

            let left = build_boost_tree(x, grad, hess, &left_idx, feature_indices, depth + 1, config);
            let right =
                build_boost_tree(x, grad, hess, &right_idx, feature_indices, depth + 1, config);

            BoostNode::Split {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
        _ => BoostNode::Leaf {
            weight: leaf_weight,
        },
    }
}

/// Exact greedy split search over one feature: sort once, sweep prefix
/// gradient/hessian sums.
fn best_split_for_feature(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    feature: usize,
    config: &XgboostConfig,
) -> Option<(usize, f64, f64)> {
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let g_total: f64 = sorted.iter().map(|&i| grad[i]).sum();
    let h_total: f64 = sorted.iter().map(|&i| hess[i]).sum();
    let lambda = config.reg_lambda;
    let parent_score = (g_total * g_total) / (h_total + lambda);

    let mut g_left = 0.0;
    let mut h_left = 0.0;
    let mut best: Option<(usize, f64, f64)> = None;

    for pos in 0..sorted.len() - 1 {
        let idx = sorted[pos];
        g_left += grad[idx];
        h_left += hess[idx];

        let here = x[[idx, feature]];
        let next = x[[sorted[pos + 1], feature]];
        if (next - here).abs() < 1e-12 {
            continue;
        }

        let g_right = g_total - g_left;
        let h_right = h_total - h_left;
        if h_left < config.min_child_weight || h_right < config.min_child_weight {
            continue;
        }

        let gain = 0.5
            * ((g_left * g_left) / (h_left + lambda) + (g_right * g_right) / (h_right + lambda)
                - parent_score);

        if best.as_ref().map_or(true, |b| gain > b.2) {
            best = Some((feature, (here + next) / 2.0, gain));
        }
    }

    best
}

/// Second-order boosting binary classifier (logistic loss)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XgboostClassifier {
    config: XgboostConfig,
    trees: Vec<BoostNode>,
    base_score: f64,
}

impl XgboostClassifier {
    pub fn new(config: XgboostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        if n_samples != y.len() {
            return Err(CardioError::DimensionMismatch {
                expected: n_samples,
                actual: y.len(),
            });
        }
        if n_samples == 0 {
            return Err(CardioError::DataError("empty training set".to_string()));
        }

        // Base score in log-odds space
        let p = y.mean().unwrap_or(0.5).clamp(1e-7, 1.0 - 1e-7);
        self.base_score = (p / (1.0 - p)).ln();
        let mut raw = Array1::from_elem(n_samples, self.base_score);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for _ in 0..self.config.n_estimators {
            // Logistic loss: grad = p - y, hess = p * (1 - p)
            let probs: Array1<f64> = raw.mapv(sigmoid);
            let grad: Array1<f64> = &probs - y;
            let hess: Array1<f64> = probs.mapv(|p| (p * (1.0 - p)).max(1e-7));

            let row_indices = subsample(&mut rng, n_samples, self.config.subsample);
            let col_indices = subsample(&mut rng, n_features, self.config.colsample_bytree);

            let tree = build_boost_tree(x, &grad, &hess, &row_indices, &col_indices, 0, &self.config);

            for i in 0..n_samples {
                raw[i] += self.config.learning_rate * tree.predict(x.row(i));
            }

            self.trees.push(tree);
        }

        Ok(())
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(CardioError::ModelNotFitted);
        }

        let mut raw = Array1::from_elem(x.nrows(), self.base_score);
        for (i, row) in x.rows().into_iter().enumerate() {
            for tree in &self.trees {
                raw[i] += self.config.learning_rate * tree.predict(row);
            }
        }
        Ok(raw.mapv(sigmoid))
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn subsample(rng: &mut Xoshiro256PlusPlus, n: usize, ratio: f64) -> Vec<usize> {
    if ratio >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64) * ratio).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k.max(1));
    indices.sort_unstable();
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((50, 2), (0..100).map(|i| i as f64 * 0.1).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|r| if r[0] + r[1] > 10.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_classifier_learns() {
        let (x, y) = classification_data();
        let mut model = XgboostClassifier::new(XgboostConfig {
            n_estimators: 30,
            max_depth: 4,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        let acc = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(acc >= 0.85, "accuracy = {}", acc);
    }

    #[test]
    fn test_predict_proba_bounds() {
        let (x, y) = classification_data();
        let mut model = XgboostClassifier::new(XgboostConfig {
            n_estimators: 10,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.len(), x.nrows());
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_learning_rate_changes_model() {
        let (x, y) = classification_data();

        let mut slow = XgboostClassifier::new(XgboostConfig {
            n_estimators: 5,
            learning_rate: 0.01,
            ..Default::default()
        });
        slow.fit(&x, &y).unwrap();

        let mut fast = XgboostClassifier::new(XgboostConfig {
            n_estimators: 5,
            learning_rate: 0.3,
            ..Default::default()
        });
        fast.fit(&x, &y).unwrap();

        let p_slow = slow.predict_proba(&x).unwrap();
        let p_fast = fast.predict_proba(&x).unwrap();
        assert!(p_slow
            .iter()
            .zip(p_fast.iter())
            .any(|(a, b)| (a - b).abs() > 1e-6));
    }

    #[test]
    fn test_regularization_shrinks_leaves() {
        let (x, y) = classification_data();
        let mut model = XgboostClassifier::new(XgboostConfig {
            n_estimators: 10,
            reg_lambda: 100.0,
            gamma: 1.0,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();
        assert_eq!(preds.len(), 50);
    }
}
