//! Oblivious-tree gradient boosting
//!
//! CatBoost-style boosting over symmetric (oblivious) trees: every node at a
//! given depth shares the same split, so a tree of depth d is just d
//! (feature, threshold) pairs plus 2^d leaf values. Prediction walks the
//! split list and accumulates a bit index into the leaf table.

use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for oblivious-tree boosting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatboostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 regularization on leaf values
    pub reg_lambda: f64,
    pub subsample: f64,
    pub random_state: Option<u64>,
}

impl Default for CatboostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            reg_lambda: 3.0,
            subsample: 1.0,
            random_state: Some(42),
        }
    }
}

/// A symmetric tree: one split per level, 2^depth leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SymmetricTree {
    splits: Vec<(usize, f64)>,
    leaf_values: Vec<f64>,
}

impl SymmetricTree {
    fn predict(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0usize;
        for &(feature, threshold) in &self.splits {
            idx = idx * 2 + usize::from(row[feature] > threshold);
        }
        self.leaf_values[idx.min(self.leaf_values.len() - 1)]
    }
}

fn build_symmetric_tree(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    indices: &[usize],
    config: &CatboostConfig,
) -> SymmetricTree {
    let n_features = x.ncols();
    let lambda = config.reg_lambda;

    let mut splits = Vec::with_capacity(config.max_depth);
    let mut buckets: Vec<Vec<usize>> = vec![indices.to_vec()];

    for _ in 0..config.max_depth {
        let best = (0..n_features)
            .into_par_iter()
            .filter_map(|feature| best_level_split(x, grad, hess, &buckets, feature, lambda))
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

        let Some((feature, threshold, gain)) = best else {
            break;
        };
        if gain <= 0.0 {
            break;
        }

        splits.push((feature, threshold));

        let mut next = Vec::with_capacity(buckets.len() * 2);
        for bucket in &buckets {
            let (right, left): (Vec<usize>, Vec<usize>) =
                bucket.iter().partition(|&&i| x[[i, feature]] > threshold);
            next.push(left);
            next.push(right);
        }
        buckets = next;
    }

    let leaf_values = buckets
        .iter()
        .map(|bucket| {
            if bucket.is_empty() {
                return 0.0;
            }
            let g: f64 = bucket.iter().map(|&i| grad[i]).sum();
            let h: f64 = bucket.iter().map(|&i| hess[i]).sum();
            -g / (h + lambda)
        })
        .collect();

    SymmetricTree {
        splits,
        leaf_values,
    }
}

/// Score one feature as the shared split for the current level. Candidate
/// thresholds are subsampled from the sorted unique values; the gain is the
/// regularized score improvement summed over every bucket.
fn best_level_split(
    x: &Array2<f64>,
    grad: &Array1<f64>,
    hess: &Array1<f64>,
    buckets: &[Vec<usize>],
    feature: usize,
    lambda: f64,
) -> Option<(usize, f64, f64)> {
    let mut values: Vec<f64> = buckets
        .iter()
        .flatten()
        .map(|&i| x[[i, feature]])
        .collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    values.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
    if values.len() < 2 {
        return None;
    }

    let step = (values.len() / 256).max(1);
    let mut best: Option<(usize, f64, f64)> = None;

    for threshold in values.iter().step_by(step) {
        let mut total_gain = 0.0;
        for bucket in buckets {
            if bucket.is_empty() {
                continue;
            }
            let (mut lg, mut lh, mut rg, mut rh) = (0.0, 0.0, 0.0, 0.0);
            for &i in bucket {
                if x[[i, feature]] > *threshold {
                    rg += grad[i];
                    rh += hess[i];
                } else {
                    lg += grad[i];
                    lh += hess[i];
                }
            }
            let parent_g = lg + rg;
            let parent_h = lh + rh;
            total_gain += (lg * lg) / (lh + lambda) + (rg * rg) / (rh + lambda)
                - (parent_g * parent_g) / (parent_h + lambda);
        }
        if best.as_ref().map_or(true, |b| total_gain > b.2) {
            best = Some((feature, *threshold, total_gain));
        }
    }

    best
}

/// Oblivious-tree boosting binary classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatboostClassifier {
    config: CatboostConfig,
    trees: Vec<SymmetricTree>,
    base_score: f64,
}

impl CatboostClassifier {
    pub fn new(config: CatboostConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            base_score: 0.0,
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
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

        let pos = y.iter().filter(|&&v| v > 0.5).count() as f64;
        let neg = (n_samples as f64 - pos).max(1e-10);
        self.base_score = (pos.max(1e-10) / neg).ln();
        let mut raw = Array1::from_elem(n_samples, self.base_score);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for _ in 0..self.config.n_estimators {
            let probs: Array1<f64> = raw.mapv(sigmoid);
            let grad: Array1<f64> = &probs - y;
            let hess: Array1<f64> = probs.mapv(|p| (p * (1.0 - p)).max(1e-16));

            let indices = subsample(&mut rng, n_samples, self.config.subsample);
            let tree = build_symmetric_tree(x, &grad, &hess, &indices, &self.config);

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
    let k = (((n as f64) * ratio).ceil() as usize).max(1);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}
