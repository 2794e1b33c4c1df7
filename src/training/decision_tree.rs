//! Decision tree implementation
//!
//! CART-style recursive partitioning for binary labels, with optional
//! per-class sample weighting. The regression variant fits continuous
//! targets and backs the residual trees of the boosting ensembles.

use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Variance reduction (regression)
    Mse,
}

impl Criterion {
    /// Parse a criterion name as it appears in hyperparameter grids.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "gini" => Ok(Criterion::Gini),
            "entropy" => Ok(Criterion::Entropy),
            other => Err(CardioError::InvalidParameter {
                name: "criterion".to_string(),
                value: other.to_string(),
                reason: "expected 'gini' or 'entropy'".to_string(),
            }),
        }
    }
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Per-class weights (negative, positive), classification only
    class_weights: (f64, f64),
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
    is_classification: bool,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            class_weights: (1.0, 1.0),
            n_features: 0,
            feature_importances: None,
            is_classification: true,
        }
    }

    /// Create a new regression tree
    pub fn new_regressor() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Mse,
            class_weights: (1.0, 1.0),
            n_features: 0,
            feature_importances: None,
            is_classification: false,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set per-class sample weights as (negative, positive).
    pub fn with_class_weights(mut self, negative: f64, positive: f64) -> Self {
        self.class_weights = (negative, positive);
        self
    }

    fn sample_weight(&self, label: f64) -> f64 {
        if label > 0.5 {
            self.class_weights.1
        } else {
            self.class_weights.0
        }
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
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

        self.n_features = n_features;

        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();

        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.map_or(false, |d| depth >= d)
            || self.is_pure(y, indices);

        if should_stop {
            return TreeNode::Leaf {
                value: self.leaf_value(y, indices),
                n_samples,
            };
        }

        match self.find_best_split(x, y, indices) {
            Some(split) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, split.feature_idx]] <= split.threshold);

                if left_indices.len() < self.min_samples_leaf
                    || right_indices.len() < self.min_samples_leaf
                {
                    return TreeNode::Leaf {
                        value: self.leaf_value(y, indices),
                        n_samples,
                    };
                }

                importances[split.feature_idx] += split.weighted_gain;

                let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances));
                let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances));

                TreeNode::Split {
                    feature_idx: split.feature_idx,
                    threshold: split.threshold,
                    left,
                    right,
                    n_samples,
                }
            }
            None => TreeNode::Leaf {
                value: self.leaf_value(y, indices),
                n_samples,
            },
        }
    }

    /// Scan every feature in parallel; each feature sweeps its sorted values
    /// once, accumulating prefix statistics.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
    ) -> Option<BestSplit> {
        let n_features = x.ncols();
        let parent_impurity = self.node_impurity(y, indices);

        let candidates: Vec<Option<BestSplit>> = (0..n_features)
            .into_par_iter()
            .map(|feature_idx| self.scan_feature(x, y, indices, feature_idx, parent_impurity))
            .collect();

        candidates
            .into_iter()
            .flatten()
            .max_by(|a, b| {
                a.gain
                    .partial_cmp(&b.gain)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    fn scan_feature(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        feature_idx: usize,
        parent_impurity: f64,
    ) -> Option<BestSplit> {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            x[[a, feature_idx]]
                .partial_cmp(&x[[b, feature_idx]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let n = order.len();

        // Totals for the whole node
        let mut total = SplitStats::default();
        for &i in &order {
            total.add(y[i], self.sample_weight(y[i]));
        }

        let mut left = SplitStats::default();
        let mut best: Option<BestSplit> = None;

        for pos in 0..n - 1 {
            let idx = order[pos];
            left.add(y[idx], self.sample_weight(y[idx]));

            let here = x[[idx, feature_idx]];
            let next = x[[order[pos + 1], feature_idx]];
            if (next - here).abs() < 1e-12 {
                continue;
            }

            let left_count = pos + 1;
            let right_count = n - left_count;
            if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                continue;
            }

            let right = total.minus(&left);
            let wl = left.weight;
            let wr = right.weight;
            let wt = wl + wr;
            if wt <= 0.0 {
                continue;
            }

            let child_impurity = (wl * self.stats_impurity(&left, left_count)
                + wr * self.stats_impurity(&right, right_count))
                / wt;
            let gain = parent_impurity - child_impurity;

            if gain > 0.0 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(BestSplit {
                    feature_idx,
                    threshold: (here + next) / 2.0,
                    gain,
                    weighted_gain: wt * gain,
                });
            }
        }

        best
    }

    fn stats_impurity(&self, stats: &SplitStats, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        match self.criterion {
            Criterion::Gini => {
                let w = stats.weight;
                if w <= 0.0 {
                    return 0.0;
                }
                let p_pos = stats.pos_weight / w;
                let p_neg = 1.0 - p_pos;
                1.0 - p_pos * p_pos - p_neg * p_neg
            }
            Criterion::Entropy => {
                let w = stats.weight;
                if w <= 0.0 {
                    return 0.0;
                }
                let mut entropy = 0.0;
                for p in [stats.pos_weight / w, (w - stats.pos_weight) / w] {
                    if p > 0.0 {
                        entropy -= p * p.ln();
                    }
                }
                entropy
            }
            Criterion::Mse => {
                // Var = E[X^2] - E[X]^2
                let n = count as f64;
                stats.sq_sum / n - (stats.sum / n).powi(2)
            }
        }
    }

    fn node_impurity(&self, y: &Array1<f64>, indices: &[usize]) -> f64 {
        let mut stats = SplitStats::default();
        for &i in indices {
            stats.add(y[i], self.sample_weight(y[i]));
        }
        self.stats_impurity(&stats, indices.len())
    }

    fn is_pure(&self, y: &Array1<f64>, indices: &[usize]) -> bool {
        match indices.first() {
            None => true,
            Some(&first) => {
                let v = y[first];
                indices.iter().all(|&i| (y[i] - v).abs() < 1e-10)
            }
        }
    }

    fn leaf_value(&self, y: &Array1<f64>, indices: &[usize]) -> f64 {
        if indices.is_empty() {
            return 0.0;
        }
        if self.is_classification {
            let mut stats = SplitStats::default();
            for &i in indices {
                stats.add(y[i], self.sample_weight(y[i]));
            }
            if stats.pos_weight > stats.weight - stats.pos_weight {
                1.0
            } else {
                0.0
            }
        } else {
            indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64
        }
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(CardioError::ModelNotFitted)?;

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| Self::predict_row(root, row))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn predict_row(node: &TreeNode, row: ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if row[*feature_idx] <= *threshold {
                    Self::predict_row(left, row)
                } else {
                    Self::predict_row(right, row)
                }
            }
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

/// Prefix statistics for one side of a candidate split
#[derive(Debug, Clone, Copy, Default)]
struct SplitStats {
    /// Total sample weight
    weight: f64,
    /// Weight of positive-class samples
    pos_weight: f64,
    /// Target sum (regression)
    sum: f64,
    /// Target square sum (regression)
    sq_sum: f64,
}

impl SplitStats {
    fn add(&mut self, label: f64, weight: f64) {
        self.weight += weight;
        if label > 0.5 {
            self.pos_weight += weight;
        }
        self.sum += label;
        self.sq_sum += label * label;
    }

    fn minus(&self, other: &SplitStats) -> SplitStats {
        SplitStats {
            weight: self.weight - other.weight,
            pos_weight: self.pos_weight - other.pos_weight,
            sum: self.sum - other.sum,
            sq_sum: self.sq_sum - other.sq_sum,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
    weighted_gain: f64,
}
