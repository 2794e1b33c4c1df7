//! Random Forest implementation

use super::decision_tree::{Criterion, DecisionTree};
use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for the number of features drawn per tree
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

/// Per-class weighting applied during tree construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassWeight {
    /// All samples weigh the same
    Uniform,
    /// Inverse-frequency weights, so the minority class counts as much
    /// as the majority
    Balanced,
}

impl ClassWeight {
    /// Parse a class-weight name as it appears in hyperparameter grids.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "balanced" => Ok(ClassWeight::Balanced),
            "uniform" => Ok(ClassWeight::Uniform),
            other => Err(CardioError::InvalidParameter {
                name: "class_weight".to_string(),
                value: other.to_string(),
                reason: "expected 'balanced' or 'uniform'".to_string(),
            }),
        }
    }
}

/// Random Forest binary classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
    feature_indices_per_tree: Vec<Vec<usize>>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn per tree
    pub max_features: MaxFeatures,
    /// Per-class weighting
    pub class_weight: ClassWeight,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Random state
    pub random_state: Option<u64>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForestClassifier {
    /// Create a new forest with the given number of trees
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            feature_indices_per_tree: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            class_weight: ClassWeight::Uniform,
            criterion: Criterion::Gini,
            random_state: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set per-class weighting
    pub fn with_class_weight(mut self, class_weight: ClassWeight) -> Self {
        self.class_weight = class_weight;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn feature_count(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    /// Inverse-frequency weights over the full training labels,
    /// as (negative, positive).
    fn balanced_weights(y: &Array1<f64>) -> (f64, f64) {
        let n = y.len() as f64;
        let pos = y.iter().filter(|&&v| v > 0.5).count() as f64;
        let neg = n - pos;
        if pos == 0.0 || neg == 0.0 {
            return (1.0, 1.0);
        }
        (n / (2.0 * neg), n / (2.0 * pos))
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(CardioError::DimensionMismatch {
                expected: n_samples,
                actual: y.len(),
            });
        }

        self.n_features = n_features;
        let n_tree_features = self.feature_count(n_features);

        let (weight_neg, weight_pos) = match self.class_weight {
            ClassWeight::Uniform => (1.0, 1.0),
            ClassWeight::Balanced => Self::balanced_weights(y),
        };

        let base_seed = self.random_state.unwrap_or(42);

        let fitted: Result<Vec<(DecisionTree, Vec<usize>)>> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                // Bootstrap sample with replacement
                let sample_indices: Vec<usize> = (0..n_samples)
                    .map(|_| (rng.next_u64() as usize) % n_samples)
                    .collect();

                // Random feature subset for this tree
                let mut feature_indices: Vec<usize> = (0..n_features).collect();
                feature_indices.shuffle(&mut rng);
                feature_indices.truncate(n_tree_features);
                feature_indices.sort_unstable();

                let x_boot = x
                    .select(Axis(0), &sample_indices)
                    .select(Axis(1), &feature_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut tree = DecisionTree::new_classifier()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_criterion(self.criterion)
                    .with_class_weights(weight_neg, weight_pos);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit(&x_boot, &y_boot)?;
                Ok((tree, feature_indices))
            })
            .collect();

        let (trees, features): (Vec<_>, Vec<_>) = fitted?.into_iter().unzip();
        self.trees = trees;
        self.feature_indices_per_tree = features;

        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total = vec![0.0; self.n_features];
        for (tree, features) in self.trees.iter().zip(&self.feature_indices_per_tree) {
            if let Some(imp) = tree.feature_importances() {
                for (local, &global) in features.iter().enumerate() {
                    if local < imp.len() {
                        total[global] += imp[local];
                    }
                }
            }
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for v in &mut total {
                *v /= sum;
            }
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Make predictions by majority vote
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(CardioError::ModelNotFitted);
        }

        let per_tree: Result<Vec<Array1<f64>>> = self
            .trees
            .par_iter()
            .zip(self.feature_indices_per_tree.par_iter())
            .map(|(tree, features)| {
                let x_sub = x.select(Axis(1), features);
                tree.predict(&x_sub)
            })
            .collect();
        let per_tree = per_tree?;

        let n_trees = per_tree.len() as f64;
        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let votes: f64 = per_tree.iter().filter(|p| p[i] > 0.5).count() as f64;
                if votes * 2.0 > n_trees {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Fraction of trees voting for the positive class, per sample.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(CardioError::ModelNotFitted);
        }

        let per_tree: Result<Vec<Array1<f64>>> = self
            .trees
            .par_iter()
            .zip(self.feature_indices_per_tree.par_iter())
            .map(|(tree, features)| {
                let x_sub = x.select(Axis(1), features);
                tree.predict(&x_sub)
            })
            .collect();
        let per_tree = per_tree?;

        let n_trees = per_tree.len() as f64;
        let proba: Vec<f64> = (0..x.nrows())
            .map(|i| per_tree.iter().filter(|p| p[i] > 0.5).count() as f64 / n_trees)
            .collect();

        Ok(Array1::from_vec(proba))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
