//! Gradient boosting implementation
//!
//! Boosted shallow regression trees on the logistic loss. Each round fits
//! a tree to the negative gradient (label minus predicted probability) and
//! nudges the log-odds by a shrunken step.

use super::decision_tree::DecisionTree;
use crate::error::{CardioError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Gradient boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Row subsample ratio per round
    pub subsample: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: Some(42),
        }
    }
}

/// Gradient boosting binary classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_log_odds: f64,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_log_odds: 0.0,
        }
    }

    /// Fit binary classification
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

        let p = y.mean().unwrap_or(0.5).clamp(1e-7, 1.0 - 1e-7);
        self.initial_log_odds = (p / (1.0 - p)).ln();
        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();

        for _ in 0..self.config.n_estimators {
            let probs: Array1<f64> = log_odds.mapv(sigmoid);
            let residuals: Array1<f64> = y - &probs;

            let row_indices = self.subsample_indices(n_samples, &mut rng);

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);

            if row_indices.len() < n_samples {
                let x_sub = x.select(Axis(0), &row_indices);
                let r_sub: Array1<f64> =
                    Array1::from_vec(row_indices.iter().map(|&i| residuals[i]).collect());
                tree.fit(&x_sub, &r_sub)?;
            } else {
                tree.fit(x, &residuals)?;
            }

            // Every row moves, including rows left out of the subsample
            let step = tree.predict(x)?;
            log_odds = log_odds + self.config.learning_rate * &step;

            self.trees.push(tree);
        }

        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Predict positive-class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(CardioError::ModelNotFitted);
        }

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            let step = tree.predict(x)?;
            log_odds = log_odds + self.config.learning_rate * &step;
        }

        Ok(log_odds.mapv(sigmoid))
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil() as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size.max(1));
        indices.sort_unstable();
        indices
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((60, 2), (0..120).map(|i| i as f64 * 0.1).collect()).unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| if row[0] + row[1] > 12.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_classifier_learns() {
        let (x, y) = classification_data();
        let config = GradientBoostingConfig {
            n_estimators: 20,
            max_depth: 3,
            learning_rate: 0.2,
            ..Default::default()
        };

        let mut model = GradientBoostingClassifier::new(config);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&x).unwrap();
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count();
        let accuracy = correct as f64 / y.len() as f64;

        assert!(accuracy > 0.8, "Accuracy too low: {}", accuracy);
    }

    #[test]
    fn test_subsample_rounds() {
        let (x, y) = classification_data();
        let config = GradientBoostingConfig {
            n_estimators: 10,
            subsample: 0.7,
            random_state: Some(3),
            ..Default::default()
        };

        let mut model = GradientBoostingClassifier::new(config);
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let (x, y) = classification_data();
        let config = GradientBoostingConfig {
            n_estimators: 5,
            subsample: 0.8,
            random_state: Some(11),
            ..Default::default()
        };

        let mut a = GradientBoostingClassifier::new(config.clone());
        a.fit(&x, &y).unwrap();
        let mut b = GradientBoostingClassifier::new(config);
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_predict_unfitted() {
        let model = GradientBoostingClassifier::new(Default::default());
        let x = Array2::zeros((2, 2));
        assert!(matches!(
            model.predict(&x),
            Err(CardioError::ModelNotFitted)
        ));
    }
}
