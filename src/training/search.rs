//! Hyperparameter search for one model family
//!
//! Expands the family's grid, scores every candidate by stratified
//! cross-validated accuracy on the training set, refits the best candidate
//! on the full training set, and reports its held-out test accuracy.
//!
//! Candidates are scored in parallel, but scores land in a positional
//! vector and the argmax scan is sequential with strict `>`, so the first
//! candidate in expansion order wins ties no matter how the rayon pool
//! schedules the work.

use crate::error::{CardioError, Result};
use super::catalog::{FittedModel, HyperParams, ModelKind};
use super::cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
use super::metrics::evaluate_binary;
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use tracing::{debug, info};

/// The winning candidate of one family's grid search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub kind: ModelKind,
    /// Held-out test accuracy of the refit winner.
    pub accuracy: f64,
    pub params: HyperParams,
    pub model: FittedModel,
}

/// Grid search over one model family at a time.
#[derive(Debug, Clone)]
pub struct SearchRunner {
    folds: usize,
    seed: u64,
}

impl SearchRunner {
    pub fn new(folds: usize, seed: u64) -> Self {
        Self { folds, seed }
    }

    /// Run the full search for `kind`. Any candidate failure aborts the
    /// whole search; there are no partial results.
    pub fn search(
        &self,
        kind: ModelKind,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<SearchOutcome> {
        let candidates = kind.grid().expand();

        // A lone candidate needs no comparison, so families with an empty
        // (or single-combination) grid skip cross-validation entirely.
        let best_params = if candidates.len() < 2 {
            candidates.into_iter().next().unwrap_or_default()
        } else {
            self.best_by_cross_validation(kind, candidates, x_train, y_train)?
        };

        let model = kind
            .fit(&best_params, x_train, y_train, self.seed)
            .map_err(|e| CardioError::search_failure(kind.name(), e))?;
        let predictions = model
            .predict(x_test)
            .map_err(|e| CardioError::search_failure(kind.name(), e))?;
        let evaluation = evaluate_binary(y_test, &predictions)
            .map_err(|e| CardioError::search_failure(kind.name(), e))?;

        info!(
            model = kind.name(),
            params = %best_params,
            accuracy = evaluation.accuracy,
            "grid search finished"
        );

        Ok(SearchOutcome {
            kind,
            accuracy: evaluation.accuracy,
            params: best_params,
            model,
        })
    }

    fn best_by_cross_validation(
        &self,
        kind: ModelKind,
        mut candidates: Vec<HyperParams>,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
    ) -> Result<HyperParams> {
        let validator = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: self.folds,
            shuffle: true,
        })
        .with_random_state(self.seed);
        let splits = validator
            .split(x_train.nrows(), Some(y_train))
            .map_err(|e| CardioError::search_failure(kind.name(), e))?;

        let scores: Vec<Result<f64>> = candidates
            .par_iter()
            .map(|params| self.cv_score(kind, params, &splits, x_train, y_train))
            .collect();

        let mut best_idx = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (idx, score) in scores.into_iter().enumerate() {
            let score = score.map_err(|e| CardioError::search_failure(kind.name(), e))?;
            debug!(
                model = kind.name(),
                params = %candidates[idx],
                cv_accuracy = score,
                "scored candidate"
            );
            if score > best_score {
                best_idx = idx;
                best_score = score;
            }
        }

        Ok(candidates.swap_remove(best_idx))
    }

    /// Mean validation accuracy of one candidate across the folds.
    fn cv_score(
        &self,
        kind: ModelKind,
        params: &HyperParams,
        splits: &[CVSplit],
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<f64> {
        let mut fold_scores = Vec::with_capacity(splits.len());
        for split in splits {
            let x_fit = x.select(Axis(0), &split.train_indices);
            let y_fit = y.select(Axis(0), &split.train_indices);
            let x_val = x.select(Axis(0), &split.test_indices);
            let y_val = y.select(Axis(0), &split.test_indices);

            let model = kind.fit(params, &x_fit, &y_fit, self.seed)?;
            let predictions = model.predict(&x_val)?;
            fold_scores.push(evaluate_binary(&y_val, &predictions)?.accuracy);
        }
        Ok(CVResults::from_scores(fold_scores).mean_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 60 rows, cleanly separable on the first feature, balanced classes.
    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (60, 2),
            (0..120).map(|i| (i % 60) as f64 + (i % 7) as f64 * 0.1).collect(),
        )
        .unwrap();
        let y: Array1<f64> = (0..60).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
        // Make feature 0 carry the label signal.
        let mut x = x;
        for i in 0..60 {
            x[[i, 0]] = if y[i] > 0.5 {
                10.0 + (i % 10) as f64
            } else {
                -10.0 - (i % 10) as f64
            };
        }
        (x, y)
    }

    fn split_train_test(
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_train: usize,
    ) -> (Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>) {
        let train_idx: Vec<usize> = (0..n_train).collect();
        let test_idx: Vec<usize> = (n_train..x.nrows()).collect();
        (
            x.select(Axis(0), &train_idx),
            y.select(Axis(0), &train_idx),
            x.select(Axis(0), &test_idx),
            y.select(Axis(0), &test_idx),
        )
    }

    #[test]
    fn test_search_decision_tree_on_separable_data() {
        let (x, y) = separable_data();
        let (x_train, y_train, x_test, y_test) = split_train_test(&x, &y, 40);

        let runner = SearchRunner::new(3, 42);
        let outcome = runner
            .search(ModelKind::DecisionTree, &x_train, &y_train, &x_test, &y_test)
            .unwrap();

        assert_eq!(outcome.kind, ModelKind::DecisionTree);
        assert!(outcome.accuracy >= 0.9, "accuracy = {}", outcome.accuracy);
        assert!(outcome.params.get("criterion").is_some());
    }

    #[test]
    fn test_tie_break_prefers_first_candidate() {
        // Perfectly separable data: gini and entropy both reach CV accuracy
        // 1.0, so the first grid entry must win.
        let (x, y) = separable_data();
        let (x_train, y_train, x_test, y_test) = split_train_test(&x, &y, 40);

        let runner = SearchRunner::new(3, 42);
        let outcome = runner
            .search(ModelKind::DecisionTree, &x_train, &y_train, &x_test, &y_test)
            .unwrap();
        assert_eq!(outcome.params.str_or("criterion", ""), "gini");
    }

    #[test]
    fn test_empty_grid_skips_cross_validation() {
        // Two training rows cannot be 3-fold split; the default-only family
        // must still train because no cross-validation runs for it.
        let (x, y) = separable_data();
        let (x_train, y_train, _, _) = split_train_test(&x, &y, 2);
        let (_, _, x_test, y_test) = split_train_test(&x, &y, 40);

        let runner = SearchRunner::new(3, 42);
        let outcome = runner.search(
            ModelKind::LogisticRegression,
            &x_train,
            &y_train,
            &x_test,
            &y_test,
        );
        assert!(outcome.is_ok());
        assert!(outcome.unwrap().params.is_empty());
    }

    #[test]
    fn test_too_few_samples_is_search_failure() {
        let (x, y) = separable_data();
        let (x_train, y_train, x_test, y_test) = split_train_test(&x, &y, 2);

        let runner = SearchRunner::new(3, 42);
        let err = runner
            .search(ModelKind::DecisionTree, &x_train, &y_train, &x_test, &y_test)
            .unwrap_err();
        assert!(matches!(err, CardioError::SearchFailure { .. }));
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let (x, y) = separable_data();
        let (x_train, y_train, x_test, y_test) = split_train_test(&x, &y, 40);

        let run = || {
            SearchRunner::new(3, 7)
                .search(ModelKind::RandomForest, &x_train, &y_train, &x_test, &y_test)
                .unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.params, b.params);
        assert_eq!(a.accuracy, b.accuracy);
    }
}
