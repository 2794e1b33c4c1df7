//! Best-model selection across the catalog
//!
//! Runs the grid search for every catalog family in declaration order and
//! keeps the single best fitted model. The argmax uses strict `>`, so the
//! earliest-declared family wins ties; losing models are dropped as soon
//! as they are beaten, keeping at most one refit model alive.

use crate::error::{CardioError, Result};
use super::catalog::ModelKind;
use super::search::{SearchOutcome, SearchRunner};
use ndarray::{Array1, Array2};
use std::cmp::Ordering;
use tracing::info;

/// Outcome of a full catalog sweep.
#[derive(Debug, Clone)]
pub struct SelectionReport {
    /// The winning family's search outcome, refit on the full training set.
    pub winner: SearchOutcome,
    /// Held-out accuracy per catalog entry, in catalog order.
    pub scores: Vec<(ModelKind, f64)>,
}

/// Search every family in `catalog` and pick the best by test accuracy.
pub fn select(
    runner: &SearchRunner,
    catalog: &[ModelKind],
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    x_test: &Array2<f64>,
    y_test: &Array1<f64>,
) -> Result<SelectionReport> {
    let mut best: Option<SearchOutcome> = None;
    let mut scores = Vec::with_capacity(catalog.len());

    for &kind in catalog {
        let outcome = runner.search(kind, x_train, y_train, x_test, y_test)?;
        info!(
            model = kind.name(),
            accuracy = outcome.accuracy,
            "catalog candidate evaluated"
        );
        scores.push((kind, outcome.accuracy));

        // Scores are NaN-free by construction; the partial_cmp fallback just
        // means a hypothetical NaN never beats the incumbent.
        let beats_incumbent = match &best {
            None => true,
            Some(incumbent) => matches!(
                outcome.accuracy.partial_cmp(&incumbent.accuracy),
                Some(Ordering::Greater)
            ),
        };
        if beats_incumbent {
            best = Some(outcome);
        }
    }

    let winner = best.ok_or(CardioError::NoViableModel)?;
    info!(
        model = winner.kind.name(),
        accuracy = winner.accuracy,
        "selected best model"
    );

    Ok(SelectionReport { winner, scores })
}
