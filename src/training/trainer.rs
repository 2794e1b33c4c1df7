//! End-to-end training orchestration
//!
//! Drives one full run: split the combined arrays into features and
//! labels, sweep the model catalog, gate the winner on held-out accuracy,
//! persist the artifact, and report the run. The phases are linear and a
//! trainer is single-use; build a fresh one per run.

use crate::error::{CardioError, Result};
use crate::export::{save_model, ModelMetadata};
use crate::tracking::{RunRecord, RunReporter};
use crate::utils::{split_features_labels, FEATURE_NAMES, TARGET_NAME};
use super::catalog::ModelKind;
use super::config::TrainerConfig;
use super::metrics::{evaluate_binary, Evaluation};
use super::search::SearchRunner;
use super::selection::{select, SelectionReport};
use ndarray::Array2;
use std::fmt;
use tracing::info;

/// Phase of a training run. Transitions are linear; a failed run stops in
/// the phase that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerState {
    Idle,
    SplittingInputs,
    Searching,
    Selecting,
    QualityGate,
    Persisting,
    Reporting,
    Done,
}

impl TrainerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainerState::Idle => "idle",
            TrainerState::SplittingInputs => "splitting_inputs",
            TrainerState::Searching => "searching",
            TrainerState::Selecting => "selecting",
            TrainerState::QualityGate => "quality_gate",
            TrainerState::Persisting => "persisting",
            TrainerState::Reporting => "reporting",
            TrainerState::Done => "done",
        }
    }
}

impl fmt::Display for TrainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-use pipeline runner
pub struct ModelTrainer {
    config: TrainerConfig,
    reporter: RunReporter,
    state: TrainerState,
    selection: Option<SelectionReport>,
    evaluation: Option<Evaluation>,
}

impl ModelTrainer {
    /// Create a trainer; the tracking backend is resolved here, once.
    pub fn new(config: TrainerConfig) -> Self {
        let reporter = RunReporter::new(&config.tracking);
        Self {
            config,
            reporter,
            state: TrainerState::Idle,
            selection: None,
            evaluation: None,
        }
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Catalog sweep results of a finished run.
    pub fn selection(&self) -> Option<&SelectionReport> {
        self.selection.as_ref()
    }

    /// Held-out evaluation of the persisted winner.
    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    /// Run the whole pipeline and return the winner's held-out accuracy.
    ///
    /// Both arrays carry the label in their last column. The quality gate
    /// sits before persistence and reporting: a winner below the threshold
    /// leaves no artifact and no tracked run.
    pub fn train(&mut self, train: Array2<f64>, test: Array2<f64>) -> Result<f64> {
        if self.state != TrainerState::Idle {
            return Err(CardioError::ConfigError(
                "training already ran; create a new trainer".to_string(),
            ));
        }

        self.transition(TrainerState::SplittingInputs);
        if train.ncols() != test.ncols() {
            return Err(CardioError::DimensionMismatch {
                expected: train.ncols(),
                actual: test.ncols(),
            });
        }
        let (x_train, y_train) = split_features_labels(&train)?;
        let (x_test, y_test) = split_features_labels(&test)?;

        self.transition(TrainerState::Searching);
        let runner = SearchRunner::new(self.config.cv_folds, self.config.seed);
        let report = select(&runner, &ModelKind::ALL, &x_train, &y_train, &x_test, &y_test)?;

        self.transition(TrainerState::Selecting);
        let accuracy = report.winner.accuracy;
        let winner_kind = report.winner.kind;

        self.transition(TrainerState::QualityGate);
        if accuracy < self.config.quality_threshold {
            return Err(CardioError::BelowQualityThreshold {
                score: accuracy,
                threshold: self.config.quality_threshold,
            });
        }

        self.transition(TrainerState::Persisting);
        let predictions = report.winner.model.predict(&x_test)?;
        let evaluation = evaluate_binary(&y_test, &predictions)?;

        let mut metadata = ModelMetadata::new(winner_kind.name())
            .with_features(feature_names_for(x_train.ncols()))
            .with_target(TARGET_NAME);
        for (name, value) in report.winner.params.to_string_pairs() {
            metadata = metadata.add_hyperparameter(name, value);
        }
        for (name, value) in evaluation.named_values() {
            metadata = metadata.add_metric(name, value);
        }
        save_model(&report.winner.model, metadata, &self.config.artifact_path)?;

        self.transition(TrainerState::Reporting);
        let mut record =
            RunRecord::new(winner_kind.name()).with_params(report.winner.params.to_string_pairs());
        for (name, value) in evaluation.named_values() {
            record = record.add_metric(name, value);
        }
        // Delivery is best-effort; a dead tracking sink never fails the run.
        self.reporter.report_best_effort(&record);

        self.transition(TrainerState::Done);
        self.selection = Some(report);
        self.evaluation = Some(evaluation);
        Ok(accuracy)
    }

    fn transition(&mut self, next: TrainerState) {
        info!(from = %self.state, to = %next, "trainer state change");
        self.state = next;
    }
}

/// Canonical clinical names when the width matches, positional otherwise.
fn feature_names_for(n_features: usize) -> Vec<String> {
    if n_features == FEATURE_NAMES.len() {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    } else {
        (0..n_features).map(|i| format!("feature_{i}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::load_model;
    use crate::tracking::TrackingConfig;
    use ndarray::Array2;

    /// Rows with a clean margin on the first feature; label in the last column.
    fn separable_frame(n_rows: usize) -> Array2<f64> {
        Array2::from_shape_fn((n_rows, 3), |(i, j)| {
            let label = (i % 2) as f64;
            match j {
                0 => {
                    if label > 0.5 {
                        8.0 + (i % 7) as f64
                    } else {
                        -8.0 - (i % 7) as f64
                    }
                }
                1 => (i % 5) as f64,
                _ => label,
            }
        })
    }

    fn test_config(dir: &std::path::Path) -> TrainerConfig {
        TrainerConfig::new(dir.join("model.bin"))
            .with_tracking(TrackingConfig::local(dir.join("mlruns"), "trainer-tests"))
    }

    #[test]
    fn test_end_to_end_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let artifact = config.artifact_path.clone();

        let mut trainer = ModelTrainer::new(config);
        let accuracy = trainer
            .train(separable_frame(100), separable_frame(24))
            .unwrap();

        assert!(accuracy >= 0.6);
        assert_eq!(trainer.state(), TrainerState::Done);
        assert!(artifact.exists());

        let (model, metadata) = load_model(&artifact).unwrap();
        assert_eq!(model.kind(), trainer.selection().unwrap().winner.kind);
        assert_eq!(metadata.feature_names, vec!["feature_0", "feature_1"]);
        assert_eq!(metadata.target_name, "target");
        assert!(metadata.metrics.contains_key("accuracy"));
    }

    #[test]
    fn test_quality_gate_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path()).with_quality_threshold(1.5);
        let artifact = config.artifact_path.clone();

        let mut trainer = ModelTrainer::new(config);
        let err = trainer
            .train(separable_frame(100), separable_frame(24))
            .unwrap_err();

        assert!(matches!(err, CardioError::BelowQualityThreshold { .. }));
        assert_eq!(trainer.state(), TrainerState::QualityGate);
        assert!(!artifact.exists());
        assert!(!dir.path().join("mlruns").join("experiments.json").exists());
    }

    #[test]
    fn test_mismatched_column_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = ModelTrainer::new(test_config(dir.path()));

        let train = separable_frame(20);
        let test = Array2::zeros((10, 4));
        let err = trainer.train(train, test).unwrap_err();
        assert!(matches!(
            err,
            CardioError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_single_column_inputs_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = ModelTrainer::new(test_config(dir.path()));

        let err = trainer
            .train(Array2::zeros((10, 1)), Array2::zeros((5, 1)))
            .unwrap_err();
        assert!(matches!(err, CardioError::DimensionMismatch { .. }));
        assert_eq!(trainer.state(), TrainerState::SplittingInputs);
    }

    #[test]
    fn test_dead_tracking_sink_does_not_fail_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path()).with_tracking(TrackingConfig {
            uri: crate::tracking::TrackingUri::Remote("http://mlflow.invalid:5000".to_string()),
            experiment: "trainer-tests".to_string(),
        });

        let mut trainer = ModelTrainer::new(config);
        let accuracy = trainer
            .train(separable_frame(100), separable_frame(24))
            .unwrap();
        assert!(accuracy >= 0.6);
        assert_eq!(trainer.state(), TrainerState::Done);
    }

    #[test]
    fn test_trainer_is_single_use() {
        let dir = tempfile::tempdir().unwrap();
        let mut trainer = ModelTrainer::new(test_config(dir.path()));
        trainer
            .train(separable_frame(100), separable_frame(24))
            .unwrap();

        let err = trainer
            .train(separable_frame(100), separable_frame(24))
            .unwrap_err();
        assert!(matches!(err, CardioError::ConfigError(_)));
    }
}
