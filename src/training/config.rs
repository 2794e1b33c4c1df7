//! Trainer configuration

use crate::tracking::TrackingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Test accuracy the selected model must reach before an artifact is written.
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.6;

/// Number of cross-validation folds used during grid search.
pub const DEFAULT_CV_FOLDS: usize = 3;

/// Configuration for the end-to-end training pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Where the winning model artifact is written
    pub artifact_path: PathBuf,

    /// Minimum test accuracy required before persisting
    pub quality_threshold: f64,

    /// Number of cross-validation folds during grid search
    pub cv_folds: usize,

    /// Random seed for reproducibility
    pub seed: u64,

    /// Experiment tracking backend
    pub tracking: TrackingConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            artifact_path: PathBuf::from("artifacts/model.bin"),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            cv_folds: DEFAULT_CV_FOLDS,
            seed: 42,
            tracking: TrackingConfig::default(),
        }
    }
}

impl TrainerConfig {
    /// Create a configuration writing its artifact to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_path: path.into(),
            ..Default::default()
        }
    }

    /// Builder method to set the quality threshold
    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    /// Builder method to set CV folds
    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// Builder method to set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the tracking backend
    pub fn with_tracking(mut self, tracking: TrackingConfig) -> Self {
        self.tracking = tracking;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainerConfig::default();
        assert_eq!(config.artifact_path, PathBuf::from("artifacts/model.bin"));
        assert_eq!(config.quality_threshold, 0.6);
        assert_eq!(config.cv_folds, 3);
    }

    #[test]
    fn test_builder_pattern() {
        let config = TrainerConfig::new("out/best.bin")
            .with_quality_threshold(0.75)
            .with_cv_folds(5)
            .with_seed(7);

        assert_eq!(config.artifact_path, PathBuf::from("out/best.bin"));
        assert_eq!(config.quality_threshold, 0.75);
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.seed, 7);
    }
}
