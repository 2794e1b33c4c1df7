//! cardio-train - Heart-disease model selection and training
//!
//! This crate trains a binary heart-disease classifier end to end:
//! - Eight native model families with per-family hyperparameter grids
//! - Stratified cross-validated grid search and best-model selection
//! - A quality gate on held-out accuracy
//! - Atomic artifact persistence with integrity checks
//! - Best-effort experiment tracking
//!
//! # Modules
//!
//! ## Core pipeline
//! - [`training`] - Model families, grid search, selection, the trainer
//! - [`export`] - Artifact serialization and loading
//! - [`tracking`] - Experiment tracking (local file store)
//!
//! ## Support
//! - [`utils`] - CSV loading and feature/label splitting
//! - [`cli`] - Command-line interface
//! - [`error`] - Crate-wide error type

// Core error handling
pub mod error;

// Core pipeline
pub mod training;
pub mod export;
pub mod tracking;

// Utilities
pub mod utils;

// Services
pub mod cli;

pub use error::{CardioError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{CardioError, Result};

    // Training
    pub use crate::training::{
        evaluate_binary, Evaluation, FittedModel, HyperParams, ModelKind, ModelTrainer,
        SearchRunner, SelectionReport, TrainerConfig, TrainerState,
    };

    // Export
    pub use crate::export::{load_model, save_model, ModelMetadata};

    // Experiment tracking
    pub use crate::tracking::{RunRecord, RunReporter, TrackingConfig, TrackingUri};

    // Data utilities
    pub use crate::utils::{load_csv_matrix, split_features_labels, FEATURE_NAMES};
}
