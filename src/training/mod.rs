//! Model training module
//!
//! Everything between raw arrays and a persisted model:
//! - eight native binary classifiers (trees, boosters, KNN, logistic)
//! - the hyperparameter catalog and per-family grid search
//! - stratified cross-validation
//! - best-model selection across the catalog
//! - the end-to-end trainer driving search, quality gate, persistence
//!   and run reporting

mod catalog;
mod config;
mod metrics;
mod search;
mod selection;
mod trainer;
pub mod cross_validation;
pub mod decision_tree;
pub mod random_forest;
pub mod gradient_boosting;
pub mod xgboost;
pub mod catboost;
pub mod knn;
pub mod adaboost;
pub mod linear_models;

pub use catalog::{FittedModel, HyperGrid, HyperParams, ModelKind, ParamValue};
pub use config::{TrainerConfig, DEFAULT_CV_FOLDS, DEFAULT_QUALITY_THRESHOLD};
pub use metrics::{evaluate_binary, Evaluation};
pub use search::{SearchOutcome, SearchRunner};
pub use selection::{select, SelectionReport};
pub use trainer::{ModelTrainer, TrainerState};
pub use cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree};
pub use random_forest::{ClassWeight, RandomForestClassifier};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use xgboost::{XgboostClassifier, XgboostConfig};
pub use catboost::{CatboostClassifier, CatboostConfig};
pub use knn::{DistanceMetric, KnnClassifier, KnnConfig, WeightScheme};
pub use adaboost::AdaboostClassifier;
pub use linear_models::LogisticRegression;
