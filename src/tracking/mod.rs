//! Experiment run tracking
//!
//! Records finished training runs (winning model, parameters, metrics) to a
//! local file store or, by configuration, a remote tracking server.
//! Reporting is strictly best-effort and can never fail the pipeline.

mod config;
mod reporter;
mod storage;

pub use config::{TrackingConfig, TrackingUri, EXPERIMENT_ENV, TRACKING_URI_ENV};
pub use reporter::RunReporter;
pub use storage::{LocalFileStore, RemoteStore, RunRecord, RunStatus, TrackingStore};
