//! Best-effort run reporting
//!
//! Reporting is observability, not pipeline logic: every failure here is
//! logged at warn level and swallowed. The function name carries the
//! contract so no caller mistakes the returned bool for something that
//! needs handling.

use super::config::{TrackingConfig, TrackingUri};
use super::storage::{LocalFileStore, RemoteStore, RunRecord, TrackingStore};
use tracing::{info, warn};

/// Sends run records to the configured store.
pub struct RunReporter {
    store: Box<dyn TrackingStore>,
    experiment: String,
}

impl RunReporter {
    pub fn new(config: &TrackingConfig) -> Self {
        let store: Box<dyn TrackingStore> = match &config.uri {
            TrackingUri::Local(dir) => Box::new(LocalFileStore::new(dir.clone())),
            TrackingUri::Remote(uri) => Box::new(RemoteStore::new(uri.clone())),
        };
        Self {
            store,
            experiment: config.experiment.clone(),
        }
    }

    /// Record the run if the store cooperates. Failures are logged and
    /// swallowed; the bool only says whether the record landed.
    pub fn report_best_effort(&self, record: &RunRecord) -> bool {
        if !self.store.is_available() {
            warn!(
                experiment = %self.experiment,
                run_id = %record.run_id,
                "tracking store unavailable, run not recorded"
            );
            return false;
        }

        match self.store.append_run(&self.experiment, record) {
            Ok(()) => {
                info!(
                    experiment = %self.experiment,
                    run_id = %record.run_id,
                    model = %record.model,
                    "run recorded"
                );
                true
            }
            Err(e) => {
                warn!(
                    experiment = %self.experiment,
                    run_id = %record.run_id,
                    error = %e,
                    "run reporting failed, continuing"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::storage::RunStatus;

    #[test]
    fn test_report_to_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackingConfig::local(dir.path(), "exp");
        let reporter = RunReporter::new(&config);

        let record = RunRecord::new("random_forest").add_metric("accuracy", 0.9);
        assert!(reporter.report_best_effort(&record));

        let store = LocalFileStore::new(dir.path());
        let runs = store.load_runs("exp").unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Finished);
    }

    #[test]
    fn test_remote_failure_is_swallowed() {
        let config = TrackingConfig {
            uri: crate::tracking::TrackingUri::Remote("http://nowhere:5000".to_string()),
            experiment: "exp".to_string(),
        };
        let reporter = RunReporter::new(&config);

        // No panic, no error; just a false.
        assert!(!reporter.report_best_effort(&RunRecord::new("model")));
    }

    #[test]
    fn test_unwritable_store_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, b"a file, not a directory").unwrap();

        let config = TrackingConfig::local(&blocker, "exp");
        let reporter = RunReporter::new(&config);
        assert!(!reporter.report_best_effort(&RunRecord::new("model")));
    }
}
