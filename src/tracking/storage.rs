//! Storage backends for run tracking
//!
//! The local backend keeps a single `experiments.json` document mapping
//! experiment names to their run records, rewritten on every append. No
//! network client ships with this crate, so the remote backend only
//! reports itself unavailable; the reporter turns that into a warning.

use crate::error::{CardioError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Final status of a recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Finished,
    Failed,
}

/// One training run as recorded in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    /// Winning model family name
    pub model: String,
    /// Unix timestamp of the run
    pub started_at: u64,
    /// Hyperparameters, in declaration order
    pub params: Vec<(String, String)>,
    /// Evaluation metrics, in declaration order
    pub metrics: Vec<(String, f64)>,
    pub status: RunStatus,
}

impl RunRecord {
    pub fn new(model: impl Into<String>) -> Self {
        let started_at = current_timestamp();
        Self {
            run_id: format!("run_{}", started_at),
            model: model.into(),
            started_at,
            params: Vec::new(),
            metrics: Vec::new(),
            status: RunStatus::Finished,
        }
    }

    /// Set all hyperparameters at once.
    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    /// Append one metric.
    pub fn add_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.metrics.push((name.into(), value));
        self
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A sink for run records.
pub trait TrackingStore: Send + Sync {
    /// Append one run to the named experiment.
    fn append_run(&self, experiment: &str, run: &RunRecord) -> Result<()>;

    /// All recorded runs of the named experiment.
    fn load_runs(&self, experiment: &str) -> Result<Vec<RunRecord>>;

    /// Whether the store can accept records right now.
    fn is_available(&self) -> bool;
}

/// experiment name -> runs, as stored on disk.
type ExperimentsDoc = BTreeMap<String, Vec<RunRecord>>;

/// Local filesystem store: `<base_dir>/experiments.json`.
pub struct LocalFileStore {
    base_dir: PathBuf,
}

impl LocalFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let _ = fs::create_dir_all(&base_dir);
        Self { base_dir }
    }

    fn experiments_file(&self) -> PathBuf {
        self.base_dir.join("experiments.json")
    }

    fn load_doc(&self) -> Result<ExperimentsDoc> {
        let path = self.experiments_file();
        if !path.exists() {
            return Ok(ExperimentsDoc::new());
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| CardioError::TrackingError(format!("cannot read store: {}", e)))?;
        serde_json::from_str(&contents)
            .map_err(|e| CardioError::TrackingError(format!("corrupt store: {}", e)))
    }

    fn save_doc(&self, doc: &ExperimentsDoc) -> Result<()> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|e| CardioError::TrackingError(format!("cannot create store dir: {}", e)))?;
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| CardioError::TrackingError(format!("cannot encode store: {}", e)))?;
        fs::write(self.experiments_file(), json)
            .map_err(|e| CardioError::TrackingError(format!("cannot write store: {}", e)))
    }
}

impl TrackingStore for LocalFileStore {
    fn append_run(&self, experiment: &str, run: &RunRecord) -> Result<()> {
        let mut doc = self.load_doc()?;
        doc.entry(experiment.to_string())
            .or_default()
            .push(run.clone());
        self.save_doc(&doc)
    }

    fn load_runs(&self, experiment: &str) -> Result<Vec<RunRecord>> {
        Ok(self.load_doc()?.remove(experiment).unwrap_or_default())
    }

    fn is_available(&self) -> bool {
        fs::create_dir_all(&self.base_dir).is_ok()
    }
}

/// Remote tracking server placeholder: always unavailable.
pub struct RemoteStore {
    uri: String,
}

impl RemoteStore {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl TrackingStore for RemoteStore {
    fn append_run(&self, _experiment: &str, _run: &RunRecord) -> Result<()> {
        Err(CardioError::TrackingError(format!(
            "remote tracking server {} is not supported by this build",
            self.uri
        )))
    }

    fn load_runs(&self, _experiment: &str) -> Result<Vec<RunRecord>> {
        Err(CardioError::TrackingError(format!(
            "remote tracking server {} is not supported by this build",
            self.uri
        )))
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        let run = RunRecord::new("random_forest")
            .with_params(vec![("n_estimators".to_string(), "40".to_string())])
            .add_metric("accuracy", 0.91);
        store.append_run("exp", &run).unwrap();

        let runs = store.load_runs("exp").unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].model, "random_forest");
        assert_eq!(runs[0].metrics, vec![("accuracy".to_string(), 0.91)]);
        assert_eq!(runs[0].status, RunStatus::Finished);
    }

    #[test]
    fn test_appends_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.append_run("exp", &RunRecord::new("first")).unwrap();
        store.append_run("exp", &RunRecord::new("second")).unwrap();
        store.append_run("other", &RunRecord::new("third")).unwrap();

        assert_eq!(store.load_runs("exp").unwrap().len(), 2);
        assert_eq!(store.load_runs("other").unwrap().len(), 1);
        assert!(store.load_runs("absent").unwrap().is_empty());
    }

    #[test]
    fn test_run_id_prefix() {
        let run = RunRecord::new("model");
        assert!(run.run_id.starts_with("run_"));
    }

    #[test]
    fn test_remote_store_is_unavailable() {
        let store = RemoteStore::new("http://tracker:5000");
        assert!(!store.is_available());
        assert!(store.append_run("exp", &RunRecord::new("m")).is_err());
    }

    #[test]
    fn test_corrupt_store_surfaces_tracking_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        fs::write(store.experiments_file(), "not json").unwrap();

        let err = store.load_runs("exp").unwrap_err();
        assert!(matches!(err, CardioError::TrackingError(_)));
    }
}
