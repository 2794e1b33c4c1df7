//! Trained-model artifact serialization
//!
//! The on-disk artifact is a bincode-encoded `SerializedModel` envelope:
//! magic bytes, format version, metadata, the bincode-encoded model payload,
//! and an FNV-1a checksum over the payload. Writes go through a same-
//! directory temp file followed by an atomic rename, so the artifact path
//! never holds a partial file.

use crate::error::{CardioError, Result};
use crate::training::FittedModel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Metadata stored alongside the model payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model family name
    pub name: String,
    /// Crate version that produced the artifact
    pub version: String,
    /// Training timestamp (RFC 3339)
    pub trained_at: String,
    /// Feature names, in column order
    pub feature_names: Vec<String>,
    /// Target column name
    pub target_name: String,
    /// Winning hyperparameters
    pub hyperparameters: HashMap<String, String>,
    /// Held-out evaluation metrics
    pub metrics: HashMap<String, f64>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: "model".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now().to_rfc3339(),
            feature_names: Vec::new(),
            target_name: "target".to_string(),
            hyperparameters: HashMap::new(),
            metrics: HashMap::new(),
        }
    }
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set feature names
    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.feature_names = features;
        self
    }

    /// Set target name
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_name = target.into();
        self
    }

    /// Add a hyperparameter
    pub fn add_hyperparameter(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.hyperparameters.insert(key.into(), value.into());
        self
    }

    /// Add an evaluation metric
    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

/// On-disk artifact envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedModel {
    /// Magic bytes for format detection
    pub magic: [u8; 4],
    /// Format version
    pub format_version: u32,
    pub metadata: ModelMetadata,
    /// Bincode-encoded model payload
    pub model_data: Vec<u8>,
    /// FNV-1a checksum over `model_data`
    pub checksum: u64,
}

impl SerializedModel {
    const MAGIC: [u8; 4] = *b"CARD";
    const VERSION: u32 = 1;

    pub fn new(metadata: ModelMetadata, model_data: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&model_data);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            model_data,
            checksum,
        }
    }

    /// FNV-1a over the payload bytes.
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        let mut hash = FNV_OFFSET;
        for byte in data {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }

    pub fn verify_checksum(&self) -> bool {
        Self::compute_checksum(&self.model_data) == self.checksum
    }
}

/// Same-directory temp path: `model.bin` -> `model.bin.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Persist a fitted model and its metadata to `path`, atomically.
///
/// Missing parent directories are created. Re-saving over an existing
/// artifact is allowed.
pub fn save_model(
    model: &FittedModel,
    metadata: ModelMetadata,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let fail = |reason: String| CardioError::PersistFailure {
        path: path.display().to_string(),
        reason,
    };

    let payload =
        bincode::serialize(model).map_err(|e| fail(format!("model encoding failed: {}", e)))?;
    let envelope = SerializedModel::new(metadata, payload);
    let bytes = bincode::serialize(&envelope)
        .map_err(|e| fail(format!("envelope encoding failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| fail(format!("cannot create parent directory: {}", e)))?;
        }
    }

    let tmp = temp_path(path);
    {
        let mut file =
            File::create(&tmp).map_err(|e| fail(format!("cannot create temp file: {}", e)))?;
        file.write_all(&bytes)
            .map_err(|e| fail(format!("write failed: {}", e)))?;
        file.sync_all()
            .map_err(|e| fail(format!("sync failed: {}", e)))?;
    }
    fs::rename(&tmp, path).map_err(|e| fail(format!("rename failed: {}", e)))?;

    debug!(path = %path.display(), bytes = bytes.len(), "artifact saved");
    Ok(())
}

/// Load a persisted model, verifying magic, version, and checksum.
pub fn load_model(path: impl AsRef<Path>) -> Result<(FittedModel, ModelMetadata)> {
    let path = path.as_ref();

    // A leftover temp file means an earlier save was interrupted after the
    // final artifact was already in place (or never completed). Either way
    // it is garbage now.
    let tmp = temp_path(path);
    if tmp.exists() {
        debug!(path = %tmp.display(), "removing stale temp artifact");
        let _ = fs::remove_file(&tmp);
    }

    let bytes = fs::read(path)?;
    let envelope: SerializedModel = bincode::deserialize(&bytes)
        .map_err(|e| CardioError::SerializationError(format!("corrupt artifact: {}", e)))?;

    if envelope.magic != SerializedModel::MAGIC {
        return Err(CardioError::SerializationError(
            "not a model artifact (bad magic bytes)".to_string(),
        ));
    }
    if envelope.format_version != SerializedModel::VERSION {
        return Err(CardioError::SerializationError(format!(
            "unsupported artifact format version {}",
            envelope.format_version
        )));
    }
    if !envelope.verify_checksum() {
        return Err(CardioError::SerializationError(
            "artifact checksum mismatch".to_string(),
        ));
    }

    let model: FittedModel = bincode::deserialize(&envelope.model_data)
        .map_err(|e| CardioError::SerializationError(format!("corrupt model payload: {}", e)))?;
    Ok((model, envelope.metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{HyperParams, ModelKind};
    use ndarray::{Array1, Array2};

    fn fitted_tree() -> FittedModel {
        let x = Array2::from_shape_vec((20, 2), (0..40).map(|i| i as f64).collect()).unwrap();
        let y: Array1<f64> = (0..20).map(|i| if i < 10 { 0.0 } else { 1.0 }).collect();
        ModelKind::DecisionTree
            .fit(&HyperParams::new(), &x, &y, 42)
            .unwrap()
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let model = fitted_tree();

        let metadata = ModelMetadata::new("decision_tree")
            .with_features(vec!["a".to_string(), "b".to_string()])
            .add_metric("accuracy", 0.95);
        save_model(&model, metadata, &path).unwrap();

        let (loaded, meta) = load_model(&path).unwrap();
        assert_eq!(meta.name, "decision_tree");
        assert_eq!(meta.feature_names, vec!["a", "b"]);
        assert_eq!(meta.metrics.get("accuracy"), Some(&0.95));
        assert_eq!(meta.target_name, "target");

        let x = Array2::from_shape_vec((4, 2), vec![0.0, 1.0, 5.0, 6.0, 30.0, 31.0, 38.0, 39.0])
            .unwrap();
        let before = model.predict(&x).unwrap();
        let after = loaded.predict(&x).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep/nested/artifacts/model.bin");
        save_model(&fitted_tree(), ModelMetadata::default(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_overwrite_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let model = fitted_tree();
        save_model(&model, ModelMetadata::new("first"), &path).unwrap();
        save_model(&model, ModelMetadata::new("second"), &path).unwrap();

        let (_, meta) = load_model(&path).unwrap();
        assert_eq!(meta.name, "second");
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        save_model(&fitted_tree(), ModelMetadata::default(), &path).unwrap();
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_stale_temp_cleaned_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        save_model(&fitted_tree(), ModelMetadata::default(), &path).unwrap();

        let tmp = temp_path(&path);
        fs::write(&tmp, b"leftover").unwrap();
        load_model(&path).unwrap();
        assert!(!tmp.exists());
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");

        let payload = bincode::serialize(&fitted_tree()).unwrap();
        let mut envelope = SerializedModel::new(ModelMetadata::default(), payload);
        envelope.checksum ^= 0xdead_beef;
        fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();

        let err = load_model(&path).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");

        let payload = bincode::serialize(&fitted_tree()).unwrap();
        let mut envelope = SerializedModel::new(ModelMetadata::default(), payload);
        envelope.magic = *b"NOPE";
        fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();

        let err = load_model(&path).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_unwritable_parent_is_persist_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"file").unwrap();

        let path = blocker.join("model.bin");
        let err = save_model(&fitted_tree(), ModelMetadata::default(), &path).unwrap_err();
        assert!(matches!(err, CardioError::PersistFailure { .. }));
    }

    #[test]
    fn test_missing_artifact_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, CardioError::IoError(_)));
    }
}
