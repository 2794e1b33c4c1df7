//! Tracking configuration
//!
//! The tracking destination is resolved exactly once, at startup. Nothing
//! else in the pipeline reads the environment, so a mid-run environment
//! change cannot redirect where results land.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable naming the tracking destination.
pub const TRACKING_URI_ENV: &str = "CARDIO_TRACKING_URI";
/// Environment variable naming the experiment.
pub const EXPERIMENT_ENV: &str = "CARDIO_EXPERIMENT";

const DEFAULT_LOCAL_DIR: &str = "./mlruns";
const DEFAULT_EXPERIMENT: &str = "heart-disease";

/// Where run records go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingUri {
    /// A directory on the local filesystem.
    Local(PathBuf),
    /// A remote tracking server URI.
    Remote(String),
}

/// Resolved tracking destination and experiment name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingConfig {
    pub uri: TrackingUri,
    pub experiment: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            uri: TrackingUri::Local(PathBuf::from(DEFAULT_LOCAL_DIR)),
            experiment: DEFAULT_EXPERIMENT.to_string(),
        }
    }
}

impl TrackingConfig {
    /// A local file store rooted at `dir`.
    pub fn local(dir: impl Into<PathBuf>, experiment: impl Into<String>) -> Self {
        Self {
            uri: TrackingUri::Local(dir.into()),
            experiment: experiment.into(),
        }
    }

    /// Resolve from `CARDIO_TRACKING_URI` / `CARDIO_EXPERIMENT`. Unset or
    /// empty URI falls back to the local `./mlruns` store.
    pub fn from_env() -> Self {
        let uri = match env::var(TRACKING_URI_ENV) {
            Ok(raw) if !raw.trim().is_empty() => Self::parse_uri(raw.trim()),
            _ => TrackingUri::Local(PathBuf::from(DEFAULT_LOCAL_DIR)),
        };
        let experiment = match env::var(EXPERIMENT_ENV) {
            Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => DEFAULT_EXPERIMENT.to_string(),
        };
        Self { uri, experiment }
    }

    /// `file://` prefixes and bare paths are local; any other scheme is
    /// treated as a remote server.
    fn parse_uri(raw: &str) -> TrackingUri {
        if let Some(path) = raw.strip_prefix("file://") {
            return TrackingUri::Local(PathBuf::from(path));
        }
        if raw.contains("://") {
            return TrackingUri::Remote(raw.to_string());
        }
        TrackingUri::Local(PathBuf::from(raw))
    }
}
