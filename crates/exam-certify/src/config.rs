//! Engine configuration.
//!
//! Loaded from a JSON file; every field has a default so a partial file is
//! valid.
//!
//! ```json
//! {
//!     "data_dir": "/var/lib/exam-certify",
//!     "exam_window_secs": 259200,
//!     "pass_mark": 10.0,
//!     "sweep_interval_secs": 300,
//!     "credential_ttl_secs": 900
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExamError, Result};
use crate::time::DEFAULT_EXAM_WINDOW_SECS;

/// Runtime configuration for [`crate::engine::ExamEngine`] and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory for domain records, artifacts and the issuer key.
    pub data_dir: PathBuf,
    /// Length of a candidate's exam window.
    pub exam_window_secs: u64,
    /// Minimum average, out of 20, for a track to be passed (inclusive).
    pub pass_mark: f64,
    /// How often `examctl sweep --watch` runs the expiry sweep.
    pub sweep_interval_secs: u64,
    /// Lifetime of cached payment gateway credentials.
    pub credential_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("exam-data"),
            exam_window_secs: DEFAULT_EXAM_WINDOW_SECS,
            pass_mark: 10.0,
            sweep_interval_secs: 300,
            credential_ttl_secs: 900,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Configuration` if the file is missing or invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ExamError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|e| {
            ExamError::Configuration(format!("invalid config {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.exam_window_secs == 0 {
            return Err(ExamError::Configuration(
                "exam_window_secs must be > 0".into(),
            ));
        }
        if !self.pass_mark.is_finite() || !(0.0..=20.0).contains(&self.pass_mark) {
            return Err(ExamError::Configuration(format!(
                "pass_mark must be within 0-20, got {}",
                self.pass_mark
            )));
        }
        Ok(())
    }

    pub fn domains_dir(&self) -> PathBuf {
        self.data_dir.join("domains")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_dir.join("certificates")
    }

    pub fn issuer_key_path(&self) -> PathBuf {
        self.data_dir.join("issuer.key")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("catalog.json")
    }

    pub fn candidates_path(&self) -> PathBuf {
        self.data_dir.join("candidates.json")
    }
}
