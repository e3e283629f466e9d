//! Domain record persistence.
//!
//! Each domain is stored as a single JSON file named by the digest of its
//! key. The key itself is read from the file contents.
//!
//! File format:
//! ```json
//! {
//!     "version": 1,
//!     "record": { ... DomainRecord ... }
//! }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ExamError, Result};
use crate::model::{DomainKey, ModuleId, SubmissionId};

use super::record::DomainRecord;
use super::write_atomic;

// ── File format constants ─────────────────────────────────────────────────────

const DOMAIN_FILE_VERSION: u32 = 1;

const SUBMISSIONS_DIR: &str = "submissions";

// ── On-disk structures ────────────────────────────────────────────────────────

/// Wrapper written to disk for each domain.
#[derive(Debug, Serialize, Deserialize)]
struct DomainFile {
    version: u32,
    record: DomainRecord,
}

/// Where a submission lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionLocator {
    pub domain: DomainKey,
    pub module: ModuleId,
}

#[derive(Debug, Serialize, Deserialize)]
struct LocatorFile {
    version: u32,
    locator: SubmissionLocator,
}

// ── DomainStore ───────────────────────────────────────────────────────────────

/// Persistence for [`DomainRecord`]s.
///
/// `commit` is all-or-nothing for one record and performs a compare-and-set
/// on `revision`: it fails with `RevisionConflict` if the stored revision
/// differs from the one the caller loaded.
pub trait DomainStore: Send + Sync {
    fn load(&self, key: &DomainKey) -> Result<Option<DomainRecord>>;

    /// Persist `record` and bump its revision on success.
    fn commit(&self, record: &mut DomainRecord) -> Result<()>;

    fn locate_submission(&self, id: &SubmissionId) -> Result<Option<SubmissionLocator>>;
}

/// Filesystem-backed [`DomainStore`].
///
/// Writes are atomic per file. Cross-writer exclusion within a process is
/// the caller's job (see [`super::DomainLocks`]).
pub struct FileDomainStore {
    base_dir: PathBuf,
}

impl FileDomainStore {
    /// Create a store rooted at `base_dir`, creating directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Io` if the directories cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(base_dir.join(SUBMISSIONS_DIR))?;
        Ok(Self { base_dir })
    }

    fn domain_path(&self, key: &DomainKey) -> PathBuf {
        self.base_dir.join(format!("{}.json", key.digest()))
    }

    fn locator_path(&self, id: &SubmissionId) -> PathBuf {
        self.base_dir
            .join(SUBMISSIONS_DIR)
            .join(format!("{}.json", id.0))
    }

    fn read_domain(&self, path: &std::path::Path) -> Result<DomainRecord> {
        let bytes = std::fs::read(path)?;
        let file: DomainFile = serde_json::from_slice(&bytes).map_err(|e| {
            ExamError::InvalidFileFormat(format!(
                "failed to parse domain file {}: {e}",
                path.display()
            ))
        })?;
        Ok(file.record)
    }

    fn write_locators(&self, record: &DomainRecord) -> Result<()> {
        for (module, submission) in &record.submissions {
            let path = self.locator_path(&submission.id);
            if path.exists() {
                continue;
            }
            let file = LocatorFile {
                version: DOMAIN_FILE_VERSION,
                locator: SubmissionLocator {
                    domain: record.key.clone(),
                    module: module.clone(),
                },
            };
            let json = serde_json::to_vec_pretty(&file)
                .map_err(|e| ExamError::SerializationError(e.to_string()))?;
            write_atomic(&path, &json)?;
        }
        Ok(())
    }
}

impl DomainStore for FileDomainStore {
    fn load(&self, key: &DomainKey) -> Result<Option<DomainRecord>> {
        let path = self.domain_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let record = self.read_domain(&path)?;
        if &record.key != key {
            return Err(ExamError::InvalidFileFormat(format!(
                "domain file {} holds {} instead of {}",
                path.display(),
                record.key,
                key
            )));
        }
        Ok(Some(record))
    }

    fn commit(&self, record: &mut DomainRecord) -> Result<()> {
        let stored = self.load(&record.key)?.map(|r| r.revision).unwrap_or(0);
        if stored != record.revision {
            return Err(ExamError::RevisionConflict {
                expected: record.revision,
                found: stored,
            });
        }

        // Locators first: a locator pointing at a domain that does not hold
        // the submission yet resolves to NotFound, never to wrong data.
        self.write_locators(record)?;

        let mut next = record.clone();
        next.revision += 1;
        let file = DomainFile {
            version: DOMAIN_FILE_VERSION,
            record: next,
        };
        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| ExamError::SerializationError(e.to_string()))?;
        write_atomic(&self.domain_path(&record.key), &json)?;

        record.revision += 1;
        Ok(())
    }

    fn locate_submission(&self, id: &SubmissionId) -> Result<Option<SubmissionLocator>> {
        let path = self.locator_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path)?;
        let file: LocatorFile = serde_json::from_slice(&bytes).map_err(|e| {
            ExamError::InvalidFileFormat(format!(
                "failed to parse locator {}: {e}",
                path.display()
            ))
        })?;
        Ok(Some(file.locator))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
