//! Storage layer for consistency domains and certificate artifacts.
//!
//! # Directory layout
//!
//! ```text
//! {data_dir}/
//! ├── domains/
//! │   ├── {domain_digest}.json      one DomainRecord per (candidate, track)
//! │   └── submissions/
//! │       └── {submission_id}.json  locator: submission → domain
//! ├── certificates/
//! │   └── {domain_digest}.json      rendered, signed certificate
//! └── issuer.key
//! ```
//!
//! # Modules
//!
//! - [`record`]: the [`DomainRecord`] committed as one unit.
//! - [`domain_store`]: [`DomainStore`] trait and [`FileDomainStore`].
//! - [`locks`]: in-process per-domain lock table.
//! - [`artifact_store`]: [`ArtifactStore`] trait and [`FileArtifactStore`].

pub mod artifact_store;
pub mod domain_store;
pub mod locks;
pub mod record;

pub use artifact_store::{ArtifactStore, FileArtifactStore};
pub use domain_store::{DomainStore, FileDomainStore, SubmissionLocator};
pub use locks::DomainLocks;
pub use record::DomainRecord;

use std::path::Path;

use crate::error::Result;

/// Write `data` to `path` atomically using a sibling temporary file.
///
/// A crash during the write cannot leave a partially-written file visible
/// to readers.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;

    Ok(())
}
