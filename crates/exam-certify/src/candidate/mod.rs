//! Candidate directory: identity, selected track and exam window bounds.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{ExamError, Result};
use crate::model::{CandidateId, TrackId};
use crate::time::secs_to_micros;

/// The fixed time bound within which a candidate must finish a track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExamWindow {
    pub started_at: u64,
    pub expires_at: u64,
}

impl ExamWindow {
    /// Open a window at `now`; expiry is always start + duration.
    pub fn open(now: u64, duration_secs: u64) -> Self {
        Self {
            started_at: now,
            expires_at: now.saturating_add(secs_to_micros(duration_secs)),
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at < now
    }
}

/// A pre-authenticated candidate as resolved at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub track: TrackId,
    /// Window bounds known to the directory, if any.
    #[serde(default)]
    pub window: Option<ExamWindow>,
}

/// Read-only view of candidates.
pub trait CandidateDirectory: Send + Sync {
    fn candidate(&self, id: &CandidateId) -> Result<Candidate>;

    /// Every candidate the sweep should consider.
    fn candidates(&self) -> Result<Vec<Candidate>>;
}

/// Directory held in memory, optionally loaded from a JSON array file.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    candidates: RwLock<BTreeMap<CandidateId, Candidate>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, candidate: Candidate) {
        self.candidates
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(candidate.id.clone(), candidate);
    }

    /// Load candidates from a JSON file containing an array of [`Candidate`].
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            ExamError::Configuration(format!("cannot read candidates {}: {e}", path.display()))
        })?;
        let list: Vec<Candidate> = serde_json::from_slice(&bytes).map_err(|e| {
            ExamError::Configuration(format!("invalid candidates {}: {e}", path.display()))
        })?;
        let dir = Self::new();
        for c in list {
            dir.insert(c);
        }
        Ok(dir)
    }
}

impl CandidateDirectory for InMemoryDirectory {
    fn candidate(&self, id: &CandidateId) -> Result<Candidate> {
        self.candidates
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| ExamError::NotFound(format!("candidate not found: {id}")))
    }

    fn candidates(&self) -> Result<Vec<Candidate>> {
        Ok(self
            .candidates
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect())
    }
}
