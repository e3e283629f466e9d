//! Data structures for the expiry sweep.

use crate::model::{CandidateId, ModuleId, TrackId};

/// Changes applied to one domain by one sweep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainSweep {
    /// Modules that had no submission; an empty one was created.
    pub created: Vec<ModuleId>,
    /// Modules whose in-progress submission was force-submitted.
    pub forced: Vec<ModuleId>,
    /// Modules whose progress was completed by the sweep.
    pub completed: Vec<ModuleId>,
}

impl DomainSweep {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.forced.is_empty() && self.completed.is_empty()
    }
}

/// A candidate the sweep could not process. It stays eligible for the next run.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepFailure {
    pub candidate: CandidateId,
    pub track: TrackId,
    pub operation: &'static str,
    pub error: String,
}

/// Summary of one sweep run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    /// Candidates with an expired window and unfinished modules.
    pub examined: usize,
    /// Candidates whose sweep committed changes.
    pub processed: usize,
    pub failures: Vec<SweepFailure>,
}
