//! The consistency-domain record: every row for one (candidate, track).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::candidate::ExamWindow;
use crate::certify::IssuanceRecord;
use crate::model::{DomainKey, ModuleId, SubmissionId};
use crate::progress::{ModuleProgress, ProgressStatus};
use crate::submission::Submission;

/// All progress, submissions and the issuance record of one candidate in
/// one track. Committed as a single unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainRecord {
    pub key: DomainKey,
    /// The candidate's exam window, opened by the first module start.
    pub window: Option<ExamWindow>,
    pub progress: BTreeMap<ModuleId, ModuleProgress>,
    /// At most one submission per module, keyed by module.
    pub submissions: BTreeMap<ModuleId, Submission>,
    pub certificate: Option<IssuanceRecord>,
    /// Incremented on every commit; used for compare-and-set.
    pub revision: u64,
}

impl DomainRecord {
    pub fn new(key: DomainKey) -> Self {
        Self {
            key,
            window: None,
            progress: BTreeMap::new(),
            submissions: BTreeMap::new(),
            certificate: None,
            revision: 0,
        }
    }

    /// Status of a module; modules never touched are locked.
    pub fn status(&self, module: &ModuleId) -> ProgressStatus {
        self.progress
            .get(module)
            .map(|p| p.status)
            .unwrap_or(ProgressStatus::Locked)
    }

    /// Progress for a module, inserting a locked record if absent.
    pub fn progress_mut(&mut self, module: &ModuleId) -> &mut ModuleProgress {
        let key = &self.key;
        self.progress
            .entry(module.clone())
            .or_insert_with(|| ModuleProgress::locked(key.candidate.clone(), key.exam(module.clone())))
    }

    pub fn submission(&self, module: &ModuleId) -> Option<&Submission> {
        self.submissions.get(module)
    }

    /// Find a submission by id.
    pub fn submission_by_id(&self, id: &SubmissionId) -> Option<&Submission> {
        self.submissions.values().find(|s| &s.id == id)
    }

    pub fn submission_by_id_mut(&mut self, id: &SubmissionId) -> Option<&mut Submission> {
        self.submissions.values_mut().find(|s| &s.id == id)
    }

    /// True when every listed module is completed.
    pub fn all_completed(&self, modules: &[ModuleId]) -> bool {
        modules
            .iter()
            .all(|m| self.status(m) == ProgressStatus::Completed)
    }
}
