//! Data structures for module progress.

use serde::{Deserialize, Serialize};

use crate::model::{CandidateId, ExamKey, SubmissionId};

/// Progress status of one module. Ordering follows the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Locked,
    Unlocked,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is completing a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    /// Request-driven completion; requires the module to be in progress.
    Candidate,
    /// The grading engine; may overwrite an earlier completion (auto-zero correction).
    Grading,
    /// The expiry sweeper; completes any unfinished module with a zero.
    Sweep,
}

/// Per-candidate, per-module progress record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleProgress {
    pub candidate: CandidateId,
    pub exam: ExamKey,
    pub status: ProgressStatus,
    pub score: f64,
    pub max_score: f64,
    pub unlocked_at: Option<u64>,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    /// The submission whose outcome completed this module.
    pub submission: Option<SubmissionId>,
}

impl ModuleProgress {
    /// A fresh, locked progress record.
    pub fn locked(candidate: CandidateId, exam: ExamKey) -> Self {
        Self {
            candidate,
            exam,
            status: ProgressStatus::Locked,
            score: 0.0,
            max_score: 0.0,
            unlocked_at: None,
            started_at: None,
            completed_at: None,
            submission: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }
}
