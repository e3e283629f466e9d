//! Data structures for submissions.

use serde::{Deserialize, Serialize};

use crate::model::{submission_id, CandidateId, ExamKey, ExaminerId, QuestionId, SubmissionId};

/// Grading status of a submission. Ordering follows the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    InProgress,
    Submitted,
    UnderReview,
    Graded,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::Graded => "graded",
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate's answer to one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub question: QuestionId,
    pub answer: String,
}

impl Answer {
    pub fn new(question: QuestionId, answer: impl Into<String>) -> Self {
        Self {
            question,
            answer: answer.into(),
        }
    }
}

/// Examiner note for one graded question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExaminerNote {
    pub question: QuestionId,
    /// Score after capping to `[0, max_points]`.
    pub score: f64,
    /// Score as entered by the examiner.
    pub raw_score: f64,
    pub max_points: f64,
    pub feedback: Option<String>,
}

/// One candidate's attempt at one exam.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: SubmissionId,
    pub candidate: CandidateId,
    pub exam: ExamKey,
    /// Answers in the order the candidate first gave them.
    pub answers: Vec<Answer>,
    pub status: SubmissionStatus,
    pub started_at: u64,
    pub submitted_at: Option<u64>,
    pub graded_at: Option<u64>,
    /// Sum of capped per-question scores. Never supplied by an examiner.
    pub total_score: f64,
    pub notes: Vec<ExaminerNote>,
    pub examiner: Option<ExaminerId>,
    /// Set when the expiry sweep submitted on the candidate's behalf.
    pub forced: bool,
}

impl Submission {
    /// A fresh in-progress submission.
    pub fn new(candidate: CandidateId, exam: ExamKey, started_at: u64) -> Self {
        Self {
            id: submission_id(&candidate, &exam),
            candidate,
            exam,
            answers: Vec::new(),
            status: SubmissionStatus::InProgress,
            started_at,
            submitted_at: None,
            graded_at: None,
            total_score: 0.0,
            notes: Vec::new(),
            examiner: None,
            forced: false,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.status == SubmissionStatus::Graded
    }
}
