//! Data structures for grading.

use serde::{Deserialize, Serialize};

use crate::certify::Certification;
use crate::model::{QuestionId, SubmissionId};

/// An examiner's raw score for one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestionGrade {
    pub question: QuestionId,
    pub raw_score: f64,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl QuestionGrade {
    pub fn new(question: QuestionId, raw_score: f64) -> Self {
        Self {
            question,
            raw_score,
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }
}

/// Whether this call graded the submission or found it already graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeDisposition {
    Graded,
    /// A concurrent or repeated grading won; the existing total is reported.
    AlreadyGraded,
}

/// Result of applying a grade to a domain record.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeResult {
    pub submission: SubmissionId,
    /// Server-computed total. Never the client-claimed value.
    pub total_score: f64,
    pub max_score: f64,
    pub disposition: GradeDisposition,
}

/// What the examiner API reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingOutcome {
    pub submission: SubmissionId,
    pub total_score: f64,
    pub max_score: f64,
    pub disposition: GradeDisposition,
    pub certification: Certification,
}
