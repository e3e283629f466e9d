//! Submissions: candidate answers and their grading status.
//!
//! The submission module provides:
//! - Answer persistence with merge-by-question semantics
//! - Candidate submission and forced submission by the expiry sweep
//! - Assignment to an examiner for review

pub mod engine;
pub mod types;

pub use types::{Answer, ExaminerNote, Submission, SubmissionStatus};

pub use engine::{assign_for_review, force_submit, save_answers, submit};
