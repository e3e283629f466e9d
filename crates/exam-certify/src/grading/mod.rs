//! Grading: validation and capping of examiner scores.
//!
//! The grading module provides:
//! - Per-question score capping to `[0, points]`
//! - Server-side recomputation of submission totals
//! - Atomic update of the submission and its module progress

pub mod engine;
pub mod types;

pub use types::{GradeDisposition, GradeResult, GradingOutcome, QuestionGrade};

pub use engine::{cap_score, grade_submission};
