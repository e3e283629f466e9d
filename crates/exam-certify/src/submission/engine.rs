//! Submission engine: status transitions of a single submission.
//!
//! Transitions only move forward: in_progress → submitted → under_review →
//! graded. Grading itself lives in [`crate::grading`].

use crate::error::{ExamError, Result};
use crate::model::ExaminerId;

use super::types::*;

fn wrong_status(submission: &Submission, expected: SubmissionStatus) -> ExamError {
    ExamError::InvalidStatus {
        submission: submission.id.clone(),
        expected: expected.as_str(),
        actual: submission.status.as_str(),
    }
}

/// Merge answers into an in-progress submission.
///
/// An answer for a question already answered replaces the earlier one in
/// place; new questions are appended.
pub fn save_answers(submission: &mut Submission, answers: Vec<Answer>) -> Result<()> {
    if submission.status != SubmissionStatus::InProgress {
        return Err(wrong_status(submission, SubmissionStatus::InProgress));
    }

    for answer in answers {
        match submission
            .answers
            .iter_mut()
            .find(|a| a.question == answer.question)
        {
            Some(existing) => existing.answer = answer.answer,
            None => submission.answers.push(answer),
        }
    }
    Ok(())
}

/// Candidate submission. Returns `false` if the submission had already
/// left `in_progress` (the existing submission is kept as is).
pub fn submit(submission: &mut Submission, now: u64) -> bool {
    if submission.status != SubmissionStatus::InProgress {
        return false;
    }
    submission.status = SubmissionStatus::Submitted;
    submission.submitted_at = Some(now);
    true
}

/// Submission by the expiry sweep on the candidate's behalf.
pub fn force_submit(submission: &mut Submission, now: u64) -> bool {
    let changed = submit(submission, now);
    if changed {
        submission.forced = true;
    }
    changed
}

/// Route a submitted exam to an examiner.
///
/// Re-assigning to the same examiner is a no-op. Returns `true` when the
/// status changed.
pub fn assign_for_review(submission: &mut Submission, examiner: &ExaminerId) -> Result<bool> {
    match submission.status {
        SubmissionStatus::Submitted => {
            submission.status = SubmissionStatus::UnderReview;
            submission.examiner = Some(examiner.clone());
            Ok(true)
        }
        SubmissionStatus::UnderReview if submission.examiner.as_ref() == Some(examiner) => {
            Ok(false)
        }
        SubmissionStatus::UnderReview => Err(ExamError::ExaminerMismatch {
            submission: submission.id.clone(),
            examiner: examiner.clone(),
        }),
        _ => Err(wrong_status(submission, SubmissionStatus::Submitted)),
    }
}
