//! Grading engine: validate, cap, total, and complete.

use std::collections::{HashMap, HashSet};

use crate::catalog::QuestionCatalog;
use crate::error::{ExamError, Result};
use crate::model::{ExaminerId, SubmissionId};
use crate::progress::{self, CompletionSource};
use crate::storage::DomainRecord;
use crate::submission::{ExaminerNote, SubmissionStatus};

use super::types::*;

/// Clamp a raw examiner score to `[0, max_points]`.
pub fn cap_score(raw: f64, max_points: f64) -> f64 {
    raw.min(max_points).max(0.0)
}

/// Grade a submission held in `record`.
///
/// The submission must be assigned to `examiner` and be under review. Every
/// graded question must be a published question of the submission's exam.
/// Nothing is mutated unless every grade validates.
///
/// The total is the sum of capped scores; `claimed_total` is only compared
/// and logged. A submission that is already graded is left untouched and
/// its existing total is returned with [`GradeDisposition::AlreadyGraded`].
pub fn grade_submission(
    record: &mut DomainRecord,
    catalog: &dyn QuestionCatalog,
    submission_id: &SubmissionId,
    examiner: &ExaminerId,
    grades: &[QuestionGrade],
    claimed_total: Option<f64>,
    now: u64,
) -> Result<GradeResult> {
    let submission = record
        .submission_by_id(submission_id)
        .ok_or_else(|| ExamError::NotFound(format!("submission not found: {submission_id}")))?;

    if submission.examiner.as_ref() != Some(examiner) {
        return Err(ExamError::ExaminerMismatch {
            submission: submission_id.clone(),
            examiner: examiner.clone(),
        });
    }

    let exam = submission.exam.clone();
    let questions = catalog.published_questions(&exam)?;
    let max_score: f64 = questions.iter().map(|q| f64::from(q.points)).sum();

    if submission.status == SubmissionStatus::Graded {
        log::debug!("submission {submission_id} already graded; reporting existing total");
        return Ok(GradeResult {
            submission: submission_id.clone(),
            total_score: submission.total_score,
            max_score,
            disposition: GradeDisposition::AlreadyGraded,
        });
    }

    if submission.status != SubmissionStatus::UnderReview {
        return Err(ExamError::InvalidStatus {
            submission: submission_id.clone(),
            expected: SubmissionStatus::UnderReview.as_str(),
            actual: submission.status.as_str(),
        });
    }

    let points: HashMap<_, _> = questions
        .iter()
        .map(|q| (q.id.clone(), f64::from(q.points)))
        .collect();

    let mut seen = HashSet::new();
    let mut notes = Vec::with_capacity(grades.len());
    for grade in grades {
        let max_points = *points
            .get(&grade.question)
            .ok_or_else(|| ExamError::UnknownQuestion {
                question: grade.question.clone(),
                exam: exam.clone(),
            })?;
        if !seen.insert(grade.question.clone()) {
            return Err(ExamError::DuplicateGrade(grade.question.clone()));
        }
        if !grade.raw_score.is_finite() {
            return Err(ExamError::InvalidScore {
                question: grade.question.clone(),
                raw: grade.raw_score,
            });
        }
        notes.push(ExaminerNote {
            question: grade.question.clone(),
            score: cap_score(grade.raw_score, max_points),
            raw_score: grade.raw_score,
            max_points,
            feedback: grade.feedback.clone(),
        });
    }

    let total_score: f64 = notes.iter().map(|n| n.score).sum();

    if let Some(claimed) = claimed_total {
        if (claimed - total_score).abs() > f64::EPSILON {
            log::warn!(
                "submission {submission_id}: examiner {examiner} claimed total {claimed}, \
                 server computed {total_score}"
            );
        }
    }

    let module = exam.module.clone();
    if let Some(submission) = record.submission_by_id_mut(submission_id) {
        submission.status = SubmissionStatus::Graded;
        submission.graded_at = Some(now);
        submission.total_score = total_score;
        submission.notes = notes;
    }

    progress::complete(
        record,
        &module,
        total_score,
        max_score,
        CompletionSource::Grading,
        Some(submission_id.clone()),
        now,
    )?;

    Ok(GradeResult {
        submission: submission_id.clone(),
        total_score,
        max_score,
        disposition: GradeDisposition::Graded,
    })
}
