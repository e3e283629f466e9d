//! Certification aggregator: a pure function over a domain record.

use crate::catalog::{self, QuestionCatalog};
use crate::error::Result;
use crate::model::ModuleId;
use crate::storage::DomainRecord;
use crate::submission::Submission;

use super::types::*;

/// Scale a total to an average out of 20. Zero when there is nothing to score.
pub fn average_out_of_20(total_score: f64, total_max: f64) -> f64 {
    if total_max > 0.0 {
        total_score / total_max * 20.0
    } else {
        0.0
    }
}

/// The most recently graded submission for `module`.
pub fn latest_graded<'a>(record: &'a DomainRecord, module: &ModuleId) -> Option<&'a Submission> {
    record
        .submissions
        .values()
        .filter(|s| &s.exam.module == module && s.is_graded())
        .max_by_key(|s| s.graded_at.unwrap_or(0))
}

/// Evaluate the completion condition for the record's (candidate, track).
///
/// Expected modules are the track modules with published questions. The
/// track is complete when each has a graded submission; it passes when the
/// average out of 20 reaches `pass_mark` (inclusive).
pub fn evaluate(
    record: &DomainRecord,
    catalog: &dyn QuestionCatalog,
    pass_mark: f64,
) -> Result<Evaluation> {
    let track = &record.key.track;
    let expected = catalog::expected_modules(catalog, track)?;

    let mut missing = Vec::new();
    let mut modules = Vec::with_capacity(expected.len());
    for module in &expected {
        match latest_graded(record, module) {
            Some(submission) => {
                let exam = record.key.exam(module.clone());
                modules.push(ModuleScore {
                    module: module.clone(),
                    submission: submission.id.clone(),
                    total_score: submission.total_score,
                    max_score: catalog::max_score(catalog, &exam)?,
                    graded_at: submission.graded_at.unwrap_or(0),
                });
            }
            None => missing.push(module.clone()),
        }
    }

    if !missing.is_empty() {
        return Ok(Evaluation::Incomplete { missing });
    }

    let total_score: f64 = modules.iter().map(|m| m.total_score).sum();
    let total_max: f64 = modules.iter().map(|m| m.max_score).sum();
    let summary = ScoreSummary {
        total_score,
        total_max,
        average_out_of_20: average_out_of_20(total_score, total_max),
        pass_mark,
        modules,
    };

    if summary.is_passing() {
        Ok(Evaluation::Passing(summary))
    } else {
        Ok(Evaluation::Failing(summary))
    }
}
