//! Sweep engine: closes out every unfinished module of one domain.

use crate::catalog::{self, QuestionCatalog};
use crate::error::Result;
use crate::model::ModuleId;
use crate::progress::{self, CompletionSource};
use crate::storage::DomainRecord;
use crate::submission::{self, Submission, SubmissionStatus};
use crate::time::secs_to_micros;

use super::types::DomainSweep;

/// Close out every module of `modules` that is not completed.
///
/// - No submission: create an empty, forced submission (score 0) and
///   complete the module with 0 against its max score.
/// - In-progress submission: force it to `submitted`.
/// - Progress not completed: complete it, with the graded total if the
///   submission is already graded and 0 otherwise.
///
/// `window_secs` back-dates `started_at` when the domain has no window.
pub fn sweep_domain(
    record: &mut DomainRecord,
    catalog: &dyn QuestionCatalog,
    modules: &[ModuleId],
    window_secs: u64,
    now: u64,
) -> Result<DomainSweep> {
    let mut changes = DomainSweep::default();
    let started_at = record
        .window
        .map(|w| w.started_at)
        .unwrap_or_else(|| now.saturating_sub(secs_to_micros(window_secs)));

    for module in modules {
        let exam = record.key.exam(module.clone());
        let completed = record.status(module) == progress::ProgressStatus::Completed;

        let (submission_id, score) = match record.submissions.get_mut(module) {
            None if completed => continue,
            None => {
                let mut created =
                    Submission::new(record.key.candidate.clone(), exam.clone(), started_at);
                submission::force_submit(&mut created, now);
                let id = created.id.clone();
                record.submissions.insert(module.clone(), created);
                changes.created.push(module.clone());
                (id, 0.0)
            }
            Some(existing) => {
                if submission::force_submit(existing, now) {
                    changes.forced.push(module.clone());
                }
                let score = if existing.status == SubmissionStatus::Graded {
                    existing.total_score
                } else {
                    0.0
                };
                (existing.id.clone(), score)
            }
        };

        if completed {
            continue;
        }

        let max_score = catalog::max_score(catalog, &exam)?;
        progress::complete(
            record,
            module,
            score,
            max_score,
            CompletionSource::Sweep,
            Some(submission_id),
            now,
        )?;
        changes.completed.push(module.clone());
    }

    Ok(changes)
}
