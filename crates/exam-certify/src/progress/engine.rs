//! Progress engine: unlock, start and complete over a domain record.
//!
//! All functions mutate the record in place and return a copy of the
//! resulting progress. Callers commit the record as one unit.

use crate::candidate::ExamWindow;
use crate::error::{ExamError, Result};
use crate::model::{ModuleId, SubmissionId};
use crate::storage::DomainRecord;

use super::types::*;

/// Position of `module` in the declared track order.
fn position(record: &DomainRecord, modules: &[ModuleId], module: &ModuleId) -> Result<usize> {
    modules
        .iter()
        .position(|m| m == module)
        .ok_or_else(|| ExamError::UnknownModule {
            track: record.key.track.clone(),
            module: module.clone(),
        })
}

/// First lower-order module that is not completed, if any.
fn blocking_prerequisite(
    record: &DomainRecord,
    modules: &[ModuleId],
    index: usize,
) -> Option<ModuleId> {
    modules[..index]
        .iter()
        .find(|m| record.status(m) != ProgressStatus::Completed)
        .cloned()
}

// ---------------------------------------------------------------------------
// Unlock
// ---------------------------------------------------------------------------

/// Fail with `ModuleLocked` while a lower-order module is not completed.
pub fn ensure_prerequisites(
    record: &DomainRecord,
    modules: &[ModuleId],
    module: &ModuleId,
) -> Result<()> {
    let index = position(record, modules, module)?;
    match blocking_prerequisite(record, modules, index) {
        Some(blocking) => Err(ExamError::ModuleLocked {
            module: module.clone(),
            blocking,
        }),
        None => Ok(()),
    }
}

/// Move a module from locked to unlocked.
///
/// `modules` is the track's declared order. Every lower-order module must be
/// completed. A module already unlocked or further along is returned as is.
pub fn unlock(
    record: &mut DomainRecord,
    modules: &[ModuleId],
    module: &ModuleId,
    now: u64,
) -> Result<ModuleProgress> {
    let index = position(record, modules, module)?;

    if record.status(module) >= ProgressStatus::Unlocked {
        return Ok(record.progress_mut(module).clone());
    }

    if let Some(blocking) = blocking_prerequisite(record, modules, index) {
        return Err(ExamError::ModuleLocked {
            module: module.clone(),
            blocking,
        });
    }

    let progress = record.progress_mut(module);
    progress.status = ProgressStatus::Unlocked;
    progress.unlocked_at = Some(now);
    Ok(progress.clone())
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// Move a module from unlocked to in progress.
///
/// The first start in a domain opens the exam window. Starting a module that
/// is already in progress returns the existing progress and window
/// unchanged. Fails once the window has expired.
pub fn start(
    record: &mut DomainRecord,
    modules: &[ModuleId],
    module: &ModuleId,
    now: u64,
    window_secs: u64,
) -> Result<(ModuleProgress, ExamWindow)> {
    let index = position(record, modules, module)?;

    if let Some(window) = record.window {
        if window.is_expired(now) {
            return Err(ExamError::WindowExpired(record.key.candidate.clone()));
        }
    }

    match record.status(module) {
        ProgressStatus::InProgress => {
            let window = *record
                .window
                .get_or_insert_with(|| ExamWindow::open(now, window_secs));
            return Ok((record.progress_mut(module).clone(), window));
        }
        ProgressStatus::Unlocked => {}
        other => {
            return Err(ExamError::InvalidTransition {
                module: module.clone(),
                from: other.as_str(),
                to: ProgressStatus::InProgress.as_str(),
            })
        }
    }

    if let Some(blocking) = blocking_prerequisite(record, modules, index) {
        return Err(ExamError::ModuleLocked {
            module: module.clone(),
            blocking,
        });
    }

    let window = *record
        .window
        .get_or_insert_with(|| ExamWindow::open(now, window_secs));

    let progress = record.progress_mut(module);
    progress.status = ProgressStatus::InProgress;
    if progress.started_at.is_none() {
        progress.started_at = Some(now);
    }
    Ok((progress.clone(), window))
}

// ---------------------------------------------------------------------------
// Complete
// ---------------------------------------------------------------------------

/// Complete a module with a score clamped to `[0, max_score]`.
///
/// Candidate-initiated completion requires the module to be in progress.
/// Only [`CompletionSource::Grading`] may overwrite a completed module.
pub fn complete(
    record: &mut DomainRecord,
    module: &ModuleId,
    score: f64,
    max_score: f64,
    source: CompletionSource,
    submission: Option<SubmissionId>,
    now: u64,
) -> Result<ModuleProgress> {
    let current = record.status(module);

    match (current, source) {
        (ProgressStatus::Completed, CompletionSource::Grading) => {}
        (ProgressStatus::Completed, _) => {
            return Err(ExamError::AlreadyCompleted(module.clone()));
        }
        (ProgressStatus::InProgress, CompletionSource::Candidate) => {}
        (other, CompletionSource::Candidate) => {
            return Err(ExamError::InvalidTransition {
                module: module.clone(),
                from: other.as_str(),
                to: ProgressStatus::Completed.as_str(),
            });
        }
        _ => {}
    }

    let max_score = if max_score.is_finite() { max_score.max(0.0) } else { 0.0 };
    let score = if score.is_finite() { score.clamp(0.0, max_score) } else { 0.0 };

    let progress = record.progress_mut(module);
    progress.status = ProgressStatus::Completed;
    progress.score = score;
    progress.max_score = max_score;
    progress.completed_at = Some(now);
    if submission.is_some() {
        progress.submission = submission;
    }
    Ok(progress.clone())
}
