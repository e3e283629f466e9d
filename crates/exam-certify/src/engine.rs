//! The exam engine: transactional entry point for every operation.
//!
//! Each operation resolves its consistency domain (candidate, track), takes
//! the domain lock, loads the record, applies one of the pure engines
//! (progress, submission, grading, sweep, certify) and commits the record as
//! a single unit. Certification re-evaluation after grading or sweeping runs
//! under the same lock, so two concurrent gradings of the last modules can
//! never both observe "not yet issued".

use std::sync::Arc;

use serde::Serialize;

use crate::candidate::{Candidate, CandidateDirectory, ExamWindow};
use crate::catalog::{CandidateQuestion, QuestionCatalog};
use crate::certify::{self, CertificateIssuer, Certification, Evaluation, IssuanceRecord};
use crate::config::EngineConfig;
use crate::crypto::IssuerKey;
use crate::error::{ExamError, Result};
use crate::gateway::{OpenAccess, UnlockAuthorizer};
use crate::grading::{self, GradingOutcome, QuestionGrade};
use crate::model::{CandidateId, CertificateId, DomainKey, ExaminerId, ModuleId, SubmissionId, TrackId};
use crate::progress::{self, CompletionSource, ModuleProgress, ProgressStatus};
use crate::storage::{
    DomainLocks, DomainRecord, DomainStore, FileArtifactStore, FileDomainStore,
};
use crate::submission::{self, Answer, Submission, SubmissionStatus};
use crate::sweep::{self, SweepFailure, SweepReport};
use crate::time::now_micros;

// ── Candidate-facing views ────────────────────────────────────────────────────

/// Status of one module as shown to a candidate: final status and score only.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModuleStatusView {
    pub module: ModuleId,
    pub status: ProgressStatus,
    pub submission: Option<SubmissionStatus>,
    /// Present once the module is completed.
    pub score: Option<f64>,
    pub max_score: Option<f64>,
}

/// A candidate's view of their track.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CandidateStatus {
    pub candidate: CandidateId,
    pub track: TrackId,
    pub window: Option<ExamWindow>,
    pub modules: Vec<ModuleStatusView>,
    pub certificate: Option<CertificateId>,
}

// ── ExamEngine ────────────────────────────────────────────────────────────────

/// Exam lifecycle and grading engine.
pub struct ExamEngine {
    config: EngineConfig,
    catalog: Arc<dyn QuestionCatalog>,
    directory: Arc<dyn CandidateDirectory>,
    authorizer: Arc<dyn UnlockAuthorizer>,
    store: Arc<dyn DomainStore>,
    issuer: CertificateIssuer,
    locks: DomainLocks,
}

impl ExamEngine {
    /// Build an engine from explicit collaborators. Unlocks are open until
    /// [`ExamEngine::with_authorizer`] installs a gateway.
    pub fn new(
        config: EngineConfig,
        catalog: Arc<dyn QuestionCatalog>,
        directory: Arc<dyn CandidateDirectory>,
        store: Arc<dyn DomainStore>,
        issuer: CertificateIssuer,
    ) -> Self {
        Self {
            config,
            catalog,
            directory,
            authorizer: Arc::new(OpenAccess),
            store,
            issuer,
            locks: DomainLocks::new(),
        }
    }

    /// Build an engine with file-backed stores under `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Io` if the data directories cannot be created, or
    /// `ExamError::InvalidKey` if the issuer key file is corrupt.
    pub fn open(
        config: EngineConfig,
        catalog: Arc<dyn QuestionCatalog>,
        directory: Arc<dyn CandidateDirectory>,
    ) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(FileDomainStore::new(config.domains_dir())?);
        let artifacts = Arc::new(FileArtifactStore::new(config.artifacts_dir())?);
        let key = IssuerKey::load_or_generate(&config.issuer_key_path())?;
        let issuer = CertificateIssuer::new(artifacts, key);
        Ok(Self::new(config, catalog, directory, store, issuer))
    }

    /// Replace the unlock authorizer.
    pub fn with_authorizer(mut self, authorizer: Arc<dyn UnlockAuthorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn issuer(&self) -> &CertificateIssuer {
        &self.issuer
    }

    // ── Transactions ──────────────────────────────────────────────────────

    fn load_or_new(&self, key: &DomainKey) -> Result<DomainRecord> {
        Ok(self
            .store
            .load(key)?
            .unwrap_or_else(|| DomainRecord::new(key.clone())))
    }

    /// Run `f` on the domain record and commit if it changed. The caller
    /// must hold the domain lock. Nothing is written when `f` fails.
    fn apply_locked<T>(
        &self,
        key: &DomainKey,
        f: impl FnOnce(&mut DomainRecord) -> Result<T>,
    ) -> Result<T> {
        let mut record = self.load_or_new(key)?;
        let before = record.clone();
        let value = f(&mut record)?;
        if record != before {
            self.store.commit(&mut record)?;
        }
        Ok(value)
    }

    /// Lock the domain and run [`Self::apply_locked`].
    fn transact<T>(
        &self,
        key: &DomainKey,
        f: impl FnOnce(&mut DomainRecord) -> Result<T>,
    ) -> Result<T> {
        let lock = self.locks.handle(key);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        self.apply_locked(key, f)
    }

    fn domain_of(&self, candidate: &CandidateId) -> Result<(Candidate, DomainKey)> {
        let candidate = self.directory.candidate(candidate)?;
        let key = DomainKey::new(candidate.id.clone(), candidate.track.clone());
        Ok((candidate, key))
    }

    fn locate(&self, id: &SubmissionId) -> Result<DomainKey> {
        self.store
            .locate_submission(id)?
            .map(|locator| locator.domain)
            .ok_or_else(|| ExamError::NotFound(format!("submission not found: {id}")))
    }

    /// Fill in the window from the directory when the domain has none.
    fn adopt_window(record: &mut DomainRecord, candidate: &Candidate) {
        if record.window.is_none() {
            record.window = candidate.window;
        }
    }

    fn ensure_open(record: &DomainRecord, now: u64) -> Result<()> {
        match record.window {
            Some(window) if window.is_expired(now) => {
                Err(ExamError::WindowExpired(record.key.candidate.clone()))
            }
            _ => Ok(()),
        }
    }

    // ── Module progress ───────────────────────────────────────────────────

    /// Unlock a module of the candidate's track once the gateway authorizes it.
    ///
    /// The gateway is consulted only for a locked module whose prerequisites
    /// are all completed.
    pub fn unlock(&self, candidate: &CandidateId, module: &ModuleId) -> Result<ModuleProgress> {
        let (_, key) = self.domain_of(candidate)?;
        let modules = self.catalog.track_modules(&key.track)?;
        let exam = key.exam(module.clone());
        let now = now_micros();

        self.transact(&key, |record| {
            if record.status(module) == ProgressStatus::Locked {
                progress::ensure_prerequisites(record, &modules, module)?;
                if !self.authorizer.is_authorized(candidate, &exam)? {
                    return Err(ExamError::UnlockNotAuthorized(exam));
                }
            }
            progress::unlock(record, &modules, module, now)
        })
    }

    /// Start a module; the first start opens the exam window.
    pub fn start(
        &self,
        candidate: &CandidateId,
        module: &ModuleId,
    ) -> Result<(ModuleProgress, ExamWindow)> {
        let (candidate, key) = self.domain_of(candidate)?;
        let modules = self.catalog.track_modules(&key.track)?;
        let now = now_micros();
        let window_secs = self.config.exam_window_secs;

        self.transact(&key, |record| {
            Self::adopt_window(record, &candidate);
            progress::start(record, &modules, module, now, window_secs)
        })
    }

    /// Candidate-initiated completion with an externally computed score.
    pub fn complete(
        &self,
        candidate: &CandidateId,
        module: &ModuleId,
        score: f64,
        max_score: f64,
    ) -> Result<ModuleProgress> {
        let (_, key) = self.domain_of(candidate)?;
        let now = now_micros();
        self.transact(&key, |record| {
            progress::complete(
                record,
                module,
                score,
                max_score,
                CompletionSource::Candidate,
                None,
                now,
            )
        })
    }

    /// Published questions of a module in progress, without reference answers.
    pub fn questions_for(
        &self,
        candidate: &CandidateId,
        module: &ModuleId,
    ) -> Result<Vec<CandidateQuestion>> {
        let (_, key) = self.domain_of(candidate)?;
        let record = self.load_or_new(&key)?;
        if record.status(module) != ProgressStatus::InProgress {
            return Err(ExamError::ModuleNotStarted(module.clone()));
        }
        let questions = self.catalog.published_questions(&key.exam(module.clone()))?;
        Ok(questions.iter().map(CandidateQuestion::from).collect())
    }

    // ── Submissions ───────────────────────────────────────────────────────

    /// Persist answers for a module in progress, creating the submission on
    /// first save.
    pub fn save_answers(
        &self,
        candidate: &CandidateId,
        module: &ModuleId,
        answers: Vec<Answer>,
    ) -> Result<Submission> {
        let (candidate, key) = self.domain_of(candidate)?;
        let exam = key.exam(module.clone());
        let published = self.catalog.published_questions(&exam)?;
        if let Some(unknown) = answers
            .iter()
            .find(|a| !published.iter().any(|q| q.id == a.question))
        {
            return Err(ExamError::UnknownQuestion {
                question: unknown.question.clone(),
                exam,
            });
        }

        let now = now_micros();
        self.transact(&key, |record| {
            Self::adopt_window(record, &candidate);
            Self::ensure_open(record, now)?;
            let started_at = match record.progress.get(module) {
                Some(p) if p.status == ProgressStatus::InProgress => p.started_at.unwrap_or(now),
                _ => return Err(ExamError::ModuleNotStarted(module.clone())),
            };
            let submission = record
                .submissions
                .entry(module.clone())
                .or_insert_with(|| Submission::new(candidate.id.clone(), exam.clone(), started_at));
            submission::save_answers(submission, answers)?;
            Ok(submission.clone())
        })
    }

    /// Submit a module for grading. Submitting again returns the existing
    /// submission unchanged.
    pub fn submit(&self, candidate: &CandidateId, module: &ModuleId) -> Result<Submission> {
        let (candidate, key) = self.domain_of(candidate)?;
        let exam = key.exam(module.clone());
        let now = now_micros();

        self.transact(&key, |record| {
            Self::adopt_window(record, &candidate);
            if let Some(existing) = record.submission(module) {
                if existing.status != SubmissionStatus::InProgress {
                    log::debug!("submission {} already {}", existing.id, existing.status);
                    return Ok(existing.clone());
                }
            }
            Self::ensure_open(record, now)?;
            let started_at = match record.progress.get(module) {
                Some(p) if p.status == ProgressStatus::InProgress => p.started_at.unwrap_or(now),
                _ => return Err(ExamError::ModuleNotStarted(module.clone())),
            };
            let submission = record
                .submissions
                .entry(module.clone())
                .or_insert_with(|| Submission::new(candidate.id.clone(), exam.clone(), started_at));
            submission::submit(submission, now);
            Ok(submission.clone())
        })
    }

    /// Route a submitted exam, including one force-submitted by the sweep,
    /// to an examiner.
    pub fn assign_for_review(
        &self,
        submission_id: &SubmissionId,
        examiner: &ExaminerId,
    ) -> Result<Submission> {
        let key = self.locate(submission_id)?;
        self.transact(&key, |record| {
            let submission = record.submission_by_id_mut(submission_id).ok_or_else(|| {
                ExamError::NotFound(format!("submission not found: {submission_id}"))
            })?;
            submission::assign_for_review(submission, examiner)?;
            Ok(submission.clone())
        })
    }

    // ── Grading ───────────────────────────────────────────────────────────

    /// Grade a submission under review.
    ///
    /// The reported total is always recomputed from capped per-question
    /// scores; `claimed_total` is never echoed back. Certification is
    /// re-evaluated before the domain lock is released.
    pub fn grade(
        &self,
        submission_id: &SubmissionId,
        examiner: &ExaminerId,
        grades: &[QuestionGrade],
        claimed_total: Option<f64>,
    ) -> Result<GradingOutcome> {
        let key = self.locate(submission_id)?;
        let lock = self.locks.handle(&key);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let now = now_micros();
        let catalog = self.catalog.as_ref();
        let result = self.apply_locked(&key, |record| {
            grading::grade_submission(
                record,
                catalog,
                submission_id,
                examiner,
                grades,
                claimed_total,
                now,
            )
        })?;

        if result.disposition == grading::GradeDisposition::Graded {
            log::info!(
                "graded {} for {} by {}: {}/{}",
                submission_id,
                key,
                examiner,
                result.total_score,
                result.max_score
            );
        }

        let certification = match self.reevaluate_locked(&key, now) {
            Ok(certification) => certification,
            Err(e) => {
                log::warn!("certification re-evaluation failed for {key} after grading: {e}");
                Certification::Deferred {
                    reason: e.to_string(),
                }
            }
        };

        Ok(GradingOutcome {
            submission: result.submission,
            total_score: result.total_score,
            max_score: result.max_score,
            disposition: result.disposition,
            certification,
        })
    }

    // ── Certification ─────────────────────────────────────────────────────

    /// Re-evaluate certification for (candidate, track). Idempotent.
    pub fn reevaluate(&self, candidate: &CandidateId, track: &TrackId) -> Result<Certification> {
        let key = DomainKey::new(candidate.clone(), track.clone());
        let lock = self.locks.handle(&key);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        self.reevaluate_locked(&key, now_micros())
    }

    /// Evaluate and, when passing and not yet issued, issue. The caller
    /// holds the domain lock, which makes the check-then-issue atomic.
    fn reevaluate_locked(&self, key: &DomainKey, now: u64) -> Result<Certification> {
        let mut record = self.load_or_new(key)?;

        if let Some(existing) = &record.certificate {
            log::debug!("certificate {} already issued for {key}", existing.certificate_id);
            return Ok(Certification::Issued {
                record: existing.clone(),
                newly_issued: false,
            });
        }

        let summary = match certify::evaluate(&record, self.catalog.as_ref(), self.config.pass_mark)? {
            Evaluation::Incomplete { missing } => return Ok(Certification::Incomplete { missing }),
            Evaluation::Failing(summary) => return Ok(Certification::Failing(summary)),
            Evaluation::Passing(summary) => summary,
        };

        let artifact = match self.issuer.issue(&key.candidate, &key.track, &summary, now) {
            Ok(artifact) => artifact,
            Err(e) => {
                log::warn!("certificate issuance failed for {key} (operation=render/put): {e}");
                return Ok(Certification::Deferred {
                    reason: e.to_string(),
                });
            }
        };

        // `issue` may hand back an artifact stored by an earlier attempt
        // whose commit failed; the record follows the artifact.
        let issuance = IssuanceRecord {
            certificate_id: artifact.certificate.id.clone(),
            issued_at: artifact.certificate.issued_at,
            artifact: artifact.name.clone(),
            summary,
        };
        record.certificate = Some(issuance.clone());

        if let Err(e) = self.store.commit(&mut record) {
            log::warn!(
                "issuance record commit failed for {key}; artifact {} is reused on retry: {e}",
                artifact.name
            );
            return Ok(Certification::Deferred {
                reason: e.to_string(),
            });
        }

        log::info!(
            "issued certificate {} for {key}: average {:.2}/20",
            issuance.certificate_id,
            issuance.summary.average_out_of_20
        );
        Ok(Certification::Issued {
            record: issuance,
            newly_issued: true,
        })
    }

    // ── Expiry sweep ──────────────────────────────────────────────────────

    /// Sweep every candidate against the current time.
    pub fn run_sweep(&self) -> Result<SweepReport> {
        self.run_sweep_at(now_micros())
    }

    /// Sweep every candidate as of `now`.
    ///
    /// Each candidate is one atomic unit. A failing candidate is logged and
    /// reported, never aborts the batch, and is retried by the next run.
    pub fn run_sweep_at(&self, now: u64) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for candidate in self.directory.candidates()? {
            match self.sweep_candidate(&candidate, now) {
                Ok(None) => {}
                Ok(Some(changed)) => {
                    report.examined += 1;
                    if changed {
                        report.processed += 1;
                    }
                }
                Err(e) => {
                    report.examined += 1;
                    log::warn!(
                        "sweep failed for candidate {} track {} (operation=sweep): {e}",
                        candidate.id,
                        candidate.track
                    );
                    report.failures.push(SweepFailure {
                        candidate: candidate.id.clone(),
                        track: candidate.track.clone(),
                        operation: "sweep",
                        error: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "sweep finished: {} examined, {} processed, {} failed",
            report.examined,
            report.processed,
            report.failures.len()
        );
        Ok(report)
    }

    /// `Ok(None)` when the candidate is not due; `Ok(Some(changed))` otherwise.
    fn sweep_candidate(&self, candidate: &Candidate, now: u64) -> Result<Option<bool>> {
        let key = DomainKey::new(candidate.id.clone(), candidate.track.clone());
        let lock = self.locks.handle(&key);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut record = self.load_or_new(&key)?;
        Self::adopt_window(&mut record, candidate);
        let due = matches!(record.window, Some(window) if window.is_expired(now));
        if !due {
            return Ok(None);
        }

        let modules = self.catalog.track_modules(&key.track)?;
        if record.all_completed(&modules) {
            return Ok(None);
        }

        let changes = sweep::sweep_domain(
            &mut record,
            self.catalog.as_ref(),
            &modules,
            self.config.exam_window_secs,
            now,
        )?;
        if changes.is_noop() {
            return Ok(Some(false));
        }
        self.store.commit(&mut record)?;

        log::info!(
            "swept {key}: created {:?}, forced {:?}, completed {:?}",
            changes.created,
            changes.forced,
            changes.completed
        );

        if let Err(e) = self.reevaluate_locked(&key, now) {
            log::warn!("certification re-evaluation failed for {key} after sweep: {e}");
        }
        Ok(Some(true))
    }

    // ── Views ─────────────────────────────────────────────────────────────

    /// Module statuses and final scores for a candidate. No examiner notes.
    pub fn candidate_status(&self, candidate: &CandidateId) -> Result<CandidateStatus> {
        let (candidate, key) = self.domain_of(candidate)?;
        let mut record = self.load_or_new(&key)?;
        Self::adopt_window(&mut record, &candidate);

        let modules = self
            .catalog
            .track_modules(&key.track)?
            .into_iter()
            .map(|module| {
                let progress = record.progress.get(&module);
                let completed = progress.map(|p| p.is_completed()).unwrap_or(false);
                ModuleStatusView {
                    status: record.status(&module),
                    submission: record.submission(&module).map(|s| s.status),
                    score: progress.filter(|_| completed).map(|p| p.score),
                    max_score: progress.filter(|_| completed).map(|p| p.max_score),
                    module,
                }
            })
            .collect();

        Ok(CandidateStatus {
            candidate: key.candidate.clone(),
            track: key.track.clone(),
            window: record.window,
            modules,
            certificate: record.certificate.map(|c| c.certificate_id),
        })
    }

    /// Load a submission by id (examiner side).
    pub fn submission(&self, submission_id: &SubmissionId) -> Result<Submission> {
        let key = self.locate(submission_id)?;
        self.load_or_new(&key)?
            .submission_by_id(submission_id)
            .cloned()
            .ok_or_else(|| ExamError::NotFound(format!("submission not found: {submission_id}")))
    }
}
