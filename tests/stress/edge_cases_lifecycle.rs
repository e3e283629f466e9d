//! Edge case tests: lifecycle validation, rejected grades, window expiry
//! and unlock authorization.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use exam_certify::gateway::{
    CredentialCache, CredentialProvider, Credentials, GatewayAuthorizer, PaymentRecords,
};
use exam_certify::time::now_micros;
use exam_certify::{
    Answer, Candidate, CandidateId, EngineConfig, ErrorKind, ExamEngine, ExamError, ExamKey,
    ExamWindow, ExaminerId, InMemoryCatalog, InMemoryDirectory, ModuleId, ProgressStatus,
    Question, QuestionGrade, QuestionId, SubmissionId, SubmissionStatus, TrackId,
    UnlockAuthorizer,
};

const TRACK: &str = "rust";

fn question(id: &str, module: &str, points: u32, published: bool) -> Question {
    Question {
        id: QuestionId::new(id),
        exam: ExamKey::new(TrackId::new(TRACK), ModuleId::new(module)),
        version: 1,
        prompt: String::new(),
        points,
        reference_answer: String::new(),
        is_published: published,
    }
}

fn catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    catalog.add_track(
        TrackId::new(TRACK),
        vec![ModuleId::new("m1"), ModuleId::new("m2")],
    );
    catalog.add_question(question("q1", "m1", 5, true));
    catalog.add_question(question("q2", "m1", 5, true));
    catalog.add_question(question("draft", "m1", 5, false));
    catalog.add_question(question("q3", "m2", 10, true));
    catalog
}

fn engine_with(dir: &Path, window: Option<ExamWindow>) -> ExamEngine {
    let directory = InMemoryDirectory::new();
    directory.insert(Candidate {
        id: CandidateId::new("alice"),
        track: TrackId::new(TRACK),
        window,
    });
    let config = EngineConfig {
        data_dir: dir.to_path_buf(),
        ..EngineConfig::default()
    };
    ExamEngine::open(config, Arc::new(catalog()), Arc::new(directory)).unwrap()
}

fn engine(dir: &Path) -> ExamEngine {
    engine_with(dir, None)
}

fn alice() -> CandidateId {
    CandidateId::new("alice")
}

fn m1() -> ModuleId {
    ModuleId::new("m1")
}

fn examiner() -> ExaminerId {
    ExaminerId::new("examiner-1")
}

/// m1 unlocked, started, answered, submitted and assigned.
fn under_review(engine: &ExamEngine) -> SubmissionId {
    engine.unlock(&alice(), &m1()).unwrap();
    engine.start(&alice(), &m1()).unwrap();
    engine
        .save_answers(&alice(), &m1(), vec![Answer::new(QuestionId::new("q1"), "a")])
        .unwrap();
    let submission = engine.submit(&alice(), &m1()).unwrap();
    engine.assign_for_review(&submission.id, &examiner()).unwrap();
    submission.id
}

// ── Lookup failures ──────────────────────────────────────────────────────────

#[test]
fn edge_unknown_candidate_module_and_submission() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());

    let err = engine.unlock(&CandidateId::new("nobody"), &m1()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = engine.unlock(&alice(), &ModuleId::new("m9")).unwrap_err();
    assert!(matches!(err, ExamError::UnknownModule { .. }), "{err}");

    let err = engine
        .grade(&SubmissionId::new("asub_missing"), &examiner(), &[], None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

// ── Progress transitions ─────────────────────────────────────────────────────

#[test]
fn edge_start_requires_unlock_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());

    let err = engine.start(&alice(), &m1()).unwrap_err();
    assert!(matches!(err, ExamError::InvalidTransition { .. }), "{err}");

    engine.unlock(&alice(), &m1()).unwrap();
    let (first, window) = engine.start(&alice(), &m1()).unwrap();
    let (second, again) = engine.start(&alice(), &m1()).unwrap();
    assert_eq!(first, second);
    assert_eq!(window, again);
    assert_eq!(first.status, ProgressStatus::InProgress);
    assert_eq!(
        window.expires_at - window.started_at,
        engine.config().exam_window_secs * 1_000_000
    );
}

#[test]
fn edge_candidate_completion_clamps_and_rejects_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    engine.unlock(&alice(), &m1()).unwrap();
    engine.start(&alice(), &m1()).unwrap();

    let progress = engine.complete(&alice(), &m1(), 42.0, 10.0).unwrap();
    assert_eq!(progress.status, ProgressStatus::Completed);
    assert_eq!(progress.score, 10.0);

    let err = engine.complete(&alice(), &m1(), 5.0, 10.0).unwrap_err();
    assert!(matches!(err, ExamError::AlreadyCompleted(_)), "{err}");
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

// ── Submissions ──────────────────────────────────────────────────────────────

#[test]
fn edge_answers_validated_against_published_questions() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());

    let err = engine
        .save_answers(&alice(), &m1(), vec![Answer::new(QuestionId::new("q1"), "a")])
        .unwrap_err();
    assert!(matches!(err, ExamError::ModuleNotStarted(_)), "{err}");

    engine.unlock(&alice(), &m1()).unwrap();
    engine.start(&alice(), &m1()).unwrap();

    let err = engine
        .save_answers(&alice(), &m1(), vec![Answer::new(QuestionId::new("draft"), "a")])
        .unwrap_err();
    assert!(matches!(err, ExamError::UnknownQuestion { .. }), "{err}");

    engine
        .save_answers(&alice(), &m1(), vec![Answer::new(QuestionId::new("q1"), "first")])
        .unwrap();
    let saved = engine
        .save_answers(
            &alice(),
            &m1(),
            vec![
                Answer::new(QuestionId::new("q1"), "revised"),
                Answer::new(QuestionId::new("q2"), "new"),
            ],
        )
        .unwrap();
    assert_eq!(saved.answers.len(), 2);
    assert_eq!(saved.answers[0].answer, "revised");
}

#[test]
fn edge_submit_twice_keeps_first_submission() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    engine.unlock(&alice(), &m1()).unwrap();
    engine.start(&alice(), &m1()).unwrap();

    let first = engine.submit(&alice(), &m1()).unwrap();
    let second = engine.submit(&alice(), &m1()).unwrap();
    assert_eq!(first, second);
    assert_eq!(second.status, SubmissionStatus::Submitted);

    let err = engine
        .save_answers(&alice(), &m1(), vec![Answer::new(QuestionId::new("q1"), "late")])
        .unwrap_err();
    assert!(matches!(err, ExamError::InvalidStatus { .. }), "{err}");
}

#[test]
fn edge_assignment_is_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = under_review(&engine);

    // Same examiner: no-op.
    let again = engine.assign_for_review(&id, &examiner()).unwrap();
    assert_eq!(again.status, SubmissionStatus::UnderReview);

    let err = engine
        .assign_for_review(&id, &ExaminerId::new("examiner-2"))
        .unwrap_err();
    assert!(matches!(err, ExamError::ExaminerMismatch { .. }), "{err}");
}

// ── Grading rejections ───────────────────────────────────────────────────────

#[test]
fn edge_invalid_grades_leave_submission_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = under_review(&engine);

    let reject = |grades: Vec<QuestionGrade>| {
        let err = engine.grade(&id, &examiner(), &grades, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        err
    };

    // A question from another module.
    let err = reject(vec![
        QuestionGrade::new(QuestionId::new("q1"), 3.0),
        QuestionGrade::new(QuestionId::new("q3"), 3.0),
    ]);
    assert!(matches!(err, ExamError::UnknownQuestion { .. }), "{err}");

    // An unpublished question.
    let err = reject(vec![QuestionGrade::new(QuestionId::new("draft"), 3.0)]);
    assert!(matches!(err, ExamError::UnknownQuestion { .. }), "{err}");

    let err = reject(vec![
        QuestionGrade::new(QuestionId::new("q1"), 3.0),
        QuestionGrade::new(QuestionId::new("q1"), 4.0),
    ]);
    assert!(matches!(err, ExamError::DuplicateGrade(_)), "{err}");

    let err = reject(vec![QuestionGrade::new(QuestionId::new("q1"), f64::NAN)]);
    assert!(matches!(err, ExamError::InvalidScore { .. }), "{err}");

    let submission = engine.submission(&id).unwrap();
    assert_eq!(submission.status, SubmissionStatus::UnderReview);
    assert!(submission.notes.is_empty());
    assert_eq!(submission.total_score, 0.0);
}

#[test]
fn edge_grading_requires_the_assigned_examiner() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = under_review(&engine);

    let err = engine
        .grade(
            &id,
            &ExaminerId::new("intruder"),
            &[QuestionGrade::new(QuestionId::new("q1"), 5.0)],
            None,
        )
        .unwrap_err();
    assert!(matches!(err, ExamError::ExaminerMismatch { .. }), "{err}");
}

#[test]
fn edge_negative_scores_floor_at_zero_and_claimed_total_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(dir.path());
    let id = under_review(&engine);

    let outcome = engine
        .grade(
            &id,
            &examiner(),
            &[
                QuestionGrade::new(QuestionId::new("q1"), -4.0),
                QuestionGrade::new(QuestionId::new("q2"), 3.5),
            ],
            Some(100.0),
        )
        .unwrap();
    assert_eq!(outcome.total_score, 3.5);
    assert_eq!(outcome.max_score, 10.0);
}

// ── Window expiry ────────────────────────────────────────────────────────────

#[test]
fn edge_expired_window_blocks_start() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(
        dir.path(),
        Some(ExamWindow {
            started_at: 1,
            expires_at: 2,
        }),
    );
    engine.unlock(&alice(), &m1()).unwrap();

    let err = engine.start(&alice(), &m1()).unwrap_err();
    assert!(matches!(err, ExamError::WindowExpired(_)), "{err}");
}

#[test]
fn edge_expiry_between_start_and_submit() {
    let dir = tempfile::tempdir().unwrap();
    let now = now_micros();
    let engine = engine_with(
        dir.path(),
        Some(ExamWindow {
            started_at: now,
            expires_at: now + 500_000,
        }),
    );
    engine.unlock(&alice(), &m1()).unwrap();
    engine.start(&alice(), &m1()).unwrap();

    std::thread::sleep(Duration::from_millis(800));

    let err = engine
        .save_answers(&alice(), &m1(), vec![Answer::new(QuestionId::new("q1"), "a")])
        .unwrap_err();
    assert!(matches!(err, ExamError::WindowExpired(_)), "{err}");
    let err = engine.submit(&alice(), &m1()).unwrap_err();
    assert!(matches!(err, ExamError::WindowExpired(_)), "{err}");

    // The sweep closes the module out instead.
    let report = engine.run_sweep().unwrap();
    assert_eq!(report.processed, 1);
    let status = engine.candidate_status(&alice()).unwrap();
    assert_eq!(status.modules[0].status, ProgressStatus::Completed);
    assert_eq!(status.modules[0].submission, Some(SubmissionStatus::Submitted));
}

// ── Unlock authorization ─────────────────────────────────────────────────────

struct StaticProvider {
    fetches: Arc<AtomicUsize>,
}

impl CredentialProvider for StaticProvider {
    fn fetch(&self) -> exam_certify::Result<Credentials> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(Credentials {
            client_id: "client".into(),
            secret: "secret".into(),
        })
    }
}

/// Only module m1 has been paid for.
struct PaidForM1;

impl PaymentRecords for PaidForM1 {
    fn has_paid(
        &self,
        _credentials: &Credentials,
        _candidate: &CandidateId,
        exam: &ExamKey,
    ) -> exam_certify::Result<bool> {
        Ok(exam.module.as_str() == "m1")
    }
}

#[test]
fn edge_unlock_requires_gateway_authorization() {
    let dir = tempfile::tempdir().unwrap();
    let fetches = Arc::new(AtomicUsize::new(0));
    let engine = engine(dir.path());
    let authorizer: Arc<dyn UnlockAuthorizer> = Arc::new(GatewayAuthorizer::new(
        CredentialCache::from_config(
            StaticProvider {
                fetches: fetches.clone(),
            },
            engine.config(),
        ),
        PaidForM1,
    ));
    let engine = engine.with_authorizer(authorizer);

    // Unmet prerequisites fail before the gateway is asked.
    let err = engine.unlock(&alice(), &ModuleId::new("m2")).unwrap_err();
    assert!(matches!(err, ExamError::ModuleLocked { .. }), "{err}");
    assert_eq!(fetches.load(Ordering::SeqCst), 0);

    let progress = engine.unlock(&alice(), &m1()).unwrap();
    assert_eq!(progress.status, ProgressStatus::Unlocked);

    // Already unlocked: the gateway is not consulted again.
    engine.unlock(&alice(), &m1()).unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 1);

    engine.start(&alice(), &m1()).unwrap();
    engine.complete(&alice(), &m1(), 10.0, 10.0).unwrap();
    let err = engine.unlock(&alice(), &ModuleId::new("m2")).unwrap_err();
    assert!(matches!(err, ExamError::UnlockNotAuthorized(_)), "{err}");
    // Credentials were cached across calls.
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
}
