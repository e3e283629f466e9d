//! Concurrency test: parallel grading across and within consistency domains.
//!
//! Validates that the per-domain lock serializes grading and issuance so
//! exactly one certificate exists per (candidate, track), however many
//! examiner requests race.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use exam_certify::crypto::IssuerKey;
use exam_certify::storage::{ArtifactStore, FileArtifactStore, FileDomainStore};
use exam_certify::{
    Answer, Candidate, CandidateId, CertificateIssuer, Certification, EngineConfig, ExamEngine,
    ExamKey, ExaminerId, GradeDisposition, InMemoryCatalog, InMemoryDirectory, ModuleId, Question,
    QuestionGrade, QuestionId, SubmissionId, TrackId,
};

const TRACK: &str = "rust";
const MODULES: [&str; 2] = ["m1", "m2"];

struct CountingArtifacts {
    inner: FileArtifactStore,
    puts: AtomicUsize,
}

impl ArtifactStore for CountingArtifacts {
    fn put(&self, name: &str, bytes: &[u8]) -> exam_certify::Result<()> {
        self.inner.put(name, bytes)?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get(&self, name: &str) -> exam_certify::Result<Option<Vec<u8>>> {
        self.inner.get(name)
    }
}

fn setup(dir: &Path, candidates: usize) -> (Arc<ExamEngine>, Arc<CountingArtifacts>) {
    let mut catalog = InMemoryCatalog::new();
    catalog.add_track(
        TrackId::new(TRACK),
        MODULES.iter().map(|m| ModuleId::new(*m)).collect(),
    );
    for module in MODULES {
        catalog.add_question(Question {
            id: QuestionId::new(format!("{module}-q")),
            exam: ExamKey::new(TrackId::new(TRACK), ModuleId::new(module)),
            version: 1,
            prompt: String::new(),
            points: 20,
            reference_answer: String::new(),
            is_published: true,
        });
    }

    let directory = InMemoryDirectory::new();
    for i in 0..candidates {
        directory.insert(Candidate {
            id: CandidateId::new(format!("cand-{i}")),
            track: TrackId::new(TRACK),
            window: None,
        });
    }

    let config = EngineConfig {
        data_dir: dir.to_path_buf(),
        ..EngineConfig::default()
    };
    let store = Arc::new(FileDomainStore::new(config.domains_dir()).unwrap());
    let artifacts = Arc::new(CountingArtifacts {
        inner: FileArtifactStore::new(config.artifacts_dir()).unwrap(),
        puts: AtomicUsize::new(0),
    });
    let issuer = CertificateIssuer::new(artifacts.clone(), IssuerKey::generate());
    let engine = ExamEngine::new(config, Arc::new(catalog), Arc::new(directory), store, issuer);
    (Arc::new(engine), artifacts)
}

fn sit_module(engine: &ExamEngine, candidate: &CandidateId, module: &str) -> SubmissionId {
    let module = ModuleId::new(module);
    engine.unlock(candidate, &module).unwrap();
    engine.start(candidate, &module).unwrap();
    engine
        .save_answers(
            candidate,
            &module,
            vec![Answer::new(QuestionId::new(format!("{module}-q")), "answer")],
        )
        .unwrap();
    let submission = engine.submit(candidate, &module).unwrap();
    engine
        .assign_for_review(&submission.id, &ExaminerId::new("examiner"))
        .unwrap();
    submission.id
}

fn grade_final(engine: &ExamEngine, id: &SubmissionId) -> exam_certify::GradingOutcome {
    engine
        .grade(
            id,
            &ExaminerId::new("examiner"),
            &[QuestionGrade::new(QuestionId::new("m2-q"), 14.0)],
            None,
        )
        .unwrap()
}

#[test]
fn stress_16_threads_grade_the_same_final_submission() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, artifacts) = setup(dir.path(), 1);
    let candidate = CandidateId::new("cand-0");

    let first = sit_module(&engine, &candidate, "m1");
    engine
        .grade(
            &first,
            &ExaminerId::new("examiner"),
            &[QuestionGrade::new(QuestionId::new("m1-q"), 16.0)],
            None,
        )
        .unwrap();
    let last = sit_module(&engine, &candidate, "m2");

    let barrier = Arc::new(Barrier::new(16));
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = Arc::clone(&engine);
        let barrier = Arc::clone(&barrier);
        let outcomes = Arc::clone(&outcomes);
        let id = last.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            let outcome = grade_final(&engine, &id);
            outcomes.lock().unwrap().push(outcome);
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    let outcomes = outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 16);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| o.disposition == GradeDisposition::Graded)
            .count(),
        1
    );
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| matches!(
                o.certification,
                Certification::Issued {
                    newly_issued: true,
                    ..
                }
            ))
            .count(),
        1
    );
    assert!(outcomes.iter().all(|o| o.certification.is_certified()));
    assert_eq!(artifacts.puts.load(Ordering::SeqCst), 1);
}

#[test]
fn stress_parallel_candidates_each_certified_once() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, artifacts) = setup(dir.path(), 12);

    let mut handles = Vec::new();
    for i in 0..12 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            let candidate = CandidateId::new(format!("cand-{i}"));
            let first = sit_module(&engine, &candidate, "m1");
            engine
                .grade(
                    &first,
                    &ExaminerId::new("examiner"),
                    &[QuestionGrade::new(QuestionId::new("m1-q"), 20.0)],
                    None,
                )
                .unwrap();
            let last = sit_module(&engine, &candidate, "m2");

            // Two racing gradings per candidate.
            let racers: Vec<_> = (0..2)
                .map(|_| {
                    let engine = Arc::clone(&engine);
                    let id = last.clone();
                    thread::spawn(move || grade_final(&engine, &id))
                })
                .collect();
            racers
                .into_iter()
                .map(|r| r.join().unwrap())
                .filter(|o| {
                    matches!(
                        o.certification,
                        Certification::Issued {
                            newly_issued: true,
                            ..
                        }
                    )
                })
                .count()
        }));
    }

    let newly_issued: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(newly_issued, 12);
    assert_eq!(artifacts.puts.load(Ordering::SeqCst), 12);

    for i in 0..12 {
        let status = engine
            .candidate_status(&CandidateId::new(format!("cand-{i}")))
            .unwrap();
        assert!(status.certificate.is_some());
    }
}
