//! ExamCertify: exam lifecycle and grading engine.
//!
//! Tracks candidate progress through ordered, timed exam modules, stores
//! submissions, grades them with per-question caps, force-submits expired
//! work in a periodic sweep, and issues exactly one signed certificate per
//! candidate and track once every module is graded with a passing average.

pub mod candidate;
pub mod catalog;
pub mod certify;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod grading;
pub mod model;
pub mod progress;
pub mod storage;
pub mod submission;
pub mod sweep;
pub mod time;

// Re-export primary types
pub use config::EngineConfig;
pub use engine::{CandidateStatus, ExamEngine, ModuleStatusView};
pub use error::{ErrorKind, ExamError, Result};
pub use model::{
    CandidateId, CertificateId, DomainKey, ExamKey, ExaminerId, ModuleId, QuestionId,
    SubmissionId, TrackId,
};

// Re-export lifecycle types
pub use candidate::{Candidate, CandidateDirectory, ExamWindow, InMemoryDirectory};
pub use catalog::{CandidateQuestion, InMemoryCatalog, Question, QuestionCatalog};
pub use progress::{CompletionSource, ModuleProgress, ProgressStatus};
pub use submission::{Answer, ExaminerNote, Submission, SubmissionStatus};

// Re-export grading and certification types
pub use certify::{
    Certificate, CertificateArtifact, CertificateIssuer, Certification, IssuanceRecord,
    ModuleScore, ScoreSummary,
};
pub use grading::{GradeDisposition, GradingOutcome, QuestionGrade};
pub use sweep::{SweepFailure, SweepReport};

// Re-export collaborator seams
pub use gateway::{OpenAccess, UnlockAuthorizer};
pub use storage::{ArtifactStore, DomainRecord, DomainStore, FileArtifactStore, FileDomainStore};
