//! Error types for exam-certify.
//!
//! Every failure is classified into one of the [`ErrorKind`] buckets so that
//! callers (examiner API, scheduler, CLI) can decide whether to surface,
//! retry, or degrade.

use crate::model::{CandidateId, ExamKey, ExaminerId, ModuleId, QuestionId, SubmissionId};

/// Coarse classification of an [`ExamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or disallowed input. Rejected synchronously, never partially applied.
    Validation,
    /// Concurrent or repeated mutation of state that has already moved on.
    Conflict,
    /// The referenced record does not exist.
    NotFound,
    /// Storage, IO or gateway failure. Safe to retry from current state.
    Transient,
    /// Missing or unreadable configuration / catalog data.
    Configuration,
}

/// Exam engine error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum ExamError {
    #[error("Unknown question {question} for exam {exam}")]
    UnknownQuestion { question: QuestionId, exam: ExamKey },

    #[error("Question {0} graded more than once")]
    DuplicateGrade(QuestionId),

    #[error("Invalid score for question {question}: {raw}")]
    InvalidScore { question: QuestionId, raw: f64 },

    #[error("Submission {submission} is not assigned to examiner {examiner}")]
    ExaminerMismatch {
        submission: SubmissionId,
        examiner: ExaminerId,
    },

    #[error("Submission {submission} is {actual}, expected {expected}")]
    InvalidStatus {
        submission: SubmissionId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Module {module} is locked: prerequisite {blocking} not completed")]
    ModuleLocked { module: ModuleId, blocking: ModuleId },

    #[error("Invalid progress transition for module {module}: {from} -> {to}")]
    InvalidTransition {
        module: ModuleId,
        from: &'static str,
        to: &'static str,
    },

    #[error("Module {0} is not in progress")]
    ModuleNotStarted(ModuleId),

    #[error("Exam window expired for candidate {0}")]
    WindowExpired(CandidateId),

    #[error("Unknown module {module} in track {track}")]
    UnknownModule {
        track: crate::model::TrackId,
        module: ModuleId,
    },

    #[error("Unlock not authorized for exam {0}")]
    UnlockNotAuthorized(ExamKey),

    #[error("Module {0} already completed")]
    AlreadyCompleted(ModuleId),

    #[error("Revision conflict: expected {expected}, found {found}")]
    RevisionConflict { expected: u64, found: u64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExamError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownQuestion { .. }
            | Self::DuplicateGrade(_)
            | Self::InvalidScore { .. }
            | Self::ExaminerMismatch { .. }
            | Self::InvalidStatus { .. }
            | Self::ModuleLocked { .. }
            | Self::InvalidTransition { .. }
            | Self::ModuleNotStarted(_)
            | Self::WindowExpired(_)
            | Self::UnknownModule { .. }
            | Self::UnlockNotAuthorized(_)
            | Self::InvalidKey(_)
            | Self::SignatureInvalid => ErrorKind::Validation,
            Self::AlreadyCompleted(_) | Self::RevisionConflict { .. } => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::StorageError(_)
            | Self::SerializationError(_)
            | Self::InvalidFileFormat(_)
            | Self::Gateway(_)
            | Self::Io(_) => ErrorKind::Transient,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// True when retrying later, from fresh state, may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, ExamError>;
