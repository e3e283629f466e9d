//! Identifiers and composite keys shared by every module.
//!
//! Composite keys are carried as structs ([`ExamKey`], [`DomainKey`]) and
//! never reconstructed by parsing a formatted string.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id!(
    /// A pre-authenticated candidate identifier.
    CandidateId
);
string_id!(
    /// A certification track (ordered set of modules).
    TrackId
);
string_id!(
    /// A gradable module within a track.
    ModuleId
);
string_id!(
    /// A catalog question.
    QuestionId
);
string_id!(
    /// An examiner allowed to grade assigned submissions.
    ExaminerId
);
string_id!(
    /// Stable identifier of a submission (`asub_…`).
    SubmissionId
);
string_id!(
    /// Identifier of an issued certificate (`acert_…`).
    CertificateId
);

/// The exam a submission answers: one module of one track.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExamKey {
    pub track: TrackId,
    pub module: ModuleId,
}

impl ExamKey {
    pub fn new(track: TrackId, module: ModuleId) -> Self {
        Self { track, module }
    }
}

impl std::fmt::Display for ExamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.track, self.module)
    }
}

/// One consistency domain: every progress, submission and certificate row
/// of a candidate within a track.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DomainKey {
    pub candidate: CandidateId,
    pub track: TrackId,
}

impl DomainKey {
    pub fn new(candidate: CandidateId, track: TrackId) -> Self {
        Self { candidate, track }
    }

    pub fn exam(&self, module: ModuleId) -> ExamKey {
        ExamKey::new(self.track.clone(), module)
    }

    /// Hex digest used for file names. Never decoded back into a key.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.candidate.0.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.track.0.as_bytes());
        hex::encode(&hasher.finalize()[..16])
    }
}

impl std::fmt::Display for DomainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.candidate, self.track)
    }
}

/// Derive the submission id for a (candidate, exam) pair.
///
/// The id is a pure function of the pair, so a second submission for the
/// same exam always collides with the first.
pub fn submission_id(candidate: &CandidateId, exam: &ExamKey) -> SubmissionId {
    let input = format!(
        "submission:{}\0{}\0{}",
        candidate.0, exam.track.0, exam.module.0
    );
    let hash = Sha256::digest(input.as_bytes());
    SubmissionId(format!("asub_{}", bs58::encode(&hash[..16]).into_string()))
}

/// Derive a certificate id from (candidate, track, issuance timestamp).
pub fn certificate_id(candidate: &CandidateId, track: &TrackId, issued_at: u64) -> CertificateId {
    let input = format!("certificate:{}\0{}\0{}", candidate.0, track.0, issued_at);
    let hash = Sha256::digest(input.as_bytes());
    CertificateId(format!("acert_{}", bs58::encode(&hash[..16]).into_string()))
}
