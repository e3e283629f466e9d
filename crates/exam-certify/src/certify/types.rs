//! Data structures for certification.

use serde::{Deserialize, Serialize};

use crate::model::{CandidateId, CertificateId, ModuleId, SubmissionId, TrackId};

/// Score of the graded submission counted for one module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleScore {
    pub module: ModuleId,
    pub submission: SubmissionId,
    pub total_score: f64,
    pub max_score: f64,
    pub graded_at: u64,
}

/// Aggregate over every expected module of a track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreSummary {
    pub total_score: f64,
    pub total_max: f64,
    /// `total_score / total_max * 20`, or 0 when there is nothing to score.
    pub average_out_of_20: f64,
    pub pass_mark: f64,
    pub modules: Vec<ModuleScore>,
}

impl ScoreSummary {
    pub fn is_passing(&self) -> bool {
        self.average_out_of_20 >= self.pass_mark
    }
}

/// Result of evaluating the completion condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// At least one expected module has no graded submission.
    Incomplete { missing: Vec<ModuleId> },
    Failing(ScoreSummary),
    Passing(ScoreSummary),
}

/// Issuance entry stored in the domain record. Its presence makes
/// re-evaluation a no-op.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IssuanceRecord {
    pub certificate_id: CertificateId,
    pub issued_at: u64,
    /// Name of the artifact in the artifact store.
    pub artifact: String,
    pub summary: ScoreSummary,
}

/// The signed certificate document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Certificate {
    pub id: CertificateId,
    pub candidate: CandidateId,
    pub track: TrackId,
    pub issued_at: u64,
    pub issued_at_rfc3339: String,
    pub summary: ScoreSummary,
    /// Base64 Ed25519 public key of the issuer.
    pub issuer_key: String,
    /// Base64 Ed25519 signature over [`Certificate::signing_payload`].
    pub signature: String,
}

impl Certificate {
    /// Canonical bytes covered by the signature.
    pub fn signing_payload(&self) -> String {
        format!(
            "certificate:{}:{}:{}:{}:{:.4}:{:.4}",
            self.id, self.candidate, self.track, self.issued_at, self.summary.total_score,
            self.summary.total_max
        )
    }
}

/// A rendered certificate persisted in the artifact store.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateArtifact {
    pub name: String,
    pub certificate: Certificate,
    pub rendered: Vec<u8>,
}

/// Outcome of re-evaluating a (candidate, track).
#[derive(Debug, Clone, PartialEq)]
pub enum Certification {
    Incomplete { missing: Vec<ModuleId> },
    Failing(ScoreSummary),
    /// A certificate exists. `newly_issued` is true only for the call that created it.
    Issued {
        record: IssuanceRecord,
        newly_issued: bool,
    },
    /// Evaluation or issuance failed; the next grading event or sweep retries.
    Deferred { reason: String },
}

impl Certification {
    pub fn is_certified(&self) -> bool {
        matches!(self, Self::Issued { .. })
    }
}
