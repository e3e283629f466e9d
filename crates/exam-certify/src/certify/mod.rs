//! Certification: track completion, aggregation and certificate issuance.
//!
//! The certify module provides:
//! - Completion evaluation over the latest graded submission per module
//! - Score aggregation to an average out of 20
//! - Signed certificate rendering and verification

pub mod aggregator;
pub mod issuer;
pub mod types;

pub use types::{
    Certificate, CertificateArtifact, Certification, Evaluation, IssuanceRecord, ModuleScore,
    ScoreSummary,
};

pub use aggregator::{average_out_of_20, evaluate, latest_graded};
pub use issuer::{artifact_name, parse_certificate, verify_certificate, CertificateIssuer};
