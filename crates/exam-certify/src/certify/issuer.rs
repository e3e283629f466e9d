//! Certificate issuer: renders, signs and persists certificate artifacts.
//!
//! The issuer does not record issuance itself. The engine writes the
//! [`super::IssuanceRecord`] into the domain only after `issue` returned, so
//! a failed render or put leaves no issuance behind.
//!
//! Artifacts are named by the (candidate, track) domain digest, not by the
//! certificate id. If the domain commit after a successful put fails, the
//! next `issue` finds the artifact it already signed and returns it
//! unchanged.

use std::sync::Arc;

use ed25519_dalek::VerifyingKey;

use crate::crypto::{signing, IssuerKey};
use crate::error::{ExamError, Result};
use crate::model::{certificate_id, CandidateId, DomainKey, TrackId};
use crate::storage::ArtifactStore;
use crate::time::micros_to_rfc3339;

use super::types::*;

/// Signs certificates and writes them to an [`ArtifactStore`].
pub struct CertificateIssuer {
    artifacts: Arc<dyn ArtifactStore>,
    key: IssuerKey,
}

impl CertificateIssuer {
    pub fn new(artifacts: Arc<dyn ArtifactStore>, key: IssuerKey) -> Self {
        Self { artifacts, key }
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.key.verifying_key()
    }

    /// Render and persist a certificate for (candidate, track), or return
    /// the one this issuer already stored for the pair.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::SerializationError` if rendering fails, or the
    /// artifact store's error if the get or put fails.
    pub fn issue(
        &self,
        candidate: &CandidateId,
        track: &TrackId,
        summary: &ScoreSummary,
        now: u64,
    ) -> Result<CertificateArtifact> {
        let name = artifact_name(candidate, track);

        if let Some(existing) = self.stored(&name, candidate, track)? {
            log::info!("reusing certificate artifact {name} for {candidate}@{track}");
            return Ok(existing);
        }

        let mut certificate = Certificate {
            id: certificate_id(candidate, track, now),
            candidate: candidate.clone(),
            track: track.clone(),
            issued_at: now,
            issued_at_rfc3339: micros_to_rfc3339(now),
            summary: summary.clone(),
            issuer_key: self.key.public_key_base64(),
            signature: String::new(),
        };
        certificate.signature = signing::sign_to_base64(
            self.key.signing_key(),
            certificate.signing_payload().as_bytes(),
        );

        let rendered = serde_json::to_vec_pretty(&certificate)
            .map_err(|e| ExamError::SerializationError(e.to_string()))?;
        self.artifacts.put(&name, &rendered)?;

        Ok(CertificateArtifact {
            name,
            certificate,
            rendered,
        })
    }

    /// A previously stored artifact for the pair, if it is intact and
    /// signed by this issuer. Anything else is overwritten.
    fn stored(
        &self,
        name: &str,
        candidate: &CandidateId,
        track: &TrackId,
    ) -> Result<Option<CertificateArtifact>> {
        let rendered = match self.artifacts.get(name)? {
            Some(rendered) => rendered,
            None => return Ok(None),
        };
        let certificate = match parse_certificate(&rendered) {
            Ok(certificate) => certificate,
            Err(e) => {
                log::warn!("overwriting unreadable certificate artifact {name}: {e}");
                return Ok(None);
            }
        };
        if certificate.candidate != *candidate
            || certificate.track != *track
            || verify_certificate(&certificate, self.verifying_key()).is_err()
        {
            log::warn!("overwriting certificate artifact {name} not signed by this issuer");
            return Ok(None);
        }
        Ok(Some(CertificateArtifact {
            name: name.to_string(),
            certificate,
            rendered,
        }))
    }
}

/// Artifact name for (candidate, track); at most one per pair.
pub fn artifact_name(candidate: &CandidateId, track: &TrackId) -> String {
    format!(
        "{}.json",
        DomainKey::new(candidate.clone(), track.clone()).digest()
    )
}

/// Parse a rendered certificate.
pub fn parse_certificate(bytes: &[u8]) -> Result<Certificate> {
    serde_json::from_slice(bytes)
        .map_err(|e| ExamError::InvalidFileFormat(format!("invalid certificate: {e}")))
}

/// Verify a certificate's signature against a trusted issuer key.
pub fn verify_certificate(certificate: &Certificate, issuer: &VerifyingKey) -> Result<()> {
    signing::verify_from_base64(
        issuer,
        certificate.signing_payload().as_bytes(),
        &certificate.signature,
    )
}
