//! Payment / unlock gateway integration.
//!
//! Unlocking a module is authorized outside the engine. The engine asks an
//! injected [`UnlockAuthorizer`] and only records the result. Gateway
//! credentials live in an explicitly-scoped [`CredentialCache`] owned by the
//! authorizer, never in process-wide state.

use std::sync::Mutex;

use crate::config::EngineConfig;
use crate::error::{ExamError, Result};
use crate::model::{CandidateId, ExamKey};
use crate::time::{now_micros, secs_to_micros};

/// Decides whether a candidate may unlock an exam.
pub trait UnlockAuthorizer: Send + Sync {
    fn is_authorized(&self, candidate: &CandidateId, exam: &ExamKey) -> Result<bool>;
}

/// Authorizes every unlock. For deployments without paid modules.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAccess;

impl UnlockAuthorizer for OpenAccess {
    fn is_authorized(&self, _candidate: &CandidateId, _exam: &ExamKey) -> Result<bool> {
        Ok(true)
    }
}

// ── Credentials ───────────────────────────────────────────────────────────────

/// Gateway credentials as returned by a provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Source of fresh credentials (secret manager, environment, vault...).
pub trait CredentialProvider: Send + Sync {
    fn fetch(&self) -> Result<Credentials>;
}

/// Cache-with-expiry over a [`CredentialProvider`].
///
/// Credentials older than the TTL are refetched on next use. A failed fetch
/// leaves the cache empty so the following call retries.
pub struct CredentialCache<P> {
    provider: P,
    ttl_micros: u64,
    cached: Mutex<Option<(Credentials, u64)>>,
}

impl<P: CredentialProvider> CredentialCache<P> {
    pub fn new(provider: P, ttl_secs: u64) -> Self {
        Self {
            provider,
            ttl_micros: secs_to_micros(ttl_secs),
            cached: Mutex::new(None),
        }
    }

    /// Cache with the configured `credential_ttl_secs`.
    pub fn from_config(provider: P, config: &EngineConfig) -> Self {
        Self::new(provider, config.credential_ttl_secs)
    }

    /// Current credentials, refreshing if expired.
    pub fn get(&self) -> Result<Credentials> {
        self.get_at(now_micros())
    }

    /// Current credentials as of `now`.
    pub fn get_at(&self, now: u64) -> Result<Credentials> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some((credentials, fetched_at)) = cached.as_ref() {
            if now.saturating_sub(*fetched_at) < self.ttl_micros {
                return Ok(credentials.clone());
            }
        }

        *cached = None;
        let fresh = self.provider.fetch()?;
        *cached = Some((fresh.clone(), now));
        Ok(fresh)
    }

    /// Drop cached credentials, e.g. after the gateway rejected them.
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

// ── Gateway authorizer ────────────────────────────────────────────────────────

/// Payment lookup performed with gateway credentials.
pub trait PaymentRecords: Send + Sync {
    fn has_paid(
        &self,
        credentials: &Credentials,
        candidate: &CandidateId,
        exam: &ExamKey,
    ) -> Result<bool>;
}

/// [`UnlockAuthorizer`] backed by a payment gateway.
pub struct GatewayAuthorizer<P, R> {
    credentials: CredentialCache<P>,
    records: R,
}

impl<P: CredentialProvider, R: PaymentRecords> GatewayAuthorizer<P, R> {
    pub fn new(credentials: CredentialCache<P>, records: R) -> Self {
        Self {
            credentials,
            records,
        }
    }
}

impl<P: CredentialProvider, R: PaymentRecords> UnlockAuthorizer for GatewayAuthorizer<P, R> {
    fn is_authorized(&self, candidate: &CandidateId, exam: &ExamKey) -> Result<bool> {
        let credentials = self.credentials.get()?;
        match self.records.has_paid(&credentials, candidate, exam) {
            Err(ExamError::Gateway(reason)) => {
                // Credentials may have been rotated upstream.
                self.credentials.invalidate();
                Err(ExamError::Gateway(reason))
            }
            other => other,
        }
    }
}
