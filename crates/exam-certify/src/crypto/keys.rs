//! Ed25519 issuer key.
//!
//! The issuer signs every certificate it emits. The secret is persisted as
//! hex in a single file and zeroized in memory on drop.

use std::path::Path;

use ed25519_dalek::{SigningKey, VerifyingKey};
use zeroize::Zeroize;

use crate::error::{ExamError, Result};

/// The certificate issuer's signing key pair.
pub struct IssuerKey {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl IssuerKey {
    /// Generate a new random issuer key.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct from raw secret bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Load the key at `path`, generating and saving a new one if absent.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::InvalidKey` if the file exists but does not hold a
    /// 32-byte hex secret, or `ExamError::Io` for filesystem errors.
    pub fn load_or_generate(path: &Path) -> Result<Self> {
        if path.exists() {
            let mut text = std::fs::read_to_string(path)?;
            let decoded = hex::decode(text.trim());
            text.zeroize();
            let mut bytes = decoded
                .map_err(|e| ExamError::InvalidKey(format!("issuer key is not hex: {e}")))?;
            let secret: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| ExamError::InvalidKey("issuer key must be 32 bytes".into()))?;
            bytes.zeroize();
            let key = Self::from_bytes(&secret);
            let mut secret = secret;
            secret.zeroize();
            return Ok(key);
        }

        let key = Self::generate();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut encoded = hex::encode(key.signing_key.to_bytes());
        let written = std::fs::write(path, encoded.as_bytes());
        encoded.zeroize();
        written?;
        Ok(key)
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Public key as base64, as embedded in certificates.
    pub fn public_key_base64(&self) -> String {
        base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            self.verifying_key.to_bytes(),
        )
    }

    /// Decode a base64 public key.
    pub fn verifying_key_from_base64(encoded: &str) -> Result<VerifyingKey> {
        let bytes = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, encoded)
            .map_err(|e| ExamError::InvalidKey(format!("invalid base64 key: {e}")))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ExamError::InvalidKey("public key must be 32 bytes".into()))?;
        VerifyingKey::from_bytes(&array)
            .map_err(|e| ExamError::InvalidKey(format!("invalid verifying key: {e}")))
    }
}

impl Drop for IssuerKey {
    fn drop(&mut self) {
        let mut bytes = self.signing_key.to_bytes();
        bytes.zeroize();
    }
}
