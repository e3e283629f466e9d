//! Cryptographic primitives for certificate issuance.
//!
//! This module provides:
//! - Ed25519 issuer key generation and persistence
//! - Signing and verification with base64-encoded signatures

pub mod keys;
pub mod signing;

pub use keys::IssuerKey;
