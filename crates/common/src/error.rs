//! Error taxonomy shared across the envelope-encryption crates.
//!
//! Error values are surfaced to the immediate caller unchanged; nothing in
//! this subsystem retries or swallows them. Display strings must never carry
//! plaintext or key material.

use thiserror::Error;

use crate::model::KEY_LEN;

/// Failure modes of any `Crypt` operation.
#[derive(Debug, Error)]
pub enum CryptError {
    /// The remote key-management backend reported an error. Propagated
    /// verbatim; retry policy belongs to the transport layer.
    #[error("key management backend error: {0}")]
    Backend(String),

    /// The envelope carries no nested key envelope, so there is no way to
    /// recover its data key. Signals a corrupt or foreign-format envelope.
    #[error("envelope has no nested key envelope")]
    MissingKeyEnvelope,

    /// The ciphertext is too short to contain a nonce and a sealed payload.
    #[error("malformed ciphertext: {0} bytes is shorter than a nonce")]
    MalformedCiphertext(usize),

    /// The AEAD seal or open operation failed. On open this means the
    /// authentication tag did not verify (wrong key or tampered data);
    /// no plaintext is returned.
    #[error("aead operation failed")]
    AeadFailure,

    /// A chain link handed back key material of the wrong length. The key
    /// size contract between links is fixed at [`KEY_LEN`] bytes, so this is
    /// a configuration defect in the inner backend, not a transient error.
    #[error("invalid key length: expected {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The OS secure random source failed. There is no fallback to a weaker
    /// source.
    #[error("secure random source unavailable")]
    RandomSource,
}
