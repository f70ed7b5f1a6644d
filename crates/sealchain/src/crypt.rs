//! The [`Crypt`] capability: the contract every chain link implements.

use async_trait::async_trait;
use common::{CryptError, DataEncryptionKey, Envelope};

/// One link in an envelope-encryption chain.
///
/// Implementations are stateless after construction and safe to call from
/// multiple tasks concurrently. Two variants ship with this crate:
/// [`KmsCrypt`](crate::KmsCrypt) delegates to a remote key-management
/// service, and [`ChainCrypt`](crate::ChainCrypt) seals locally while an
/// inner link protects its data keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Crypt: Send + Sync {
    /// Encrypt a small secret, returning a complete, independently
    /// decryptable [`Envelope`]. Never returns a partially constructed
    /// envelope on error.
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Envelope, CryptError>;

    /// Exact inverse of [`encrypt`](Crypt::encrypt).
    ///
    /// # Errors
    ///
    /// Fails if the envelope's key has the wrong shape, if the inner link
    /// fails to unwrap it, or if the authentication tag does not verify.
    /// No partial plaintext is ever returned.
    async fn decrypt(&self, envelope: &Envelope) -> Result<Vec<u8>, CryptError>;

    /// Mint a fresh 256-bit data key, returning its plaintext for immediate
    /// local use and its encrypted form for storage. The plaintext is never
    /// written into the returned envelope.
    async fn generate_data_key(&self) -> Result<DataEncryptionKey, CryptError>;
}
