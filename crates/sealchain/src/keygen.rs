//! Data-key generation from the OS CSPRNG.

use chacha20poly1305::aead::{rand_core::RngCore, OsRng};
use common::{CryptError, KeyBytes, KEY_LEN};

/// Source of fresh 256-bit data keys.
///
/// [`ChainCrypt::with_key_source`](crate::ChainCrypt::with_key_source)
/// accepts one of these strictly for deterministic tests; production chains
/// must use [`random_key`].
pub type KeyGenFn = fn() -> Result<KeyBytes, CryptError>;

/// Generate a [`KEY_LEN`]-byte key from the OS secure random source.
///
/// # Errors
///
/// Returns [`CryptError::RandomSource`] if the OS random source fails.
/// There is no fallback to a weaker source.
pub fn random_key() -> Result<KeyBytes, CryptError> {
    let mut buf = [0u8; KEY_LEN];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|_| CryptError::RandomSource)?;
    Ok(KeyBytes::new(buf))
}
