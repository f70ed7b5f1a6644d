//! Envelope and data-key types.
//!
//! An [`Envelope`] is the persisted unit of envelope encryption: opaque
//! ciphertext plus, optionally, another envelope holding the encrypted form
//! of the data key that produced it. The nesting recurses once per chain
//! link, terminating at an envelope whose key state lives entirely inside a
//! remote key-management service.
//!
//! # Wire format
//!
//! Envelopes serialise as two JSON fields:
//!
//! ```text
//! { "ciphertext": "<base64url-no-pad bytes>", "encryption_key": { ... } }
//! ```
//!
//! `encryption_key` is omitted entirely when absent; a present value must be
//! a nested envelope object, and any other shape fails deserialisation.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptError;

/// Byte length of a data encryption key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

mod base64_bytes {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        URL_SAFE_NO_PAD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Ciphertext plus the (possibly recursive) means to obtain its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Opaque ciphertext bytes. The producing backend defines the layout;
    /// the symmetric chain backend prepends its nonce, a remote KMS returns
    /// a fully self-describing blob.
    #[serde(with = "base64_bytes")]
    pub ciphertext: Vec<u8>,

    /// Encrypted form of the data key that sealed `ciphertext`, produced by
    /// the next link inward. Absent when the ciphertext is self-describing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<Box<Envelope>>,
}

impl Envelope {
    /// Envelope whose ciphertext is self-describing (remote-KMS output).
    pub fn keyless(ciphertext: Vec<u8>) -> Self {
        Self {
            ciphertext,
            encryption_key: None,
        }
    }

    /// Envelope whose data key travels alongside it, encrypted by an inner
    /// chain link.
    pub fn chained(ciphertext: Vec<u8>, encryption_key: Envelope) -> Self {
        Self {
            ciphertext,
            encryption_key: Some(Box::new(encryption_key)),
        }
    }
}

/// Fixed-size buffer holding exactly [`KEY_LEN`] bytes of plaintext key
/// material.
///
/// The memory is overwritten with zeroes on drop, and the `Debug` impl never
/// prints the contents. Callers receive this only at key-generation or
/// key-unwrap time and are expected to use and drop it promptly.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyBytes([u8; KEY_LEN]);

impl KeyBytes {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl TryFrom<&[u8]> for KeyBytes {
    type Error = CryptError;

    /// Copy a slice into a key buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CryptError::InvalidKeyLength`] if the slice is not exactly
    /// [`KEY_LEN`] bytes — the key size contract between chain links was
    /// violated.
    fn try_from(slice: &[u8]) -> Result<Self, CryptError> {
        if slice.len() != KEY_LEN {
            return Err(CryptError::InvalidKeyLength(slice.len()));
        }
        let mut buf = [0u8; KEY_LEN];
        buf.copy_from_slice(slice);
        Ok(Self(buf))
    }
}

impl fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material — not even in debug builds.
        f.write_str("KeyBytes([REDACTED])")
    }
}

/// A freshly generated data key: its encrypted form for storage and its
/// plaintext for immediate local use.
///
/// Transient by design — there are no serde derives, and the plaintext is
/// never copied into the envelope. The plaintext buffer zeroes itself when
/// this value is dropped.
#[derive(Debug)]
pub struct DataEncryptionKey {
    /// Encrypted form of the key, safe to persist.
    pub envelope: Envelope,
    /// Raw key bytes, owned exclusively by the caller that requested them.
    pub plaintext: KeyBytes,
}

impl DataEncryptionKey {
    pub fn new(envelope: Envelope, plaintext: KeyBytes) -> Self {
        Self {
            envelope,
            plaintext,
        }
    }

    /// Split into the persistable envelope and the transient plaintext key.
    pub fn into_parts(self) -> (Envelope, KeyBytes) {
        (self.envelope, self.plaintext)
    }
}
