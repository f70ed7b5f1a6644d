//! Symmetric chain-link backend: local XChaCha20-Poly1305 sealing with an
//! inner [`Crypt`] protecting every data key.
//!
//! # Ciphertext format
//!
//! ```text
//! [ 24-byte nonce ][ sealed payload + 16-byte tag ]
//! ```
//!
//! The data key that sealed the payload never appears in the ciphertext;
//! its encrypted form travels separately in `Envelope::encryption_key`,
//! produced by the inner link.

use async_trait::async_trait;
use chacha20poly1305::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Key, XChaCha20Poly1305, XNonce,
};
use common::{CryptError, DataEncryptionKey, Envelope, KeyBytes};
use tracing::debug;
use zeroize::Zeroize;

use crate::crypt::Crypt;
use crate::keygen::{self, KeyGenFn};

/// Byte length of an XChaCha20-Poly1305 nonce (24 bytes = 192 bits).
///
/// The nonce space is large enough that random nonces make reuse under one
/// key negligible; no uniqueness bookkeeping is kept.
pub const NONCE_LEN: usize = 24;

/// [`Crypt`] backend that seals payloads locally and defers protection of
/// its data keys to the chain link below it.
///
/// Each encrypt call mints a fresh key via `inner.generate_data_key()`,
/// seals with it once, and drops it; nothing is retained between calls.
pub struct ChainCrypt<C> {
    inner: C,
    key_source: KeyGenFn,
}

impl<C: Crypt> ChainCrypt<C> {
    /// Chain this link on top of `inner`. The innermost link of a chain
    /// holds the highest trust, e.g. a remote KMS.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            key_source: keygen::random_key,
        }
    }

    /// Override the data-key source. Strictly for deterministic tests;
    /// production chains must use the secure default from [`ChainCrypt::new`].
    pub fn with_key_source(inner: C, key_source: KeyGenFn) -> Self {
        Self { inner, key_source }
    }
}

fn build_cipher(key: &KeyBytes) -> XChaCha20Poly1305 {
    XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
}

#[async_trait]
impl<C: Crypt> Crypt for ChainCrypt<C> {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Envelope, CryptError> {
        // Fresh key per payload, already wrapped by the inner link. The
        // KeyBytes type enforces the 256-bit key contract at this boundary.
        let (key_envelope, key) = self.inner.generate_data_key().await?.into_parts();

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|_| CryptError::RandomSource)?;
        let nonce = XNonce::from_slice(&nonce_bytes);

        let sealed = build_cipher(&key)
            .encrypt(nonce, plaintext)
            .map_err(|_| CryptError::AeadFailure)?;

        let mut ciphertext = Vec::with_capacity(NONCE_LEN + sealed.len());
        ciphertext.extend_from_slice(&nonce_bytes);
        ciphertext.extend_from_slice(&sealed);

        debug!(
            plaintext_bytes = plaintext.len(),
            ciphertext_bytes = ciphertext.len(),
            "chain link sealed payload"
        );
        Ok(Envelope::chained(ciphertext, key_envelope))
    }

    async fn decrypt(&self, envelope: &Envelope) -> Result<Vec<u8>, CryptError> {
        // Without a nested key envelope there is no key source to consult.
        let key_envelope = envelope
            .encryption_key
            .as_deref()
            .ok_or(CryptError::MissingKeyEnvelope)?;

        let mut raw_key = self.inner.decrypt(key_envelope).await?;
        let key = KeyBytes::try_from(raw_key.as_slice());
        raw_key.zeroize();
        let key = key?;

        if envelope.ciphertext.len() < NONCE_LEN {
            return Err(CryptError::MalformedCiphertext(envelope.ciphertext.len()));
        }
        let (nonce_bytes, sealed) = envelope.ciphertext.split_at(NONCE_LEN);
        let nonce = XNonce::from_slice(nonce_bytes);

        build_cipher(&key)
            .decrypt(nonce, sealed)
            .map_err(|_| CryptError::AeadFailure)
    }

    async fn generate_data_key(&self) -> Result<DataEncryptionKey, CryptError> {
        let key = (self.key_source)()?;
        // Recurse through this link's own encrypt so the key is protected by
        // the whole chain below it.
        let envelope = self.encrypt(key.as_bytes()).await?;
        Ok(DataEncryptionKey::new(envelope, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::MockCrypt;
    use common::KEY_LEN;

    /// Deterministic stand-in for a remote KMS: "encrypts" by XOR with one
    /// fixed key, so a wrapped 32-byte data key yields a 32-byte ciphertext.
    struct FixedKeyCrypt {
        key: [u8; KEY_LEN],
    }

    impl FixedKeyCrypt {
        fn new() -> Self {
            Self {
                key: [0x42; KEY_LEN],
            }
        }

        fn xor(&self, data: &[u8]) -> Vec<u8> {
            data.iter()
                .zip(self.key.iter().cycle())
                .map(|(b, k)| b ^ k)
                .collect()
        }
    }

    #[async_trait]
    impl Crypt for FixedKeyCrypt {
        async fn encrypt(&self, plaintext: &[u8]) -> Result<Envelope, CryptError> {
            Ok(Envelope::keyless(self.xor(plaintext)))
        }

        async fn decrypt(&self, envelope: &Envelope) -> Result<Vec<u8>, CryptError> {
            Ok(self.xor(&envelope.ciphertext))
        }

        async fn generate_data_key(&self) -> Result<DataEncryptionKey, CryptError> {
            let key = keygen::random_key()?;
            let envelope = self.encrypt(key.as_bytes()).await?;
            Ok(DataEncryptionKey::new(envelope, key))
        }
    }

    #[tokio::test]
    async fn hello_world_round_trips_with_fixed_inner_link() {
        let chain = ChainCrypt::new(FixedKeyCrypt::new());

        let envelope = chain.encrypt(b"hello world").await.unwrap();

        let key_envelope = envelope.encryption_key.as_deref().unwrap();
        // The wrapped data key is 32 bytes, and the XOR stub preserves length.
        assert_eq!(key_envelope.ciphertext.len(), KEY_LEN);
        assert!(key_envelope.encryption_key.is_none());

        let plaintext = chain.decrypt(&envelope).await.unwrap();
        assert_eq!(plaintext, b"hello world");
    }

    #[tokio::test]
    async fn round_trips_across_payload_sizes() {
        let chain = ChainCrypt::new(FixedKeyCrypt::new());
        for payload in [&b""[..], &b"x"[..], &[0u8; 1024][..]] {
            let envelope = chain.encrypt(payload).await.unwrap();
            assert_eq!(chain.decrypt(&envelope).await.unwrap(), payload);
        }
    }

    #[tokio::test]
    async fn tampering_any_region_fails_authentication() {
        let chain = ChainCrypt::new(FixedKeyCrypt::new());
        let envelope = chain.encrypt(b"tamper me").await.unwrap();

        // Flip one bit in the nonce, then one in the sealed payload, then
        // one in the trailing tag.
        for index in [0, NONCE_LEN, envelope.ciphertext.len() - 1] {
            let mut tampered = envelope.clone();
            tampered.ciphertext[index] ^= 0x01;
            let err = chain.decrypt(&tampered).await.unwrap_err();
            assert!(matches!(err, CryptError::AeadFailure), "index {index}");
        }
    }

    #[tokio::test]
    async fn same_plaintext_twice_yields_distinct_ciphertexts() {
        let chain = ChainCrypt::new(FixedKeyCrypt::new());
        let first = chain.encrypt(b"repeated secret").await.unwrap();
        let second = chain.encrypt(b"repeated secret").await.unwrap();
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[tokio::test]
    async fn keyless_envelope_is_a_shape_error() {
        let chain = ChainCrypt::new(FixedKeyCrypt::new());

        let mut bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut bytes);
        let envelope = Envelope::keyless(bytes.to_vec());

        let err = chain.decrypt(&envelope).await.unwrap_err();
        assert!(matches!(err, CryptError::MissingKeyEnvelope));
    }

    #[tokio::test]
    async fn truncated_ciphertext_is_malformed() {
        let chain = ChainCrypt::new(FixedKeyCrypt::new());
        let mut envelope = chain.encrypt(b"short").await.unwrap();
        envelope.ciphertext.truncate(10);

        let err = chain.decrypt(&envelope).await.unwrap_err();
        assert!(matches!(err, CryptError::MalformedCiphertext(10)));
    }

    #[tokio::test]
    async fn three_link_chain_round_trips() {
        // local -> local -> simulated remote KMS.
        let chain = ChainCrypt::new(ChainCrypt::new(FixedKeyCrypt::new()));

        let envelope = chain.encrypt(b"defense in depth").await.unwrap();

        let middle = envelope.encryption_key.as_deref().unwrap();
        let innermost = middle.encryption_key.as_deref().unwrap();
        assert!(innermost.encryption_key.is_none());

        let plaintext = chain.decrypt(&envelope).await.unwrap();
        assert_eq!(plaintext, b"defense in depth");
    }

    #[tokio::test]
    async fn broken_inner_link_error_surfaces_on_decrypt() {
        let mut inner = MockCrypt::new();
        inner
            .expect_decrypt()
            .returning(|_| Err(CryptError::Backend("kms unavailable".into())));
        let chain = ChainCrypt::new(inner);

        let envelope = Envelope::chained(vec![0u8; 64], Envelope::keyless(vec![1, 2, 3]));
        let err = chain.decrypt(&envelope).await.unwrap_err();
        match err {
            CryptError::Backend(msg) => assert!(msg.contains("kms unavailable")),
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn broken_inner_link_error_surfaces_on_encrypt() {
        let mut inner = MockCrypt::new();
        inner
            .expect_generate_data_key()
            .returning(|| Err(CryptError::Backend("kms unavailable".into())));
        let chain = ChainCrypt::new(inner);

        let err = chain.encrypt(b"anything").await.unwrap_err();
        assert!(matches!(err, CryptError::Backend(_)));
    }

    #[tokio::test]
    async fn wrong_length_inner_key_violates_the_contract() {
        let mut inner = MockCrypt::new();
        inner.expect_decrypt().returning(|_| Ok(vec![0u8; 16]));
        let chain = ChainCrypt::new(inner);

        let envelope = Envelope::chained(vec![0u8; 64], Envelope::keyless(vec![1, 2, 3]));
        let err = chain.decrypt(&envelope).await.unwrap_err();
        assert!(matches!(err, CryptError::InvalidKeyLength(16)));
    }

    #[tokio::test]
    async fn deterministic_key_source_is_honoured() {
        fn fixed_key() -> Result<KeyBytes, CryptError> {
            Ok(KeyBytes::new([0x07; KEY_LEN]))
        }

        let chain = ChainCrypt::with_key_source(FixedKeyCrypt::new(), fixed_key);
        let dek = chain.generate_data_key().await.unwrap();
        assert_eq!(dek.plaintext.as_bytes(), &[0x07; KEY_LEN]);

        // The plaintext key must not appear in the envelope.
        assert_ne!(dek.envelope.ciphertext, [0x07; KEY_LEN].to_vec());
        let unwrapped = chain.decrypt(&dek.envelope).await.unwrap();
        assert_eq!(unwrapped, [0x07; KEY_LEN].to_vec());
    }
}
