//! Remote-KMS backend: AWS KMS as the root of trust.
//!
//! Ciphertext blobs returned by KMS are opaque. The service records
//! internally which customer master key produced each blob, so envelopes
//! from this backend carry no nested key envelope — the ciphertext is
//! self-describing. All failures from the SDK are propagated as
//! [`CryptError::Backend`] without retries or interpretation; retry policy
//! lives in the transport layer.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_kms::{primitives::Blob, types::DataKeySpec, Client};
use common::{CryptError, DataEncryptionKey, Envelope, KeyBytes};
use tracing::debug;

use crate::crypt::Crypt;

/// [`Crypt`] backend that delegates all encryption state to AWS KMS.
#[derive(Clone)]
pub struct KmsCrypt {
    client: Client,
    key_id: String,
}

impl KmsCrypt {
    /// Wrap an existing KMS client. `key_id` may be a key id, ARN, or alias.
    pub fn new(client: Client, key_id: impl Into<String>) -> Self {
        Self {
            client,
            key_id: key_id.into(),
        }
    }

    /// Build a backend from the default AWS config chain (environment,
    /// profile, or instance role).
    pub async fn init(key_id: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(Client::new(&config), key_id)
    }
}

#[async_trait]
impl Crypt for KmsCrypt {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Envelope, CryptError> {
        debug!(bytes = plaintext.len(), "encrypting via KMS");
        let resp = self
            .client
            .encrypt()
            .key_id(&self.key_id)
            .plaintext(Blob::new(plaintext))
            .send()
            .await
            .map_err(|e| CryptError::Backend(format!("kms Encrypt failed: {e:?}")))?;

        let ciphertext = resp
            .ciphertext_blob()
            .ok_or_else(|| {
                CryptError::Backend("kms Encrypt response contained no ciphertext".into())
            })?
            .as_ref()
            .to_vec();

        Ok(Envelope::keyless(ciphertext))
    }

    async fn decrypt(&self, envelope: &Envelope) -> Result<Vec<u8>, CryptError> {
        // The blob already names its master key inside KMS; any nested key
        // envelope on the input is ignored. Pinning key_id rejects blobs
        // produced under an unexpected CMK.
        debug!(bytes = envelope.ciphertext.len(), "decrypting via KMS");
        let resp = self
            .client
            .decrypt()
            .key_id(&self.key_id)
            .ciphertext_blob(Blob::new(envelope.ciphertext.clone()))
            .send()
            .await
            .map_err(|e| CryptError::Backend(format!("kms Decrypt failed: {e:?}")))?;

        let plaintext = resp.plaintext().ok_or_else(|| {
            CryptError::Backend("kms Decrypt response contained no plaintext".into())
        })?;

        Ok(plaintext.as_ref().to_vec())
    }

    async fn generate_data_key(&self) -> Result<DataEncryptionKey, CryptError> {
        let resp = self
            .client
            .generate_data_key()
            .key_id(&self.key_id)
            .key_spec(DataKeySpec::Aes256)
            .send()
            .await
            .map_err(|e| CryptError::Backend(format!("kms GenerateDataKey failed: {e:?}")))?;

        let plaintext = resp.plaintext().ok_or_else(|| {
            CryptError::Backend("kms GenerateDataKey response contained no plaintext".into())
        })?;
        let ciphertext = resp.ciphertext_blob().ok_or_else(|| {
            CryptError::Backend("kms GenerateDataKey response contained no ciphertext".into())
        })?;

        // KMS guarantees 32 bytes for AES_256; anything else means the key
        // size contract is broken and the chain above must not proceed.
        let key = KeyBytes::try_from(plaintext.as_ref())?;

        Ok(DataEncryptionKey::new(
            Envelope::keyless(ciphertext.as_ref().to_vec()),
            key,
        ))
    }
}
