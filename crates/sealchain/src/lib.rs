//! Chained envelope encryption for small secrets.
//!
//! A chain of [`Crypt`] links encrypts a payload so that no single component
//! ever holds more than one layer's worth of key material in the open. The
//! innermost link is the root of trust (typically [`KmsCrypt`], backed by
//! AWS KMS); each [`ChainCrypt`] stacked on top seals data locally with
//! XChaCha20-Poly1305 and hands the fresh data key inward to be protected.
//!
//! Encryption flows outward-to-inward: every link asks its inner link to
//! mint and wrap a data key, then seals with that key locally. Decryption
//! walks back out: unwrap the nested key envelope through the inner link,
//! then open the payload.
//!
//! ```no_run
//! use sealchain::{ChainCrypt, Crypt, KmsCrypt};
//!
//! # async fn run() -> Result<(), sealchain::CryptError> {
//! let root = KmsCrypt::init("alias/app-root-key").await;
//! let chain = ChainCrypt::new(root);
//!
//! let envelope = chain.encrypt(b"database password").await?;
//! let plaintext = chain.decrypt(&envelope).await?;
//! assert_eq!(plaintext, b"database password");
//! # Ok(()) }
//! ```
//!
//! Every operation is stateless and safe for concurrent use; the only shared
//! resource is the KMS client, which is itself clone-and-share friendly.
//! Transport timeouts, retries, and persistence of serialised envelopes are
//! the caller's concern.

pub mod chain;
pub mod crypt;
pub mod keygen;
pub mod kms;

pub use chain::{ChainCrypt, NONCE_LEN};
pub use common::{CryptError, DataEncryptionKey, Envelope, KeyBytes, KEY_LEN};
pub use crypt::Crypt;
pub use keygen::KeyGenFn;
pub use kms::KmsCrypt;
