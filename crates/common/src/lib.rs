//! Shared data model and error taxonomy for the `sealchain` crates.

pub mod error;
pub mod model;

pub use error::CryptError;
pub use model::{DataEncryptionKey, Envelope, KeyBytes, KEY_LEN};
