//! Engine setup and client-side errors.

use thiserror::Error;

/// Errors outside the `CryptoEngine` interface: key setup and client-side
/// input encryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// HKDF expansion failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The environment returned an all-zero master secret.
    #[error("environment produced no entropy for the master secret")]
    InsufficientEntropy,

    /// AEAD encryption failed.
    #[error("encryption failed")]
    Encryption,
}
