//! Host error types.

use std::fmt;

use sealbox_core::{EngineError, RelayError};
use sealbox_crypto::CryptoError;

/// Errors that can occur in the host.
#[derive(Debug)]
pub enum HostError {
    /// Configuration error
    Config(String),

    /// Relay rejected the operation
    Relay(RelayError),

    /// Off-system engine call failed (decrypt)
    Engine(EngineError),

    /// Engine setup or client-side encryption failed
    Crypto(CryptoError),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Relay(err) => write!(f, "relay error: {}", err),
            Self::Engine(err) => write!(f, "engine error: {}", err),
            Self::Crypto(err) => write!(f, "crypto error: {}", err),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Relay(err) => Some(err),
            Self::Engine(err) => Some(err),
            Self::Crypto(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RelayError> for HostError {
    fn from(err: RelayError) -> Self {
        Self::Relay(err)
    }
}

impl From<EngineError> for HostError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

impl From<CryptoError> for HostError {
    fn from(err: CryptoError) -> Self {
        Self::Crypto(err)
    }
}
