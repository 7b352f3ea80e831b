//! Caller and recipient identities.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opaque, equality-comparable party identity.
///
/// The relay makes no assumption about the format (address, key hash,
/// account id). Authenticity is the transport layer's job; by the time an
/// `Identity` reaches the relay it is trusted.
///
/// The empty identity and the all-zero identity are the "null" identity and
/// are rejected as recipients.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity(Bytes);

impl Identity {
    /// Wraps raw identity bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// The null identity.
    pub fn null() -> Self {
        Self(Bytes::new())
    }

    /// Parses a hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(digits).map(Self::new)
    }

    /// Raw identity bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True unless this is the null identity.
    pub fn is_valid(&self) -> bool {
        self.0.iter().any(|b| *b != 0)
    }
}

impl From<&[u8]> for Identity {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<[u8; N]> for Identity {
    fn from(bytes: [u8; N]) -> Self {
        Self(Bytes::copy_from_slice(&bytes))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({self})")
    }
}
