//! Encrypted value handles and client inputs.
//!
//! A [`Handle`] names a ciphertext held by the crypto engine. The relay
//! stores, copies and compares handles but can never look inside them.
//!
//! # Security
//!
//! - **Debug Redaction**: [`ExternalInput`] and [`InputProof`] print only
//!   their length, so submitted ciphertext never ends up in logs.

use std::fmt;

use bytes::Bytes;

/// Width of an engine handle in bytes.
pub const HANDLE_SIZE: usize = 32;

/// Opaque reference to an engine-managed ciphertext.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle([u8; HANDLE_SIZE]);

impl Handle {
    /// The "no value" sentinel. Engines never allocate it.
    pub const NONE: Self = Self([0u8; HANDLE_SIZE]);

    /// Wraps raw handle bytes.
    pub const fn from_bytes(bytes: [u8; HANDLE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw handle bytes.
    pub const fn as_bytes(&self) -> &[u8; HANDLE_SIZE] {
        &self.0
    }

    /// True for the "no value" sentinel.
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are enough to tell handles apart in logs
        write!(f, "Handle({}..)", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Handle to an encrypted boolean produced by an encrypted comparison.
///
/// Kept distinct from [`Handle`] so a comparison result cannot be stored as a
/// message payload by mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncryptedBool(pub Handle);

/// Ciphertext as submitted by a client, before engine import.
#[derive(Clone, PartialEq, Eq)]
pub struct ExternalInput(pub Bytes);

impl fmt::Debug for ExternalInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExternalInput(<redacted {} bytes>)", self.0.len())
    }
}

/// Proof that an [`ExternalInput`] was produced for a given relay and caller.
#[derive(Clone, PartialEq, Eq)]
pub struct InputProof(pub Bytes);

impl fmt::Debug for InputProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InputProof(<redacted {} bytes>)", self.0.len())
    }
}
