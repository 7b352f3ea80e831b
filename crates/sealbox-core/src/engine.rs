//! Cryptographic engine capability.
//!
//! The relay consumes the engine through this narrow trait and nothing else.
//! Encryption, encrypted comparison/selection and decryption all happen on
//! the engine's side of the boundary; the relay only ever holds [`Handle`]s.
//!
//! # Invariants
//!
//! - The relay never branches on plaintext. Data-dependent choices go through
//!   [`CryptoEngine::encrypted_select`].
//! - Access grants are idempotent and permanent. There is no revoke.
//! - A handle returned by the engine is never [`Handle::NONE`].
//! - `encrypted_equals` and `encrypted_select` return fresh handles, distinct
//!   from their operands, so operands can be discarded afterwards.

use thiserror::Error;

use crate::{
    handle::{EncryptedBool, ExternalInput, Handle, InputProof},
    identity::Identity,
};

/// Binding for an input import: which relay receives it, on whose behalf.
///
/// Proofs are bound to both, so a ciphertext produced for one caller cannot
/// be replayed by another.
#[derive(Debug, Clone, Copy)]
pub struct InputContext<'a> {
    /// Relay the input was produced for.
    pub relay: &'a Identity,
    /// Identity submitting the input.
    pub caller: &'a Identity,
}

/// Errors reported by a crypto engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Submitted ciphertext is malformed or does not decrypt.
    #[error("invalid ciphertext")]
    InvalidCiphertext,

    /// Input proof does not match the ciphertext and context.
    #[error("input proof verification failed")]
    ProofVerificationFailed,

    /// Handle is not known to the engine.
    #[error("unknown handle")]
    UnknownHandle,

    /// Operand has the wrong encrypted type for the operation.
    #[error("encrypted type mismatch")]
    TypeMismatch,

    /// Requester holds no grant for the handle.
    #[error("access denied")]
    AccessDenied,
}

/// Operations the relay needs from the cryptographic engine.
///
/// An engine serves exactly one relay. Its [`CryptoEngine::self_identity`]
/// is the relay's address: the import context and the grantee of
/// [`CryptoEngine::grant_self_access`] are the same identity.
pub trait CryptoEngine {
    /// Identity of the relay this engine serves.
    fn self_identity(&self) -> &Identity;

    /// Verifies `proof` against `input` and `context` and imports the
    /// ciphertext, returning a fresh internal handle.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidCiphertext` if the input is malformed
    /// - `EngineError::ProofVerificationFailed` if the proof is rejected
    fn import_verified(
        &mut self,
        input: &ExternalInput,
        proof: &InputProof,
        context: InputContext<'_>,
    ) -> Result<Handle, EngineError>;

    /// Encrypted equality of two handles.
    fn encrypted_equals(&mut self, a: Handle, b: Handle) -> Result<EncryptedBool, EngineError>;

    /// Encrypted `cond ? if_true : if_false`, as a fresh handle.
    fn encrypted_select(
        &mut self,
        cond: EncryptedBool,
        if_true: Handle,
        if_false: Handle,
    ) -> Result<Handle, EngineError>;

    /// Handle of the canonical encrypted zero.
    fn canonical_zero(&self) -> Handle;

    /// Lets `identity` request off-system decryption of `handle`.
    fn grant_permanent_access(&mut self, handle: Handle, identity: &Identity);

    /// Lets the relay itself (`self_identity`) decrypt `handle`.
    fn grant_self_access(&mut self, handle: Handle);

    /// Releases an intermediate handle the relay will never reference again.
    ///
    /// Engines that do not track handle lifetimes may ignore this.
    fn discard(&mut self, handle: Handle) {
        let _ = handle;
    }
}
