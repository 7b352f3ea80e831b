//! Client input encryption and proof binding.
//!
//! # Wire format
//!
//! ```text
//! ExternalInput = nonce (24) || XChaCha20-Poly1305(value as u64 BE) (8 + 16)
//! InputProof    = HMAC-SHA256(proof_key, binding || ExternalInput)
//! binding       = len(relay) as u32 BE || relay || len(caller) as u32 BE || caller
//! ```
//!
//! The binding is also the AEAD associated data, so a ciphertext only opens
//! for the (relay, caller) pair it was produced for.

use bytes::Bytes;
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sealbox_core::{EngineError, ExternalInput, Identity, InputProof};
use sha2::Sha256;

use crate::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// XChaCha20 nonce size.
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag size.
const TAG_SIZE: usize = 16;

/// Size of a well-formed [`ExternalInput`].
pub const CIPHERTEXT_SIZE: usize = NONCE_SIZE + 8 + TAG_SIZE;

/// Domain separation labels.
const KDF_SALT: &[u8] = b"sealbox engine v1";
const CIPHER_KEY_LABEL: &[u8] = b"sealbox input cipher key";
const PROOF_KEY_LABEL: &[u8] = b"sealbox input proof key";

/// Keys used for client inputs, derived from the engine's master secret.
pub(crate) struct InputKeys {
    cipher_key: [u8; 32],
    proof_key: [u8; 32],
}

impl InputKeys {
    pub(crate) fn derive(master: &[u8; 32]) -> Result<Self, CryptoError> {
        let hk = Hkdf::<Sha256>::new(Some(KDF_SALT), master);

        let mut cipher_key = [0u8; 32];
        hk.expand(CIPHER_KEY_LABEL, &mut cipher_key)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

        let mut proof_key = [0u8; 32];
        hk.expand(PROOF_KEY_LABEL, &mut proof_key)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

        Ok(Self { cipher_key, proof_key })
    }

    /// Encrypts `value` for `caller` at `relay` and produces the matching
    /// proof.
    pub(crate) fn seal(
        &self,
        value: u64,
        nonce: [u8; NONCE_SIZE],
        relay: &Identity,
        caller: &Identity,
    ) -> Result<(ExternalInput, InputProof), CryptoError> {
        let aad = binding(relay, caller);
        let cipher = XChaCha20Poly1305::new((&self.cipher_key).into());
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), Payload { msg: &value.to_be_bytes(), aad: &aad })
            .map_err(|_| CryptoError::Encryption)?;

        let mut external = Vec::with_capacity(CIPHERTEXT_SIZE);
        external.extend_from_slice(&nonce);
        external.extend_from_slice(&ciphertext);

        let tag = self.proof_tag(&aad, &external).map_err(|_| CryptoError::Encryption)?;

        Ok((ExternalInput(Bytes::from(external)), InputProof(Bytes::from(tag))))
    }

    /// Verifies the proof and decrypts the input.
    ///
    /// # Errors
    ///
    /// - `EngineError::InvalidCiphertext` if the input has the wrong size or
    ///   fails to decrypt
    /// - `EngineError::ProofVerificationFailed` if the proof does not match
    pub(crate) fn open(
        &self,
        input: &ExternalInput,
        proof: &InputProof,
        relay: &Identity,
        caller: &Identity,
    ) -> Result<u64, EngineError> {
        if input.0.len() != CIPHERTEXT_SIZE {
            return Err(EngineError::InvalidCiphertext);
        }

        let aad = binding(relay, caller);
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.proof_key)
            .map_err(|_| EngineError::ProofVerificationFailed)?;
        mac.update(&aad);
        mac.update(&input.0);
        mac.verify_slice(&proof.0).map_err(|_| EngineError::ProofVerificationFailed)?;

        let (nonce, ciphertext) = input.0.split_at(NONCE_SIZE);
        let cipher = XChaCha20Poly1305::new((&self.cipher_key).into());
        let plaintext = cipher
            .decrypt(XNonce::from_slice(nonce), Payload { msg: ciphertext, aad: &aad })
            .map_err(|_| EngineError::InvalidCiphertext)?;

        let bytes: [u8; 8] =
            plaintext.as_slice().try_into().map_err(|_| EngineError::InvalidCiphertext)?;
        Ok(u64::from_be_bytes(bytes))
    }

    fn proof_tag(
        &self,
        aad: &[u8],
        external: &[u8],
    ) -> Result<Vec<u8>, hmac::digest::InvalidLength> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.proof_key)?;
        mac.update(aad);
        mac.update(external);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Unambiguous encoding of (relay, caller).
fn binding(relay: &Identity, caller: &Identity) -> Vec<u8> {
    let (relay, caller) = (relay.as_bytes(), caller.as_bytes());
    let mut out = Vec::with_capacity(8 + relay.len() + caller.len());
    out.extend_from_slice(&(relay.len() as u32).to_be_bytes());
    out.extend_from_slice(relay);
    out.extend_from_slice(&(caller.len() as u32).to_be_bytes());
    out.extend_from_slice(caller);
    out
}
