//! In-memory engine.

use std::collections::{HashMap, HashSet};

use sealbox_core::{
    CryptoEngine, EncryptedBool, EngineError, Environment, ExternalInput, Handle, Identity,
    InputContext, InputProof,
};
use sha2::{Digest, Sha256};

use crate::{
    error::CryptoError,
    input::{InputKeys, NONCE_SIZE},
};

/// Domain separation for handle derivation.
const HANDLE_DOMAIN: &[u8] = b"sealbox handle v1";

/// Decrypted value behind a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plaintext {
    Uint(u64),
    Bool(bool),
}

/// Reference [`CryptoEngine`] keeping plaintexts and grants in memory.
///
/// Bound to one relay identity: that identity is the grantee of
/// [`CryptoEngine::grant_self_access`].
pub struct MemoryEngine<E: Environment> {
    env: E,
    relay: Identity,
    keys: InputKeys,
    values: HashMap<Handle, Plaintext>,
    acl: HashMap<Handle, HashSet<Identity>>,
    zero: Handle,
    serial: u64,
}

impl<E: Environment> MemoryEngine<E> {
    /// Creates an engine for `relay` with a fresh master secret drawn from
    /// `env`.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InsufficientEntropy` if `env` yields an all-zero secret
    /// - `CryptoError::KeyDerivation` if key expansion fails
    pub fn new(env: E, relay: Identity) -> Result<Self, CryptoError> {
        let master = env.random_array32();
        if master == [0u8; 32] {
            tracing::error!(%relay, "refusing all-zero master secret");
            return Err(CryptoError::InsufficientEntropy);
        }
        let keys = InputKeys::derive(&master)?;

        let mut engine = Self {
            env,
            relay,
            keys,
            values: HashMap::new(),
            acl: HashMap::new(),
            zero: Handle::NONE,
            serial: 0,
        };
        engine.zero = engine.alloc(Plaintext::Uint(0));

        Ok(engine)
    }

    /// Relay this engine is bound to.
    pub fn relay(&self) -> &Identity {
        &self.relay
    }

    /// Client side: encrypts `value` as an input for `caller` at `relay`.
    pub fn encrypt_input(
        &self,
        value: u64,
        relay: &Identity,
        caller: &Identity,
    ) -> Result<(ExternalInput, InputProof), CryptoError> {
        let mut nonce = [0u8; NONCE_SIZE];
        self.env.random_bytes(&mut nonce);
        self.keys.seal(value, nonce, relay, caller)
    }

    /// Off-system decryption of an integer handle on behalf of `requester`.
    ///
    /// # Errors
    ///
    /// - `EngineError::UnknownHandle` if the engine never issued `handle`
    /// - `EngineError::AccessDenied` if `requester` holds no grant
    /// - `EngineError::TypeMismatch` if `handle` is an encrypted boolean
    pub fn decrypt(&self, handle: Handle, requester: &Identity) -> Result<u64, EngineError> {
        let value = self.lookup(handle)?;
        if !self.is_allowed(handle, requester) {
            tracing::debug!(?handle, %requester, "decrypt denied");
            return Err(EngineError::AccessDenied);
        }
        match value {
            Plaintext::Uint(v) => Ok(v),
            Plaintext::Bool(_) => Err(EngineError::TypeMismatch),
        }
    }

    /// Whether `identity` may decrypt `handle`.
    pub fn is_allowed(&self, handle: Handle, identity: &Identity) -> bool {
        self.acl.get(&handle).is_some_and(|grantees| grantees.contains(identity))
    }

    /// Number of live handles, canonical zero included.
    pub fn handle_count(&self) -> usize {
        self.values.len()
    }

    fn lookup(&self, handle: Handle) -> Result<Plaintext, EngineError> {
        self.values.get(&handle).copied().ok_or(EngineError::UnknownHandle)
    }

    fn lookup_uint(&self, handle: Handle) -> Result<u64, EngineError> {
        match self.lookup(handle)? {
            Plaintext::Uint(v) => Ok(v),
            Plaintext::Bool(_) => Err(EngineError::TypeMismatch),
        }
    }

    /// Stores `value` under a fresh handle.
    ///
    /// Handles hash fresh randomness together with an allocation counter, so
    /// they stay unique even if the environment repeats itself.
    fn alloc(&mut self, value: Plaintext) -> Handle {
        self.serial += 1;
        let digest = Sha256::new()
            .chain_update(HANDLE_DOMAIN)
            .chain_update(self.env.random_array32())
            .chain_update(self.serial.to_be_bytes())
            .finalize();

        let handle = Handle::from_bytes(digest.into());
        self.values.insert(handle, value);
        handle
    }

    fn grant(&mut self, handle: Handle, identity: &Identity) {
        if !self.values.contains_key(&handle) {
            tracing::warn!(?handle, "grant on unknown handle ignored");
            return;
        }
        self.acl.entry(handle).or_default().insert(identity.clone());
    }
}

impl<E: Environment> CryptoEngine for MemoryEngine<E> {
    fn self_identity(&self) -> &Identity {
        &self.relay
    }

    fn import_verified(
        &mut self,
        input: &ExternalInput,
        proof: &InputProof,
        context: InputContext<'_>,
    ) -> Result<Handle, EngineError> {
        let value = self.keys.open(input, proof, context.relay, context.caller)?;
        Ok(self.alloc(Plaintext::Uint(value)))
    }

    fn encrypted_equals(&mut self, a: Handle, b: Handle) -> Result<EncryptedBool, EngineError> {
        let equal = self.lookup_uint(a)? == self.lookup_uint(b)?;
        Ok(EncryptedBool(self.alloc(Plaintext::Bool(equal))))
    }

    fn encrypted_select(
        &mut self,
        cond: EncryptedBool,
        if_true: Handle,
        if_false: Handle,
    ) -> Result<Handle, EngineError> {
        let Plaintext::Bool(cond) = self.lookup(cond.0)? else {
            return Err(EngineError::TypeMismatch);
        };
        let (when_true, when_false) = (self.lookup(if_true)?, self.lookup(if_false)?);
        if std::mem::discriminant(&when_true) != std::mem::discriminant(&when_false) {
            return Err(EngineError::TypeMismatch);
        }

        let chosen = if cond { when_true } else { when_false };
        Ok(self.alloc(chosen))
    }

    fn canonical_zero(&self) -> Handle {
        self.zero
    }

    fn grant_permanent_access(&mut self, handle: Handle, identity: &Identity) {
        self.grant(handle, identity);
    }

    fn grant_self_access(&mut self, handle: Handle) {
        let relay = self.relay.clone();
        self.grant(handle, &relay);
    }

    fn discard(&mut self, handle: Handle) {
        if handle == self.zero {
            return;
        }
        self.values.remove(&handle);
        self.acl.remove(&handle);
    }
}

impl<E: Environment> std::fmt::Debug for MemoryEngine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("relay", &self.relay)
            .field("handles", &self.values.len())
            .field("keys", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[derive(Clone)]
    struct SeededEnv(Arc<Mutex<ChaCha8Rng>>);

    impl Environment for SeededEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            self.0.lock().expect("rng mutex poisoned").fill_bytes(buffer);
        }
    }

    fn engine() -> MemoryEngine<SeededEnv> {
        let env = SeededEnv(Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(1))));
        MemoryEngine::new(env, Identity::from([0xee; 20])).unwrap()
    }

    fn import(engine: &mut MemoryEngine<SeededEnv>, value: u64, caller: &Identity) -> Handle {
        let relay = engine.relay().clone();
        let (input, proof) = engine.encrypt_input(value, &relay, caller).unwrap();
        engine.import_verified(&input, &proof, InputContext { relay: &relay, caller }).unwrap()
    }

    #[test]
    fn canonical_zero_is_a_real_handle() {
        let engine = engine();
        assert!(!engine.canonical_zero().is_none());
        assert_eq!(engine.handle_count(), 1);
    }

    #[test]
    fn decrypt_requires_grant() {
        let mut engine = engine();
        let alice = Identity::from([0xa; 20]);
        let handle = import(&mut engine, 9, &alice);

        assert_eq!(engine.decrypt(handle, &alice), Err(EngineError::AccessDenied));
        engine.grant_permanent_access(handle, &alice);
        engine.grant_permanent_access(handle, &alice);
        assert_eq!(engine.decrypt(handle, &alice), Ok(9));
    }

    #[test]
    fn self_access_goes_to_bound_relay() {
        let mut engine = engine();
        let alice = Identity::from([0xa; 20]);
        let handle = import(&mut engine, 9, &alice);

        engine.grant_self_access(handle);
        assert!(engine.is_allowed(handle, &Identity::from([0xee; 20])));
        assert!(!engine.is_allowed(handle, &alice));
    }

    #[test]
    fn select_on_equality_sanitizes() {
        let mut engine = engine();
        let alice = Identity::from([0xa; 20]);
        let zero = engine.canonical_zero();

        for value in [0, 1, u64::MAX] {
            let imported = import(&mut engine, value, &alice);
            let is_zero = engine.encrypted_equals(imported, zero).unwrap();
            let sealed = engine.encrypted_select(is_zero, zero, imported).unwrap();

            engine.grant_permanent_access(sealed, &alice);
            assert_eq!(engine.decrypt(sealed, &alice), Ok(value));
        }
    }

    #[test]
    fn operations_reject_wrong_types_and_unknown_handles() {
        let mut engine = engine();
        let alice = Identity::from([0xa; 20]);
        let zero = engine.canonical_zero();
        let value = import(&mut engine, 3, &alice);
        let flag = engine.encrypted_equals(value, zero).unwrap();

        assert_eq!(engine.encrypted_equals(flag.0, zero), Err(EngineError::TypeMismatch));
        assert_eq!(
            engine.encrypted_select(EncryptedBool(value), zero, value),
            Err(EngineError::TypeMismatch)
        );
        assert_eq!(
            engine.encrypted_select(flag, flag.0, value),
            Err(EngineError::TypeMismatch)
        );
        assert_eq!(
            engine.encrypted_equals(Handle::from_bytes([9; 32]), zero),
            Err(EngineError::UnknownHandle)
        );
    }

    #[test]
    fn grant_on_unknown_handle_is_ignored() {
        let mut engine = engine();
        let alice = Identity::from([0xa; 20]);
        let bogus = Handle::from_bytes([9; 32]);

        engine.grant_permanent_access(bogus, &alice);
        assert!(!engine.is_allowed(bogus, &alice));
        assert_eq!(engine.decrypt(bogus, &alice), Err(EngineError::UnknownHandle));
    }

    #[derive(Clone)]
    struct ZeroEnv;

    impl Environment for ZeroEnv {
        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0);
        }
    }

    #[test]
    fn zero_master_secret_rejected() {
        let result = MemoryEngine::new(ZeroEnv, Identity::from([0xee; 20]));
        assert!(matches!(result, Err(CryptoError::InsufficientEntropy)));
    }

    #[test]
    fn discard_frees_handle_but_keeps_zero() {
        let mut engine = engine();
        let alice = Identity::from([0xa; 20]);
        let zero = engine.canonical_zero();
        let imported = import(&mut engine, 5, &alice);
        engine.grant_permanent_access(imported, &alice);
        assert_eq!(engine.handle_count(), 2);

        engine.discard(imported);
        engine.discard(zero);
        assert_eq!(engine.handle_count(), 1);
        assert!(!engine.is_allowed(imported, &alice));
        assert_eq!(engine.decrypt(imported, &alice), Err(EngineError::UnknownHandle));
        assert_eq!(engine.canonical_zero(), zero);
        assert!(engine.encrypted_equals(zero, zero).is_ok());
    }

    #[test]
    fn self_identity_is_bound_relay() {
        assert_eq!(engine().self_identity(), &Identity::from([0xee; 20]));
    }

    #[test]
    fn debug_redacts_keys() {
        let rendered = format!("{:?}", engine());
        assert!(rendered.contains("<redacted>"));
    }
}
