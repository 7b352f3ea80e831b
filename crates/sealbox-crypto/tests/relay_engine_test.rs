//! Relay + MemoryEngine integration tests
//!
//! These tests drive the relay through a real engine and check what each
//! party can decrypt afterwards:
//! - Sanitization preserves non-zero values and zeroes zero inputs
//! - Only sender, recipient and relay can decrypt message and reply
//! - Inputs bound to one caller cannot be submitted by another

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sealbox_core::{
    EngineError, Environment, ExternalInput, Handle, Identity, InputProof, Relay, RelayError,
};
use sealbox_crypto::MemoryEngine;

// Test environment with a seeded RNG
#[derive(Clone)]
struct TestEnv(Arc<Mutex<ChaCha8Rng>>);

impl TestEnv {
    fn with_seed(seed: u64) -> Self {
        Self(Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))))
    }
}

impl Environment for TestEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.0.lock().expect("rng mutex poisoned").fill_bytes(buffer);
    }
}

fn relay_address() -> Identity {
    Identity::from([0xee; 20])
}

fn alice() -> Identity {
    Identity::from([0xa; 20])
}

fn bob() -> Identity {
    Identity::from([0xb; 20])
}

fn carol() -> Identity {
    Identity::from([0xc; 20])
}

fn new_relay(seed: u64) -> Relay<MemoryEngine<TestEnv>> {
    let engine = MemoryEngine::new(TestEnv::with_seed(seed), relay_address()).expect("engine");
    Relay::new(engine)
}

fn encrypt(
    relay: &Relay<MemoryEngine<TestEnv>>,
    value: u64,
    caller: &Identity,
) -> (ExternalInput, InputProof) {
    relay.engine().encrypt_input(value, relay.address(), caller).expect("encrypt_input")
}

fn send(
    relay: &mut Relay<MemoryEngine<TestEnv>>,
    from: &Identity,
    to: &Identity,
    value: u64,
) -> u64 {
    let (input, proof) = encrypt(relay, value, from);
    relay.send_message(from, to.clone(), &input, &proof).expect("send_message").0
}

fn reply(
    relay: &mut Relay<MemoryEngine<TestEnv>>,
    from: &Identity,
    record: u64,
    value: u64,
) -> Result<(), RelayError> {
    let (input, proof) = encrypt(relay, value, from);
    relay.send_reply(from, record, &input, &proof).map(|_| ())
}

#[test]
fn parties_decrypt_message_and_reply() {
    let mut relay = new_relay(1);
    let record = send(&mut relay, &alice(), &bob(), 7);
    reply(&mut relay, &bob(), record, 42).expect("reply");

    let message = relay.message_handle(record).expect("message handle");
    let answer = relay.reply_handle(record).expect("reply handle");
    let engine = relay.engine();

    for party in [alice(), bob(), relay_address()] {
        assert_eq!(engine.decrypt(message, &party), Ok(7));
        assert_eq!(engine.decrypt(answer, &party), Ok(42));
    }
    assert_eq!(engine.decrypt(message, &carol()), Err(EngineError::AccessDenied));
    assert_eq!(engine.decrypt(answer, &carol()), Err(EngineError::AccessDenied));
}

#[test]
fn zero_payload_decrypts_to_zero() {
    let mut relay = new_relay(2);
    let record = send(&mut relay, &alice(), &bob(), 0);

    let handle = relay.message_handle(record).expect("message handle");
    assert_eq!(relay.engine().decrypt(handle, &bob()), Ok(0));
}

#[test]
fn reply_slot_is_placeholder_until_replied() {
    let mut relay = new_relay(3);
    let record = send(&mut relay, &alice(), &bob(), 7);

    assert_eq!(relay.reply_handle(record), Ok(Handle::NONE));
    assert_eq!(relay.engine().decrypt(Handle::NONE, &bob()), Err(EngineError::UnknownHandle));
}

#[test]
fn input_stolen_from_sender_is_rejected() {
    let mut relay = new_relay(4);
    let (input, proof) = encrypt(&relay, 7, &alice());

    // Carol submits Alice's ciphertext as her own
    let result = relay.send_message(&carol(), bob(), &input, &proof);
    assert_eq!(result, Err(RelayError::ProofVerificationFailed));
    assert_eq!(relay.message_count(), 0);
    assert_eq!(relay.inbox_count(&bob()), 0);
}

#[test]
fn tampered_ciphertext_is_rejected() {
    let mut relay = new_relay(5);
    let (input, proof) = encrypt(&relay, 7, &alice());

    let mut bytes = input.0.to_vec();
    bytes.truncate(10);
    let result = relay.send_message(&alice(), bob(), &ExternalInput(bytes.into()), &proof);
    assert_eq!(result, Err(RelayError::InvalidCiphertext));
}

#[test]
fn reply_input_must_be_bound_to_recipient() {
    let mut relay = new_relay(6);
    let record = send(&mut relay, &alice(), &bob(), 7);

    // Input produced for Alice, submitted by Bob
    let (input, proof) = encrypt(&relay, 42, &alice());
    assert_eq!(
        relay.send_reply(&bob(), record, &input, &proof),
        Err(RelayError::ProofVerificationFailed)
    );
    assert!(!relay.metadata(record).expect("metadata").replied);
}

#[test]
fn send_reply_scenario_end_to_end() {
    let mut relay = new_relay(7);

    let record = send(&mut relay, &alice(), &bob(), 7);
    assert_eq!(record, 0);
    assert_eq!(relay.inbox_count(&bob()), 1);
    let meta = relay.metadata(0).expect("metadata");
    assert_eq!((meta.recipient, meta.replied), (bob(), false));

    reply(&mut relay, &bob(), 0, 42).expect("first reply");
    assert!(relay.metadata(0).expect("metadata").replied);
    assert_eq!(reply(&mut relay, &bob(), 0, 99), Err(RelayError::AlreadyReplied(0)));

    assert_eq!(
        relay.inbox_entry(&bob(), 5),
        Err(RelayError::PositionOutOfRange { position: 5, count: 1 })
    );
}

#[test]
fn non_recipient_cannot_reply_even_if_sender() {
    let mut relay = new_relay(8);
    let record = send(&mut relay, &alice(), &bob(), 7);

    assert_eq!(reply(&mut relay, &alice(), record, 1), Err(RelayError::NotAuthorized(record)));
    assert_eq!(reply(&mut relay, &carol(), record, 1), Err(RelayError::NotAuthorized(record)));
}

#[test]
fn relay_reads_payloads_under_its_own_address() {
    let other = Identity::from([0xef; 20]);
    let engine = MemoryEngine::new(TestEnv::with_seed(9), other.clone()).expect("engine");
    let mut relay = Relay::new(engine);
    assert_eq!(relay.address(), &other);

    let record = send(&mut relay, &alice(), &bob(), 7);
    let handle = relay.message_handle(record).expect("message handle");
    let engine = relay.engine();

    assert!(engine.is_allowed(handle, relay.address()));
    assert_eq!(engine.decrypt(handle, relay.address()), Ok(7));
    assert_eq!(engine.decrypt(handle, &relay_address()), Err(EngineError::AccessDenied));
}

#[test]
fn handle_table_grows_one_per_payload() {
    let mut relay = new_relay(10);
    assert_eq!(relay.engine().handle_count(), 1);

    for (i, value) in [0, 7, 0, u64::MAX].into_iter().enumerate() {
        let record = send(&mut relay, &alice(), &bob(), value);
        reply(&mut relay, &bob(), record, value).expect("reply");
        assert_eq!(relay.engine().handle_count(), 1 + 2 * (i + 1));
    }

    // Rejected inputs leave nothing behind either
    let (input, proof) = encrypt(&relay, 1, &alice());
    assert!(relay.send_message(&carol(), bob(), &input, &proof).is_err());
    assert_eq!(relay.engine().handle_count(), 1 + 2 * 4);
}

proptest! {
    /// Whatever value is sent, both parties read it back unchanged.
    #[test]
    fn prop_sealed_value_roundtrips(seed in any::<u64>(), value in any::<u64>()) {
        let mut relay = new_relay(seed);
        let record = send(&mut relay, &alice(), &bob(), value);
        let handle = relay.message_handle(record).expect("message handle");

        prop_assert_eq!(relay.engine().decrypt(handle, &alice()), Ok(value));
        prop_assert_eq!(relay.engine().decrypt(handle, &bob()), Ok(value));
        prop_assert_eq!(relay.engine().decrypt(handle, &carol()), Err(EngineError::AccessDenied));
    }
}
