//! Fuzz target for the relay state machine
//!
//! Prevent divergence from the reference model and leaks of payload access
//!
//! # Strategy
//!
//! - Operation sequences: Arbitrary sends, replies, forged sends and
//!   null-recipient sends, applied to model and real relay in lockstep
//! - Raw submissions: Arbitrary ciphertext and proof bytes pushed straight
//!   into the relay
//!
//! # Invariants
//!
//! - Model and real relay return the same result for every operation
//! - Raw garbage is ALWAYS rejected and leaves the ledger untouched
//! - Inboxes partition the ledger, in strictly increasing order
//! - Only the relay, sender and recipient can read a stored payload
//! - Final decrypted state equals the model's state
//! - NEVER panic

#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use sealbox_core::{ExternalInput, Identity, InputProof, RelayError};
use sealbox_harness::{ModelRelay, Operation, PartyId, RealRelay};

#[derive(Debug, Clone, Arbitrary)]
enum Step {
    Op(Operation),
    Raw {
        sender: PartyId,
        recipient: PartyId,
        reply_to: Option<u8>,
        input: Vec<u8>,
        proof: Vec<u8>,
    },
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    seed: u64,
    num_parties: u8,
    steps: Vec<Step>,
}

fuzz_target!(|input: FuzzInput| {
    let num_parties = usize::from(input.num_parties % 6) + 1;
    let mut model = ModelRelay::new(num_parties);
    let Ok(mut real) = RealRelay::new(num_parties, input.seed) else {
        return;
    };

    for step in input.steps.into_iter().take(64) {
        match step {
            Step::Op(op) => {
                let op = op.clamp(num_parties);
                let expected = model.apply(&op);
                let actual = real.apply(&op);
                assert_eq!(expected, actual, "divergence on {op:?}");
            },
            Step::Raw { sender, recipient, reply_to, input, proof } => {
                let count = real.relay().message_count();
                let sender = party(&real, sender, num_parties);
                let recipient = party(&real, recipient, num_parties);
                let input = ExternalInput(Bytes::from(input));
                let proof = InputProof(Bytes::from(proof));

                let result = match reply_to {
                    Some(record) => real
                        .relay_mut()
                        .send_reply(&sender, u64::from(record), &input, &proof)
                        .map(|_| ()),
                    None => real
                        .relay_mut()
                        .send_message(&sender, recipient, &input, &proof)
                        .map(|_| ()),
                };

                match result {
                    Err(
                        RelayError::InvalidCiphertext
                        | RelayError::ProofVerificationFailed
                        | RelayError::RecordNotFound(_)
                        | RelayError::AlreadyReplied(_)
                        | RelayError::NotAuthorized(_),
                    ) => {},
                    other => panic!("raw submission not rejected: {other:?}"),
                }
                assert_eq!(real.relay().message_count(), count);
            },
        }

        if let Err(e) = real.check_invariants() {
            panic!("invariant violated: {e:?}");
        }
    }

    match real.observable_state() {
        Ok(state) => assert_eq!(state, model.observable_state()),
        Err(e) => panic!("state not observable: {e:?}"),
    }
});

fn party(real: &RealRelay, id: PartyId, num_parties: usize) -> Identity {
    let id = usize::from(id) % num_parties;
    PartyId::try_from(id)
        .ok()
        .and_then(|p| real.identity(p))
        .cloned()
        .unwrap_or_else(Identity::null)
}
