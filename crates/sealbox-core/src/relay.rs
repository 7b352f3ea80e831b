//! Relay
//!
//! Owns the Message Ledger, the Inbox Index and the crypto engine, and
//! exposes the caller-facing operations.
//!
//! ## Responsibilities
//!
//! - Send: validate recipient, seal payload, grant access, append record and
//!   inbox entry, notify
//! - Reply: enforce one reply per record from the recipient only, seal reply,
//!   grant access, attach, notify
//! - Reads: handles and metadata, never plaintext
//!
//! ## Design
//!
//! - One aggregate: ledger and inbox change together or not at all
//! - Action-based: notifications and logs are returned, not performed
//! - Failure atomicity: every fallible step runs before the first ledger or
//!   inbox write

use crate::{
    engine::{CryptoEngine, InputContext},
    error::RelayError,
    event::{RelayAction, RelayEvent},
    handle::{ExternalInput, Handle, InputProof},
    identity::Identity,
    inbox::InboxIndex,
    ledger::{MessageLedger, MessageRecord, RecordIndex},
    seal::{grant_parties, seal_input},
};

/// Non-confidential record fields.
///
/// The sender is left out on purpose. It is still public through
/// [`RelayEvent::MessageDelivered`] and [`Relay::record`]; the omission only
/// keeps it off the everyday metadata read path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    /// Addressee of the record.
    pub recipient: Identity,
    /// Whether a reply has been attached.
    pub replied: bool,
}

/// Confidential message relay.
pub struct Relay<G> {
    ledger: MessageLedger,
    inbox: InboxIndex,
    engine: G,
}

impl<G: CryptoEngine> Relay<G> {
    /// Empty relay backed by `engine`.
    ///
    /// The relay's address is the engine's [`CryptoEngine::self_identity`],
    /// so inputs are bound to the same identity that receives self-access.
    pub fn new(engine: G) -> Self {
        Self { ledger: MessageLedger::new(), inbox: InboxIndex::new(), engine }
    }

    /// The relay's own identity.
    pub fn address(&self) -> &Identity {
        self.engine.self_identity()
    }

    /// Deposits an encrypted message for `recipient`.
    ///
    /// Returns the new record's index together with the actions to execute.
    ///
    /// # Errors
    ///
    /// - `RelayError::InvalidRecipient` if `recipient` is null
    /// - `RelayError::InvalidCiphertext` / `ProofVerificationFailed` if the
    ///   engine rejects the input
    pub fn send_message(
        &mut self,
        caller: &Identity,
        recipient: Identity,
        input: &ExternalInput,
        proof: &InputProof,
    ) -> Result<(RecordIndex, Vec<RelayAction>), RelayError> {
        if !recipient.is_valid() {
            return Err(RelayError::InvalidRecipient);
        }

        let relay = self.engine.self_identity().clone();
        let context = InputContext { relay: &relay, caller };
        let handle = seal_input(&mut self.engine, input, proof, context)?;
        grant_parties(&mut self.engine, handle, caller, &recipient);

        // Nothing below can fail
        let stored = MessageRecord::new(handle, caller.clone(), recipient.clone());
        let record = self.ledger.append(stored);
        self.inbox.append(recipient.clone(), record);

        tracing::debug!(record, %caller, %recipient, "message appended");

        let actions = vec![
            RelayAction::Notify(RelayEvent::MessageDelivered {
                sender: caller.clone(),
                recipient,
                record,
            }),
            RelayAction::Log(format!("record {record} sent")),
        ];

        Ok((record, actions))
    }

    /// Attaches the single reply to `record`.
    ///
    /// # Errors
    ///
    /// Checked in this order:
    ///
    /// - `RelayError::RecordNotFound` if `record` does not exist
    /// - `RelayError::AlreadyReplied` if it already has a reply
    /// - `RelayError::NotAuthorized` if `caller` is not its recipient
    /// - `RelayError::InvalidCiphertext` / `ProofVerificationFailed` if the
    ///   engine rejects the input
    pub fn send_reply(
        &mut self,
        caller: &Identity,
        record: RecordIndex,
        input: &ExternalInput,
        proof: &InputProof,
    ) -> Result<Vec<RelayAction>, RelayError> {
        let stored = self.ledger.get(record)?;
        if stored.replied() {
            return Err(RelayError::AlreadyReplied(record));
        }
        if stored.recipient() != caller {
            return Err(RelayError::NotAuthorized(record));
        }
        let sender = stored.sender().clone();

        let relay = self.engine.self_identity().clone();
        let context = InputContext { relay: &relay, caller };
        let handle = seal_input(&mut self.engine, input, proof, context)?;
        grant_parties(&mut self.engine, handle, &sender, caller);

        self.ledger.attach_reply(record, handle)?;

        tracing::debug!(record, %caller, "reply attached");

        Ok(vec![
            RelayAction::Notify(RelayEvent::ReplyDelivered { record }),
            RelayAction::Log(format!("record {record} replied")),
        ])
    }

    /// Number of inbox entries for `recipient`.
    pub fn inbox_count(&self, recipient: &Identity) -> u64 {
        self.inbox.count(recipient)
    }

    /// Record reference at `position` in `recipient`'s inbox.
    pub fn inbox_entry(
        &self,
        recipient: &Identity,
        position: u64,
    ) -> Result<RecordIndex, RelayError> {
        self.inbox.entry_at(recipient, position)
    }

    /// Whole inbox of `recipient` in arrival order.
    pub fn inbox(&self, recipient: &Identity) -> &[RecordIndex] {
        self.inbox.entries(recipient)
    }

    /// Stored message handle. Decryption rights are the engine's business.
    pub fn message_handle(&self, record: RecordIndex) -> Result<Handle, RelayError> {
        self.ledger.message_handle(record)
    }

    /// Stored reply handle, [`Handle::NONE`] until replied.
    pub fn reply_handle(&self, record: RecordIndex) -> Result<Handle, RelayError> {
        self.ledger.reply_handle(record)
    }

    /// Recipient and replied flag of `record`.
    pub fn metadata(&self, record: RecordIndex) -> Result<RecordMetadata, RelayError> {
        let stored = self.ledger.get(record)?;
        Ok(RecordMetadata { recipient: stored.recipient().clone(), replied: stored.replied() })
    }

    /// Full record, sender included.
    pub fn record(&self, record: RecordIndex) -> Result<&MessageRecord, RelayError> {
        self.ledger.get(record)
    }

    /// Number of records in the ledger.
    pub fn message_count(&self) -> u64 {
        self.ledger.len()
    }

    /// The ledger.
    pub fn ledger(&self) -> &MessageLedger {
        &self.ledger
    }

    /// The engine, for off-system decryption.
    pub fn engine(&self) -> &G {
        &self.engine
    }
}

impl<G: CryptoEngine> std::fmt::Debug for Relay<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("address", self.address())
            .field("records", &self.ledger.len())
            .field("recipients", &self.inbox.recipient_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use bytes::Bytes;

    use super::*;
    use crate::{engine::EngineError, handle::EncryptedBool};

    /// Plaintext-backed engine. Inputs are big-endian u64s, the proof is the
    /// caller's identity bytes.
    struct TestEngine {
        relay: Identity,
        values: HashMap<Handle, u64>,
        acl: HashSet<(Handle, Identity)>,
        self_acl: HashSet<Handle>,
        next: u8,
        calls: Vec<&'static str>,
    }

    const ZERO: Handle = Handle::from_bytes([0xff; 32]);

    impl TestEngine {
        fn new(relay: Identity) -> Self {
            let mut values = HashMap::new();
            values.insert(ZERO, 0);
            Self {
                relay,
                values,
                acl: HashSet::new(),
                self_acl: HashSet::new(),
                next: 0,
                calls: Vec::new(),
            }
        }

        fn alloc(&mut self, value: u64) -> Handle {
            self.next += 1;
            let handle = Handle::from_bytes([self.next; 32]);
            self.values.insert(handle, value);
            handle
        }

        fn value(&self, handle: Handle) -> Result<u64, EngineError> {
            self.values.get(&handle).copied().ok_or(EngineError::UnknownHandle)
        }

        fn allowed(&self, handle: Handle, who: &Identity) -> bool {
            self.acl.contains(&(handle, who.clone()))
        }
    }

    impl CryptoEngine for TestEngine {
        fn self_identity(&self) -> &Identity {
            &self.relay
        }

        fn import_verified(
            &mut self,
            input: &ExternalInput,
            proof: &InputProof,
            context: InputContext<'_>,
        ) -> Result<Handle, EngineError> {
            self.calls.push("import");
            if context.relay != &self.relay || proof.0.as_ref() != context.caller.as_bytes() {
                return Err(EngineError::ProofVerificationFailed);
            }
            let bytes: [u8; 8] =
                input.0.as_ref().try_into().map_err(|_| EngineError::InvalidCiphertext)?;
            Ok(self.alloc(u64::from_be_bytes(bytes)))
        }

        fn encrypted_equals(
            &mut self,
            a: Handle,
            b: Handle,
        ) -> Result<EncryptedBool, EngineError> {
            self.calls.push("eq");
            let equal = self.value(a)? == self.value(b)?;
            Ok(EncryptedBool(self.alloc(u64::from(equal))))
        }

        fn encrypted_select(
            &mut self,
            cond: EncryptedBool,
            if_true: Handle,
            if_false: Handle,
        ) -> Result<Handle, EngineError> {
            self.calls.push("select");
            let chosen = if self.value(cond.0)? == 1 { if_true } else { if_false };
            let value = self.value(chosen)?;
            Ok(self.alloc(value))
        }

        fn canonical_zero(&self) -> Handle {
            ZERO
        }

        fn grant_permanent_access(&mut self, handle: Handle, identity: &Identity) {
            self.acl.insert((handle, identity.clone()));
        }

        fn grant_self_access(&mut self, handle: Handle) {
            self.self_acl.insert(handle);
        }

        fn discard(&mut self, handle: Handle) {
            self.calls.push("discard");
            if handle != ZERO {
                self.values.remove(&handle);
            }
        }
    }

    fn id(tag: u8) -> Identity {
        Identity::from([tag; 20])
    }

    fn input(caller: &Identity, value: u64) -> (ExternalInput, InputProof) {
        (
            ExternalInput(Bytes::copy_from_slice(&value.to_be_bytes())),
            InputProof(Bytes::copy_from_slice(caller.as_bytes())),
        )
    }

    fn relay() -> Relay<TestEngine> {
        Relay::new(TestEngine::new(id(0xee)))
    }

    fn send(
        relay: &mut Relay<TestEngine>,
        from: &Identity,
        to: &Identity,
        value: u64,
    ) -> RecordIndex {
        let (payload, proof) = input(from, value);
        relay.send_message(from, to.clone(), &payload, &proof).unwrap().0
    }

    #[test]
    fn send_then_reply_scenario() {
        let (a, b, c) = (id(0xa), id(0xb), id(0xc));
        let mut relay = relay();

        let record = send(&mut relay, &a, &b, 7);
        assert_eq!(record, 0);
        assert_eq!(relay.inbox_count(&b), 1);
        let open = RecordMetadata { recipient: b.clone(), replied: false };
        assert_eq!(relay.metadata(0).unwrap(), open);

        let (payload, proof) = input(&b, 42);
        relay.send_reply(&b, 0, &payload, &proof).unwrap();
        let closed = RecordMetadata { recipient: b.clone(), replied: true };
        assert_eq!(relay.metadata(0).unwrap(), closed);

        let (payload, proof) = input(&b, 99);
        assert_eq!(relay.send_reply(&b, 0, &payload, &proof), Err(RelayError::AlreadyReplied(0)));

        let (payload, proof) = input(&c, 1);
        assert_eq!(relay.send_reply(&c, 0, &payload, &proof), Err(RelayError::AlreadyReplied(0)));
    }

    #[test]
    fn only_recipient_may_reply() {
        let (a, b, c) = (id(0xa), id(0xb), id(0xc));
        let mut relay = relay();
        send(&mut relay, &a, &b, 7);

        for caller in [&a, &c] {
            let (payload, proof) = input(caller, 1);
            let result = relay.send_reply(caller, 0, &payload, &proof);
            assert_eq!(result, Err(RelayError::NotAuthorized(0)));
        }
        assert!(!relay.metadata(0).unwrap().replied);
    }

    #[test]
    fn reply_to_missing_record_fails() {
        let b = id(0xb);
        let mut relay = relay();
        let (payload, proof) = input(&b, 1);

        let result = relay.send_reply(&b, 3, &payload, &proof);
        assert_eq!(result, Err(RelayError::RecordNotFound(3)));
    }

    #[test]
    fn null_recipient_rejected_without_side_effects() {
        let a = id(0xa);
        let mut relay = relay();
        let (payload, proof) = input(&a, 7);

        let result = relay.send_message(&a, Identity::null(), &payload, &proof);
        assert_eq!(result, Err(RelayError::InvalidRecipient));
        assert_eq!(relay.message_count(), 0);
        assert!(relay.engine().calls.is_empty());
    }

    #[test]
    fn rejected_proof_leaves_state_unchanged() {
        let (a, b) = (id(0xa), id(0xb));
        let mut relay = relay();
        send(&mut relay, &a, &b, 1);

        // Proof bound to someone else
        let (payload, proof) = input(&b, 7);
        assert_eq!(
            relay.send_message(&a, b.clone(), &payload, &proof),
            Err(RelayError::ProofVerificationFailed)
        );
        assert_eq!(relay.message_count(), 1);
        assert_eq!(relay.inbox(&b), &[0]);

        // Next successful send still gets the next index
        assert_eq!(send(&mut relay, &a, &b, 2), 1);
    }

    #[test]
    fn malformed_reply_input_keeps_record_open() {
        let (a, b) = (id(0xa), id(0xb));
        let mut relay = relay();
        send(&mut relay, &a, &b, 1);

        let payload = ExternalInput(Bytes::from_static(b"short"));
        let proof = InputProof(Bytes::copy_from_slice(b.as_bytes()));
        let result = relay.send_reply(&b, 0, &payload, &proof);
        assert_eq!(result, Err(RelayError::InvalidCiphertext));
        assert_eq!(relay.reply_handle(0).unwrap(), Handle::NONE);

        let (payload, proof) = input(&b, 5);
        assert!(relay.send_reply(&b, 0, &payload, &proof).is_ok());
    }

    #[test]
    fn grants_cover_both_parties_and_relay() {
        let (a, b, c) = (id(0xa), id(0xb), id(0xc));
        let mut relay = relay();
        send(&mut relay, &a, &b, 7);
        let (payload, proof) = input(&b, 42);
        relay.send_reply(&b, 0, &payload, &proof).unwrap();

        let engine = relay.engine();
        for handle in [relay.message_handle(0).unwrap(), relay.reply_handle(0).unwrap()] {
            assert!(engine.allowed(handle, &a));
            assert!(engine.allowed(handle, &b));
            assert!(!engine.allowed(handle, &c));
            assert!(engine.self_acl.contains(&handle));
        }
    }

    #[test]
    fn sanitization_is_value_preserving_and_branch_free() {
        let (a, b) = (id(0xa), id(0xb));
        let mut relay = relay();

        send(&mut relay, &a, &b, 7);
        let nonzero_calls = std::mem::take(&mut relay.engine.calls);
        send(&mut relay, &a, &b, 0);
        let zero_calls = std::mem::take(&mut relay.engine.calls);

        assert_eq!(nonzero_calls, zero_calls);
        let engine = relay.engine();
        assert_eq!(engine.value(relay.message_handle(0).unwrap()), Ok(7));
        assert_eq!(engine.value(relay.message_handle(1).unwrap()), Ok(0));
        assert_ne!(relay.message_handle(1).unwrap(), ZERO);
    }

    #[test]
    fn sealing_discards_intermediate_handles() {
        let (a, b) = (id(0xa), id(0xb));
        let mut relay = relay();

        send(&mut relay, &a, &b, 7);
        assert_eq!(relay.engine().calls, ["import", "eq", "select", "discard", "discard"]);

        // Canonical zero plus one stored handle per payload
        let (payload, proof) = input(&b, 0);
        relay.send_reply(&b, 0, &payload, &proof).unwrap();
        send(&mut relay, &b, &a, 0);
        assert_eq!(relay.engine().values.len(), 1 + 3);
    }

    #[test]
    fn address_is_engine_identity() {
        let (a, b) = (id(0xa), id(0xb));
        let mut relay = relay();
        assert_eq!(relay.address(), &id(0xee));

        send(&mut relay, &a, &b, 7);
        let handle = relay.message_handle(0).unwrap();
        assert!(relay.engine().self_acl.contains(&handle));
    }

    #[test]
    fn notifications_carry_parties_and_index() {
        let (a, b) = (id(0xa), id(0xb));
        let mut relay = relay();
        let (payload, proof) = input(&a, 7);

        let (record, actions) = relay.send_message(&a, b.clone(), &payload, &proof).unwrap();
        assert!(actions.contains(&RelayAction::Notify(RelayEvent::MessageDelivered {
            sender: a.clone(),
            recipient: b.clone(),
            record,
        })));

        let (payload, proof) = input(&b, 1);
        let actions = relay.send_reply(&b, record, &payload, &proof).unwrap();
        assert!(actions.contains(&RelayAction::Notify(RelayEvent::ReplyDelivered { record })));
    }

    #[test]
    fn full_record_exposes_sender() {
        let (a, b) = (id(0xa), id(0xb));
        let mut relay = relay();
        send(&mut relay, &a, &b, 7);

        let record = relay.record(0).unwrap();
        assert_eq!(record.sender(), &a);
        assert_eq!(record.recipient(), &b);
    }

    #[test]
    fn self_addressed_message_can_be_replied_by_owner() {
        let a = id(0xa);
        let mut relay = relay();
        send(&mut relay, &a, &a, 3);

        let (payload, proof) = input(&a, 4);
        assert!(relay.send_reply(&a, 0, &payload, &proof).is_ok());
        assert_eq!(relay.inbox_count(&a), 1);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// Indices are dense and every record lands in exactly its
            /// recipient's inbox, in order.
            #[test]
            fn prop_inboxes_partition_ledger(
                sends in prop::collection::vec((1..5u8, 1..5u8, any::<u64>()), 0..30)
            ) {
                let mut relay = relay();

                for (expected, (from, to, value)) in sends.iter().enumerate() {
                    let before = relay.inbox_count(&id(*to));
                    let record = send(&mut relay, &id(*from), &id(*to), *value);

                    prop_assert_eq!(record, expected as u64);
                    prop_assert_eq!(relay.inbox_count(&id(*to)), before + 1);
                    prop_assert_eq!(relay.inbox_entry(&id(*to), before), Ok(record));
                }

                let total: u64 = (1..5u8).map(|tag| relay.inbox_count(&id(tag))).sum();
                prop_assert_eq!(total, relay.message_count());
            }
        }
    }
}
