//! Real relay wrapper that mirrors [`ModelRelay`](crate::ModelRelay)'s
//! interface.
//!
//! Drives a [`Relay`] backed by the reference engine. Parties act as their
//! own clients: every payload is encrypted for the submitting party (or, for
//! forged sends, for the party being impersonated).

use std::collections::HashMap;

use sealbox_core::{
    EngineError, ExternalInput, Handle, Identity, InputProof, Relay, RelayError,
};
use sealbox_crypto::{CryptoError, MemoryEngine};

use crate::{
    model::{ObservableState, ObservedRecord, Operation, OperationError, OperationResult, PartyId},
    sim_env::SimEnv,
};

/// Why the real relay's state could not be observed or checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationError {
    /// A record names an identity that is not one of the parties.
    UnknownParty(Identity),
    /// A party could not decrypt a payload it is entitled to.
    Engine(EngineError),
    /// A structural invariant does not hold.
    Invariant(String),
}

impl From<EngineError> for ObservationError {
    fn from(err: EngineError) -> Self {
        Self::Engine(err)
    }
}

/// Relay address used by the harness.
const RELAY_TAG: u8 = 0xee;

/// Real relay plus the party roster.
pub struct RealRelay {
    relay: Relay<MemoryEngine<SimEnv>>,
    parties: Vec<Identity>,
    lookup: HashMap<Identity, PartyId>,
}

impl RealRelay {
    /// Relay with `num_parties` parties whose randomness derives from `seed`.
    pub fn new(num_parties: usize, seed: u64) -> Result<Self, CryptoError> {
        let env = SimEnv::with_seed(seed);
        let engine = MemoryEngine::new(env, Identity::from([RELAY_TAG; 20]))?;
        let relay = Relay::new(engine);

        let parties: Vec<Identity> = (0..num_parties.min(usize::from(u8::MAX)))
            .map(|i| {
                let tag = u8::try_from(i + 1).unwrap_or(u8::MAX);
                Identity::from([tag; 20])
            })
            .collect();
        let lookup = parties
            .iter()
            .enumerate()
            .filter_map(|(i, id)| PartyId::try_from(i).ok().map(|p| (id.clone(), p)))
            .collect();

        Ok(Self { relay, parties, lookup })
    }

    /// The wrapped relay.
    pub fn relay(&self) -> &Relay<MemoryEngine<SimEnv>> {
        &self.relay
    }

    /// Mutable access for submissions outside the [`Operation`] set.
    pub fn relay_mut(&mut self) -> &mut Relay<MemoryEngine<SimEnv>> {
        &mut self.relay
    }

    /// Identity of `party`.
    pub fn identity(&self, party: PartyId) -> Option<&Identity> {
        self.parties.get(usize::from(party))
    }

    /// Apply an operation and return the result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let result = match *op {
            Operation::SendMessage { sender, recipient, value } => {
                self.send(sender, sender, Some(recipient), value)
            },
            Operation::SendReply { replier, record, value } => {
                self.reply(replier, u64::from(record), value)
            },
            Operation::ForgedSend { sender, claimed, recipient, value } => {
                self.send(sender, claimed, Some(recipient), value)
            },
            Operation::SendToNull { sender, value } => self.send(sender, sender, None, value),
        };

        result.unwrap_or_else(OperationResult::Error)
    }

    fn party(&self, party: PartyId) -> Result<Identity, OperationError> {
        self.identity(party).cloned().ok_or(OperationError::InvalidParty)
    }

    fn encrypt(
        &self,
        value: u64,
        bound_to: &Identity,
    ) -> Result<(ExternalInput, InputProof), OperationError> {
        self.relay
            .engine()
            .encrypt_input(value, self.relay.address(), bound_to)
            .map_err(|e| OperationError::Unexpected(e.to_string()))
    }

    fn send(
        &mut self,
        sender: PartyId,
        claimed: PartyId,
        recipient: Option<PartyId>,
        value: u64,
    ) -> Result<OperationResult, OperationError> {
        let caller = self.party(sender)?;
        let bound_to = self.party(claimed)?;
        let recipient = match recipient {
            Some(party) => self.party(party)?,
            None => Identity::null(),
        };

        let (input, proof) = self.encrypt(value, &bound_to)?;
        let (record, _actions) = self.relay.send_message(&caller, recipient, &input, &proof)?;
        Ok(OperationResult::Sent(record))
    }

    fn reply(
        &mut self,
        replier: PartyId,
        record: u64,
        value: u64,
    ) -> Result<OperationResult, OperationError> {
        let caller = self.party(replier)?;
        let (input, proof) = self.encrypt(value, &caller)?;
        self.relay.send_reply(&caller, record, &input, &proof)?;
        Ok(OperationResult::Replied)
    }

    fn party_of(&self, identity: &Identity) -> Result<PartyId, ObservationError> {
        self.lookup
            .get(identity)
            .copied()
            .ok_or_else(|| ObservationError::UnknownParty(identity.clone()))
    }

    /// Extract observable state by decrypting every payload as its parties.
    ///
    /// Messages are decrypted as the recipient, replies as the sender.
    pub fn observable_state(&self) -> Result<ObservableState, ObservationError> {
        let engine = self.relay.engine();
        let mut records = Vec::new();

        for (_, stored) in self.relay.ledger().iter() {
            let reply = if stored.replied() {
                Some(engine.decrypt(stored.encrypted_reply(), stored.sender())?)
            } else {
                None
            };
            records.push(ObservedRecord {
                sender: self.party_of(stored.sender())?,
                recipient: self.party_of(stored.recipient())?,
                message: engine.decrypt(stored.encrypted_message(), stored.recipient())?,
                reply,
            });
        }

        let inboxes =
            self.parties.iter().map(|party| self.relay.inbox(party).to_vec()).collect();

        Ok(ObservableState { records, inboxes })
    }

    /// Structural and confidentiality invariants of the real relay.
    ///
    /// - Inbox sizes sum to the record count; each entry points at a record
    ///   addressed to the inbox owner; entries strictly increase
    /// - A reply handle is set exactly when the record is replied
    /// - Every stored handle is readable by the relay, the sender and the
    ///   recipient, and by no other party
    pub fn check_invariants(&self) -> Result<(), ObservationError> {
        let relay = &self.relay;

        let mut total = 0u64;
        for party in &self.parties {
            let inbox = relay.inbox(party);
            total += inbox.len() as u64;
            if relay.inbox_count(party) != inbox.len() as u64 {
                return Err(invariant(format!("inbox count of {party} disagrees with entries")));
            }
            if inbox.windows(2).any(|w| w[0] >= w[1]) {
                return Err(invariant(format!("inbox of {party} is not strictly increasing")));
            }
            for &record in inbox {
                let meta = relay.metadata(record).map_err(unexpected)?;
                if &meta.recipient != party {
                    return Err(invariant(format!("record {record} listed in wrong inbox")));
                }
            }
        }
        if total != relay.message_count() {
            return Err(invariant(format!(
                "{total} inbox entries for {} records",
                relay.message_count()
            )));
        }

        for (index, stored) in relay.ledger().iter() {
            if stored.replied() == stored.encrypted_reply().is_none() {
                let message = format!("record {index} replied flag disagrees with handle");
                return Err(invariant(message));
            }

            let mut handles = vec![stored.encrypted_message()];
            if stored.replied() {
                handles.push(stored.encrypted_reply());
            }
            for handle in handles {
                self.check_grants(index, handle, stored.sender(), stored.recipient())?;
            }
        }

        Ok(())
    }

    fn check_grants(
        &self,
        index: u64,
        handle: Handle,
        sender: &Identity,
        recipient: &Identity,
    ) -> Result<(), ObservationError> {
        let engine = self.relay.engine();

        for required in [self.relay.address(), sender, recipient] {
            if !engine.is_allowed(handle, required) {
                return Err(invariant(format!("record {index}: {required} lacks access")));
            }
        }
        for party in &self.parties {
            if party != sender && party != recipient && engine.is_allowed(handle, party) {
                return Err(invariant(format!("record {index}: outsider {party} has access")));
            }
        }

        Ok(())
    }
}

fn invariant(message: String) -> ObservationError {
    ObservationError::Invariant(message)
}

fn unexpected(err: RelayError) -> ObservationError {
    ObservationError::Invariant(err.to_string())
}

impl std::fmt::Debug for RealRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealRelay")
            .field("relay", &self.relay)
            .field("parties", &self.parties.len())
            .finish()
    }
}
