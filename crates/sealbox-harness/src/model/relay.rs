//! Model relay - the reference implementation.

use super::{
    operation::{Operation, OperationError, OperationResult, PartyId},
    state::{ObservableState, ObservedRecord},
};

/// Record in the model (plaintext).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    /// Sending party.
    pub sender: PartyId,
    /// Addressee.
    pub recipient: PartyId,
    /// Message plaintext.
    pub message: u64,
    /// Reply plaintext, if replied.
    pub reply: Option<u64>,
}

/// Plaintext relay.
#[derive(Debug, Clone)]
pub struct ModelRelay {
    num_parties: usize,
    records: Vec<ModelRecord>,
    inboxes: Vec<Vec<u64>>,
}

impl ModelRelay {
    /// Create a model with `num_parties` parties.
    pub fn new(num_parties: usize) -> Self {
        Self { num_parties, records: Vec::new(), inboxes: vec![Vec::new(); num_parties] }
    }

    /// All records in index order.
    pub fn records(&self) -> &[ModelRecord] {
        &self.records
    }

    /// Inbox of `party`.
    pub fn inbox(&self, party: PartyId) -> &[u64] {
        self.inboxes.get(usize::from(party)).map(Vec::as_slice).unwrap_or_default()
    }

    /// Apply an operation and return the result.
    ///
    /// The result should match the real relay's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        match *op {
            Operation::SendMessage { sender, recipient, value } => {
                self.apply_send(sender, recipient, value)
            },
            Operation::SendReply { replier, record, value } => {
                self.apply_reply(replier, u64::from(record), value)
            },
            Operation::ForgedSend { sender, claimed, recipient, value } => {
                if !self.is_party(sender) || !self.is_party(claimed) || !self.is_party(recipient) {
                    return OperationResult::Error(OperationError::InvalidParty);
                }
                if claimed != sender {
                    return OperationResult::Error(OperationError::ProofVerificationFailed);
                }
                self.apply_send(sender, recipient, value)
            },
            Operation::SendToNull { sender, .. } => {
                if !self.is_party(sender) {
                    return OperationResult::Error(OperationError::InvalidParty);
                }
                OperationResult::Error(OperationError::InvalidRecipient)
            },
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let records = self
            .records
            .iter()
            .map(|r| ObservedRecord {
                sender: r.sender,
                recipient: r.recipient,
                message: r.message,
                reply: r.reply,
            })
            .collect();

        ObservableState { records, inboxes: self.inboxes.clone() }
    }

    fn is_party(&self, party: PartyId) -> bool {
        usize::from(party) < self.num_parties
    }

    fn apply_send(&mut self, sender: PartyId, recipient: PartyId, value: u64) -> OperationResult {
        if !self.is_party(sender) || !self.is_party(recipient) {
            return OperationResult::Error(OperationError::InvalidParty);
        }

        let index = self.records.len() as u64;
        self.records.push(ModelRecord { sender, recipient, message: value, reply: None });
        self.inboxes[usize::from(recipient)].push(index);

        OperationResult::Sent(index)
    }

    fn apply_reply(&mut self, replier: PartyId, record: u64, value: u64) -> OperationResult {
        if !self.is_party(replier) {
            return OperationResult::Error(OperationError::InvalidParty);
        }

        let Some(stored) = usize::try_from(record).ok().and_then(|i| self.records.get_mut(i))
        else {
            return OperationResult::Error(OperationError::RecordNotFound);
        };
        if stored.reply.is_some() {
            return OperationResult::Error(OperationError::AlreadyReplied);
        }
        if stored.recipient != replier {
            return OperationResult::Error(OperationError::NotAuthorized);
        }

        stored.reply = Some(value);
        OperationResult::Replied
    }
}
