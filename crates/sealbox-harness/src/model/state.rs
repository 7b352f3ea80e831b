//! Observable state shared by the model and the real relay.

use super::operation::PartyId;

/// One record as the parties see it after decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedRecord {
    /// Sending party.
    pub sender: PartyId,
    /// Addressee.
    pub recipient: PartyId,
    /// Message plaintext.
    pub message: u64,
    /// Reply plaintext, if replied.
    pub reply: Option<u64>,
}

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Records in index order.
    pub records: Vec<ObservedRecord>,
    /// Per-party inbox, in arrival order.
    pub inboxes: Vec<Vec<u64>>,
}
