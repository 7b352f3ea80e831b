//! Message Ledger
//!
//! Append-only sequence of message records. A record's position is its
//! permanent reference.
//!
//! ## Invariants
//!
//! - Record indices start at 0 and grow by exactly one per append
//! - Records are never removed or reordered
//! - A record's reply is written at most once; `replied` never reverts

use crate::{error::RelayError, handle::Handle, identity::Identity};

/// Permanent reference to a record: its position in the ledger.
pub type RecordIndex = u64;

/// One sent message and its optional reply.
///
/// Fields are private so the reply can only be attached through
/// [`MessageLedger::attach_reply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    encrypted_message: Handle,
    sender: Identity,
    recipient: Identity,
    encrypted_reply: Handle,
    replied: bool,
}

impl MessageRecord {
    /// New unreplied record. The reply slot holds [`Handle::NONE`].
    pub fn new(encrypted_message: Handle, sender: Identity, recipient: Identity) -> Self {
        Self { encrypted_message, sender, recipient, encrypted_reply: Handle::NONE, replied: false }
    }

    /// Encrypted message handle.
    pub fn encrypted_message(&self) -> Handle {
        self.encrypted_message
    }

    /// Caller of the original send.
    pub fn sender(&self) -> &Identity {
        &self.sender
    }

    /// Addressee.
    pub fn recipient(&self) -> &Identity {
        &self.recipient
    }

    /// Encrypted reply handle, [`Handle::NONE`] until replied.
    pub fn encrypted_reply(&self) -> Handle {
        self.encrypted_reply
    }

    /// Whether a reply has been attached.
    pub fn replied(&self) -> bool {
        self.replied
    }
}

/// Append-only store of [`MessageRecord`]s.
#[derive(Debug, Default, Clone)]
pub struct MessageLedger {
    records: Vec<MessageRecord>,
}

impl MessageLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records.
    pub fn len(&self) -> u64 {
        self.records.len() as u64
    }

    /// True if no message has been sent yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index the next appended record will receive.
    pub fn next_index(&self) -> RecordIndex {
        self.len()
    }

    /// Appends a record and returns its index.
    pub fn append(&mut self, record: MessageRecord) -> RecordIndex {
        let index = self.next_index();
        self.records.push(record);
        index
    }

    /// Looks up a record.
    pub fn get(&self, index: RecordIndex) -> Result<&MessageRecord, RelayError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.records.get(i))
            .ok_or(RelayError::RecordNotFound(index))
    }

    /// Stores the reply handle and flips `replied`.
    ///
    /// # Errors
    ///
    /// - `RelayError::RecordNotFound` if `index` is out of range
    /// - `RelayError::AlreadyReplied` if the record already has a reply
    pub fn attach_reply(&mut self, index: RecordIndex, reply: Handle) -> Result<(), RelayError> {
        let record = usize::try_from(index)
            .ok()
            .and_then(|i| self.records.get_mut(i))
            .ok_or(RelayError::RecordNotFound(index))?;

        if record.replied {
            return Err(RelayError::AlreadyReplied(index));
        }

        record.encrypted_reply = reply;
        record.replied = true;
        Ok(())
    }

    /// Stored message handle, unchanged.
    pub fn message_handle(&self, index: RecordIndex) -> Result<Handle, RelayError> {
        self.get(index).map(MessageRecord::encrypted_message)
    }

    /// Stored reply handle, unchanged ([`Handle::NONE`] before a reply).
    pub fn reply_handle(&self, index: RecordIndex) -> Result<Handle, RelayError> {
        self.get(index).map(MessageRecord::encrypted_reply)
    }

    /// Iterates records in index order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordIndex, &MessageRecord)> {
        self.records.iter().enumerate().map(|(i, r)| (i as RecordIndex, r))
    }
}
