//! Inbox Index
//!
//! Per-recipient list of record references in arrival order, so a recipient
//! can enumerate their mail without scanning the ledger.

use std::collections::HashMap;

use crate::{error::RelayError, identity::Identity, ledger::RecordIndex};

/// Recipient → record references, append-only.
#[derive(Debug, Default, Clone)]
pub struct InboxIndex {
    entries: HashMap<Identity, Vec<RecordIndex>>,
}

impl InboxIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record` to `recipient`'s inbox.
    ///
    /// Only the ledger's send path calls this, at record creation time.
    pub(crate) fn append(&mut self, recipient: Identity, record: RecordIndex) {
        self.entries.entry(recipient).or_default().push(record);
    }

    /// Number of entries for `recipient` (0 if none).
    pub fn count(&self, recipient: &Identity) -> u64 {
        self.entries(recipient).len() as u64
    }

    /// Record reference at `position` in `recipient`'s inbox.
    pub fn entry_at(&self, recipient: &Identity, position: u64) -> Result<RecordIndex, RelayError> {
        let entries = self.entries(recipient);
        usize::try_from(position)
            .ok()
            .and_then(|i| entries.get(i))
            .copied()
            .ok_or(RelayError::PositionOutOfRange { position, count: entries.len() as u64 })
    }

    /// All entries for `recipient` in arrival order.
    pub fn entries(&self, recipient: &Identity) -> &[RecordIndex] {
        self.entries.get(recipient).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of recipients with at least one entry.
    pub fn recipient_count(&self) -> usize {
        self.entries.len()
    }
}
