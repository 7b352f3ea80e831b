//! Notifications and actions produced by the relay.
//!
//! The relay performs no I/O. Each state change returns a list of
//! [`RelayAction`]s which the host executes: [`RelayEvent`]s go to off-system
//! observers, log lines go to whatever logging the host runs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{identity::Identity, ledger::RecordIndex};

/// Notification for off-system observers.
///
/// Observers use these to discover new mail without polling the ledger.
/// `MessageDelivered` carries the sender, so the sender of a record is public
/// to anyone watching notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelayEvent {
    /// A new message was appended to the ledger.
    MessageDelivered {
        /// Caller of the send.
        sender: Identity,
        /// Addressee.
        recipient: Identity,
        /// Permanent reference of the new record.
        record: RecordIndex,
    },

    /// A reply was attached to an existing record.
    ReplyDelivered {
        /// Record that received the reply.
        record: RecordIndex,
    },
}

/// CBOR codec failure for [`RelayEvent`].
#[derive(Debug, Error)]
pub enum EventCodecError {
    /// Serialization failed.
    #[error("event encode failed: {0}")]
    Encode(String),

    /// Bytes are not a valid event.
    #[error("event decode failed: {0}")]
    Decode(String),
}

impl RelayEvent {
    /// CBOR encoding used on the observer wire.
    pub fn encode(&self) -> Result<Vec<u8>, EventCodecError> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| EventCodecError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes an event from its CBOR encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self, EventCodecError> {
        ciborium::de::from_reader(bytes).map_err(|e| EventCodecError::Decode(e.to_string()))
    }

    /// Record this notification refers to.
    pub fn record(&self) -> RecordIndex {
        match self {
            Self::MessageDelivered { record, .. } | Self::ReplyDelivered { record } => *record,
        }
    }
}

/// Side effects requested by the relay, executed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayAction {
    /// Publish a notification to observers.
    Notify(RelayEvent),

    /// Emit a debug-level log line.
    Log(String),
}
