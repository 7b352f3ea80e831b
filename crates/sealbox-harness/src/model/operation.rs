//! Operations for model-based testing.
//!
//! Operations are generated randomly by proptest (or decoded by the fuzzer)
//! and applied to both the model and the real relay.

use arbitrary::Arbitrary;
use sealbox_core::RelayError;

/// Party identifier (0-indexed, mapped to a non-null identity).
pub type PartyId = u8;

/// Operations that can be applied to the relay.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Party sends a value to another party.
    SendMessage {
        /// Sending party.
        sender: PartyId,
        /// Addressee.
        recipient: PartyId,
        /// Plaintext payload.
        value: u64,
    },

    /// Party replies to a record.
    SendReply {
        /// Replying party.
        replier: PartyId,
        /// Target record (kept small so it often exists).
        record: u8,
        /// Plaintext payload.
        value: u64,
    },

    /// Party submits an input that was encrypted for someone else.
    ///
    /// Succeeds only when `claimed == sender`.
    ForgedSend {
        /// Submitting party.
        sender: PartyId,
        /// Party the input was bound to.
        claimed: PartyId,
        /// Addressee.
        recipient: PartyId,
        /// Plaintext payload.
        value: u64,
    },

    /// Party sends to the null identity.
    SendToNull {
        /// Sending party.
        sender: PartyId,
        /// Plaintext payload.
        value: u64,
    },
}

impl Operation {
    /// Maps every party id into `0..num_parties`.
    #[must_use]
    pub fn clamp(self, num_parties: usize) -> Self {
        let n = u8::try_from(num_parties.clamp(1, 255)).unwrap_or(u8::MAX);
        match self {
            Self::SendMessage { sender, recipient, value } => {
                Self::SendMessage { sender: sender % n, recipient: recipient % n, value }
            },
            Self::SendReply { replier, record, value } => {
                Self::SendReply { replier: replier % n, record, value }
            },
            Self::ForgedSend { sender, claimed, recipient, value } => Self::ForgedSend {
                sender: sender % n,
                claimed: claimed % n,
                recipient: recipient % n,
                value,
            },
            Self::SendToNull { sender, value } => Self::SendToNull { sender: sender % n, value },
        }
    }
}

/// Result of applying an operation.
///
/// Used to compare model and real relay behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Message stored at this record index.
    Sent(u64),

    /// Reply attached.
    Replied,

    /// Operation rejected.
    Error(OperationError),
}

/// Rejections the relay can produce for generated operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Recipient is the null identity.
    InvalidRecipient,

    /// Input was not bound to the submitting party.
    ProofVerificationFailed,

    /// Record does not exist.
    RecordNotFound,

    /// Record already has a reply.
    AlreadyReplied,

    /// Replier is not the record's recipient.
    NotAuthorized,

    /// Party id outside the configured range.
    InvalidParty,

    /// Anything else the relay reported.
    Unexpected(String),
}

impl From<RelayError> for OperationError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::InvalidRecipient => Self::InvalidRecipient,
            RelayError::ProofVerificationFailed => Self::ProofVerificationFailed,
            RelayError::RecordNotFound(_) => Self::RecordNotFound,
            RelayError::AlreadyReplied(_) => Self::AlreadyReplied,
            RelayError::NotAuthorized(_) => Self::NotAuthorized,
            other => Self::Unexpected(other.to_string()),
        }
    }
}
