//! Relay error types.

use thiserror::Error;

use crate::{engine::EngineError, ledger::RecordIndex};

/// Errors from relay operations.
///
/// Every error aborts the whole operation. Ledger and inbox state are left
/// exactly as they were before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Recipient is the null identity.
    #[error("invalid recipient")]
    InvalidRecipient,

    /// Submitted ciphertext is malformed.
    #[error("invalid ciphertext")]
    InvalidCiphertext,

    /// Submitted input proof was rejected by the engine.
    #[error("input proof verification failed")]
    ProofVerificationFailed,

    /// No record at this index.
    #[error("record not found: {0}")]
    RecordNotFound(RecordIndex),

    /// Record already carries a reply.
    #[error("record {0} already replied")]
    AlreadyReplied(RecordIndex),

    /// Caller is not the record's recipient.
    #[error("caller is not the recipient of record {0}")]
    NotAuthorized(RecordIndex),

    /// Inbox position past the end of the recipient's index.
    #[error("inbox position {position} out of range (count {count})")]
    PositionOutOfRange {
        /// Requested position.
        position: u64,
        /// Number of entries in the inbox.
        count: u64,
    },

    /// Engine failed for a reason outside the caller's control.
    #[error("engine error: {0}")]
    Engine(EngineError),
}

impl From<EngineError> for RelayError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidCiphertext => Self::InvalidCiphertext,
            EngineError::ProofVerificationFailed => Self::ProofVerificationFailed,
            other => Self::Engine(other),
        }
    }
}

impl RelayError {
    /// Returns true if the caller's request caused this error.
    ///
    /// Caller faults are surfaced to the end user unchanged. Anything else
    /// points at a broken engine.
    pub fn is_caller_fault(&self) -> bool {
        !matches!(self, Self::Engine(_))
    }
}
