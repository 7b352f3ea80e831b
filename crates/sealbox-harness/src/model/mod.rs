//! Reference model for model-based testing.
//!
//! The model is a plaintext relay: no engine, no handles, no grants. It keeps
//! the same rules (index assignment, inbox order, reply-once, recipient-only
//! replies, null-recipient rejection) in the most obvious form, and serves as
//! the oracle against which the real relay is verified.

pub mod operation;
mod relay;
mod state;

pub use operation::{Operation, OperationError, OperationResult, PartyId};
pub use relay::{ModelRecord, ModelRelay};
pub use state::{ObservableState, ObservedRecord};
