//! Sealbox relay core.
//!
//! Sans-IO implementation of a confidential message relay: an append-only
//! ledger where any party deposits an encrypted payload for a recipient, and
//! the recipient may post exactly one encrypted reply back to the sender.
//!
//! The relay never sees plaintext. Every payload crosses the boundary as an
//! opaque [`Handle`] managed by an injected [`CryptoEngine`]; the relay only
//! imports, sanitizes and grants access to handles.
//!
//! ## Architecture
//!
//! ```text
//! Relay<G: CryptoEngine>
//!   ├─ MessageLedger   (records, position = permanent reference)
//!   ├─ InboxIndex      (per-recipient arrival order)
//!   └─ seal            (import + sanitize + grant, shared by send and reply)
//! ```
//!
//! All state-changing methods take `&mut self`. Exclusive access is the
//! serialization boundary; hosts that share a relay between tasks wrap it in
//! a single lock (see `sealbox-host`).
//!
//! Methods return [`RelayAction`]s instead of performing I/O. The caller
//! decides how to deliver notifications and where logs go.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod env;
pub mod error;
pub mod event;
pub mod handle;
pub mod identity;
pub mod inbox;
pub mod ledger;
pub mod relay;
mod seal;

pub use engine::{CryptoEngine, EngineError, InputContext};
pub use env::Environment;
pub use error::RelayError;
pub use event::{RelayAction, RelayEvent};
pub use handle::{EncryptedBool, ExternalInput, Handle, InputProof};
pub use identity::Identity;
pub use inbox::InboxIndex;
pub use ledger::{MessageLedger, MessageRecord, RecordIndex};
pub use relay::{RecordMetadata, Relay};
