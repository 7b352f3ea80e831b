//! Relay host.
//!
//! Wraps the sans-IO [`Relay`] in a shared lock so concurrent callers observe
//! one total order of state changes. Writes hold the lock exclusively for the
//! whole operation, including execution of the resulting actions, so
//! notifications leave in ledger order. Reads share the lock and never see a
//! half-applied send or reply.

use std::sync::Arc;

use sealbox_core::{
    CryptoEngine, Environment, ExternalInput, Handle, Identity, InputProof, MessageRecord,
    RecordIndex, RecordMetadata, Relay, RelayError, RelayEvent,
};
use sealbox_crypto::{CryptoError, MemoryEngine};
use tokio::sync::{RwLock, broadcast};

use crate::{config::HostConfig, executor::ActionExecutor};

/// Shared, serialized access to a [`Relay`].
///
/// Cheap to clone; all clones drive the same relay.
pub struct RelayHost<G> {
    relay: Arc<RwLock<Relay<G>>>,
    executor: ActionExecutor,
}

impl<G> Clone for RelayHost<G> {
    fn clone(&self) -> Self {
        Self { relay: Arc::clone(&self.relay), executor: self.executor.clone() }
    }
}

impl<G> RelayHost<G>
where
    G: CryptoEngine + Send + Sync + 'static,
{
    /// Host for a fresh relay backed by `engine`, addressed as the engine's
    /// own identity.
    pub fn new(engine: G, notification_capacity: usize) -> Self {
        Self {
            relay: Arc::new(RwLock::new(Relay::new(engine))),
            executor: ActionExecutor::new(notification_capacity),
        }
    }

    /// Subscribes to relay notifications published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.executor.subscribe()
    }

    /// The relay's own identity.
    pub async fn address(&self) -> Identity {
        self.relay.read().await.address().clone()
    }

    /// Deposits a message from `caller` for `recipient`.
    ///
    /// # Errors
    ///
    /// Whatever [`Relay::send_message`] rejects. A rejected send leaves the
    /// relay untouched and publishes nothing.
    pub async fn send_message(
        &self,
        caller: &Identity,
        recipient: Identity,
        input: &ExternalInput,
        proof: &InputProof,
    ) -> Result<RecordIndex, RelayError> {
        let mut relay = self.relay.write().await;
        let (record, actions) =
            relay.send_message(caller, recipient, input, proof).inspect_err(|e| {
                tracing::debug!(%caller, error = %e, "send rejected");
            })?;
        self.executor.execute(actions);
        Ok(record)
    }

    /// Attaches `caller`'s reply to `record`.
    ///
    /// # Errors
    ///
    /// Whatever [`Relay::send_reply`] rejects.
    pub async fn send_reply(
        &self,
        caller: &Identity,
        record: RecordIndex,
        input: &ExternalInput,
        proof: &InputProof,
    ) -> Result<(), RelayError> {
        let mut relay = self.relay.write().await;
        let actions = relay.send_reply(caller, record, input, proof).inspect_err(|e| {
            tracing::debug!(%caller, record, error = %e, "reply rejected");
        })?;
        self.executor.execute(actions);
        Ok(())
    }

    /// Number of inbox entries for `recipient`.
    pub async fn inbox_count(&self, recipient: &Identity) -> u64 {
        self.relay.read().await.inbox_count(recipient)
    }

    /// Record reference at `position` in `recipient`'s inbox.
    pub async fn inbox_entry(
        &self,
        recipient: &Identity,
        position: u64,
    ) -> Result<RecordIndex, RelayError> {
        self.relay.read().await.inbox_entry(recipient, position)
    }

    /// Snapshot of `recipient`'s inbox.
    pub async fn inbox(&self, recipient: &Identity) -> Vec<RecordIndex> {
        self.relay.read().await.inbox(recipient).to_vec()
    }

    /// Stored message handle of `record`.
    pub async fn message_handle(&self, record: RecordIndex) -> Result<Handle, RelayError> {
        self.relay.read().await.message_handle(record)
    }

    /// Stored reply handle of `record`.
    pub async fn reply_handle(&self, record: RecordIndex) -> Result<Handle, RelayError> {
        self.relay.read().await.reply_handle(record)
    }

    /// Recipient and replied flag of `record`.
    pub async fn metadata(&self, record: RecordIndex) -> Result<RecordMetadata, RelayError> {
        self.relay.read().await.metadata(record)
    }

    /// Copy of the full record.
    pub async fn record(&self, record: RecordIndex) -> Result<MessageRecord, RelayError> {
        self.relay.read().await.record(record).cloned()
    }

    /// Number of records in the ledger.
    pub async fn message_count(&self) -> u64 {
        self.relay.read().await.message_count()
    }

    /// Runs `f` against the engine under a shared lock.
    pub async fn with_engine<R>(&self, f: impl FnOnce(&G) -> R) -> R {
        let relay = self.relay.read().await;
        f(relay.engine())
    }
}

impl<E: Environment> RelayHost<MemoryEngine<E>> {
    /// Host over a [`MemoryEngine`] built for `config.address`.
    ///
    /// # Errors
    ///
    /// Whatever [`MemoryEngine::new`] rejects.
    pub fn from_config(env: E, config: HostConfig) -> Result<Self, CryptoError> {
        let engine = MemoryEngine::new(env, config.address)?;
        Ok(Self::new(engine, config.notification_capacity))
    }
}

impl<G> std::fmt::Debug for RelayHost<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayHost").finish_non_exhaustive()
    }
}
