//! Relay action execution.
//!
//! Notifications are published on a broadcast channel. Having no subscriber
//! is not an error: observers are optional and off-system.

use sealbox_core::{RelayAction, RelayEvent};
use tokio::sync::broadcast;

/// Executes [`RelayAction`]s produced by the relay.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    notifications: broadcast::Sender<RelayEvent>,
}

impl ActionExecutor {
    /// Executor with room for `capacity` buffered notifications per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (notifications, _) = broadcast::channel(capacity.max(1));
        Self { notifications }
    }

    /// New notification subscription. Receives events published after this
    /// call.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.notifications.subscribe()
    }

    /// Executes `actions` in order.
    pub fn execute(&self, actions: Vec<RelayAction>) {
        for action in actions {
            match action {
                RelayAction::Notify(event) => {
                    let record = event.record();
                    if self.notifications.send(event).is_err() {
                        tracing::trace!(record, "no observers for notification");
                    }
                },
                RelayAction::Log(message) => tracing::debug!("{}", message),
            }
        }
    }
}
