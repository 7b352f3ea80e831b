//! Host configuration.

use sealbox_core::Identity;

/// Default relay identity used when none is configured.
const DEFAULT_ADDRESS: [u8; 20] = *b"sealbox-relay-v1\0\0\0\x01";

/// Configuration for [`crate::RelayHost`].
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Relay identity. The engine is built for it and the relay takes its
    /// address from the engine.
    pub address: Identity,
    /// Buffered notifications per subscriber before slow observers lag.
    pub notification_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            address: Identity::from(DEFAULT_ADDRESS),
            notification_capacity: 1024,
        }
    }
}
