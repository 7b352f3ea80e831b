//! Production Environment implementation using the OS RNG.

use sealbox_core::Environment;

/// Production environment.
///
/// `getrandom` for randomness.
///
/// # Security
///
/// `getrandom` draws from the OS entropy pool, which is what engine master
/// secrets, handles and input nonces require. If the OS refuses entropy the
/// process aborts: there is no safe value to hand back for key material.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Err(e) = getrandom::fill(buffer) {
            tracing::error!("getrandom failed, aborting: {}", e);
            std::process::abort();
        }
    }
}
