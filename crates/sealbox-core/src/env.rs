//! Environment abstraction for deterministic testing.
//!
//! The relay core itself is deterministic. Randomness is needed only at the
//! edges: engines allocate fresh handles and clients pick encryption nonces.
//! Routing those through `Environment` lets simulations replay a run exactly
//! from a seed while production uses OS entropy.
//!
//! # Invariants
//!
//! - Determinism: given the same seed, `random_bytes()` yields the same
//!   sequence
//! - Isolation: implementations must not share global state

/// Source of randomness.
///
/// # Security
///
/// Production implementations MUST fill buffers from a cryptographically
/// secure source (`getrandom`) and MUST NOT return predictable bytes when
/// that source fails. Simulation implementations MUST be seeded and the seed
/// MUST be logged for reproducibility.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Fills `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates 32 random bytes, the width of an engine handle.
    fn random_array32(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.random_bytes(&mut bytes);
        bytes
    }
}
