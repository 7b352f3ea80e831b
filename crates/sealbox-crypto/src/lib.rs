//! Sealbox reference crypto engine
//!
//! [`MemoryEngine`] implements the relay's `CryptoEngine` capability in
//! process memory. It stands in for a real homomorphic coprocessor in tests,
//! simulations and the demo host.
//!
//! # Design
//!
//! - Client inputs are real XChaCha20-Poly1305 ciphertexts under an
//!   engine-held key, bound to (relay, caller) as associated data
//! - Input proofs are HMAC-SHA256 tags over the same binding plus the
//!   ciphertext, so an input cannot be replayed by another caller or at
//!   another relay
//! - After import the engine keeps plaintexts in a table keyed by random
//!   opaque handles; "encrypted" operations compute on that table and always
//!   allocate a fresh handle
//! - Decryption is gated by a permanent per-handle access list
//!
//! # Security Properties
//!
//! This engine is NOT a confidentiality boundary. Anyone holding the engine
//! value can read its table. It reproduces the access-control and
//! proof-binding behaviour of a real engine, nothing more.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod input;
mod memory;

pub use error::CryptoError;
pub use input::{CIPHERTEXT_SIZE, NONCE_SIZE};
pub use memory::MemoryEngine;
