//! Deterministic test harness for the sealbox relay.
//!
//! Seeded implementation of the `Environment` trait, so engine handles and
//! input nonces are reproducible from a seed.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a plaintext reference relay. Operations are
//! applied to both the model and a real relay backed by the reference engine,
//! and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod real;
pub mod sim_env;

pub use model::{
    ModelRecord, ModelRelay, ObservableState, ObservedRecord, Operation, OperationError,
    OperationResult, PartyId,
};
pub use real::{ObservationError, RealRelay};
pub use sim_env::SimEnv;
