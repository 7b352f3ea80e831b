//! Sealbox relay host.
//!
//! Runs the sans-IO relay inside a tokio process:
//! - One lock around the relay serializes every state change
//! - Relay actions are executed here: notifications fan out over a broadcast
//!   channel, log actions go to `tracing`
//! - OS randomness backs the reference engine
//!
//! ## Architecture
//!
//! ```text
//! sealbox-host
//!   ├─ SystemEnv        (production Environment impl)
//!   ├─ RelayHost        (RwLock<Relay>, one logical operation per lock)
//!   ├─ ActionExecutor   (notifications + logs)
//!   └─ Console          (line-oriented commands for the binary)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod console;
mod error;
mod executor;
mod host;
mod system_env;

pub use config::HostConfig;
pub use console::{Console, ConsoleOutcome};
pub use error::HostError;
pub use executor::ActionExecutor;
pub use host::RelayHost;
pub use system_env::SystemEnv;
