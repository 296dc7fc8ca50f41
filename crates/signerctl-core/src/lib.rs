#![deny(unsafe_code)]

//! signerctl core: the control-socket client for the signer engine.
//!
//! A session has two steps. [`establish`] connects to the engine's Unix
//! control socket (or launches the engine for `start`), then a
//! [`ProtocolDriver`] runs either one batch command/response cycle or an
//! interactive relay between the terminal and the engine.

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Batch command assembly and size bounds.
pub mod command;
/// Control socket setup and the `start`/`running` fallbacks.
pub mod connection;
/// Readiness loop, response framing and half-close handling.
pub mod driver;
/// Error taxonomy shared by every stage of a session.
pub mod error;

pub use command::{Command, MAX_LINE};
pub use connection::{EngineTarget, Established, establish};
pub use driver::{Input, ProtocolDriver, spawn_input};
pub use error::{ClientError, ErrorKind};
