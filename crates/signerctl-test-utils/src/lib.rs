#![deny(unsafe_code)]

//! Shared test utilities for the signerctl workspace.
//!
//! Provides a scripted stub engine, config builders, and tracing helpers so
//! that individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! signerctl-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod engine;
pub mod log_capture;
pub mod tracing_setup;

pub use config::TestConfigBuilder;
pub use engine::{Behavior, StubEngine};
pub use log_capture::{CapturedEvent, LogCapture};
