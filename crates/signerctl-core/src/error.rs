//! Client error taxonomy.
//!
//! Every failure ends the session. The `Display` text of each variant is the
//! diagnostic printed on stderr by the CLI.

use std::io;
use std::path::PathBuf;

/// Broad class of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Socket creation, connect, or non-blocking setup failed.
    Connection,
    /// The engine violated the response framing or hung up early.
    Protocol,
    /// A non-retryable read or write failed.
    Io,
    /// A size bound was exceeded or the engine could not be launched.
    Resource,
}

/// Errors from establishing or driving a control session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Unable to connect to engine: connect() failed: {source}")]
    Connect { path: PathBuf, source: io::Error },

    #[error("Engine not running.")]
    NotRunning(PathBuf),

    #[error("unable to start interface, cannot set socket non-blocking: {0}")]
    NonBlocking(#[source] io::Error),

    #[error("unable to start interface, cannot register socket: {0}")]
    Register(#[source] io::Error),

    #[error("not enough response data received from daemon.")]
    ShortResponse { received: usize },

    #[error("signer engine terminated prematurely")]
    PrematureClose,

    #[error("error: {0}")]
    Read(#[source] io::Error),

    #[error("write error: {0}")]
    Write(#[source] io::Error),

    #[error("write error: more bytes ({written}) written than required ({requested})")]
    Overwrite { written: usize, requested: usize },

    #[error("shutdown failed: {0}")]
    Shutdown(#[source] io::Error),

    #[error("error, too many arguments ({count}, at most {limit})")]
    TooManyArguments { count: usize, limit: usize },

    #[error("error, command too long ({len} bytes, at most {limit})")]
    CommandTooLong { len: usize, limit: usize },

    #[error("Unable to start engine: cmd too long")]
    StartCommandTooLong { len: usize, limit: usize },

    #[error("Unable to start engine {program}: {source}")]
    Spawn { program: String, source: io::Error },
}

impl ClientError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. } | Self::NotRunning(_) | Self::NonBlocking(_) | Self::Register(_) => {
                ErrorKind::Connection
            }
            Self::ShortResponse { .. } | Self::PrematureClose => ErrorKind::Protocol,
            Self::Read(_) | Self::Write(_) | Self::Overwrite { .. } | Self::Shutdown(_) => {
                ErrorKind::Io
            }
            Self::TooManyArguments { .. }
            | Self::CommandTooLong { .. }
            | Self::StartCommandTooLong { .. }
            | Self::Spawn { .. } => ErrorKind::Resource,
        }
    }

    /// Process exit code for this error. There is no partial success.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Interrupted and would-block conditions are retried at the call site and
/// never surface as a [`ClientError`].
pub(crate) fn is_retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
    )
}
