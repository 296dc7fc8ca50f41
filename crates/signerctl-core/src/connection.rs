//! Connection setup for the engine's control socket.
//!
//! [`establish`] opens the socket and hands back a non-blocking stream. When
//! the engine is not listening, the `start` command launches it instead and
//! `running` reports that it is down.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitStatus;

use tokio::net::UnixStream;
use tracing::{debug, error, info};

use signerctl_config::ClientConfig;

use crate::command::Command;
use crate::error::ClientError;

/// Upper bound on `"<engine> -c <config>"` plus its terminator.
pub const MAX_START_COMMAND: usize = 256;

/// Which engine to talk to, and how to launch it.
#[derive(Debug, Clone)]
pub struct EngineTarget {
    pub socket_path: PathBuf,
    pub engine_binary: String,
    /// Config file handed to the engine with `-c` when it is started.
    pub config_path: PathBuf,
}

impl EngineTarget {
    pub fn new(
        socket_path: impl Into<PathBuf>,
        engine_binary: impl Into<String>,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            socket_path: socket_path.into(),
            engine_binary: engine_binary.into(),
            config_path: config_path.into(),
        }
    }

    /// Resolve the target from a loaded configuration and the file it came from.
    pub fn from_config(config: &ClientConfig, config_path: impl Into<PathBuf>) -> Self {
        Self::new(
            &config.signer.socket_path,
            &config.signer.engine_binary,
            config_path,
        )
    }

    /// Build the engine launch command, refusing invocations that would not
    /// fit in [`MAX_START_COMMAND`] bytes.
    pub fn start_invocation(&self) -> Result<tokio::process::Command, ClientError> {
        // "<engine> -c <config>\0"
        let len = self.engine_binary.len() + self.config_path.as_os_str().len() + 5;
        if len >= MAX_START_COMMAND {
            return Err(ClientError::StartCommandTooLong {
                len,
                limit: MAX_START_COMMAND,
            });
        }

        let mut cmd = tokio::process::Command::new(&self.engine_binary);
        cmd.args([OsString::from("-c"), self.config_path.clone().into_os_string()]);
        Ok(cmd)
    }
}

/// Outcome of [`establish`].
#[derive(Debug)]
pub enum Established {
    /// A live, non-blocking connection to the engine.
    Connected(UnixStream),
    /// The engine was not reachable and `start` launched it; no session follows.
    Spawned(ExitStatus),
}

/// Connect to the engine's control socket.
pub async fn establish(
    target: &EngineTarget,
    command: Option<&Command>,
) -> Result<Established, ClientError> {
    debug!(
        role = "client",
        socket = %target.socket_path.display(),
        "connecting to signer engine"
    );

    let stream = match std::os::unix::net::UnixStream::connect(&target.socket_path) {
        Ok(stream) => stream,
        Err(source) => return on_connect_failure(target, command, source).await,
    };

    if let Err(e) = stream.set_nonblocking(true) {
        error!(role = "client", error = %e, "unable to start interface, set non-blocking failed");
        return Err(ClientError::NonBlocking(e));
    }

    let stream = UnixStream::from_std(stream).map_err(|e| {
        error!(role = "client", error = %e, "unable to start interface, reactor registration failed");
        ClientError::Register(e)
    })?;

    Ok(Established::Connected(stream))
}

async fn on_connect_failure(
    target: &EngineTarget,
    command: Option<&Command>,
    source: std::io::Error,
) -> Result<Established, ClientError> {
    match command {
        Some(cmd) if cmd.is_start() => {
            let mut invocation = target.start_invocation()?;
            info!(
                engine = %target.engine_binary,
                config = %target.config_path.display(),
                "engine not reachable, starting it"
            );
            let status = invocation
                .status()
                .await
                .map_err(|source| ClientError::Spawn {
                    program: target.engine_binary.clone(),
                    source,
                })?;
            Ok(Established::Spawned(status))
        }
        Some(cmd) if cmd.is_running() => Err(ClientError::NotRunning(target.socket_path.clone())),
        _ => Err(ClientError::Connect {
            path: target.socket_path.clone(),
            source,
        }),
    }
}
