#![deny(unsafe_code)]

//! signerctl — command-line client for the signer engine daemon.
//!
//! With command words, sends them as one command and prints the engine's
//! reply. Without, relays lines typed on stdin until `quit`, end of input,
//! or the engine hangs up.

use std::path::{Path, PathBuf};
use std::process::{ExitCode, ExitStatus};

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use signerctl_config::ClientConfig;
use signerctl_core::driver::PROMPT;
use signerctl_core::{
    ClientError, Command, EngineTarget, Established, ProtocolDriver, build_info, establish,
    spawn_input,
};

const DEFAULT_CONFIG_PATH: &str = "/etc/opendnssec/signerctl.toml";

/// Simple command line interface to control the signer engine daemon.
/// If no command is given, the tool goes into interactive mode.
#[derive(Parser, Debug)]
#[command(
    name = "signerctl",
    version,
    long_version = build_info::LONG_VERSION,
    about,
    long_about = None
)]
struct Cli {
    /// Read configuration from file.
    #[arg(short, long, visible_alias = "cfgfile", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Command sent to the engine, e.g. `sign example.com`. Flags may appear
    /// between the words; words starting with `-` go after `--`.
    #[arg(value_name = "CMD")]
    command: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(cli.verbose, config.as_ref().map(|c| c.logging.level.as_str()));
    let config = resolve_config(&cli.config, config);

    match session(&cli, &config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(failure_code(&e))
        }
    }
}

fn init_tracing(verbose: u8, config_level: Option<&str>) {
    let filter = match verbose {
        0 => config_level.unwrap_or("warn"),
        1 => "debug",
        _ => "trace",
    };

    // stdout carries the engine's responses, so logs go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the config file, or `None` when it does not exist.
async fn load_config(path: &Path) -> Result<Option<ClientConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    ClientConfig::load(path)
        .await
        .map(Some)
        .map_err(|e| anyhow::anyhow!("cfgfile {} has errors: {e}", path.display()))
}

/// Settle on the loaded config or the defaults. Logged here because tracing
/// is only set up once the configured level is known.
fn resolve_config(path: &Path, loaded: Option<ClientConfig>) -> ClientConfig {
    match loaded {
        Some(config) => {
            debug!(
                path = %path.display(),
                socket = %config.signer.socket_path,
                level = %config.logging.level,
                "configuration loaded"
            );
            config
        }
        None => {
            info!(path = %path.display(), "Config file not found, using defaults");
            ClientConfig::default()
        }
    }
}

/// Run one session and return the process exit code.
async fn session(cli: &Cli, config: &ClientConfig) -> Result<u8> {
    let command = Command::from_words(&cli.command)?;
    let target = EngineTarget::from_config(config, &cli.config);

    let stream = match establish(&target, command.as_ref()).await? {
        Established::Connected(stream) => stream,
        Established::Spawned(status) => return Ok(spawned_exit_code(status)),
    };

    let stdout = tokio::io::stdout();
    match command {
        Some(cmd) => ProtocolDriver::batch(stream, stdout, cmd).run().await?,
        None => {
            eprint!("{PROMPT}");
            let input = spawn_input(std::io::BufReader::new(std::io::stdin()));
            ProtocolDriver::interactive(stream, stdout, input)
                .run()
                .await?
        }
    }
    debug!("session finished");
    Ok(0)
}

/// The engine's own exit code when `start` launched it; 1 if it was killed.
fn spawned_exit_code(status: ExitStatus) -> u8 {
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

fn failure_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ClientError>() {
        Some(client_err) => {
            debug!(kind = ?client_err.kind(), "session failed");
            client_err.exit_code()
        }
        None => 1,
    }
}
