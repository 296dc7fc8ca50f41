//! Protocol driver for one control session.
//!
//! The driver owns the engine connection and multiplexes it against terminal
//! input. Terminal input is read by a dedicated input thread ([`spawn_input`])
//! and delivered over a channel, so the session itself is a single
//! `select!` loop on one task.
//!
//! ## Framing
//!
//! In batch mode the engine terminates its response with [`SENTINEL`]. The
//! sentinel is stripped before the response is printed and ends the session.
//! Interactive output is relayed untouched. Either way [`STOP_RESPONSE`]
//! announces that the engine is shutting down, which also ends the session.
//!
//! ```text
//!  terminal ──▶ input thread ──mpsc──┐
//!                                    ▼
//!                         ProtocolDriver::run ◀──▶ control socket
//!                                    │
//!                                    ▼
//!                                 stdout
//! ```

use std::io::{self, BufRead, Read};
use std::thread;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::command::{Command, MAX_LINE};
use crate::error::{ClientError, is_retryable};

/// Appended by the engine after each complete batch response.
pub const SENTINEL: &[u8] = b"\ncmd> ";

/// Sent by the engine when it shuts down.
pub const STOP_RESPONSE: &[u8] = b"Engine shut down.";

/// Printed on stderr before an interactive session starts.
pub const PROMPT: &str = "cmd> ";

/// Something read from the terminal. End of input closes the channel.
#[derive(Debug)]
pub enum Input {
    Line(Vec<u8>),
    Error(io::Error),
}

/// Session flags. Terminal input is watched while `ProtocolDriver::input`
/// is `Some`.
#[derive(Debug, Default, Clone, Copy)]
struct DriverState {
    /// Terminal input has ended (or is never read, in batch mode).
    stdin_eof: bool,
    /// The batch command has been written to the socket.
    command_written: bool,
    /// The sentinel of the batch response has been seen.
    response_complete: bool,
}

enum Flow {
    Continue,
    Done,
}

enum Event {
    Socket(io::Result<usize>),
    Input(Option<Input>),
}

/// Read terminal input on its own thread, one line per message.
///
/// A line longer than [`MAX_LINE`] arrives as several messages of at most
/// `MAX_LINE` bytes each. Interrupted reads are retried. Any other read error is forwarded once and
/// ends the thread; end of input drops the sender.
pub fn spawn_input<R>(reader: R) -> mpsc::Receiver<Input>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    let spawned = thread::Builder::new()
        .name("signerctl-input".to_string())
        .spawn(move || read_lines(reader, tx));
    if let Err(e) = spawned {
        warn!(error = %e, "failed to start input thread, treating input as closed");
    }
    rx
}

fn read_lines<R: BufRead>(mut reader: R, tx: mpsc::Sender<Input>) {
    loop {
        let mut line = Vec::with_capacity(MAX_LINE);
        match (&mut reader).take(MAX_LINE as u64).read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if tx.blocking_send(Input::Line(line)).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(role = "client", error = %e, "interface input error");
                let _ = tx.blocking_send(Input::Error(e));
                break;
            }
        }
    }
}

/// Drives one batch or interactive session over `stream`, printing the
/// engine's output to `output`.
pub struct ProtocolDriver<S, O> {
    stream: S,
    output: O,
    command: Option<Command>,
    input: Option<mpsc::Receiver<Input>>,
    state: DriverState,
}

impl<S, O> ProtocolDriver<S, O>
where
    S: AsyncRead + AsyncWrite + Unpin,
    O: AsyncWrite + Unpin,
{
    /// Send `command` once and print the framed response.
    pub fn batch(stream: S, output: O, command: Command) -> Self {
        Self {
            stream,
            output,
            command: Some(command),
            input: None,
            state: DriverState::default(),
        }
    }

    /// Relay terminal lines from `input` until quit, end of input, or peer close.
    pub fn interactive(stream: S, output: O, input: mpsc::Receiver<Input>) -> Self {
        Self {
            stream,
            output,
            command: None,
            input: Some(input),
            state: DriverState::default(),
        }
    }

    /// Run the session to completion. The connection is closed when the
    /// driver is dropped, on success and on failure alike.
    pub async fn run(mut self) -> Result<(), ClientError> {
        let mut buf = [0u8; MAX_LINE];

        loop {
            if !self.state.command_written
                && let Some(cmd) = &self.command
            {
                write_all(&mut self.stream, cmd.as_bytes()).await?;
                debug!(command = %cmd, "command written");
                self.state.command_written = true;
                self.state.stdin_eof = true;
                self.input = None;
                continue;
            }

            if self.command.is_some() && self.state.command_written && self.state.response_complete
            {
                return Ok(());
            }

            let input = &mut self.input;
            let event = tokio::select! {
                biased;
                read = self.stream.read(&mut buf) => Event::Socket(read),
                line = next_input(input), if !self.state.stdin_eof => Event::Input(line),
            };

            let flow = match event {
                Event::Socket(Ok(0)) => return self.on_peer_closed(),
                Event::Socket(Ok(n)) => self.on_response(&buf[..n]).await?,
                Event::Socket(Err(e)) if is_retryable(&e) => Flow::Continue,
                Event::Socket(Err(e)) => return Err(ClientError::Read(e)),
                Event::Input(input) => self.on_input(input).await?,
            };
            if let Flow::Done = flow {
                return Ok(());
            }
        }
    }

    fn on_peer_closed(&self) -> Result<(), ClientError> {
        if self.state.stdin_eof {
            debug!("engine closed the connection");
            Ok(())
        } else {
            Err(ClientError::PrematureClose)
        }
    }

    async fn on_response(&mut self, chunk: &[u8]) -> Result<Flow, ClientError> {
        let mut chunk = chunk;
        if self.command.is_some() {
            let (body, complete) = strip_sentinel(chunk)?;
            chunk = body;
            self.state.response_complete = complete;
        }

        write_all(&mut self.output, chunk).await?;

        if chunk == STOP_RESPONSE || self.state.response_complete {
            write_all(&mut self.output, b"\n").await?;
            self.output.flush().await.map_err(ClientError::Write)?;
            return Ok(Flow::Done);
        }
        self.output.flush().await.map_err(ClientError::Write)?;
        Ok(Flow::Continue)
    }

    async fn on_input(&mut self, input: Option<Input>) -> Result<Flow, ClientError> {
        // batch mode never reads the terminal, readiness only means "half-close now"
        if self.command.is_some() && self.state.command_written {
            self.half_close().await?;
            return Ok(Flow::Continue);
        }

        let line = match input {
            None => {
                self.half_close().await?;
                return Ok(Flow::Continue);
            }
            Some(Input::Error(e)) => return Err(ClientError::Read(e)),
            Some(Input::Line(line)) => line,
        };

        let trimmed = trim_end(&line);
        if trimmed.starts_with(b"exit") || trimmed.starts_with(b"quit") {
            return Ok(Flow::Done);
        }
        write_all(&mut self.stream, trimmed).await?;
        Ok(Flow::Continue)
    }

    /// Tell the engine no more input is coming while still reading its output.
    async fn half_close(&mut self) -> Result<(), ClientError> {
        self.state.stdin_eof = true;
        self.input = None;
        self.stream.shutdown().await.map_err(ClientError::Shutdown)?;
        debug!("input closed, socket write side shut down");
        Ok(())
    }
}

/// Frame one batch-mode read: the bytes to print, and whether the read ended
/// with [`SENTINEL`].
///
/// A read shorter than the sentinel is a framing error, whatever its content.
pub fn strip_sentinel(chunk: &[u8]) -> Result<(&[u8], bool), ClientError> {
    if chunk.len() < SENTINEL.len() {
        return Err(ClientError::ShortResponse {
            received: chunk.len(),
        });
    }
    Ok(match chunk.strip_suffix(SENTINEL) {
        Some(body) => (body, true),
        None => (chunk, false),
    })
}

async fn next_input(input: &mut Option<mpsc::Receiver<Input>>) -> Option<Input> {
    match input {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn trim_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &line[..end]
}

/// Write every byte of `buf`, retrying interrupted and would-block writes.
///
/// A write that reports zero bytes, or more bytes than were asked for, is
/// fatal.
pub async fn write_all<W>(writer: &mut W, buf: &[u8]) -> Result<(), ClientError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while written < buf.len() {
        let requested = buf.len() - written;
        match writer.write(&buf[written..]).await {
            Ok(0) => {
                return Err(ClientError::Write(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "no write",
                )));
            }
            Ok(n) if n > requested => {
                return Err(ClientError::Overwrite {
                    written: written + n,
                    requested: buf.len(),
                });
            }
            Ok(n) => written += n,
            Err(e) if is_retryable(&e) => continue,
            Err(e) => return Err(ClientError::Write(e)),
        }
    }
    Ok(())
}
