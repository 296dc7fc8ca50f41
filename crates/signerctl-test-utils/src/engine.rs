//! Scripted stand-in for the signer engine.
//!
//! [`StubEngine`] binds a Unix socket in a temporary directory, accepts a
//! single connection, plays one [`Behavior`], and records every byte the
//! client sent until the client closes its side.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinHandle;

/// End-of-response marker the real engine appends in batch mode.
pub const SENTINEL: &[u8] = b"\ncmd> ";

/// What the stub does with its one connection.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Read one request line, echo it without the newline, append the sentinel.
    EchoWithSentinel,
    /// Read one request line, answer with these exact bytes.
    Reply(Vec<u8>),
    /// Close the connection without reading or writing.
    Hangup,
    /// Read until the client half-closes, then answer with these bytes and close.
    CollectThenReply(Vec<u8>),
}

/// A test-scoped engine listening on a temporary socket.
///
/// The temp directory (and the socket inside it) is deleted when this value
/// is dropped.
pub struct StubEngine {
    socket_path: PathBuf,
    task: JoinHandle<Vec<u8>>,
    _temp_dir: TempDir,
}

impl StubEngine {
    /// Bind the socket and start serving `behavior` in the background.
    pub fn spawn(behavior: Behavior) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let socket_path = temp_dir.path().join("engine.sock");
        let listener = UnixListener::bind(&socket_path).expect("failed to bind stub socket");

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("stub accept failed");
            serve(stream, behavior).await
        });

        Self {
            socket_path,
            task,
            _temp_dir: temp_dir,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Wait for the session to end and return everything the client sent.
    pub async fn received(self) -> Vec<u8> {
        self.task.await.expect("stub engine task panicked")
    }
}

async fn serve(mut stream: UnixStream, behavior: Behavior) -> Vec<u8> {
    let mut received = Vec::new();
    match behavior {
        Behavior::Hangup => return received,
        Behavior::EchoWithSentinel => {
            read_line(&mut stream, &mut received).await;
            let mut reply = received.clone();
            if reply.last() == Some(&b'\n') {
                reply.pop();
            }
            reply.extend_from_slice(SENTINEL);
            let _ = stream.write_all(&reply).await;
        }
        Behavior::Reply(reply) => {
            read_line(&mut stream, &mut received).await;
            let _ = stream.write_all(&reply).await;
        }
        Behavior::CollectThenReply(reply) => {
            let _ = stream.read_to_end(&mut received).await;
            let _ = stream.write_all(&reply).await;
            return received;
        }
    }
    let _ = stream.read_to_end(&mut received).await;
    received
}

async fn read_line(stream: &mut UnixStream, received: &mut Vec<u8>) {
    let mut buf = [0u8; 256];
    while !received.contains(&b'\n') {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => received.extend_from_slice(&buf[..n]),
        }
    }
}
