//! Batch-mode command assembly.
//!
//! The words left over after flag parsing are joined with single spaces and
//! terminated by a newline. No words means interactive mode.

use std::fmt;

use crate::error::ClientError;

/// Capacity of the response buffer and upper bound on an assembled command.
pub const MAX_LINE: usize = 1024;

/// Most command words accepted on the command line.
pub const MAX_COMMAND_WORDS: usize = 9;

/// A newline-terminated command sent once in batch mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(String);

impl Command {
    /// Assemble a command from its words.
    ///
    /// Returns `Ok(None)` when there are no words, which selects interactive
    /// mode.
    pub fn from_words<I, S>(words: I) -> Result<Option<Self>, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<S> = words.into_iter().collect();
        if words.is_empty() {
            return Ok(None);
        }
        if words.len() > MAX_COMMAND_WORDS {
            return Err(ClientError::TooManyArguments {
                count: words.len(),
                limit: MAX_COMMAND_WORDS,
            });
        }

        let mut text = words
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ");
        text.push('\n');

        if text.len() > MAX_LINE {
            return Err(ClientError::CommandTooLong {
                len: text.len(),
                limit: MAX_LINE,
            });
        }
        Ok(Some(Self(text)))
    }

    /// The raw bytes written to the socket, including the trailing newline.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `start`: launch the engine when it is not reachable.
    pub fn is_start(&self) -> bool {
        self.0 == "start\n"
    }

    /// `running`: only asks whether the engine is up.
    pub fn is_running(&self) -> bool {
        self.0 == "running\n"
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.trim_end_matches('\n'))
    }
}
