//! Interactive command session
//!
//! Reads command lines, drives a [`Database`] and writes one output line
//! for every command that produces a result.

use crate::{
    error::{Result, TxVaultError},
    protocol::{parse_command, Command, Response},
    store::{Database, MemoryStore},
};
use serde::Deserialize;
use std::path::Path;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::broadcast,
};
use tracing::{info, warn};

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Written before every command when set
    pub prompt: Option<String>,
    /// Answer malformed lines with an `ERROR` line instead of only logging them
    pub report_errors: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt: None,
            report_errors: true,
        }
    }
}

impl SessionConfig {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// What a single input line amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(Response),
    Quiet,
    End,
}

/// A command session bound to one database
pub struct Session<D = MemoryStore> {
    config: SessionConfig,
    db: D,
}

impl Session<MemoryStore> {
    /// Create a session over a fresh in-memory store
    pub fn new(config: SessionConfig) -> Self {
        Self::with_database(MemoryStore::new(), config)
    }
}

impl<D: Database> Session<D> {
    pub fn with_database(db: D, config: SessionConfig) -> Self {
        Self { config, db }
    }

    pub fn database(&self) -> &D {
        &self.db
    }

    /// Run the session until END, end of input or a shutdown signal
    pub async fn run<R, W>(
        &mut self,
        reader: R,
        mut writer: W,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        let mut processed = 0usize;
        info!("Session started");

        loop {
            if let Some(prompt) = &self.config.prompt {
                writer.write_all(prompt.as_bytes()).await?;
                writer.flush().await?;
            }

            tokio::select! {
                line = lines.next_line() => {
                    let line = match line? {
                        Some(line) => line,
                        None => break,
                    };
                    processed += 1;

                    match self.process_line(&line) {
                        Outcome::Reply(response) => {
                            writer.write_all(&response.to_bytes()).await?;
                            writer.flush().await?;
                        }
                        Outcome::Quiet => {}
                        Outcome::End => break,
                    }
                }

                Ok(()) = shutdown_rx.recv() => {
                    info!("Shutdown signal received, ending session");
                    break;
                }
            }
        }

        writer.flush().await?;
        info!(lines = processed, depth = self.db.depth(), "Session ended");
        Ok(())
    }

    /// Process one input line
    pub fn process_line(&mut self, line: &str) -> Outcome {
        if line.trim().is_empty() {
            return Outcome::Quiet;
        }

        match parse_command(line) {
            Ok(command) => self.execute_command(command),
            Err(e) => {
                warn!(line = line.trim(), error = %e, "Rejected command");
                if self.config.report_errors {
                    Outcome::Reply(Response::Error(error_message(e)))
                } else {
                    Outcome::Quiet
                }
            }
        }
    }

    /// Execute a parsed command
    pub fn execute_command(&mut self, command: Command) -> Outcome {
        match command {
            Command::Set { key, value } => {
                self.db.set(&key, &value);
                Outcome::Quiet
            }
            Command::Get { key } => match self.db.get(&key) {
                Some(value) => Outcome::Reply(Response::Value(value.to_string())),
                None => Outcome::Reply(Response::Null),
            },
            Command::Unset { key } => {
                self.db.unset(&key);
                Outcome::Quiet
            }
            Command::NumEqualTo { value } => {
                Outcome::Reply(Response::Count(self.db.num_equal_to(&value)))
            }
            Command::Begin => {
                self.db.begin();
                Outcome::Quiet
            }
            Command::Commit => Self::transaction_outcome(self.db.commit()),
            Command::Rollback => Self::transaction_outcome(self.db.rollback()),
            Command::End => Outcome::End,
        }
    }

    fn transaction_outcome(result: Result<()>) -> Outcome {
        match result {
            Ok(()) => Outcome::Quiet,
            Err(TxVaultError::NoTransaction) => Outcome::Reply(Response::NoTransaction),
            Err(e) => Outcome::Reply(Response::Error(error_message(e))),
        }
    }
}

fn error_message(err: TxVaultError) -> String {
    match err {
        TxVaultError::Protocol(msg) => msg,
        other => other.to_string(),
    }
}
