//! Command Snapshot Source
//!
//! Implements SnapshotSource by running an external command (occtl by
//! default) and capturing its standard output.

use crate::domain::errors::CollectError;
use crate::domain::ports::SnapshotSource;
use async_trait::async_trait;
use tokio::process::Command;

/// Runs a command line and returns its stdout.
///
/// The command line is split on whitespace; no shell is involved.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: String,
    args: Vec<String>,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a whitespace separated command line.
    pub fn from_command_line(command: &str) -> Result<Self, CollectError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(CollectError::EmptyCommand)?;
        Ok(Self::new(program, parts.collect()))
    }

    /// The command line, for logs and errors.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl SnapshotSource for CommandSource {
    async fn fetch(&self) -> Result<Vec<u8>, CollectError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CollectError::Spawn {
                command: self.command_line(),
                source,
            })?;

        if !output.status.success() {
            return Err(CollectError::ExitStatus {
                command: self.command_line(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::debug!("collected {} bytes from `{}`", output.stdout.len(), self.program);
        Ok(output.stdout)
    }
}
