//! External command execution with a wall-clock bound

use std::future::Future;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (`None` when terminated by a signal)
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{program} timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs an external program and captures its output
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> impl Future<Output = Result<CommandOutput, CommandError>> + Send;
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        limit: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!("Running {} {}", program, args.join(" "));

        let child = cmd.spawn().map_err(|e| spawn_error(program, e))?;

        // Dropping the pending future on timeout kills the child.
        let output = timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| CommandError::TimedOut {
                program: program.to_string(),
                secs: limit.as_secs(),
            })?
            .map_err(|e| CommandError::Io {
                program: program.to_string(),
                source: e,
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn spawn_error(program: &str, err: std::io::Error) -> CommandError {
    if err.kind() == ErrorKind::NotFound {
        CommandError::NotFound(program.to_string())
    } else {
        CommandError::Io {
            program: program.to_string(),
            source: err,
        }
    }
}
