//! External process execution
//!
//! Every process is spawned directly (never through a shell) with
//! `kill_on_drop`, so dropping a run future or a streaming handle always
//! terminates the child.

use async_trait::async_trait;
use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, ChildStderr, ChildStdout, Command as TokioCommand};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::errors::ProcessError;
use crate::models::ProcessResult;

/// Executable plus ordered arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs external tools for the resolver and the relay
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion, capturing both output streams.
    ///
    /// The child is killed if `timeout` elapses or the future is dropped.
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<ProcessResult, ProcessError>;

    /// Spawn with piped output for incremental consumption
    fn spawn_streaming(&self, spec: &CommandSpec) -> Result<StreamingProcess, ProcessError> {
        StreamingProcess::spawn(spec)
    }
}

/// `ProcessRunner` backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<ProcessResult, ProcessError> {
        debug!("Running process: {}", spec);

        let child = spec.command().spawn().map_err(|source| ProcessError::Spawn {
            command: spec.program.clone(),
            source,
        })?;

        // On timeout the wait future is dropped with the child, which kills it
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ProcessResult {
                exit_code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            }),
            Ok(Err(source)) => Err(ProcessError::Io {
                command: spec.program.clone(),
                source,
            }),
            Err(_) => {
                warn!("Process '{}' timed out after {:?}, killed", spec.program, timeout);
                Err(ProcessError::Timeout {
                    command: spec.program.clone(),
                    timeout,
                })
            }
        }
    }
}

/// A running process whose output is consumed while it runs.
///
/// Owns the child exclusively; dropping the handle kills the process.
pub struct StreamingProcess {
    command: String,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl StreamingProcess {
    pub fn spawn(spec: &CommandSpec) -> Result<Self, ProcessError> {
        let mut child = spec.command().spawn().map_err(|source| ProcessError::Spawn {
            command: spec.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        debug!("Spawned streaming process '{}' pid={:?}", spec.program, child.id());

        Ok(Self {
            command: spec.program.clone(),
            child,
            stdout,
            stderr,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Lazy sequence of stdout chunks; available once
    pub fn take_stdout(&mut self, chunk_size: usize) -> Option<ReaderStream<ChildStdout>> {
        self.stdout
            .take()
            .map(|stdout| ReaderStream::with_capacity(stdout, chunk_size))
    }

    /// Raw stderr pipe; available once
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Resolves when the process exits
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Request termination without waiting
    pub fn kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            // Already exited
            debug!("start_kill on '{}' failed: {}", self.command, e);
        }
    }
}

impl fmt::Debug for StreamingProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingProcess")
            .field("command", &self.command)
            .field("pid", &self.child.id())
            .finish()
    }
}

impl Drop for StreamingProcess {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            debug!("Killing '{}' pid={:?} on drop", self.command, self.child.id());
            self.kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn test_run_captures_output_and_exit_code() {
        let runner = TokioProcessRunner::new();
        let result = runner
            .run(&sh("echo out; echo err >&2; exit 3"), Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.stdout_text(), "out\n");
        assert_eq!(result.stderr_tail(5), "err");
    }

    #[tokio::test]
    async fn test_run_times_out() {
        let runner = TokioProcessRunner::new();
        let started = std::time::Instant::now();
        let err = runner
            .run(&sh("sleep 5"), Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let runner = TokioProcessRunner::new();
        let err = runner
            .run(
                &CommandSpec::new("definitely-not-a-real-tool-7c1f", vec![]),
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_args_are_not_shell_interpreted() {
        let runner = TokioProcessRunner::new();
        let spec = CommandSpec::new("echo", vec!["$HOME; echo injected".to_string()]);
        let result = runner.run(&spec, Duration::from_secs(5)).await.unwrap();
        assert_eq!(result.stdout_text(), "$HOME; echo injected\n");
    }

    #[tokio::test]
    async fn test_streaming_process_yields_stdout_and_exit() {
        let mut process = StreamingProcess::spawn(&sh("printf abc; printf def")).unwrap();
        let mut stdout = process.take_stdout(4096).unwrap();

        let mut collected = Vec::new();
        while let Some(chunk) = stdout.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, b"abcdef");

        let status = process.wait().await.unwrap();
        assert!(status.success());
    }
}
