use std::process::{ExitStatus, Stdio};

use crate::command::CommandLine;
use crate::error::ExecError;

/// Abstraction over external command execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor: Send + Sync {
    /// Run a command and capture its combined output (stdout, then stderr).
    async fn exec(&self, cmd: &CommandLine) -> Result<Vec<u8>, ExecError>;

    /// Run a command, streaming its output to the terminal.
    async fn exec_streaming(&self, cmd: &CommandLine) -> Result<(), ExecError>;

    /// Run a command with data piped to stdin and capture its combined output.
    async fn exec_with_stdin(
        &self,
        cmd: &CommandLine,
        stdin_data: &[u8],
    ) -> Result<Vec<u8>, ExecError>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    async fn exec(&self, cmd: &CommandLine) -> Result<Vec<u8>, ExecError> {
        (**self).exec(cmd).await
    }

    async fn exec_streaming(&self, cmd: &CommandLine) -> Result<(), ExecError> {
        (**self).exec_streaming(cmd).await
    }

    async fn exec_with_stdin(
        &self,
        cmd: &CommandLine,
        stdin_data: &[u8],
    ) -> Result<Vec<u8>, ExecError> {
        (**self).exec_with_stdin(cmd, stdin_data).await
    }
}

/// Executor that spawns real processes.
pub struct RealExecutor;

impl CommandExecutor for RealExecutor {
    async fn exec(&self, cmd: &CommandLine) -> Result<Vec<u8>, ExecError> {
        tracing::debug!(command = %cmd, "exec");

        let output = cmd
            .to_tokio()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| spawn_error(cmd, e))?;

        combined(cmd, output.status, output.stdout, &output.stderr)
    }

    async fn exec_streaming(&self, cmd: &CommandLine) -> Result<(), ExecError> {
        tracing::debug!(command = %cmd, "exec (streaming)");

        let mut child = cmd
            .to_tokio()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(cmd, e))?;

        // Both pipes are drained concurrently so a chatty child never blocks
        // on a full buffer; ordering between the two is not preserved.
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let drain_out = tokio::spawn(async move {
            match stdout {
                Some(mut src) => tokio::io::copy(&mut src, &mut tokio::io::stdout())
                    .await
                    .map(|_| ()),
                None => Ok(()),
            }
        });
        let drain_err = tokio::spawn(async move {
            match stderr {
                Some(mut src) => tokio::io::copy(&mut src, &mut tokio::io::stderr())
                    .await
                    .map(|_| ()),
                None => Ok(()),
            }
        });

        let status = child.wait().await.map_err(|e| io_error(cmd, e))?;

        for drain in [drain_out, drain_err] {
            drain
                .await
                .map_err(|e| io_error(cmd, std::io::Error::other(e)))?
                .map_err(|e| io_error(cmd, e))?;
        }

        if status.success() {
            Ok(())
        } else {
            Err(ExecError::CommandFailed {
                command: cmd.to_string(),
                output: format!("exit status: {status}"),
            })
        }
    }

    async fn exec_with_stdin(
        &self,
        cmd: &CommandLine,
        stdin_data: &[u8],
    ) -> Result<Vec<u8>, ExecError> {
        use tokio::io::AsyncWriteExt;

        tracing::debug!(command = %cmd, stdin_bytes = stdin_data.len(), "exec (stdin)");

        let mut child = cmd
            .to_tokio()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(cmd, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            let stdin_error = |e| ExecError::StdinWrite {
                command: cmd.to_string(),
                source: e,
            };
            stdin.write_all(stdin_data).await.map_err(stdin_error)?;
            stdin.shutdown().await.map_err(stdin_error)?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| io_error(cmd, e))?;

        combined(cmd, output.status, output.stdout, &output.stderr)
    }
}

fn combined(
    cmd: &CommandLine,
    status: ExitStatus,
    mut stdout: Vec<u8>,
    stderr: &[u8],
) -> Result<Vec<u8>, ExecError> {
    stdout.extend_from_slice(stderr);
    if status.success() {
        Ok(stdout)
    } else {
        Err(ExecError::CommandFailed {
            command: cmd.to_string(),
            output: String::from_utf8_lossy(&stdout).trim_end().to_owned(),
        })
    }
}

fn spawn_error(cmd: &CommandLine, e: std::io::Error) -> ExecError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ExecError::NotFound {
            program: cmd.program.clone(),
            source: e,
        }
    } else {
        io_error(cmd, e)
    }
}

fn io_error(cmd: &CommandLine, e: std::io::Error) -> ExecError {
    ExecError::Io {
        command: cmd.to_string(),
        source: e,
    }
}
