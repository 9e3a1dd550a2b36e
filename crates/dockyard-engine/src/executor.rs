use std::process::{ExitStatus, Stdio};

use tokio::process::Command;

use crate::docker::DockerError;

/// Seam between the client and the docker CLI.
///
/// [`RealExecutor`] spawns `docker`; tests substitute mockall mocks.
#[allow(async_fn_in_trait)]
pub trait DockerExecutor: Send + Sync {
    /// Run a command and return its stdout. Stderr is kept for the error.
    async fn exec(&self, args: &[String]) -> Result<String, DockerError>;

    /// Run a command with stdout and stderr attached to the terminal, for
    /// long-running output such as builds and `logs --follow`.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError>;
}

/// Executes the `docker` binary found on `PATH`.
pub struct RealExecutor;

impl RealExecutor {
    fn command(args: &[String]) -> Command {
        let mut cmd = Command::new("docker");
        // An interrupted verify must not leave a build or run behind.
        cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }
}

fn failure(args: &[String], status: ExitStatus, stderr: String) -> DockerError {
    DockerError::CommandFailed {
        args: args.to_vec(),
        code: status.code(),
        stderr,
    }
}

impl DockerExecutor for RealExecutor {
    async fn exec(&self, args: &[String]) -> Result<String, DockerError> {
        tracing::debug!(?args, "docker");
        let output = Self::command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(failure(args, output.status, stderr));
        }
        String::from_utf8(output.stdout).map_err(|e| DockerError::InvalidUtf8 { source: e })
    }

    async fn exec_streaming(&self, args: &[String]) -> Result<(), DockerError> {
        tracing::debug!(?args, "docker (streaming)");
        let status = Self::command(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| DockerError::NotFound { source: e })?;

        if status.success() {
            Ok(())
        } else {
            // Stderr already went to the terminal.
            Err(failure(args, status, String::new()))
        }
    }
}
