//! Bounded one-shot command execution.

use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was ended by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into an [`BridgeError::Execution`] carrying stderr.
    pub fn into_result(self, program: &Path) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let status = match self.code {
            Some(code) => format!("exit code {}", code),
            None => "a signal".to_string(),
        };
        Err(BridgeError::Execution {
            message: format!("Command failed: {} terminated with {}", program.display(), status),
            stderr: Some(self.stderr),
        })
    }
}

/// Runs short-lived commands.
///
/// Implementations return `Ok` for any command that ran to completion, whatever
/// its exit code, [`BridgeError::Timeout`] when the bound elapsed and
/// [`BridgeError::Execution`] when the command could not be started.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &Path, args: &[String], timeout: Duration)
        -> Result<CommandOutput>;
}

/// [`CommandRunner`] backed by real subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput> {
        debug!("Running {} {:?} (timeout {:?})", program.display(), args, timeout);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout must not leave the child behind.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::Execution {
                message: format!("Failed to run {}: {}", program.display(), e),
                stderr: None,
            })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Err(e)) => Err(BridgeError::Execution {
                message: format!("Failed to wait for {}: {}", program.display(), e),
                stderr: None,
            }),
            Err(_) => {
                debug!("{} exceeded {:?}", program.display(), timeout);
                Err(BridgeError::Timeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_into_result_success() {
        let output = CommandOutput {
            code: Some(0),
            stdout: "ok".into(),
            stderr: String::new(),
        };
        assert_eq!(output.clone().into_result(Path::new("adb")).unwrap(), output);
    }

    #[test]
    fn test_into_result_failure_keeps_stderr() {
        let output = CommandOutput {
            code: Some(1),
            stdout: String::new(),
            stderr: "error: device offline".into(),
        };
        let err = output.into_result(Path::new("adb")).unwrap_err();
        assert!(matches!(err, BridgeError::Execution { .. }));
        assert!(err.to_string().contains("exit code 1"));
        assert_eq!(err.stderr(), Some("error: device offline"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let output = SystemRunner
            .run(
                Path::new("sh"),
                &["-c".into(), "echo out; echo err >&2; exit 3".into()],
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_times_out() {
        let result = SystemRunner
            .run(Path::new("sleep"), &["5".into()], Duration::from_millis(50))
            .await;

        assert!(matches!(result, Err(BridgeError::Timeout(d)) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let missing = PathBuf::from("/nonexistent/adbview/adb");
        let result = SystemRunner
            .run(&missing, &[], Duration::from_secs(1))
            .await;

        assert!(matches!(result, Err(BridgeError::Execution { .. })));
    }
}
