//! Running external CLI tools with a timeout.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

/// Environment variables kept when the environment is scrubbed.
const KEPT_ENV: &[&str] = &["PATH", "HOME"];

/// How to launch a tool.
#[derive(Debug, Clone)]
pub(crate) struct ToolRun<'a> {
    pub program: &'a Path,
    pub args: Vec<String>,
    pub timeout: Duration,
    /// Start from an empty environment plus [`KEPT_ENV`].
    pub scrub_env: bool,
}

impl ToolRun<'_> {
    /// `program subcommand`, used to name the run in errors.
    fn label(&self) -> String {
        match self.args.first() {
            Some(sub) => format!("{} {}", self.program.display(), sub),
            None => self.program.display().to_string(),
        }
    }

    /// Run to completion and return stdout. A nonzero exit is an error
    /// carrying stderr.
    pub async fn stdout(&self) -> ServiceResult<String> {
        let label = self.label();
        let mut command = Command::new(self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if self.scrub_env {
            command.env_clear();
            for key in KEPT_ENV {
                if let Some(value) = std::env::var_os(key) {
                    command.env(key, value);
                }
            }
        }

        let child = command.spawn().map_err(|e| ServiceError::Command {
            command: label.clone(),
            detail: e.to_string(),
        })?;
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ServiceError::Timeout {
                command: label.clone(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ServiceError::Command {
                command: label.clone(),
                detail: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        debug!(command = %label, status = %output.status, stdout = %stdout.trim(), "tool finished");

        if !output.status.success() {
            return Err(ServiceError::Command {
                command: label,
                detail: format!("{}: {}", output.status, stderr.trim()),
            });
        }
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_command_error() {
        let run = ToolRun {
            program: Path::new("/nonexistent/build-aggregator-tool"),
            args: vec!["sub".to_string()],
            timeout: Duration::from_secs(5),
            scrub_env: false,
        };
        let err = run.stdout().await.unwrap_err();
        match err {
            ServiceError::Command { command, .. } => {
                assert_eq!(command, "/nonexistent/build-aggregator-tool sub");
            }
            other => panic!("expected command error, got {other:?}"),
        }
    }
}
