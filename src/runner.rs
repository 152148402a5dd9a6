//! External program execution
//!
//! Runs the uploaded push_swap and checker binaries directly (no sandbox)
//! with piped stdio and a wall-clock timeout.

use std::fs::Permissions;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// How an external program finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Exited(i32),
    TimeLimitExceeded,
}

/// Captured result of one program invocation.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutcome {
    fn timed_out() -> Self {
        Self {
            status: RunStatus::TimeLimitExceeded,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Common interface for invoking an uploaded executable.
#[async_trait]
pub trait ProgramRunner: Send + Sync {
    /// Run `program` with `args`, optionally piping `stdin_content` to it,
    /// and capture its output. A timeout is reported through
    /// [`RunStatus::TimeLimitExceeded`]; spawn failures are errors.
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        stdin_content: Option<&str>,
    ) -> Result<RunOutcome>;
}

/// Runner that executes programs directly on the host.
pub struct HostRunner {
    timeout: Duration,
}

impl HostRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProgramRunner for HostRunner {
    async fn run(
        &self,
        program: &Path,
        args: &[String],
        stdin_content: Option<&str>,
    ) -> Result<RunOutcome> {
        debug!("Running program: {:?} with args: {:?}", program, args);

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn {}", program.display()))?;

        // The stdin write sits inside the timed section: a child that never
        // drains its pipe must still hit the timeout.
        let wait = async {
            if let Some(input) = stdin_content {
                if let Some(mut stdin) = child.stdin.take() {
                    // A child may exit without reading stdin; its exit
                    // status tells the story then.
                    let _ = stdin.write_all(input.as_bytes()).await;
                }
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(self.timeout, wait).await {
            Ok(output) => output.context("Failed to wait for program")?,
            // kill_on_drop reaps the hung child
            Err(_) => return Ok(RunOutcome::timed_out()),
        };

        let exit_code = output.status.code().unwrap_or(-1);
        Ok(RunOutcome {
            status: RunStatus::Exited(exit_code),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Per-request scratch directory holding the uploaded binaries.
///
/// The directory and everything in it are removed on drop.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("Failed to create workspace directory")?,
        })
    }

    /// Write an uploaded binary into the workspace and mark it executable.
    pub async fn install_binary(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write uploaded binary {}", name))?;
        fs::set_permissions(&path, Permissions::from_mode(0o755))
            .await
            .with_context(|| format!("Failed to mark {} executable", name))?;
        Ok(path)
    }
}
