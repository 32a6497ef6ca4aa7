//! Command runner abstraction for the target host.
//!
//! `CommandRunner` is the seam between the orchestrator and the remote shell.
//! `SshRunner` is the production implementation; `MockRunner` is the scripted
//! test double. A non-zero exit status is returned as data, not as an error:
//! only a lost connection or an expired wait is an `Err`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProvisionError;

/// Exit status and captured output of one remote command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitResult {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExitResult {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Short human summary, preferring stderr
    pub fn summary(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        let last = text.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        if last.is_empty() {
            format!("exit status {}", self.status)
        } else {
            format!("exit status {}: {}", self.status, last.trim())
        }
    }
}

/// Destination of an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub path: String,

    /// Unix permission bits
    pub mode: u32,

    /// Write with elevated privileges
    pub elevated: bool,
}

impl RemoteFile {
    pub fn new(path: impl Into<String>, mode: u32) -> Self {
        Self {
            path: path.into(),
            mode,
            elevated: false,
        }
    }

    pub fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }
}

/// Trait for executing commands and placing files on the target host
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a shell command line and wait for it to finish
    async fn run(&self, command: &str) -> Result<ExitResult, ProvisionError>;

    /// Write `contents` to `target`, replacing any previous file
    async fn upload(&self, contents: &[u8], target: &RemoteFile) -> Result<ExitResult, ProvisionError>;

    /// Human-readable name of the target, for logs and reports
    fn describe(&self) -> String;
}
