//! SSH command runner built on the system `ssh` client

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::ProvisionError;
use crate::models::host::{Credential, HostTarget};
use crate::remote::runner::{CommandRunner, ExitResult, RemoteFile};
use crate::utils::shell_quote;

/// Exit status `ssh` reserves for its own failures
const SSH_TRANSPORT_FAILURE: i32 = 255;

/// SSH runner options
#[derive(Debug, Clone)]
pub struct SshOptions {
    /// Timeout for establishing the connection
    pub connect_timeout: Duration,

    /// Maximum wait for any single remote command
    pub command_timeout: Duration,

    /// Path of the local `ssh` binary
    pub ssh_binary: String,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            command_timeout: Duration::from_secs(900),
            ssh_binary: "ssh".to_string(),
        }
    }
}

/// Runs commands on one host through non-interactive `ssh` sessions
#[derive(Debug, Clone)]
pub struct SshRunner {
    target: HostTarget,
    options: SshOptions,
}

impl SshRunner {
    pub fn new(target: HostTarget, options: SshOptions) -> Self {
        Self { target, options }
    }

    /// Create a runner and verify the host accepts a session
    pub async fn connect(target: HostTarget, options: SshOptions) -> Result<Self, ProvisionError> {
        let runner = Self::new(target, options);
        info!("Connecting to {}", runner.target);
        let probe = runner.exec("true", None).await?;
        if !probe.success() {
            return Err(ProvisionError::ConnectionError(format!(
                "{} rejected the session: {}",
                runner.target,
                probe.summary()
            )));
        }
        info!("Connected to {}", runner.target);
        Ok(runner)
    }

    /// Arguments passed to `ssh` before the remote command
    pub fn ssh_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.options.connect_timeout.as_secs().max(1)),
            "-p".to_string(),
            self.target.port.to_string(),
        ];
        if let Credential::IdentityFile { path } = &self.target.credential {
            args.push("-i".to_string());
            args.push(path.display().to_string());
            args.push("-o".to_string());
            args.push("IdentitiesOnly=yes".to_string());
        }
        args.push(self.target.destination());
        args
    }

    async fn exec(&self, command: &str, stdin: Option<&[u8]>) -> Result<ExitResult, ProvisionError> {
        let mut child = Command::new(&self.options.ssh_binary)
            .args(self.ssh_args())
            .arg("--")
            .arg(command)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ProvisionError::ConnectionError(format!(
                    "Failed to run {}: {}",
                    self.options.ssh_binary, e
                ))
            })?;

        // Feeding stdin and collecting output share one deadline.
        let pipe = child.stdin.take();
        let feed = async move {
            match (stdin, pipe) {
                (Some(bytes), Some(mut pipe)) => {
                    let written = match pipe.write_all(bytes).await {
                        Ok(()) => pipe.shutdown().await,
                        Err(e) => Err(e),
                    };
                    written.err()
                }
                _ => None,
            }
        };
        let (write_error, output) = tokio::time::timeout(
            self.options.command_timeout,
            async move { tokio::join!(feed, child.wait_with_output()) },
        )
        .await
        .map_err(|_| ProvisionError::TimeoutError {
            command: command.to_string(),
            secs: self.options.command_timeout.as_secs(),
        })?;
        let output = output?;

        let result = with_write_error(
            ExitResult {
                status: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            },
            write_error,
        );

        if result.status == SSH_TRANSPORT_FAILURE {
            return Err(ProvisionError::ConnectionError(format!(
                "{}: {}",
                self.target,
                result.stderr.trim()
            )));
        }

        Ok(result)
    }
}

/// Fold a failed stdin write into the command result.
///
/// The remote stderr stays last so the summary shows why the remote side
/// stopped reading.
fn with_write_error(result: ExitResult, write_error: Option<std::io::Error>) -> ExitResult {
    let Some(e) = write_error else {
        return result;
    };
    ExitResult {
        status: if result.success() { -1 } else { result.status },
        stdout: result.stdout,
        stderr: format!("stdin closed early: {}\n{}", e, result.stderr),
    }
}

/// Remote command that atomically replaces `target` with stdin
pub fn upload_command(target: &RemoteFile) -> String {
    let path = shell_quote(&target.path);
    let tmp = shell_quote(&format!("{}.tmp", target.path));
    let script = format!(
        "umask 077 && cat > {tmp} && chmod {mode:o} {tmp} && mv -f {tmp} {path}",
        tmp = tmp,
        mode = target.mode,
        path = path
    );
    let sudo = if target.elevated { "sudo " } else { "" };
    format!("{}sh -c {}", sudo, shell_quote(&script))
}

#[async_trait]
impl CommandRunner for SshRunner {
    async fn run(&self, command: &str) -> Result<ExitResult, ProvisionError> {
        debug!("[{}] $ {}", self.target, command);
        let result = self.exec(command, None).await?;
        debug!("[{}] exit {}", self.target, result.status);
        Ok(result)
    }

    async fn upload(&self, contents: &[u8], target: &RemoteFile) -> Result<ExitResult, ProvisionError> {
        debug!(
            "[{}] upload {} bytes -> {} ({:o})",
            self.target,
            contents.len(),
            target.path,
            target.mode
        );
        self.exec(&upload_command(target), Some(contents)).await
    }

    fn describe(&self) -> String {
        self.target.to_string()
    }
}
