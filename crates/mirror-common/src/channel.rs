//! Management-channel command execution.
//!
//! The reconciler and topology client talk to the switch database through
//! `ovs-vsctl` and `ovs-ofctl` invocations. This module provides the
//! [`ManagementChannel`] trait they program against and the production
//! [`ShellChannel`] implementation, plus [`shellquote`] for safe
//! interpolation of interface and bridge names into commands.
//!
//! # Example
//!
//! ```ignore
//! use mirror_common::{ManagementChannel, ShellChannel};
//!
//! let channel = ShellChannel::new(std::time::Duration::from_secs(10));
//! let ifaces = channel.run("ovs-vsctl list-ifaces vmbr0").await?;
//! ```

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::{MirrorError, MirrorResult};

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// Wraps the string in double quotes and escapes the characters that keep
/// special meaning inside them (`$`, backtick, `"`, `\`, newline). Interface
/// names come from switch query output, so they are never trusted verbatim.
///
/// # Example
///
/// ```
/// use mirror_common::shellquote;
///
/// assert_eq!(shellquote("eth1"), "\"eth1\"");
/// assert_eq!(shellquote("tap$0"), "\"tap\\$0\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// Result of one command round trip.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// Trimmed stdout output.
    pub stdout: String,
    /// Trimmed stderr output.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// One logical connection to the switch management plane.
///
/// Implementations must serialize commands internally: callers invoke
/// [`run`](ManagementChannel::run) from concurrent tasks and expect one
/// acquire/release per round trip, never interleaved output.
#[async_trait]
pub trait ManagementChannel: Send + Sync {
    /// Executes one command and returns its trimmed stdout.
    ///
    /// A non-zero exit status, a transport failure, or a timeout maps to
    /// [`MirrorError::Channel`].
    async fn run(&self, cmd: &str) -> MirrorResult<String>;
}

/// Production channel: runs commands through `/bin/sh -c` on the host that
/// owns the switch database.
pub struct ShellChannel {
    /// Serializes round trips on this connection.
    lock: Mutex<()>,
    /// Bound on one command round trip; expiry is a channel error.
    command_timeout: Duration,
}

impl ShellChannel {
    /// Creates a channel with the given per-command timeout.
    pub fn new(command_timeout: Duration) -> Self {
        Self {
            lock: Mutex::new(()),
            command_timeout,
        }
    }

    /// Executes a command and returns the full result, without interpreting
    /// the exit status.
    async fn exec(&self, cmd: &str) -> MirrorResult<ExecResult> {
        tracing::debug!(command = %cmd, "Executing channel command");

        // kill_on_drop: a timed-out command must not outlive its round trip,
        // or it would run concurrently with the next command on this channel
        // and could apply a stale mutation after a newer one.
        let output = Command::new("/bin/sh")
            .arg("-c")
            .arg(cmd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.command_timeout, output).await {
            Ok(result) => result.map_err(|e| MirrorError::ChannelSpawn {
                command: cmd.to_string(),
                source: e,
            })?,
            Err(_) => {
                return Err(MirrorError::channel(
                    cmd,
                    format!("timed out after {:?}", self.command_timeout),
                ));
            }
        };

        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        let result = ExecResult {
            exit_code,
            stdout,
            stderr,
        };

        if result.success() {
            tracing::trace!(command = %cmd, "Command succeeded");
        } else {
            tracing::warn!(
                command = %cmd,
                exit_code = exit_code,
                stderr = %result.stderr,
                "Command failed"
            );
        }

        Ok(result)
    }
}

#[async_trait]
impl ManagementChannel for ShellChannel {
    async fn run(&self, cmd: &str) -> MirrorResult<String> {
        // One acquire/release per round trip; see trait contract.
        let _guard = self.lock.lock().await;

        let result = self.exec(cmd).await?;
        if result.success() {
            Ok(result.stdout)
        } else {
            Err(MirrorError::channel(
                cmd,
                format!(
                    "exit code {}: {}",
                    result.exit_code,
                    result.combined_output()
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_channel() -> ShellChannel {
        ShellChannel::new(Duration::from_secs(5))
    }

    #[test]
    fn test_shellquote_simple() {
        assert_eq!(shellquote("simple"), "\"simple\"");
        assert_eq!(shellquote("vmbr0"), "\"vmbr0\"");
        assert_eq!(shellquote("tap114i1"), "\"tap114i1\"");
    }

    #[test]
    fn test_shellquote_special_chars() {
        assert_eq!(shellquote("$HOME"), "\"\\$HOME\"");
        assert_eq!(shellquote("`whoami`"), "\"\\`whoami\\`\"");
        assert_eq!(shellquote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(shellquote("path\\to"), "\"path\\\\to\"");
        assert_eq!(shellquote("line1\nline2"), "\"line1\\\nline2\"");
    }

    #[test]
    fn test_shellquote_empty() {
        assert_eq!(shellquote(""), "\"\"");
    }

    #[test]
    fn test_exec_result_success() {
        let result = ExecResult {
            exit_code: 0,
            stdout: "output".to_string(),
            stderr: "".to_string(),
        };
        assert!(result.success());
        assert_eq!(result.combined_output(), "output");
    }

    #[test]
    fn test_exec_result_combined() {
        let result = ExecResult {
            exit_code: 1,
            stdout: "stdout".to_string(),
            stderr: "stderr".to_string(),
        };
        assert!(!result.success());
        assert_eq!(result.combined_output(), "stdout\nstderr");
    }

    #[tokio::test]
    async fn test_run_echo() {
        let output = test_channel().run("echo hello").await.unwrap();
        assert_eq!(output, "hello");
    }

    #[tokio::test]
    async fn test_run_nonzero_exit() {
        let result = test_channel().run("exit 42").await;
        match result {
            Err(MirrorError::Channel { message, .. }) => {
                assert!(message.contains("exit code 42"));
            }
            other => panic!("Expected Channel error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let channel = ShellChannel::new(Duration::from_millis(50));
        let result = channel.run("sleep 5").await;
        match result {
            Err(MirrorError::Channel { message, .. }) => {
                assert!(message.contains("timed out"));
            }
            other => panic!("Expected Channel error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_timeout_terminates_inflight_command() {
        // A timed-out command must be killed, not left running: otherwise it
        // could still mutate the switch after the channel has moved on.
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("applied");

        let channel = ShellChannel::new(Duration::from_millis(50));
        let cmd = format!("sleep 0.3 && touch {}", marker.display());
        let result = channel.run(&cmd).await;
        assert!(result.unwrap_err().is_channel());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_run_serializes_commands() {
        use std::sync::Arc;

        let channel = Arc::new(test_channel());
        let mut handles = Vec::new();
        for i in 0..4 {
            let channel = channel.clone();
            handles.push(tokio::spawn(async move {
                channel.run(&format!("echo {}", i)).await
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().unwrap(), i.to_string());
        }
    }
}
