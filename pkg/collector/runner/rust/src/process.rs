// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use tokio::process::Child;
use tokio::time;

use crate::capture::{Captured, DEFAULT_CAPTURE_LIMIT, OutputCapture};
use crate::command::Command;

/// How long a timed-out child gets to exit after SIGTERM before SIGKILL.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationCause {
    /// Terminated on its own; exit code is set.
    Exited,
    /// Exceeded the configured timeout and was terminated by the runner.
    TimedOut,
    /// Terminated by a signal it did not ask for (no exit code).
    Killed,
    /// The executable could not be found or spawned.
    LaunchFailed,
}

impl fmt::Display for TerminationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationCause::Exited => write!(f, "exited"),
            TerminationCause::TimedOut => write!(f, "timed out"),
            TerminationCause::Killed => write!(f, "killed"),
            TerminationCause::LaunchFailed => write!(f, "launch failed"),
        }
    }
}

/// Outcome of one [`Command`] execution. Exactly one termination cause;
/// `TimedOut` and `LaunchFailed` never carry an exit code.
#[derive(Debug)]
pub struct ProcessResult {
    pub cause: TerminationCause,
    pub exit_code: Option<i32>,
    pub stdout: Captured,
    pub stderr: Captured,
    pub elapsed: Duration,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.cause == TerminationCause::Exited && self.exit_code == Some(0)
    }

    fn launch_failed(elapsed: Duration) -> Self {
        Self {
            cause: TerminationCause::LaunchFailed,
            exit_code: None,
            stdout: Captured::default(),
            stderr: Captured::default(),
            elapsed,
        }
    }
}

/// Runs external commands with bounded execution and bounded capture.
///
/// Every subprocess outcome, including launch failure and timeout, is encoded
/// in the returned [`ProcessResult`]; `run` errors only for a malformed
/// [`Command`]. One OS process is spawned per call and always reaped before
/// the call returns.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    capture_limit: usize,
    kill_grace: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self {
            capture_limit: DEFAULT_CAPTURE_LIMIT,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Per-stream capture limit in bytes.
    pub fn with_capture_limit(mut self, limit: usize) -> Self {
        self.capture_limit = limit;
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub async fn run(&self, command: &Command) -> Result<ProcessResult> {
        if command.get_program().is_empty() {
            bail!("command has an empty program name");
        }

        let mut cmd = tokio::process::Command::new(command.get_program());
        cmd.args(command.get_args())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in command.get_envs() {
            cmd.env(key, value);
        }
        if let Some(dir) = command.get_working_dir() {
            cmd.current_dir(dir);
        }

        let start = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("failed to spawn {}: {e}", command.get_program());
                return Ok(ProcessResult::launch_failed(start.elapsed()));
            }
        };

        // Start draining both pipes before waiting: a child writing more than
        // the OS pipe buffer would otherwise deadlock against our wait.
        let stdout = child.stdout.take().context("child stdout pipe missing")?;
        let stderr = child.stderr.take().context("child stderr pipe missing")?;
        let capture = OutputCapture::start(stdout, stderr, self.capture_limit);

        let (cause, exit_code) = match command.get_timeout() {
            Some(limit) => match time::timeout(limit, child.wait()).await {
                Ok(status) => split_status(status.context("waiting for child")?),
                Err(_) => {
                    debug!(
                        "{} still running after {}ms, terminating",
                        command.get_program(),
                        limit.as_millis()
                    );
                    self.terminate(&mut child).await;
                    (TerminationCause::TimedOut, None)
                }
            },
            None => split_status(child.wait().await.context("waiting for child")?),
        };

        let (stdout, stderr) = capture.finalize().await;
        Ok(ProcessResult {
            cause,
            exit_code,
            stdout,
            stderr,
            elapsed: start.elapsed(),
        })
    }

    /// SIGTERM, bounded grace, then SIGKILL. Always reaps the child.
    async fn terminate(&self, child: &mut Child) {
        send_term(child);
        if time::timeout(self.kill_grace, child.wait()).await.is_err() {
            warn!(
                "child did not exit within grace period ({}s), sending SIGKILL",
                self.kill_grace.as_secs()
            );
            if let Err(e) = child.start_kill() {
                warn!("failed to kill child: {e}");
            }
            let _ = child.wait().await;
        }
    }
}

fn split_status(status: std::process::ExitStatus) -> (TerminationCause, Option<i32>) {
    match status.code() {
        Some(code) => (TerminationCause::Exited, Some(code)),
        None => (TerminationCause::Killed, None),
    }
}

#[cfg(unix)]
fn send_term(child: &Child) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id()
        && let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
    {
        warn!("failed to send SIGTERM: {e}");
    }
}

#[cfg(not(unix))]
fn send_term(_child: &Child) {
    // No SIGTERM equivalent; the SIGKILL escalation does the termination.
}
