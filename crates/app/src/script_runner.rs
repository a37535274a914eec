//! Script runner — supervises one execution of a script.
//!
//! The child process is spawned, awaited and signalled inside a dedicated
//! tokio task. The [`ScriptRunner`] handle only observes it: state, captured
//! output and timestamps are shared behind a mutex and can be read while the
//! script is still running.
//!
//! Aborting is cooperative: on Unix the child receives `SIGTERM` and may run
//! its cleanup handlers, or ignore the request entirely.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Notify;

use scripthub_domain::error::{ConflictError, ScriptHubError};
use scripthub_domain::time::{Timestamp, now};

use crate::ports::ScriptCommand;

/// How often [`ScriptRunner::abort`] checks whether the child is gone.
pub const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How many checks [`ScriptRunner::abort`] performs before giving up.
pub const ABORT_POLL_ATTEMPTS: u32 = 10;
/// How long captured pipes may stay open after the child exited.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Lifecycle of a supervised script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    /// Exited with this code; on Unix a signal `n` is reported as `-n`.
    Finished(i32),
    /// Could not be started or awaited.
    LaunchFailed,
}

impl RunState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Finished(_) => "finished",
            Self::LaunchFailed => "launch_failed",
        }
    }
}

#[derive(Debug)]
struct Progress {
    state: RunState,
    output: Vec<String>,
    finished_at: Option<Timestamp>,
}

/// Handle on one script execution.
#[derive(Debug)]
pub struct ScriptRunner {
    script: String,
    started_at: Timestamp,
    progress: Mutex<Progress>,
    abort_requested: Notify,
}

impl ScriptRunner {
    /// Launch `command` in the background and return the handle observing it.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(script: impl Into<String>, command: ScriptCommand) -> Arc<Self> {
        let runner = Arc::new(Self {
            script: script.into(),
            started_at: now(),
            progress: Mutex::new(Progress {
                state: RunState::Running,
                output: Vec::new(),
                finished_at: None,
            }),
            abort_requested: Notify::new(),
        });
        tokio::spawn(Arc::clone(&runner).supervise(command));
        runner
    }

    #[must_use]
    pub fn script(&self) -> &str {
        &self.script
    }

    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<Timestamp> {
        self.progress().finished_at
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.progress().state
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Exit code once finished; `None` while running or after a failed launch.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        match self.state() {
            RunState::Finished(code) => Some(code),
            RunState::Running | RunState::LaunchFailed => None,
        }
    }

    /// Every line captured so far, stdout and stderr interleaved as received.
    #[must_use]
    pub fn output(&self) -> Vec<String> {
        self.progress().output.clone()
    }

    /// Lines captured after the first `offset` ones.
    #[must_use]
    pub fn output_since(&self, offset: usize) -> Vec<String> {
        self.progress()
            .output
            .get(offset..)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn output_len(&self) -> usize {
        self.progress().output.len()
    }

    /// Ask the child to terminate and wait a bounded time for it to go away.
    ///
    /// Returns whether the child is gone. Callers should re-check
    /// [`is_alive`](Self::is_alive) when this returns `false`.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::NotRunning`] when the script is not running.
    #[tracing::instrument(skip(self), fields(script = %self.script))]
    pub async fn abort(&self) -> Result<bool, ScriptHubError> {
        if !self.is_alive() {
            return Err(ConflictError::NotRunning.into());
        }
        self.abort_requested.notify_one();
        for _ in 0..ABORT_POLL_ATTEMPTS {
            if !self.is_alive() {
                return Ok(true);
            }
            tokio::time::sleep(ABORT_POLL_INTERVAL).await;
        }
        let gone = !self.is_alive();
        if !gone {
            tracing::warn!("script still running after abort");
        }
        Ok(gone)
    }

    fn progress(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, state: RunState) {
        let mut progress = self.progress();
        progress.state = state;
        progress.finished_at = Some(now());
    }

    async fn supervise(self: Arc<Self>, command: ScriptCommand) {
        let mut child = match build_command(&command).spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::error!(
                    script = %self.script,
                    program = %command.program,
                    error = %err,
                    "failed to launch script"
                );
                self.finish(RunState::LaunchFailed);
                return;
            }
        };
        tracing::info!(script = %self.script, pid = ?child.id(), "script started");

        let readers = [
            child
                .stdout
                .take()
                .map(|pipe| tokio::spawn(Arc::clone(&self).capture(pipe))),
            child
                .stderr
                .take()
                .map(|pipe| tokio::spawn(Arc::clone(&self).capture(pipe))),
        ];

        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                () = self.abort_requested.notified() => self.terminate(&mut child),
            }
        };

        let deadline = tokio::time::Instant::now() + DRAIN_GRACE;
        for reader in readers.into_iter().flatten() {
            if tokio::time::timeout_at(deadline, reader).await.is_err() {
                tracing::debug!(script = %self.script, "output pipe still open after exit");
            }
        }

        match status {
            Ok(status) => {
                let code = exit_code(status);
                tracing::info!(script = %self.script, exit_code = code, "script finished");
                self.finish(RunState::Finished(code));
            }
            Err(err) => {
                tracing::error!(script = %self.script, error = %err, "failed to wait for script");
                self.finish(RunState::LaunchFailed);
            }
        }
    }

    /// Send a termination request, falling back to a kill where signals are
    /// unavailable.
    fn terminate(&self, child: &mut Child) {
        tracing::info!(script = %self.script, pid = ?child.id(), "terminating script");

        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
                match kill(Pid::from_raw(pid), Signal::SIGTERM) {
                    Ok(()) => return,
                    Err(err) => {
                        tracing::warn!(
                            script = %self.script,
                            error = %err,
                            "failed to send SIGTERM"
                        );
                    }
                }
            }
        }

        if let Err(err) = child.start_kill() {
            tracing::warn!(script = %self.script, error = %err, "failed to kill script");
        }
    }

    async fn capture<R>(self: Arc<Self>, pipe: R)
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(pipe);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&line);
                    self.progress()
                        .output
                        .push(text.trim_end_matches(['\r', '\n']).to_string());
                }
                Err(err) => {
                    tracing::warn!(
                        script = %self.script,
                        error = %err,
                        "failed to read script output"
                    );
                    break;
                }
            }
        }
    }
}

fn build_command(command: &ScriptCommand) -> Command {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .env("PYTHONIOENCODING", "utf-8")
        .env("PYTHONUNBUFFERED", "1")
        .current_dir(&command.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(-1)
}
