use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use snapshotter_bench_core::prelude::{BenchError, ShutdownHandle, ShutdownSignalError};

use crate::shutdown::start_shutdown_listener;

/// An external command, run directly without an intermediate shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Short description used in logs and errors instead of the full command line.
    label: Option<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            label: None,
        }
    }

    /// Run `program` through `sudo` when `use_sudo` is set.
    pub fn privileged(use_sudo: bool, program: impl Into<String>) -> Self {
        if use_sudo {
            Self::new("sudo").arg(program)
        } else {
            Self::new(program)
        }
    }

    /// Run `script` with `sh -c`.
    pub fn script(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            return f.write_str(label);
        }
        f.write_str(&crate::script::shell_quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", crate::script::shell_quote(arg))?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn an unsuccessful exit into [`BenchError::ExternalCommand`].
    pub fn check(self, command: &ShellCommand) -> Result<Self, BenchError> {
        if self.success() {
            Ok(self)
        } else {
            Err(BenchError::ExternalCommand {
                command: command.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs external commands for the benchmark.
///
/// Calls block until the command has exited and its output has been captured. Commands are never
/// run concurrently.
pub trait CommandExecutor {
    fn execute(&self, command: &ShellCommand) -> Result<CommandOutput, BenchError>;

    /// Run `command` and fail with [`BenchError::ExternalCommand`] if it exits unsuccessfully.
    fn execute_checked(&self, command: &ShellCommand) -> Result<CommandOutput, BenchError> {
        self.execute(command)?.check(command)
    }
}

/// Runs commands as child processes.
///
/// Each command runs in its own process group and is bounded by an optional timeout, after which
/// the whole group is killed. A Ctrl-C cancels the running command the same way, and every command
/// after it.
#[derive(Debug)]
pub struct ProcessExecutor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
    timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .context("Failed to create Tokio runtime")?;
        let shutdown_handle = start_shutdown_listener(&runtime)?;

        Ok(Self {
            runtime,
            shutdown_handle,
            timeout,
        })
    }

    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown_handle
    }

    async fn run_child(&self, command: &ShellCommand) -> Result<CommandOutput, BenchError> {
        let spawn_error = |e: std::io::Error| BenchError::ExternalCommand {
            command: command.to_string(),
            code: None,
            stderr: e.to_string(),
        };

        let mut process = tokio::process::Command::new(&command.program);
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Its own group, so everything the command starts can be killed with it.
        #[cfg(unix)]
        process.process_group(0);

        let child = process.spawn().map_err(spawn_error)?;
        // Dropped without being disarmed on timeout or shutdown, which kills the group.
        let group = ProcessGroupGuard { pgid: child.id() };
        let output = child.wait_with_output();

        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, output).await.map_err(|_| {
                BenchError::CommandTimeout {
                    command: command.to_string(),
                    timeout,
                }
            })?,
            None => output.await,
        }
        .map_err(spawn_error)?;
        group.disarm();

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Kills the process group of a command that did not run to completion.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn disarm(mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        log::warn!("Process group {pgid} is out of range, cannot kill it");
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => log::debug!("Killed process group {pgid}"),
        Err(Errno::ESRCH) => {}
        // Processes started through `sudo` belong to root and cannot be signalled.
        Err(e) => log::warn!("Failed to kill process group {pgid}: {e}"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

impl CommandExecutor for ProcessExecutor {
    fn execute(&self, command: &ShellCommand) -> Result<CommandOutput, BenchError> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        if shutdown_listener.should_shutdown() {
            return Err(ShutdownSignalError::default().into());
        }

        log::debug!("Running command: {command}");
        let output = self.runtime.block_on(async {
            tokio::select! {
                result = self.run_child(command) => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(ShutdownSignalError::default().into())
                },
            }
        })?;
        log::trace!("Command '{command}' exited with code {:?}", output.code);

        Ok(output)
    }
}
