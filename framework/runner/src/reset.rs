//! Returns the snapshotter and container runtime to a cold state between trials.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use snapshotter_bench_core::prelude::BenchError;

use crate::executor::{CommandExecutor, ShellCommand};

/// Control socket of the CernVM-FS snapshotter.
pub const DEFAULT_SOCKET_PATH: &str = "/run/containerd-cvmfs-grpc/containerd-cvmfs-grpc.sock";

/// Brings the environment back to a known state before a trial.
///
/// Individual steps are best effort. An error returned from [`EnvironmentReset::reset`] means the
/// environment is broken and the benchmark must stop.
pub trait EnvironmentReset {
    fn reset(&self, executor: &dyn CommandExecutor, image: &str) -> Result<(), BenchError>;
}

/// Leaves the environment as it is, so trials after the first run against warm caches.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReset;

impl EnvironmentReset for NoReset {
    fn reset(&self, _executor: &dyn CommandExecutor, _image: &str) -> Result<(), BenchError> {
        Ok(())
    }
}

/// Runs an operator supplied script, passing the image as its only argument.
#[derive(Debug, Clone)]
pub struct ScriptReset {
    pub script: PathBuf,
    pub socket_path: PathBuf,
}

impl EnvironmentReset for ScriptReset {
    fn reset(&self, executor: &dyn CommandExecutor, image: &str) -> Result<(), BenchError> {
        log::info!("Resetting environment with {}", self.script.display());
        let command = ShellCommand::new(self.script.to_string_lossy()).arg(image);
        best_effort(executor, &command)?;

        verify_socket(&self.socket_path)
    }
}

/// Configuration of [`ServiceReset`], read from a TOML file.
///
/// ```toml
/// services = ["containerd", "cvmfs-snapshotter", "autofs"]
/// mount_point = "/cvmfs"
/// cache_dirs = ["/var/lib/cvmfs"]
/// cache_dir_mode = 0o755
/// reload_command = ["cvmfs_config", "reload"]
/// probe_command = ["cvmfs_config", "probe"]
/// socket_path = "/run/containerd-cvmfs-grpc/containerd-cvmfs-grpc.sock"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResetConfig {
    /// Run every step through `sudo`.
    pub use_sudo: bool,
    /// Services to stop, in order. They are started again in reverse order.
    pub services: Vec<String>,
    /// Mount point of the backing read-only filesystem.
    pub mount_point: Option<PathBuf>,
    /// Cache directories that are emptied and recreated.
    pub cache_dirs: Vec<PathBuf>,
    /// Permissions of the recreated cache directories.
    pub cache_dir_mode: u32,
    /// Reloads the backing filesystem configuration.
    pub reload_command: Vec<String>,
    /// Mounts the backing filesystem again. Defaults to `mount <mount_point>`.
    pub remount_command: Vec<String>,
    /// Checks the backing filesystem after it has been mounted again.
    pub probe_command: Vec<String>,
    /// Must exist once the reset is complete.
    pub socket_path: PathBuf,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            use_sudo: true,
            services: vec![
                "containerd".to_string(),
                "cvmfs-snapshotter".to_string(),
                "autofs".to_string(),
            ],
            mount_point: Some(PathBuf::from("/cvmfs")),
            cache_dirs: vec![PathBuf::from("/var/lib/cvmfs")],
            cache_dir_mode: 0o755,
            reload_command: vec!["cvmfs_config".to_string(), "reload".to_string()],
            remount_command: Vec::new(),
            probe_command: vec!["cvmfs_config".to_string(), "probe".to_string()],
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
        }
    }
}

impl ResetConfig {
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reset config '{}'", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse reset config '{}'", path.display()))
    }
}

/// Stops the services, clears the caches and brings everything back up.
#[derive(Debug, Clone, Default)]
pub struct ServiceReset {
    config: ResetConfig,
}

impl ServiceReset {
    pub fn new(config: ResetConfig) -> Self {
        Self { config }
    }

    fn command(&self, program: &str) -> ShellCommand {
        ShellCommand::privileged(self.config.use_sudo, program)
    }

    fn argv_command(&self, argv: &[String]) -> Option<ShellCommand> {
        let (program, args) = argv.split_first()?;
        Some(self.command(program).args(args.iter().cloned()))
    }

    /// Every command of a reset, in the order they are run.
    pub fn steps(&self) -> Vec<ShellCommand> {
        let config = &self.config;
        let mut steps = Vec::new();

        for service in &config.services {
            steps.push(self.command("systemctl").args(["stop", service.as_str()]));
        }
        if let Some(mount_point) = &config.mount_point {
            steps.push(self.command("umount").arg(mount_point.to_string_lossy()));
        }
        for dir in &config.cache_dirs {
            let dir = dir.to_string_lossy();
            steps.push(self.command("rm").args(["-rf", &*dir]));
            steps.push(self.command("mkdir").args(["-p", &*dir]));
            steps.push(
                self.command("chmod")
                    .arg(format!("{:o}", config.cache_dir_mode))
                    .arg(&*dir),
            );
        }
        steps.extend(self.argv_command(&config.reload_command));
        for service in config.services.iter().rev() {
            steps.push(self.command("systemctl").args(["start", service.as_str()]));
        }
        match (self.argv_command(&config.remount_command), &config.mount_point) {
            (Some(remount), _) => steps.push(remount),
            (None, Some(mount_point)) => {
                steps.push(self.command("mount").arg(mount_point.to_string_lossy()))
            }
            (None, None) => {}
        }
        steps.extend(self.argv_command(&config.probe_command));

        steps
    }
}

impl EnvironmentReset for ServiceReset {
    fn reset(&self, executor: &dyn CommandExecutor, image: &str) -> Result<(), BenchError> {
        log::info!("Resetting environment before pulling '{image}'");
        for step in self.steps() {
            best_effort(executor, &step)?;
        }

        verify_socket(&self.config.socket_path)
    }
}

/// Run a reset step, logging failures without stopping.
///
/// Only failures of the step itself are tolerated, a shutdown is still propagated.
fn best_effort(executor: &dyn CommandExecutor, command: &ShellCommand) -> Result<(), BenchError> {
    match executor.execute_checked(command) {
        Ok(_) => log::debug!("Reset step succeeded: {command}"),
        Err(e) if e.is_recoverable() => log::error!("Reset step failed: {e}"),
        Err(e) => return Err(e),
    }
    Ok(())
}

fn verify_socket(socket_path: &Path) -> Result<(), BenchError> {
    if socket_path.exists() {
        log::debug!("Control socket present at {}", socket_path.display());
        Ok(())
    } else {
        log::error!(
            "Control socket {} does not exist after reset",
            socket_path.display()
        );
        Err(BenchError::EnvironmentVerification {
            socket: socket_path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::executor::CommandOutput;

    #[derive(Default)]
    struct RecordingExecutor {
        commands: RefCell<Vec<String>>,
        failing_program: Option<&'static str>,
    }

    impl CommandExecutor for RecordingExecutor {
        fn execute(&self, command: &ShellCommand) -> Result<CommandOutput, BenchError> {
            self.commands.borrow_mut().push(command.to_string());
            let failed = self
                .failing_program
                .is_some_and(|program| command.args.first().map(String::as_str) == Some(program));
            Ok(CommandOutput {
                code: Some(if failed { 1 } else { 0 }),
                ..Default::default()
            })
        }
    }

    fn config_with_socket(socket_path: PathBuf) -> ResetConfig {
        ResetConfig {
            socket_path,
            ..Default::default()
        }
    }

    #[test]
    fn default_steps_stop_clear_and_restart_in_reverse() {
        let steps = ServiceReset::default()
            .steps()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        assert_eq!(
            steps,
            vec![
                "sudo systemctl stop containerd",
                "sudo systemctl stop cvmfs-snapshotter",
                "sudo systemctl stop autofs",
                "sudo umount /cvmfs",
                "sudo rm -rf /var/lib/cvmfs",
                "sudo mkdir -p /var/lib/cvmfs",
                "sudo chmod 755 /var/lib/cvmfs",
                "sudo cvmfs_config reload",
                "sudo systemctl start autofs",
                "sudo systemctl start cvmfs-snapshotter",
                "sudo systemctl start containerd",
                "sudo mount /cvmfs",
                "sudo cvmfs_config probe",
            ]
        );
    }

    #[test]
    fn parses_toml_config() {
        let config = ResetConfig::from_toml(
            r#"
            use_sudo = false
            services = ["containerd"]
            cache_dirs = ["/tmp/cache a"]
            cache_dir_mode = 0o700
            remount_command = ["systemctl", "restart", "autofs"]
            probe_command = []
            socket_path = "/run/snapshotter.sock"
            "#,
        )
        .unwrap();

        assert!(!config.use_sudo);
        assert_eq!(config.mount_point, Some(PathBuf::from("/cvmfs")));
        assert_eq!(config.cache_dir_mode, 0o700);

        let steps = ServiceReset::new(config)
            .steps()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(
            steps,
            vec![
                "systemctl stop containerd",
                "umount /cvmfs",
                "rm -rf '/tmp/cache a'",
                "mkdir -p '/tmp/cache a'",
                "chmod 700 '/tmp/cache a'",
                "cvmfs_config reload",
                "systemctl start containerd",
                "systemctl restart autofs",
            ]
        );
    }

    #[test]
    fn rejects_unknown_config_keys() {
        assert!(ResetConfig::from_toml("servics = []").is_err());
    }

    #[test]
    fn failed_steps_do_not_stop_the_reset() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("snapshotter.sock");
        std::fs::write(&socket, "").unwrap();
        let executor = RecordingExecutor {
            failing_program: Some("umount"),
            ..Default::default()
        };

        ServiceReset::new(config_with_socket(socket))
            .reset(&executor, "alpine:3.20")
            .unwrap();

        assert_eq!(executor.commands.borrow().len(), 13);
    }

    #[test]
    fn missing_socket_is_fatal() {
        let dir = TempDir::new().unwrap();
        let executor = RecordingExecutor::default();

        let err = ServiceReset::new(config_with_socket(dir.path().join("missing.sock")))
            .reset(&executor, "alpine:3.20")
            .unwrap_err();

        assert!(matches!(err, BenchError::EnvironmentVerification { .. }));
    }

    #[test]
    fn script_reset_passes_image_and_checks_socket() {
        let dir = TempDir::new().unwrap();
        let socket = dir.path().join("snapshotter.sock");
        let executor = RecordingExecutor::default();
        let reset = ScriptReset {
            script: PathBuf::from("/opt/bench/reset.sh"),
            socket_path: socket.clone(),
        };

        assert!(reset.reset(&executor, "alpine:3.20").is_err());

        std::fs::write(&socket, "").unwrap();
        reset.reset(&executor, "alpine:3.20").unwrap();

        assert_eq!(
            *executor.commands.borrow(),
            vec![
                "/opt/bench/reset.sh alpine:3.20",
                "/opt/bench/reset.sh alpine:3.20"
            ]
        );
    }

    #[test]
    fn no_reset_runs_nothing() {
        let executor = RecordingExecutor::default();
        NoReset.reset(&executor, "alpine:3.20").unwrap();
        assert!(executor.commands.borrow().is_empty());
    }
}
