//! Builds the shell script for one trial.
//!
//! The script pulls the image, runs the task in a container and prints a marker at every phase
//! boundary. Every user supplied value goes through [`shell_quote`], so images, snapshotter names
//! and tasks with spaces or quotes cannot break the script.

use snapshotter_bench_summary_model::{BenchmarkCase, MarkerLabel};

use crate::executor::ShellCommand;
use crate::marker::MarkerFormat;

/// Quote `value` as a single word for a POSIX shell.
///
/// Values made only of characters with no special meaning are returned unchanged.
pub fn shell_quote(value: &str) -> String {
    let is_plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-+=.,:/@%".contains(c));
    if is_plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// How the container CLI is invoked, shared by every trial of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerCli {
    /// The container CLI binary, e.g. `nerdctl`.
    pub program: String,
    /// Run the container CLI through `sudo`.
    pub use_sudo: bool,
    /// Pass `--rm` so the container is removed when it exits.
    pub remove_container: bool,
    /// The shell inside the container that runs the task.
    pub container_shell: String,
    pub marker_format: MarkerFormat,
}

impl Default for ContainerCli {
    fn default() -> Self {
        Self {
            program: "nerdctl".to_string(),
            use_sudo: true,
            remove_container: true,
            container_shell: "/bin/sh".to_string(),
            marker_format: MarkerFormat::default(),
        }
    }
}

impl ContainerCli {
    pub fn trial_script<'a>(&'a self, case: &'a BenchmarkCase) -> TrialScript<'a> {
        TrialScript { cli: self, case }
    }
}

/// The script for one trial of a [`BenchmarkCase`].
#[derive(Debug, Clone, Copy)]
pub struct TrialScript<'a> {
    cli: &'a ContainerCli,
    case: &'a BenchmarkCase,
}

impl TrialScript<'_> {
    pub fn case(&self) -> &BenchmarkCase {
        self.case
    }

    pub fn marker_format(&self) -> MarkerFormat {
        self.cli.marker_format
    }

    fn cli_prefix(&self) -> String {
        let program = shell_quote(&self.cli.program);
        if self.cli.use_sudo {
            format!("sudo {program}")
        } else {
            program
        }
    }

    fn snapshotter_flag(&self) -> String {
        shell_quote(&format!("--snapshotter={}", self.case.snapshotter))
    }

    /// The script run by the container shell. The task's exit code is passed through.
    pub fn container_script(&self) -> String {
        let format = self.cli.marker_format;
        [
            format.echo_marker(MarkerLabel::ContainerStart),
            self.case.task.clone(),
            "status=$?".to_string(),
            format.echo_marker(MarkerLabel::ContainerEnd),
            "exit $status".to_string(),
        ]
        .join("\n")
    }

    pub fn pull_command(&self) -> String {
        format!(
            "{} pull {} {}",
            self.cli_prefix(),
            self.snapshotter_flag(),
            shell_quote(&self.case.image)
        )
    }

    pub fn run_command(&self) -> String {
        let rm = if self.cli.remove_container { " --rm" } else { "" };
        format!(
            "{} run{rm} {} {} {} -c {}",
            self.cli_prefix(),
            self.snapshotter_flag(),
            shell_quote(&self.case.image),
            shell_quote(&self.cli.container_shell),
            shell_quote(&self.container_script())
        )
    }

    /// The full host script. It stops at the first failing step.
    pub fn render(&self) -> String {
        let format = self.cli.marker_format;
        [
            "set -e".to_string(),
            format.echo_marker(MarkerLabel::BenchmarkStart),
            format.echo_marker(MarkerLabel::PullStart),
            self.pull_command(),
            format.echo_marker(MarkerLabel::PullEnd),
            format.echo_marker(MarkerLabel::RunStart),
            self.run_command(),
            format.echo_marker(MarkerLabel::RunEnd),
        ]
        .join("\n")
    }

    pub fn to_command(&self) -> ShellCommand {
        ShellCommand::script(self.render()).with_label(format!(
            "trial of '{}' with snapshotter '{}'",
            self.case.image, self.case.snapshotter
        ))
    }
}
