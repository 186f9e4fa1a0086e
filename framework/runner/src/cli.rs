use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use snapshotter_bench_summariser::{parse_threshold, DEFAULT_REGRESSION_THRESHOLD};
use snapshotter_bench_summary_model::DEFAULT_RESULTS_FILE;

use crate::marker::MarkerFormat;
use crate::reset::DEFAULT_SOCKET_PATH;

/// Snapshotter used when none is given.
pub const DEFAULT_SNAPSHOTTER: &str = "cvmfs-snapshotter";

#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct BenchmarkCli {
    /// Results file from an earlier run to check for performance regressions.
    ///
    /// Same as `--baseline`.
    #[arg(value_name = "BASELINE", conflicts_with = "baseline")]
    pub baseline_file: Option<PathBuf>,

    /// Results file from an earlier run to check for performance regressions.
    #[arg(long, env = "SNAPSHOTTER_BENCH_BASELINE")]
    pub baseline: Option<PathBuf>,

    /// Image to benchmark. Specify the flag multiple times to benchmark several images, which
    /// are run one after the other.
    #[arg(long = "image", short)]
    pub images: Vec<String>,

    /// The snapshotter used to pull and run the images.
    #[arg(long, short, env = "SNAPSHOTTER_BENCH_SNAPSHOTTER", default_value = DEFAULT_SNAPSHOTTER)]
    pub snapshotter: String,

    /// The shell command to run inside the container.
    #[arg(long, short)]
    pub task: Option<String>,

    /// The number of trials to run for each image.
    #[arg(long, short = 'n', default_value_t = 5, value_parser = parse_repetitions)]
    pub repetitions: usize,

    /// Where to write the result summaries.
    #[arg(long, short, default_value = DEFAULT_RESULTS_FILE)]
    pub output: PathBuf,

    /// Append every trial, with its raw markers, to this JSON Lines file.
    #[arg(long)]
    pub trials_output: Option<PathBuf>,

    /// Relative increase over the baseline that counts as a regression, `0.05` is 5%.
    #[arg(long, default_value_t = DEFAULT_REGRESSION_THRESHOLD, value_parser = parse_threshold)]
    pub threshold: f64,

    /// Kill a command that runs for longer than this many seconds. Use 0 to wait forever.
    #[arg(long, default_value_t = 1800)]
    pub timeout_s: u64,

    /// The format of the timestamps in marker lines.
    #[arg(long, value_enum, default_value_t = MarkerFormat::EpochNanos)]
    pub marker_format: MarkerFormat,

    /// The container CLI used to pull and run images.
    #[arg(long, env = "SNAPSHOTTER_BENCH_CONTAINER_CLI", default_value = "nerdctl")]
    pub container_cli: String,

    /// Run the container CLI without `sudo`.
    #[arg(long, default_value = "false")]
    pub no_sudo: bool,

    /// Do not pass `--rm` when running the container.
    #[arg(long, default_value = "false")]
    pub keep_container: bool,

    /// The shell inside the container that runs the task.
    #[arg(long, default_value = "/bin/sh")]
    pub container_shell: String,

    /// Script that resets the environment before every trial. It is given the image as its only
    /// argument.
    #[arg(long, conflicts_with = "reset_config")]
    pub reset_script: Option<PathBuf>,

    /// TOML file describing the services, mounts and caches to reset before every trial.
    #[arg(long)]
    pub reset_config: Option<PathBuf>,

    /// Control socket that must exist after `--reset-script` has run.
    #[arg(long, default_value = DEFAULT_SOCKET_PATH)]
    pub socket_path: PathBuf,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[arg(long, default_value = "false")]
    pub no_progress: bool,

    /// Log level, overrides `RUST_LOG`.
    #[arg(long, env = "SNAPSHOTTER_BENCH_LOG_LEVEL")]
    pub log_level: Option<LevelFilter>,
}

impl BenchmarkCli {
    /// The baseline file, however it was given.
    pub fn baseline_path(&self) -> Option<&PathBuf> {
        self.baseline.as_ref().or(self.baseline_file.as_ref())
    }
}

fn parse_repetitions(s: &str) -> anyhow::Result<usize> {
    let repetitions = s.parse::<usize>()?;
    if repetitions == 0 {
        anyhow::bail!("At least one repetition is required");
    }

    Ok(repetitions)
}
