use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use snapshotter_bench_summariser::validate_threshold;
use snapshotter_bench_summary_model::BenchmarkCase;

use crate::cli::BenchmarkCli;
use crate::executor::CommandExecutor;
use crate::reset::{EnvironmentReset, NoReset, ResetConfig, ScriptReset, ServiceReset};
use crate::script::ContainerCli;

/// The builder for a benchmark definition.
///
/// This must be used at the start of a benchmark binary to define what is measured. Values from
/// the command line take precedence over the defaults set here.
pub struct BenchmarkDefinitionBuilder {
    /// The name of the benchmark.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    /// This value is initialised for you by [BenchmarkDefinitionBuilder::new_with_init].
    #[doc(hidden)]
    cli: BenchmarkCli,
    /// Images to benchmark when none are given with `--image`.
    default_images: Vec<String>,
    /// Task to run in the container when `--task` is not given.
    default_task: Option<String>,
    /// Replaces the reset chosen from the command line.
    reset: Option<Box<dyn EnvironmentReset>>,
    /// Replaces the process executor, so a benchmark can be run without a container runtime.
    executor: Option<Box<dyn CommandExecutor>>,
}

pub struct BenchmarkDefinition {
    pub name: String,
    pub cases: Vec<BenchmarkCase>,
    pub container_cli: ContainerCli,
    pub reset: Box<dyn EnvironmentReset>,
    pub executor: Option<Box<dyn CommandExecutor>>,
    pub timeout: Option<Duration>,
    pub baseline: Option<PathBuf>,
    pub output: PathBuf,
    pub trials_output: Option<PathBuf>,
    pub threshold: f64,
    pub no_progress: bool,
}

impl BenchmarkDefinitionBuilder {
    /// Initialise a new benchmark definition from the benchmark name and parsed command line
    /// arguments. See [BenchmarkDefinitionBuilder::name] for more information about the name.
    pub fn new(name: &str, cli: BenchmarkCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            default_images: Vec::new(),
            default_task: None,
            reset: None,
            executor: None,
        }
    }

    /// Parse the command line and configure logging, then create the definition.
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, crate::init::init())
    }

    /// Set the images [BenchmarkDefinitionBuilder::default_images] used when `--image` is not
    /// given.
    pub fn with_default_images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_images = images.into_iter().map(Into::into).collect();
        self
    }

    /// Set the task [BenchmarkDefinitionBuilder::default_task] used when `--task` is not given.
    pub fn with_default_task(mut self, task: &str) -> Self {
        self.default_task = Some(task.to_string());
        self
    }

    /// Use `reset` before every trial, ignoring `--reset-script` and `--reset-config`.
    pub fn use_reset(mut self, reset: Box<dyn EnvironmentReset>) -> Self {
        self.reset = Some(reset);
        self
    }

    /// Run commands with `executor` instead of spawning processes.
    pub fn use_executor(mut self, executor: Box<dyn CommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<BenchmarkDefinition> {
        let cli = self.cli;
        let baseline = cli.baseline_path().cloned();

        let images = if cli.images.is_empty() {
            self.default_images
        } else {
            cli.images
        };
        if images.is_empty() {
            anyhow::bail!("No images to benchmark, pass at least one --image");
        }
        if images.iter().any(|image| image.trim().is_empty()) {
            anyhow::bail!("Image references must not be blank");
        }

        let task = cli
            .task
            .or(self.default_task)
            .context("No task to run in the container, pass --task")?;
        if cli.repetitions == 0 {
            anyhow::bail!("At least one repetition is required");
        }
        let threshold = validate_threshold(cli.threshold)?;

        let reset: Box<dyn EnvironmentReset> = match (self.reset, cli.reset_script, cli.reset_config)
        {
            (Some(reset), _, _) => reset,
            (None, Some(script), _) => Box::new(ScriptReset {
                script,
                socket_path: cli.socket_path.clone(),
            }),
            (None, None, Some(config)) => {
                Box::new(ServiceReset::new(ResetConfig::from_file(&config)?))
            }
            (None, None, None) => {
                log::warn!("No environment reset configured, trials after the first will run against warm caches");
                Box::new(NoReset)
            }
        };

        let cases = images
            .into_iter()
            .map(|image| BenchmarkCase::new(image, &cli.snapshotter, &task, cli.repetitions))
            .collect();

        Ok(BenchmarkDefinition {
            name: self.name,
            cases,
            container_cli: ContainerCli {
                program: cli.container_cli,
                use_sudo: !cli.no_sudo,
                remove_container: !cli.keep_container,
                container_shell: cli.container_shell,
                marker_format: cli.marker_format,
            },
            reset,
            executor: self.executor,
            timeout: (cli.timeout_s > 0).then(|| Duration::from_secs(cli.timeout_s)),
            baseline,
            output: cli.output,
            trials_output: cli.trials_output,
            threshold,
            no_progress: cli.no_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::marker::MarkerFormat;

    fn cli(args: &[&str]) -> BenchmarkCli {
        BenchmarkCli::try_parse_from(std::iter::once("pull_run").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_fill_in_missing_images_and_task() {
        let definition = BenchmarkDefinitionBuilder::new("pull_run", cli(&[]))
            .with_default_images(["rootproject/root:6.32.02-ubuntu24.04"])
            .with_default_task("python3 -c 'import ROOT'")
            .build()
            .unwrap();

        assert_eq!(
            definition.cases,
            vec![BenchmarkCase::new(
                "rootproject/root:6.32.02-ubuntu24.04",
                "cvmfs-snapshotter",
                "python3 -c 'import ROOT'",
                5
            )]
        );
        assert_eq!(definition.container_cli, ContainerCli::default());
        assert_eq!(definition.timeout, Some(Duration::from_secs(1800)));
        assert!(definition.baseline.is_none());
    }

    #[test]
    fn command_line_overrides_defaults() {
        let definition = BenchmarkDefinitionBuilder::new(
            "pull_run",
            cli(&[
                "--image",
                "alpine:3.20",
                "--image",
                "ubuntu:24.04",
                "--task",
                "true",
                "-n",
                "2",
                "--timeout-s",
                "0",
                "--no-sudo",
                "--keep-container",
                "--marker-format",
                "epoch-seconds",
                "old.json",
            ]),
        )
        .with_default_images(["rootproject/root:6.32.02-ubuntu24.04"])
        .with_default_task("python3 -c 'import ROOT'")
        .build()
        .unwrap();

        let images = definition
            .cases
            .iter()
            .map(|case| case.image.as_str())
            .collect::<Vec<_>>();
        assert_eq!(images, vec!["alpine:3.20", "ubuntu:24.04"]);
        assert!(definition.cases.iter().all(|case| case.task == "true"));
        assert!(definition.cases.iter().all(|case| case.repetitions == 2));
        assert_eq!(definition.timeout, None);
        assert!(!definition.container_cli.use_sudo);
        assert!(!definition.container_cli.remove_container);
        assert_eq!(definition.container_cli.marker_format, MarkerFormat::EpochSeconds);
        assert_eq!(definition.baseline, Some(PathBuf::from("old.json")));
    }

    #[test]
    fn requires_an_image() {
        let result = BenchmarkDefinitionBuilder::new("pull_run", cli(&["--task", "true"])).build();
        assert!(result.is_err());
    }

    #[test]
    fn requires_a_task() {
        let result =
            BenchmarkDefinitionBuilder::new("pull_run", cli(&["--image", "alpine:3.20"])).build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_blank_image() {
        let result = BenchmarkDefinitionBuilder::new(
            "pull_run",
            cli(&["--image", "alpine:3.20", "--image", " ", "--task", "true"]),
        )
        .build();
        assert!(result.is_err());

        let result = BenchmarkDefinitionBuilder::new("pull_run", cli(&["--task", "true"]))
            .with_default_images([""])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_invalid_threshold() {
        let mut cli = cli(&["--image", "alpine:3.20", "--task", "true"]);
        cli.threshold = f64::NAN;

        let result = BenchmarkDefinitionBuilder::new("pull_run", cli).build();
        assert!(result.is_err());
    }

    #[test]
    fn baseline_flag_is_used() {
        let definition = BenchmarkDefinitionBuilder::new(
            "pull_run",
            cli(&["--image", "alpine:3.20", "--task", "true", "--baseline", "old.json"]),
        )
        .build()
        .unwrap();
        assert_eq!(definition.baseline, Some(PathBuf::from("old.json")));
    }

    #[test]
    fn missing_reset_config_file_is_an_error() {
        let result = BenchmarkDefinitionBuilder::new(
            "pull_run",
            cli(&[
                "--image",
                "alpine:3.20",
                "--task",
                "true",
                "--reset-config",
                "/nonexistent/reset.toml",
            ]),
        )
        .build();
        assert!(result.is_err());
    }
}
