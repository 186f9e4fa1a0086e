use clap::Parser;
use log::LevelFilter;

use crate::cli::BenchmarkCli;

/// Initialise the CLI and logging for the benchmark runner.
pub fn init() -> BenchmarkCli {
    let cli = BenchmarkCli::parse();
    init_logging(cli.log_level);

    cli
}

/// Configure `env_logger`, defaulting to `info` when neither `RUST_LOG` nor `level` is set.
pub fn init_logging(level: Option<LevelFilter>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    if let Err(e) = builder.try_init() {
        log::debug!("Logger already initialised: {e}");
    }
}
