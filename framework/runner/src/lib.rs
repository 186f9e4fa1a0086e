mod cli;
mod definition;
mod executor;
mod init;
mod marker;
mod progress;
mod reset;
mod run;
mod script;
mod shutdown;
mod trial;
mod types;

pub mod prelude {
    pub use crate::cli::{BenchmarkCli, DEFAULT_SNAPSHOTTER};
    pub use crate::definition::{BenchmarkDefinition, BenchmarkDefinitionBuilder};
    pub use crate::executor::{CommandExecutor, CommandOutput, ProcessExecutor, ShellCommand};
    pub use crate::init::{init, init_logging};
    pub use crate::marker::{extract_markers, scan_markers, MarkerFormat};
    pub use crate::progress::TrialProgress;
    pub use crate::reset::{
        EnvironmentReset, NoReset, ResetConfig, ScriptReset, ServiceReset, DEFAULT_SOCKET_PATH,
    };
    pub use crate::run::{run, BenchmarkRunner};
    pub use crate::script::{shell_quote, ContainerCli, TrialScript};
    pub use crate::trial::run_trial;
    pub use crate::types::BenchResult;

    pub use snapshotter_bench_core::prelude::*;
    pub use snapshotter_bench_summary_model::{BenchmarkCase, ResultSummary, Trial};
}
