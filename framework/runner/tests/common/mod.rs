#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use clap::Parser;
use snapshotter_bench_runner::prelude::*;

const SECOND: i64 = 1_000_000_000;

/// Pretends to be the host shell. Trial scripts get marker output with the next scripted
/// execution time, every other command succeeds silently.
pub struct ScriptedExecutor {
    execution_times_ns: RefCell<Vec<i64>>,
    pub commands: Rc<RefCell<Vec<ShellCommand>>>,
}

impl ScriptedExecutor {
    pub fn new(execution_times_ns: &[i64]) -> Self {
        Self {
            execution_times_ns: RefCell::new(execution_times_ns.iter().rev().copied().collect()),
            commands: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn is_trial(command: &ShellCommand) -> bool {
        command.program == "sh" && command.args.first().map(String::as_str) == Some("-c")
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(&self, command: &ShellCommand) -> Result<CommandOutput, BenchError> {
        self.commands.borrow_mut().push(command.clone());
        if !Self::is_trial(command) {
            return Ok(CommandOutput {
                code: Some(0),
                ..Default::default()
            });
        }

        let Some(execution) = self.execution_times_ns.borrow_mut().pop() else {
            return Ok(CommandOutput {
                code: Some(0),
                stdout: "benchmark_start: 0\n".to_string(),
                stderr: String::new(),
            });
        };

        Ok(CommandOutput {
            code: Some(0),
            stdout: marker_output(execution),
            stderr: String::new(),
        })
    }
}

/// Output of a trial with a 2s pull, 0.5s creation and the given execution time.
pub fn marker_output(execution_ns: i64) -> String {
    let benchmark_start = 1_722_000_000 * SECOND;
    let pull_end = benchmark_start + 2 * SECOND;
    let container_start = pull_end + SECOND / 2;
    let container_end = container_start + execution_ns;
    format!(
        "benchmark_start: {benchmark_start}
pull_start: {benchmark_start}
pull_end: {pull_end}
run_start: {pull_end}
container_start: {container_start}
container_end: {container_end}
run_end: {}
",
        container_end + SECOND / 10
    )
}

pub fn cli(args: &[&str]) -> BenchmarkCli {
    BenchmarkCli::try_parse_from(
        ["pull_run", "--no-progress"]
            .into_iter()
            .chain(args.iter().copied()),
    )
    .unwrap()
}
