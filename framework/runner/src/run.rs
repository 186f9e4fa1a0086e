use std::path::Path;

use anyhow::Context;
use snapshotter_bench_summariser::{compare_with_baseline, render_summary_table, summarize};
use snapshotter_bench_summary_model::{
    append_trial_record, load_results_from_file, store_results, BenchmarkCase, ResultSummary,
    Trial, TrialRecord,
};

use crate::definition::BenchmarkDefinitionBuilder;
use crate::executor::{CommandExecutor, ProcessExecutor};
use crate::progress::TrialProgress;
use crate::reset::EnvironmentReset;
use crate::script::ContainerCli;
use crate::trial::run_trial;

/// Runs the trials of benchmark cases one after the other.
///
/// Every trial is preceded by an environment reset. Any error stops the run, there are no retries.
pub struct BenchmarkRunner<'a> {
    executor: &'a dyn CommandExecutor,
    reset: &'a dyn EnvironmentReset,
    container_cli: &'a ContainerCli,
    trials_output: Option<&'a Path>,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        reset: &'a dyn EnvironmentReset,
        container_cli: &'a ContainerCli,
    ) -> Self {
        Self {
            executor,
            reset,
            container_cli,
            trials_output: None,
        }
    }

    /// Append every trial to a JSON Lines file as soon as it completes.
    pub fn with_trials_output(mut self, path: Option<&'a Path>) -> Self {
        self.trials_output = path;
        self
    }

    /// Reset the environment, then run a single trial of `case`.
    pub fn run_trial(&self, case: &BenchmarkCase) -> anyhow::Result<Trial> {
        self.reset.reset(self.executor, &case.image)?;

        Ok(run_trial(self.executor, &self.container_cli.trial_script(case))?)
    }

    /// Run all repetitions of `case` and summarise them.
    pub fn run_case(
        &self,
        case: &BenchmarkCase,
        progress: &TrialProgress,
    ) -> anyhow::Result<ResultSummary> {
        let mut trials = Vec::with_capacity(case.repetitions);
        for repetition in 1..=case.repetitions {
            progress.set_message(format!(
                "{} ({repetition}/{})",
                case.image, case.repetitions
            ));
            log::info!(
                "Trial {repetition}/{} for image '{}'",
                case.repetitions,
                case.image
            );

            let trial = self.run_trial(case)?;
            log::info!(
                "Trial {repetition}/{} took {:.3}s (pull {:.3}s, execution {:.3}s)",
                case.repetitions,
                trial.total_time,
                trial.pull_time,
                trial.execution_time
            );

            if let Some(path) = self.trials_output {
                append_trial_record(&TrialRecord::new(case, repetition, trial), path)
                    .with_context(|| format!("Failed to record trial in {}", path.display()))?;
            }

            trials.push(trial);
            progress.trial_done();
        }

        Ok(summarize(case, &trials)?)
    }

    /// Run every case in order. The first failure aborts the remaining cases.
    pub fn run_all(
        &self,
        cases: &[BenchmarkCase],
        progress: &TrialProgress,
    ) -> anyhow::Result<Vec<ResultSummary>> {
        cases
            .iter()
            .map(|case| self.run_case(case, progress))
            .collect()
    }
}

/// Run a benchmark and write its results.
///
/// The baseline, if any, is read before the first trial so a bad path fails fast. When a new
/// result regresses against the baseline the run fails with
/// [`snapshotter_bench_core::prelude::BenchError::RegressionDetected`] and the results file is left
/// untouched.
pub fn run(definition: BenchmarkDefinitionBuilder) -> anyhow::Result<Vec<ResultSummary>> {
    let definition = definition.build()?;

    log::info!("Running benchmark: {}", definition.name);

    let baseline = definition
        .baseline
        .as_deref()
        .map(load_results_from_file)
        .transpose()
        .context("Failed to load baseline")?;

    let executor: Box<dyn CommandExecutor> = match definition.executor {
        Some(executor) => executor,
        None => Box::new(ProcessExecutor::new(definition.timeout)?),
    };

    let total_trials = definition
        .cases
        .iter()
        .map(|case| case.repetitions)
        .sum();
    let progress = TrialProgress::start(total_trials, !definition.no_progress);

    let runner = BenchmarkRunner::new(
        executor.as_ref(),
        definition.reset.as_ref(),
        &definition.container_cli,
    )
    .with_trials_output(definition.trials_output.as_deref());
    let results = runner.run_all(&definition.cases, &progress);
    progress.finish();
    let results = results?;

    println!("{}", render_summary_table(&results));

    if let Some(baseline) = &baseline {
        log::info!(
            "Comparing against baseline with a threshold of {:.1}%",
            definition.threshold * 100.0
        );
        compare_with_baseline(baseline, &results, definition.threshold)?;
        log::info!("No performance regression detected");
    }

    store_results(&results, &definition.output)?;
    log::info!("Results written to {}", definition.output.display());

    Ok(results)
}
