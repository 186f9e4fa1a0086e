use snapshotter_bench_core::prelude::BenchError;
use snapshotter_bench_summary_model::Trial;

use crate::executor::CommandExecutor;
use crate::marker::extract_markers;
use crate::script::TrialScript;

/// Run one trial: execute the script, then recover its markers and derive the durations.
///
/// A script that exits unsuccessfully fails the trial before its output is read, because `set -e`
/// stops it before the remaining markers are printed.
pub fn run_trial(executor: &dyn CommandExecutor, script: &TrialScript) -> Result<Trial, BenchError> {
    let case = script.case();
    log::info!(
        "Running benchmark with snapshotter '{}' on image '{}'",
        case.snapshotter,
        case.image
    );

    let command = script.to_command();
    log::trace!("Trial script:\n{}", script.render());
    let output = executor.execute(&command)?;
    log::debug!("Trial output:\n{}", output.stdout);
    let output = output.check(&command)?;

    let markers = extract_markers(&output.stdout, script.marker_format())?;
    let trial = Trial::from_markers(markers)?;
    log::debug!(
        "Pull: {:.3}s, creation: {:.3}s, execution: {:.3}s, total: {:.3}s",
        trial.pull_time,
        trial.creation_time,
        trial.execution_time,
        trial.total_time
    );

    Ok(trial)
}
