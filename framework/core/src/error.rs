use std::path::PathBuf;
use std::time::Duration;

use crate::shutdown::ShutdownSignalError;

/// Errors raised while running a benchmark.
///
/// Apart from command failures raised by best-effort reset steps, every variant is
/// terminal for the current run. Nothing in the benchmark retries.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    /// One or more required markers were absent from the captured output of a trial.
    #[error("Missing required marker(s) in captured output: {}", labels.join(", "))]
    MissingMarker { labels: Vec<String> },

    /// A marker was present but its value could not be read in the configured format.
    #[error("Failed to parse marker '{label}' value '{value}' as {format}: {reason}")]
    MarkerParse {
        label: String,
        value: String,
        format: String,
        reason: String,
    },

    /// The captured markers describe an interval that ends before it starts.
    #[error("Malformed capture, {interval} ends before it starts ({end} < {start})")]
    InvalidTrial {
        interval: &'static str,
        start: i64,
        end: i64,
    },

    /// The captured markers are so far apart that the interval between them overflows.
    #[error("Malformed capture, {interval} from {start} to {end} is too long to measure")]
    DurationOverflow {
        interval: &'static str,
        start: i64,
        end: i64,
    },

    /// An external command could not be started or exited unsuccessfully.
    #[error("Command '{command}' failed with exit code {code:?}: {stderr}")]
    ExternalCommand {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// An external command did not finish within its timeout and was killed.
    #[error("Command '{command}' timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    /// The control socket was not present after an environment reset.
    #[error("Environment verification failed, control socket '{}' does not exist", socket.display())]
    EnvironmentVerification { socket: PathBuf },

    /// A duration increased over its baseline by more than the allowed threshold.
    #[error("Performance regression detected in '{key}': old={old}, new={new}, diff={:.2}%", diff * 100.0)]
    RegressionDetected {
        key: String,
        old: f64,
        new: f64,
        diff: f64,
    },

    /// Statistics were requested for a case that produced no trials.
    #[error("Cannot summarise a benchmark case without trials")]
    NoTrials,

    #[error(transparent)]
    Interrupted(#[from] ShutdownSignalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BenchError {
    /// Whether the run can carry on after this error.
    ///
    /// Only failed or timed out external commands are recoverable, and only where the caller treats
    /// the command as best effort.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BenchError::ExternalCommand { .. } | BenchError::CommandTimeout { .. }
        )
    }
}
