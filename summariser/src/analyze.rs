use itertools::Itertools;
use snapshotter_bench_core::prelude::BenchError;
use snapshotter_bench_summary_model::{
    BenchmarkCase, DurationKind, DurationStats, ResultSummary, Trial,
};

/// Reduce the trials of one case to a [`ResultSummary`].
///
/// The result does not depend on the order of `trials`. With a single trial the standard deviation
/// is not defined and is reported as `0.0`.
pub fn summarize(case: &BenchmarkCase, trials: &[Trial]) -> Result<ResultSummary, BenchError> {
    if trials.is_empty() {
        return Err(BenchError::NoTrials);
    }
    if trials.len() == 1 {
        log::warn!(
            "Only one trial for '{}', reporting a standard deviation of 0",
            case.image
        );
    }

    let mut summary = ResultSummary::new(case, trials.len());
    for kind in DurationKind::ALL {
        let values = trials
            .iter()
            .map(|trial| trial.duration(kind))
            .collect::<Vec<_>>();
        *summary.stats_mut(kind) = duration_stats(&values);
    }

    Ok(summary)
}

/// Mean, median and sample standard deviation of a non-empty series.
pub(crate) fn duration_stats(values: &[f64]) -> DurationStats {
    // Sorting first makes the floating point sums independent of input order.
    let sorted = values
        .iter()
        .copied()
        .sorted_by(f64::total_cmp)
        .collect::<Vec<_>>();

    let mean = mean(&sorted);
    DurationStats {
        mean,
        median: median(&sorted),
        stddev: sample_stddev(&sorted, mean),
    }
}

fn mean(sorted: &[f64]) -> f64 {
    sorted.iter().sum::<f64>() / sorted.len() as f64
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn sample_stddev(sorted: &[f64], mean: f64) -> f64 {
    if sorted.len() < 2 {
        return 0.0;
    }

    let sum_sq = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    (sum_sq / (sorted.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use snapshotter_bench_summary_model::Markers;

    use super::*;

    const SECOND: i64 = 1_000_000_000;

    fn case() -> BenchmarkCase {
        BenchmarkCase::new("alpine:3.20", "cvmfs-snapshotter", "true", 5)
    }

    /// A trial where every phase takes `secs` seconds.
    fn trial(secs: f64) -> Trial {
        let d = (secs * SECOND as f64).round() as i64;
        Trial::from_markers(Markers {
            benchmark_start: 0,
            pull_start: 0,
            pull_end: d,
            run_start: Some(d),
            container_start: 2 * d,
            container_end: 3 * d,
            run_end: 3 * d,
        })
        .unwrap()
    }

    #[test]
    fn rejects_empty_trials() {
        assert!(matches!(summarize(&case(), &[]), Err(BenchError::NoTrials)));
    }

    #[test]
    fn single_trial_has_zero_stddev() {
        let summary = summarize(&case(), &[trial(2.0)]).unwrap();

        assert_eq!(summary.repetitions, 1);
        assert_eq!(summary.pull_time.mean, 2.0);
        assert_eq!(summary.pull_time.median, 2.0);
        assert_eq!(summary.pull_time.stddev, 0.0);
        assert_eq!(summary.total_time.mean, 6.0);
    }

    #[test]
    fn median_averages_middle_values_for_even_count() {
        let stats = duration_stats(&[4.0, 1.0, 3.0, 2.0]);

        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 2.5);
    }

    #[test]
    fn stddev_is_sample_standard_deviation() {
        let stats = duration_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);

        assert_eq!(stats.mean, 5.0);
        // Population stddev would be exactly 2.0
        assert!((stats.stddev - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn summary_is_invariant_to_trial_order() {
        let durations = [1.0, 1.1, 0.9, 1.0, 1.05, 0.3, 7.25];
        let forward = durations.iter().map(|d| trial(*d)).collect::<Vec<_>>();
        let mut shuffled = forward.clone();
        shuffled.reverse();
        shuffled.swap(0, 3);
        shuffled.swap(2, 5);

        assert_eq!(
            summarize(&case(), &forward).unwrap(),
            summarize(&case(), &shuffled).unwrap()
        );
    }

    #[test]
    fn summarises_execution_times_of_five_repetitions() {
        let trials = [1.0, 1.1, 0.9, 1.0, 1.05]
            .iter()
            .map(|d| trial(*d))
            .collect::<Vec<_>>();

        let summary = summarize(&case(), &trials).unwrap();

        assert!((summary.execution_time.mean - 1.01).abs() < 1e-9);
        assert!((summary.execution_time.median - 1.0).abs() < 1e-9);
        assert!((summary.execution_time.stddev - 0.0742).abs() < 1e-3);
    }
}
