use itertools::Itertools;
use snapshotter_bench_summary_model::{BenchmarkCase, ResultSummary};

/// Keep one summary per (image, snapshotter, task).
///
/// Results files may be concatenated from several runs, in which case the summary that appears
/// last for a case is kept. The returned summaries keep the order of their first appearance.
pub fn latest_summaries_by_case(summaries: Vec<ResultSummary>) -> Vec<ResultSummary> {
    summaries
        .into_iter()
        .enumerate()
        .into_group_map_by(|(_, summary)| {
            (
                summary.image.clone(),
                summary.snapshotter.clone(),
                summary.task.clone(),
            )
        })
        .into_values()
        .filter_map(|group| {
            let first_seen = group.first().map(|(index, _)| *index)?;
            group.into_iter().last().map(|(_, summary)| (first_seen, summary))
        })
        .sorted_by_key(|(first_seen, _)| *first_seen)
        .map(|(_, summary)| summary)
        .collect()
}

/// Find the baseline summary that measured the same thing as `case`.
pub fn baseline_for<'a>(
    case: &BenchmarkCase,
    baseline: &'a [ResultSummary],
) -> Option<&'a ResultSummary> {
    baseline.iter().rev().find(|summary| case.describes(summary))
}
