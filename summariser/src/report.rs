use std::collections::BTreeMap;

use tabled::settings::Style;
use tabled::{Table, Tabled};

use snapshotter_bench_summary_model::{DurationKind, DurationStats, ResultSummary};

#[derive(Tabled)]
struct SummaryRow {
    image: String,
    snapshotter: String,
    task: String,
    trials: usize,
    #[tabled(rename = "pull_time (s)")]
    pull_time: String,
    #[tabled(rename = "creation_time (s)")]
    creation_time: String,
    #[tabled(rename = "execution_time (s)")]
    execution_time: String,
    #[tabled(rename = "total_time (s)")]
    total_time: String,
}

impl From<&ResultSummary> for SummaryRow {
    fn from(summary: &ResultSummary) -> Self {
        Self {
            image: summary.image.clone(),
            snapshotter: summary.snapshotter.clone(),
            task: summary.task.clone(),
            trials: summary.repetitions,
            pull_time: stats_cell(summary.stats(DurationKind::Pull)),
            creation_time: stats_cell(summary.stats(DurationKind::Creation)),
            execution_time: stats_cell(summary.stats(DurationKind::Execution)),
            total_time: stats_cell(summary.stats(DurationKind::Total)),
        }
    }
}

#[derive(Tabled)]
struct ComparisonRow {
    metric: String,
    #[tabled(display = "float3")]
    old: f64,
    #[tabled(display = "float3")]
    new: f64,
    diff: String,
}

fn stats_cell(stats: &DurationStats) -> String {
    format!(
        "{:.3} ± {:.3} (median {:.3})",
        stats.mean, stats.stddev, stats.median
    )
}

fn float3(n: &f64) -> String {
    format!("{:.3}", n)
}

/// Render summaries as a table, one row per benchmark case.
pub fn render_summary_table(summaries: &[ResultSummary]) -> String {
    let rows = summaries.iter().map(SummaryRow::from).collect::<Vec<_>>();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}

/// Render a side by side comparison of two metric sets, for keys present in both.
pub fn render_comparison_table(old: &BTreeMap<String, f64>, new: &BTreeMap<String, f64>) -> String {
    let rows = old
        .iter()
        .filter_map(|(metric, old)| {
            let new = *new.get(metric)?;
            let diff = if *old == 0.0 {
                "n/a".to_string()
            } else {
                format!("{:+.2}%", (new - old) / old * 100.0)
            };
            Some(ComparisonRow {
                metric: metric.clone(),
                old: *old,
                new,
                diff,
            })
        })
        .collect::<Vec<_>>();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    table.to_string()
}
