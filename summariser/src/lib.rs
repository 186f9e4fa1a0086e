mod analyze;
mod filter;
mod regression;
mod report;

pub use analyze::summarize;
pub use filter::{baseline_for, latest_summaries_by_case};
pub use regression::{
    check_regression, comparable_metrics, compare_with_baseline, parse_threshold,
    validate_threshold, RegressionCheck, DEFAULT_REGRESSION_THRESHOLD,
};
pub use report::{render_comparison_table, render_summary_table};
