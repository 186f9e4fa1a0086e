use std::path::PathBuf;

use clap::Parser;
use snapshotter_bench_summariser::{
    baseline_for, comparable_metrics, compare_with_baseline, latest_summaries_by_case,
    parse_threshold, render_comparison_table, render_summary_table, DEFAULT_REGRESSION_THRESHOLD,
};
use snapshotter_bench_summary_model::load_results_from_file;

/// Compare a results file against a baseline results file.
#[derive(Parser)]
#[command(about, long_about = None)]
struct SummariserCli {
    /// Results file from an earlier run to compare against.
    #[arg(long)]
    baseline: PathBuf,

    /// Results file to check.
    #[arg(long, default_value = snapshotter_bench_summary_model::DEFAULT_RESULTS_FILE)]
    results: PathBuf,

    /// Relative increase over the baseline that counts as a regression, `0.05` is 5%.
    #[arg(long, default_value_t = DEFAULT_REGRESSION_THRESHOLD, value_parser = parse_threshold)]
    threshold: f64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = SummariserCli::parse();

    log::debug!("Loading baseline from {}", cli.baseline.display());
    let baseline = latest_summaries_by_case(load_results_from_file(&cli.baseline)?);
    log::debug!("Loading results from {}", cli.results.display());
    let results = latest_summaries_by_case(load_results_from_file(&cli.results)?);

    println!("\nBaseline");
    println!("{}", render_summary_table(&baseline));
    println!("\nResults");
    println!("{}", render_summary_table(&results));

    for result in &results {
        let case = result.case();
        if let Some(old) = baseline_for(&case, &baseline) {
            println!("\n{} ({})", case.image, case.snapshotter);
            println!(
                "{}",
                render_comparison_table(&comparable_metrics(old), &comparable_metrics(result))
            );
        }
    }

    compare_with_baseline(&baseline, &results, cli.threshold)?;

    log::info!("No performance regression detected");

    Ok(())
}
