/// Recommended error type for your benchmark `main` function. Errors from the runner are
/// [`snapshotter_bench_core::prelude::BenchError`]s wrapped in this type, and any of them makes
/// the process exit with a non-zero status.
pub type BenchResult<T> = anyhow::Result<T>;
