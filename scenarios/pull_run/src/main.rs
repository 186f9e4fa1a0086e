use snapshotter_bench_runner::prelude::*;

/// An image large enough that lazy pulling through the snapshotter matters.
const DEFAULT_IMAGE: &str = "rootproject/root:6.32.02-ubuntu24.04";

/// Loading the ROOT Python bindings reads a large share of the image.
const DEFAULT_TASK: &str = "python3 -c 'import ROOT'";

fn main() -> BenchResult<()> {
    let builder = BenchmarkDefinitionBuilder::new_with_init(env!("CARGO_PKG_NAME"))
        .with_default_images([DEFAULT_IMAGE])
        .with_default_task(DEFAULT_TASK);

    run(builder)?;

    Ok(())
}
