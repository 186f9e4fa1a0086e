use tokio::signal;
use snapshotter_bench_core::prelude::ShutdownHandle;

pub(crate) fn start_shutdown_listener(
    runtime: &tokio::runtime::Runtime,
) -> anyhow::Result<ShutdownHandle> {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    runtime.spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Received shutdown signal, stopping the benchmark");
                listener_handle.shutdown();
            }
            Err(e) => log::error!("Failed to listen for the shutdown signal: {e:?}"),
        }
    });

    Ok(handle)
}
