use tokio::sync::watch;

/// Signals a running benchmark to stop.
///
/// Triggered by Ctrl-C. Any command that is running when the signal arrives is cancelled, and no
/// further trials are started.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: watch::Sender<bool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: watch::channel(false).0,
        }
    }

    pub fn shutdown(&self) {
        // `send_replace` stores the value even when nobody is subscribed yet.
        let previous = self.sender.send_replace(true);
        if !previous {
            log::warn!("Shutdown requested, the benchmark will stop");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn new_listener(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Point in time check of the shutdown signal.
    pub fn should_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Wait until shutdown is requested. Safe to race against other futures to cancel them.
    ///
    /// If the [`ShutdownHandle`] is dropped without a shutdown being requested, this never
    /// completes.
    pub async fn wait_for_shutdown(&mut self) {
        if self.receiver.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Benchmark cancelled by shutdown signal".to_string(),
        }
    }
}
