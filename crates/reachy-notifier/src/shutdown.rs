//! Cooperative stop signal for the polling loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

/// Owner side of the stop signal. Cheap to clone.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side held by the polling loop.
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleep for `timeout` unless the stop signal fires first.
    ///
    /// Returns `true` when the loop should stop. Losing every `Shutdown`
    /// handle counts as a stop request.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> bool {
        let rx = &mut self.rx;
        let stopped = async move {
            // Err means every sender is gone
            let _ = rx.wait_for(|stopped| *stopped).await;
        };

        tokio::select! {
            _ = tokio::time::sleep(timeout) => {}
            _ = stopped => return true,
        }
        self.is_triggered()
    }
}

/// Trigger `shutdown` on Ctrl-C or, on unix, SIGTERM.
pub fn install_signal_handlers(shutdown: Shutdown) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received, stopping...");
        shutdown.trigger();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
