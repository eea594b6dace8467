//! Stop requests.
//!
//! A run never cancels a generator mid-stream; the orchestrator checks the
//! signal between generators and skips whatever is left.

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: std::sync::Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
            rx,
        }
    }

    pub fn request_stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// First Ctrl+C asks the run to stop after the current generator. Second Ctrl+C exits immediately.
pub fn setup_shutdown_handler(stop: StopSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("received Ctrl+C, stopping after the current generator");
            eprintln!("\nStopping after the current generator. Press Ctrl+C again to force quit");
            stop.request_stop();

            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nForce quit requested, exiting immediately...");
                std::process::exit(130);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_state() {
        let stop = StopSignal::new();
        let other = stop.clone();
        assert!(!other.is_stop_requested());
        stop.request_stop();
        assert!(other.is_stop_requested());
        other.stopped().await;
    }
}
