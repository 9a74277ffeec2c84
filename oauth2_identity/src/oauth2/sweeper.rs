use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::state_store::StateStore;

/// Background task that periodically purges expired authorization states.
///
/// Expiry is always checked when a state is used; the sweep only reclaims
/// space.
pub struct StateSweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl StateSweeper {
    pub fn spawn(store: Arc<dyn StateStore>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match store.purge_expired().await {
                            Ok(0) => {}
                            Ok(purged) => tracing::debug!(purged, "Purged expired authorization states"),
                            Err(e) => tracing::warn!(error = %e, "Failed to purge expired authorization states"),
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("State sweeper stopped");
        });

        tracing::info!(interval_secs = interval.as_secs(), "Started state sweeper");
        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "State sweeper task ended abnormally");
        }
    }
}
