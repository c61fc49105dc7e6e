//! Periodic refresh of the production store.
//!
//! Spawns a background task that runs [`ProductionStore::initial_load`] on
//! the first tick and [`ProductionStore::refresh`] on every later one,
//! whether or not the initial load succeeded, using
//! `tokio::time::interval`. Ticks missed while a cycle runs are skipped,
//! not replayed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::store::{ProductionStore, RefreshOutcome};

/// Default time between refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// How long [`Poller::shutdown`] waits for the task to wind down.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a running refresh loop.
pub struct Poller {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Start polling `store` every `interval` until `cancel` fires or
    /// [`Poller::shutdown`] is called.
    pub fn spawn(store: Arc<ProductionStore>, interval: Duration, cancel: CancellationToken) -> Self {
        let handle = tokio::spawn(run(store, interval, cancel.clone()));
        Self { cancel, handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop. A cycle already in flight is allowed to finish; no
    /// further ticks start.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.handle).await.is_err() {
            tracing::warn!("Poller did not stop within the shutdown timeout");
        }
    }
}

/// Run the refresh loop until `cancel` is triggered.
pub async fn run(store: Arc<ProductionStore>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs_f64(),
        lines = store.catalog().lines().len(),
        "Production poller started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut first_tick = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Production poller stopping");
                break;
            }
            _ = ticker.tick() => {
                if std::mem::take(&mut first_tick) {
                    if let Err(e) = store.initial_load().await {
                        tracing::error!(error = %e, "Initial load failed, retrying in the background");
                    }
                    continue;
                }
                match store.refresh().await {
                    Ok(RefreshOutcome::Committed) => {}
                    Ok(RefreshOutcome::Skipped) => {
                        tracing::debug!("Refresh skipped, previous cycle still running");
                    }
                    Err(e) => tracing::debug!(error = %e, "Background refresh failed"),
                }
            }
        }
    }
}
