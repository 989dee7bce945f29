//! Active reclamation of backend records whose TTL has elapsed.
//!
//! Reads already treat expired records as absent; the sweeper only frees the
//! space held by records nobody asks for again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::backend::KeyValueBackend;

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Token that stops the sweeper when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the sweeper and wait for its loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "Expiry sweeper task ended abnormally");
        }
    }
}

/// Spawn a task that calls `purge_expired` every `every`.
///
/// The first sweep runs one full interval after spawning.
///
/// # Returns
/// A [`SweeperHandle`] used to stop the task on shutdown.
pub fn spawn_expiry_sweeper(backend: Arc<dyn KeyValueBackend>, every: Duration) -> SweeperHandle {
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run_sweep_loop(backend, every, cancel.clone()));
    SweeperHandle { cancel, task }
}

async fn run_sweep_loop(
    backend: Arc<dyn KeyValueBackend>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // interval() fires immediately; nothing has expired at startup.
    ticker.tick().await;

    tracing::info!(
        backend = backend.kind(),
        interval_secs = every.as_secs(),
        "Expiry sweeper started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Expiry sweeper shutting down");
                break;
            }
            _ = ticker.tick() => {
                sweep_once(backend.as_ref()).await;
            }
        }
    }
}

/// Run a single purge pass.
///
/// # Returns
/// Number of records removed; `0` when the pass failed.
pub async fn sweep_once(backend: &dyn KeyValueBackend) -> usize {
    match backend.purge_expired().await {
        Ok(0) => {
            tracing::debug!("Expiry sweep: nothing to purge");
            0
        }
        Ok(removed) => {
            tracing::info!(removed, "Expiry sweep purged records");
            removed
        }
        Err(err) => {
            tracing::warn!(error = %err, "Expiry sweep failed");
            0
        }
    }
}
