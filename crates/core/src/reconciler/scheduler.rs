//! Periodic sweep scheduler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::Reconciler;

/// Runs [`Reconciler::on_scheduled_sweep`] on a fixed interval.
///
/// The first sweep happens one interval after `start`, not immediately.
pub struct SweepScheduler {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SweepScheduler {
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            reconciler,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Spawn the sweep loop.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Sweep scheduler already running");
            return;
        }

        let reconciler = Arc::clone(&self.reconciler);
        let running = Arc::clone(&self.running);
        let interval = self.interval;
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Sweep loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Sweep loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        if let Err(e) = reconciler.on_scheduled_sweep().await {
                            error!(error = %e, "Scheduled sweep failed");
                        }
                    }
                }
            }
            info!("Sweep loop stopped");
        });

        *self.handle.lock().await = Some(handle);
    }

    /// Stop the loop and wait for an in-progress sweep to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Sweep scheduler not running");
            return;
        }

        info!("Stopping sweep scheduler");
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "Sweep loop task failed");
            }
        }
    }
}
