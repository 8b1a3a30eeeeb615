//! Background eviction task

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::presence_store::PresenceStore;

/// Runs `PresenceStore::sweep` every `period` until stopped
pub struct PresenceSweeper {
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PresenceSweeper {
    /// Must be called from within a tokio runtime
    pub fn spawn(store: Arc<PresenceStore>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(period_secs = period.as_secs(), "Presence sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = store.sweep();
                        if evicted > 0 {
                            info!(evicted, remaining = store.len(), "Swept inactive users");
                        } else {
                            debug!(online = store.len(), "Presence sweep found nothing to evict");
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("Presence sweeper stopping");
                        break;
                    }
                }
            }
        });

        Self {
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signal the task and wait for it to finish; later calls are no-ops
    pub async fn stop(&self) {
        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for PresenceSweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
