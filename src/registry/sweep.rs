//! Background eviction of completed jobs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use super::manager::JobManager;

/// A background task that periodically expires completed jobs.
///
/// Spawns a tokio task that wakes every `interval` and evicts finished jobs
/// older than the retention window. Call [`ExpirySweep::stop`] to cancel.
pub struct ExpirySweep {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ExpirySweep {
    /// Starts sweeping `manager`. Must be called within a tokio runtime.
    pub fn start(manager: JobManager, interval: Duration, retention: Duration) -> Self {
        let stop_flag = Arc::new(AtomicBool::new(false));
        let flag = stop_flag.clone();

        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.tick().await; // skip the immediate first tick

            loop {
                tick.tick().await;
                if flag.load(Ordering::Relaxed) {
                    break;
                }

                let expired = manager.expire(retention);
                if expired > 0 {
                    tracing::debug!(
                        expired = expired,
                        retention_secs = retention.as_secs(),
                        "Expiry sweep evicted jobs"
                    );
                }
            }
        });

        Self {
            stop_flag,
            handle: Some(handle),
        }
    }

    /// Signal the sweep to stop and wait for it to finish.
    pub async fn stop(mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for ExpirySweep {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }
}

impl JobManager {
    /// Starts the expiry sweep configured for this manager, if retention is
    /// enabled.
    pub fn start_expiry_sweep(&self) -> Option<ExpirySweep> {
        let retention = self.config().completed_job_expiry?;
        Some(ExpirySweep::start(
            self.clone(),
            self.config().sweep_interval,
            retention,
        ))
    }
}
