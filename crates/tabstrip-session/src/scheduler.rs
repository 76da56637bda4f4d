//! Persist scheduler
//!
//! Delay-based debounce: every trigger cancels the pending flush and
//! schedules a new one `delay` later, so a burst of activity produces one
//! write once things go quiet.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::SessionError;
use crate::Result;

pub const DEFAULT_PERSIST_DELAY: Duration = Duration::from_secs(5);

/// The flush itself. Runs on a blocking thread of the background runtime.
pub type PersistJob = Arc<dyn Fn() -> Result<()> + Send + Sync>;

pub struct PersistScheduler {
    runtime: Handle,
    delay: Duration,
    job: PersistJob,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl PersistScheduler {
    pub fn new(runtime: Handle, delay: Duration, job: PersistJob) -> Self {
        Self {
            runtime,
            delay,
            job,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any queued flush with one that fires after the delay
    pub fn schedule(&self) {
        let job = Arc::clone(&self.job);
        let delay = self.delay;

        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        *pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            run_job(job).await;
        }));

        tracing::trace!(delay_ms = delay.as_millis() as u64, "Queued tab persist");
    }

    /// Flush on the background runtime right away. A queued flush stays queued.
    pub fn persist_now(&self) {
        let job = Arc::clone(&self.job);
        self.runtime.spawn(run_job(job));
    }

    /// Drop the queued flush, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.pending.lock().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                if was_pending {
                    tracing::debug!("Cancelled pending tab persist");
                }
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PersistScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}

async fn run_job(job: PersistJob) {
    let outcome = tokio::task::spawn_blocking(move || job())
        .await
        .map_err(|e| SessionError::Task(e.to_string()))
        .and_then(|result| result);

    match outcome {
        Ok(()) => tracing::debug!("Persisted tabs"),
        Err(SessionError::SyncNotConfigured) => {
            tracing::debug!("Skipped tab persist: no sync account")
        }
        Err(e) => tracing::warn!(error = %e, "Failed to persist tabs"),
    }
}
