//! One-shot completion signal for queued jobs.

use std::time::Duration;

use tokio::sync::watch;

use crate::pipeline::JobStatus;

/// Sending half, fired from the job's completion callback.
#[derive(Debug)]
pub(crate) struct CompletionNotifier(watch::Sender<Option<JobStatus>>);

impl CompletionNotifier {
    pub(crate) fn notify(&self, status: JobStatus) {
        self.0.send_replace(Some(status));
    }
}

/// Resolves with the job's terminal status.
///
/// Every clone observes the same completion, so the manager's bookkeeping
/// and any number of external waiters can watch one job.
#[derive(Debug, Clone)]
pub struct CompletionSignal(watch::Receiver<Option<JobStatus>>);

impl CompletionSignal {
    pub(crate) fn channel() -> (CompletionNotifier, CompletionSignal) {
        let (tx, rx) = watch::channel(None);
        (CompletionNotifier(tx), CompletionSignal(rx))
    }

    /// The terminal status, if the job has finished.
    pub fn current(&self) -> Option<JobStatus> {
        *self.0.borrow()
    }

    /// Waits for completion. `None` if the job was dropped without finishing.
    pub async fn wait(&mut self) -> Option<JobStatus> {
        let status = self.0.wait_for(Option::is_some).await.map(|status| *status);
        match status {
            Ok(status) => status,
            Err(_) => self.current(),
        }
    }

    /// Waits for completion for at most `timeout`.
    pub async fn wait_timeout(&mut self, timeout: Duration) -> Option<JobStatus> {
        tokio::time::timeout(timeout, self.wait()).await.ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_waiters_observe_completion() {
        let (notifier, signal) = CompletionSignal::channel();
        let mut first = signal.clone();
        let mut second = signal;

        let waiter = tokio::spawn(async move { first.wait().await });
        notifier.notify(JobStatus::Success);

        assert_eq!(
            waiter.await.expect("waiter should join"),
            Some(JobStatus::Success)
        );
        assert_eq!(second.wait().await, Some(JobStatus::Success));
    }

    #[tokio::test]
    async fn test_wait_timeout_expires() {
        let (_notifier, mut signal) = CompletionSignal::channel();
        assert_eq!(signal.wait_timeout(Duration::from_millis(20)).await, None);
        assert!(signal.current().is_none());
    }

    #[tokio::test]
    async fn test_dropped_notifier_resolves_none() {
        let (notifier, mut signal) = CompletionSignal::channel();
        drop(notifier);
        assert_eq!(signal.wait().await, None);
    }
}
