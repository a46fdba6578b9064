// File: rusty-forms-live/src/debounce.rs
// Purpose: Per-field debounce timer - at most one pending callback

use std::time::Duration;
use tokio::task::JoinHandle;

/// Owns at most one pending delayed callback.
///
/// Scheduling aborts whatever is still pending before arming the new timer,
/// so after any number of reschedules only the last callback can run.
/// Dropping the scheduler cancels the pending timer.
#[derive(Debug, Default)]
pub struct DebounceScheduler {
    pending: Option<JoinHandle<()>>,
}

impl DebounceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` after `delay`, replacing any pending callback.
    ///
    /// A zero delay runs the callback immediately on the caller's stack.
    /// Must be called from within a Tokio runtime when `delay` is non-zero.
    pub fn schedule<F>(&mut self, delay: Duration, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        if delay.is_zero() {
            callback();
            return;
        }

        tracing::trace!(?delay, "arming debounce timer");
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::trace!("debounce timer fired");
            callback();
        }));
    }

    /// Cancel the pending callback; returns true if one was still waiting
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn test_only_last_schedule_fires() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut scheduler = DebounceScheduler::new();

        for i in 0..5 {
            let fired = fired.clone();
            scheduler.schedule(Duration::from_millis(500), move || {
                fired.lock().unwrap().push(i);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*fired.lock().unwrap(), vec![4]);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_cancels_exactly_one() {
        let mut scheduler = DebounceScheduler::new();
        scheduler.schedule(Duration::from_millis(500), || {});
        assert!(scheduler.is_pending());

        // only a timer that is still waiting counts as cancelled
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_runs_synchronously() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut scheduler = DebounceScheduler::new();

        let counter = count.clone();
        scheduler.schedule(Duration::ZERO, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let mut scheduler = DebounceScheduler::new();
            let counter = count.clone();
            scheduler.schedule(Duration::from_millis(10), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
