//! Cancellable periodic tasks.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// When a periodic task fires for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstRun {
    /// Fire as soon as the task is spawned.
    Immediately,
    /// Wait one full period first.
    AfterPeriod,
}

/// A spawned job that runs once per period until cancelled.
///
/// Runs never overlap: a slow run delays the next firing instead of
/// queueing a burst. Dropping the handle cancels the task.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn `job` on the current tokio runtime.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, first: FirstRun, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let start = match first {
            FirstRun::Immediately => Instant::now(),
            FirstRun::AfterPeriod => Instant::now()
                .checked_add(period)
                .unwrap_or_else(Instant::now),
        };
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                job().await;
            }
        });
        debug!(task = name, period_ms = period.as_millis(), "Periodic task armed");
        Self { name, handle }
    }

    /// Stop the task. A run in progress is dropped at its next await point.
    pub fn cancel(&self) {
        self.handle.abort();
        debug!(task = self.name, "Periodic task cancelled");
    }

    /// Whether the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn counting_task(first: FirstRun, counter: &Arc<AtomicU32>) -> PeriodicTask {
        let counter = Arc::clone(counter);
        PeriodicTask::spawn("test", Duration::from_secs(5), first, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_task_fires_at_once_then_per_period() {
        let counter = Arc::new(AtomicU32::new(0));
        let task = counting_task(FirstRun::Immediately, &counter);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        task.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_task_waits_one_period() {
        let counter = Arc::new(AtomicU32::new(0));
        let _task = counting_task(FirstRun::AfterPeriod, &counter);

        tokio::time::sleep(Duration::from_millis(4_990)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_stops_firing() {
        let counter = Arc::new(AtomicU32::new(0));
        let task = counting_task(FirstRun::Immediately, &counter);
        tokio::time::sleep(Duration::from_millis(10)).await;
        task.cancel();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
    }
}
