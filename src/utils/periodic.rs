//! Fixed-interval background tasks with an explicit start/stop lifecycle

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::errors::CircuitBreaker;

const TASK_MAX_CONSECUTIVE_ERRORS: u32 = 5;
const TASK_COOLDOWN: Duration = Duration::from_secs(60);

pub struct PeriodicTask {
    name: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// A failing tick is logged and counted; it never ends the loop.
    pub fn spawn<F, Fut>(name: impl Into<String>, period: Duration, parent: &CancellationToken, tick: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        let cancel = parent.child_token();
        let breaker = Arc::new(CircuitBreaker::new(name.clone(), TASK_MAX_CONSECUTIVE_ERRORS, TASK_COOLDOWN));

        let task_name = name.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(task = %task_name, period_ms = period.as_millis() as u64, "⏱️  Task started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if !breaker.can_proceed().await {
                            debug!(task = %task_name, "Skipping tick while breaker is open");
                            continue;
                        }
                        match tick().await {
                            Ok(()) => breaker.record_success().await,
                            Err(e) => {
                                warn!(task = %task_name, "Tick failed: {:#}", e);
                                breaker.record_error().await;
                            }
                        }
                    }
                }
            }

            info!(task = %task_name, "Task stopped");
        });

        Self { name, cancel, handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub async fn join(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(task = %self.name, "Task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn ticks_until_stopped() {
        let count = Arc::new(AtomicU32::new(0));
        let root = CancellationToken::new();
        let counter = count.clone();
        let task = PeriodicTask::spawn("counter", Duration::from_millis(5), &root, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        tokio::time::sleep(Duration::from_millis(40)).await;
        task.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!task.is_running());

        let seen = count.load(Ordering::SeqCst);
        assert!(seen >= 2);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn failing_ticks_keep_the_loop_alive() {
        let count = Arc::new(AtomicU32::new(0));
        let root = CancellationToken::new();
        let counter = count.clone();
        let task = PeriodicTask::spawn("flaky", Duration::from_millis(5), &root, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("feed unavailable"))
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(task.is_running());
        assert!(count.load(Ordering::SeqCst) >= 2);

        root.cancel();
        task.join().await;
    }
}
