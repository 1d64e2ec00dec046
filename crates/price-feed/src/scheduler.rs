//! Periodic refresh with a cancellable handle
//!
//! The handle owns the background task: `cancel()` or dropping it stops the
//! recurring work, so a torn-down view never leaks a timer.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

pub struct RefreshScheduler {
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Run `task` every `period`, first run one period from now
    ///
    /// A run that is still in progress when the next tick is due delays that
    /// tick instead of overlapping with it.
    pub fn start<F, Fut>(period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));
        // Deadline counts from this call, not from the task's first poll
        let first_tick = Instant::now() + period;

        let handle = {
            let running = Arc::clone(&running);
            let ticks = Arc::clone(&ticks);

            tokio::spawn(async move {
                let mut interval = interval_at(first_tick, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    interval.tick().await;

                    if !running.load(Ordering::Acquire) {
                        break;
                    }

                    let n = ticks.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!("Scheduled refresh #{}", n);
                    task().await;
                }
            })
        };

        info!("Auto refresh every {:?}", period);

        Self {
            running,
            ticks,
            handle: Some(handle),
        }
    }

    /// Number of scheduled runs started so far
    pub fn tick_count(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.handle.is_some()
    }

    /// Stop the recurring task; idempotent
    pub fn cancel(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Auto refresh cancelled");
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
