//! Worker that drives the PCH task queue.

use crate::queue::{PchTaskQueue, TickOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, watch};
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info};

/// Runs [`PchTaskQueue::process_entries`] on a fixed interval and whenever a
/// scheduler reports a finished task.
pub struct QueueWorker {
    queue: Arc<Mutex<PchTaskQueue>>,
    tick_interval: Duration,
    wakeup: Arc<Notify>,
}

impl QueueWorker {
    /// `wakeup` should be the notifier the schedulers signal on completion.
    pub fn new(queue: Arc<Mutex<PchTaskQueue>>, tick_interval: Duration, wakeup: Arc<Notify>) -> Self {
        Self {
            queue,
            tick_interval,
            wakeup,
        }
    }

    /// Shared handle for producers adding or removing tasks.
    pub fn queue(&self) -> Arc<Mutex<PchTaskQueue>> {
        self.queue.clone()
    }

    /// Process pending entries once.
    pub async fn tick(&self) -> TickOutcome {
        let outcome = self.queue.lock().await.process_entries();
        if outcome != TickOutcome::default() {
            debug!(
                system = outcome.system_admitted,
                project = outcome.project_admitted,
                "Tick admitted tasks"
            );
        }
        outcome
    }

    /// Run the worker loop until `shutdown` turns true or its sender is
    /// dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.tick_interval.as_millis() as u64, "Starting PCH queue worker");

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.wakeup.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }

            self.tick().await;
        }

        info!("Stopping PCH queue worker");
    }

    /// Keep ticking until nothing is pending and both schedulers are idle.
    pub async fn run_until_drained(&self) {
        loop {
            let notified = self.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let stats = {
                let mut queue = self.queue.lock().await;
                queue.process_entries();
                queue.stats()
            };

            if stats.is_idle() {
                debug!("PCH queue drained");
                return;
            }

            tokio::select! {
                _ = notified => {}
                _ = sleep(self.tick_interval) => {}
            }
        }
    }
}
