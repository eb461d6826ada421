//! Background task that drives an [`OutboxProcessor`] on a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::{OutboxProcessor, OutboxStore};
use crate::bus::Publisher;

/// Counters accumulated over the lifetime of a scheduler task.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchedulerStats {
    pub polls: usize,
    pub messages_processed: usize,
    pub messages_failed: usize,
    pub fetch_errors: usize,
}

pub struct OutboxScheduler;

impl OutboxScheduler {
    /// Spawn the polling loop on the current tokio runtime.
    ///
    /// Batches run one at a time inside a single loop; a tick that comes due
    /// while a batch is running is skipped rather than queued.
    ///
    /// ```ignore
    /// let handle = OutboxScheduler::spawn(processor, Duration::from_secs(30));
    /// // ...
    /// let stats = handle.stop().await;
    /// ```
    pub fn spawn<S, P>(processor: OutboxProcessor<S, P>, interval: Duration) -> SchedulerHandle
    where
        S: OutboxStore + 'static,
        P: Publisher + 'static,
    {
        let cancel = CancellationToken::new();
        let trigger = Arc::new(Notify::new());
        let interval = interval.max(Duration::from_millis(1));

        let task = tokio::spawn(run(processor, interval, cancel.clone(), Arc::clone(&trigger)));

        SchedulerHandle {
            cancel,
            trigger,
            task,
        }
    }
}

async fn run<S, P>(
    processor: OutboxProcessor<S, P>,
    interval: Duration,
    cancel: CancellationToken,
    trigger: Arc<Notify>,
) -> SchedulerStats
where
    S: OutboxStore,
    P: Publisher,
{
    let mut stats = SchedulerStats::default();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(interval_ms = interval.as_millis() as u64, batch_size = processor.batch_size(), "outbox scheduler started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
            _ = trigger.notified() => {}
        }

        stats.polls += 1;
        match processor.process_batch(&cancel).await {
            Ok(result) => {
                stats.messages_processed += result.processed;
                stats.messages_failed += result.failed;
            }
            Err(err) => {
                stats.fetch_errors += 1;
                error!(error = %err, "failed to fetch outbox batch");
            }
        }
    }

    info!(
        polls = stats.polls,
        processed = stats.messages_processed,
        failed = stats.messages_failed,
        "outbox scheduler stopped"
    );
    stats
}

/// Control handle for a running [`OutboxScheduler`] task.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    trigger: Arc<Notify>,
    task: JoinHandle<SchedulerStats>,
}

impl SchedulerHandle {
    /// Ask for a batch now. It runs on the scheduler loop after any batch
    /// already in flight.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait for the loop to exit. A batch in flight finishes its
    /// current row and skips the rest.
    pub async fn stop(self) -> SchedulerStats {
        self.cancel.cancel();
        match self.task.await {
            Ok(stats) => stats,
            Err(err) => {
                error!(error = %err, "outbox scheduler task did not exit cleanly");
                SchedulerStats::default()
            }
        }
    }
}
