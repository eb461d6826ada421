use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::{OutboxMessage, OutboxStore};
use crate::bus::Publisher;
use crate::clock::{Clock, SystemClock};
use crate::error::PersistenceError;
use crate::event::EventRegistry;

pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Outcome of one [`OutboxProcessor::process_batch`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainResult {
    /// Rows returned by the fetch.
    pub selected: usize,
    pub processed: usize,
    pub failed: usize,
    /// Rows whose outcome could not be recorded. They stay pending.
    pub unpersisted: usize,
    /// Set when cancellation stopped the batch before every row was attempted.
    pub cancelled: bool,
}

impl DrainResult {
    pub fn attempted(&self) -> usize {
        self.processed + self.failed + self.unpersisted
    }
}

enum Delivery {
    Delivered,
    Failed(String),
}

/// Delivers pending outbox rows to a [`Publisher`].
///
/// Each row's outcome is written as soon as that row is done, so a crash
/// mid-batch redelivers at most the row in flight.
pub struct OutboxProcessor<S, P> {
    store: S,
    publisher: P,
    registry: Arc<EventRegistry>,
    clock: Arc<dyn Clock>,
    batch_size: usize,
}

impl<S: OutboxStore, P: Publisher> OutboxProcessor<S, P> {
    pub fn new(store: S, publisher: P, registry: Arc<EventRegistry>) -> Self {
        Self {
            store,
            publisher,
            registry,
            clock: Arc::new(SystemClock),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the maximum number of rows per batch. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Deliver up to `batch_size` pending rows, oldest first.
    ///
    /// # Errors
    ///
    /// Only a failure to fetch the batch is returned. Per-row failures are
    /// recorded on the row, and failures to record them are counted in
    /// [`DrainResult::unpersisted`].
    #[instrument(skip_all, fields(batch_size = self.batch_size))]
    pub async fn process_batch(&self, cancel: &CancellationToken) -> Result<DrainResult, PersistenceError> {
        let messages = self.store.fetch_unprocessed(self.batch_size).await?;
        let mut result = DrainResult {
            selected: messages.len(),
            ..DrainResult::default()
        };

        if messages.is_empty() {
            return Ok(result);
        }

        for message in &messages {
            if cancel.is_cancelled() {
                info!(remaining = result.selected - result.attempted(), "outbox batch cancelled");
                result.cancelled = true;
                break;
            }

            match self.deliver(message).await {
                Delivery::Delivered => {
                    match self.store.mark_processed(message.id, self.clock.now()).await {
                        Ok(true) => result.processed += 1,
                        Ok(false) => {
                            warn!(message_id = %message.id, "outbox message left pending state during delivery");
                            result.unpersisted += 1;
                        }
                        Err(err) => {
                            error!(message_id = %message.id, error = %err, "failed to mark outbox message processed");
                            result.unpersisted += 1;
                        }
                    }
                }
                Delivery::Failed(reason) => {
                    warn!(
                        message_id = %message.id,
                        event_type = %message.event_type,
                        error = %reason,
                        "outbox message delivery failed"
                    );
                    match self.store.mark_failed(message.id, &reason).await {
                        Ok(true) => result.failed += 1,
                        Ok(false) => {
                            warn!(message_id = %message.id, "outbox message left pending state during delivery");
                            result.unpersisted += 1;
                        }
                        Err(err) => {
                            error!(message_id = %message.id, error = %err, "failed to mark outbox message failed");
                            result.unpersisted += 1;
                        }
                    }
                }
            }
        }

        info!(
            selected = result.selected,
            processed = result.processed,
            failed = result.failed,
            unpersisted = result.unpersisted,
            "outbox batch complete"
        );
        Ok(result)
    }

    async fn deliver(&self, message: &OutboxMessage) -> Delivery {
        let event = match self.registry.decode(message) {
            Ok(event) => event,
            Err(err) => return Delivery::Failed(err.to_string()),
        };

        match self.publisher.publish(&event).await {
            Ok(()) => {
                info!(message_id = %message.id, event_type = %message.event_type, "outbox message delivered");
                Delivery::Delivered
            }
            Err(err) => Delivery::Failed(err.to_string()),
        }
    }
}
