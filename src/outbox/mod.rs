//! Transactional outbox: staging rows on save and delivering them later.

mod dispatcher;
mod message;
mod processor;
mod scheduler;
mod store;

pub use dispatcher::{DispatchError, DomainEventDispatcher};
pub use message::{OutboxMessage, OutboxStatus};
pub use processor::{DrainResult, OutboxProcessor, DEFAULT_BATCH_SIZE};
pub use scheduler::{OutboxScheduler, SchedulerHandle, SchedulerStats};
pub use store::OutboxStore;
