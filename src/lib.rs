//! Transactional outbox and domain-event dispatch.
//!
//! Aggregates raise [`DomainEvent`]s on an embedded [`Entity`]. A
//! [`UnitOfWork`] turns them into [`OutboxMessage`] rows inside the same
//! session as the state change, and an [`OutboxProcessor`] driven by an
//! [`OutboxScheduler`] later delivers the rows to in-process subscribers.

mod aggregate;
pub mod bus;
pub mod clock;
pub mod config;
mod entity;
mod error;
pub mod event;
pub mod memory;
pub mod outbox;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod telemetry;
pub mod uow;
pub mod users;

pub use aggregate::Aggregate;
pub use bus::{DeliveryContext, EventHandler, InProcessBus, PublishError, Publisher};
pub use clock::{Clock, ManualClock, SystemClock};
pub use self::config::AppConfig;
pub use entity::{Committable, Entity};
pub use error::PersistenceError;
pub use event::{DecodeError, DecodedEvent, DomainEvent, EventRegistry, RaisedEvent};
pub use memory::{InMemoryDatabase, InMemorySession};
pub use outbox::{
    DispatchError, DomainEventDispatcher, DrainResult, OutboxMessage, OutboxProcessor,
    OutboxScheduler, OutboxStatus, OutboxStore, SchedulerHandle, SchedulerStats,
};
pub use uow::{Database, SaveError, Session, UnitOfWork};
