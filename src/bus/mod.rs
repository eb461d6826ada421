//! In-process delivery of decoded outbox rows.
//!
//! ```text
//! OutboxProcessor ──publish(&DecodedEvent)──▶ Publisher
//!                                               │
//!                                   InProcessBus (fan-out)
//!                                    │     │     │
//!                          EventHandler<E> per subscription
//! ```

mod handler;
mod in_process;
mod publisher;

pub use handler::{DeliveryContext, EventHandler};
pub use in_process::InProcessBus;
pub use publisher::{HandlerFailure, PublishError, Publisher};
