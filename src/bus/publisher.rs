//! Core publisher trait for delivering decoded outbox rows.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::event::DecodedEvent;

/// One handler that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub handler: String,
    pub error: String,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.handler, self.error)
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{} handler(s) failed for '{event_type}': {}", .failures.len(), join(.failures))]
    HandlersFailed {
        event_type: String,
        failures: Vec<HandlerFailure>,
    },
}

fn join(failures: &[HandlerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Delivers a decoded event to whoever is interested.
///
/// `Ok(())` means every interested party handled it, which includes the case
/// where nobody is interested.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, event: &DecodedEvent) -> Result<(), PublishError>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
    async fn publish(&self, event: &DecodedEvent) -> Result<(), PublishError> {
        (**self).publish(event).await
    }
}
