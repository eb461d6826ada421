use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Delivery state derived from the nullable outcome columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    Pending,
    Processed,
    Failed,
}

/// A durable record of one domain event awaiting delivery.
///
/// Only `processed_on_utc` and `error` ever change, and only out of the
/// pending state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub occurred_on_utc: DateTime<Utc>,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub processed_on_utc: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl OutboxMessage {
    pub fn new(
        id: Uuid,
        occurred_on_utc: DateTime<Utc>,
        event_type: impl Into<String>,
        event_data: serde_json::Value,
    ) -> Self {
        Self {
            id,
            occurred_on_utc,
            event_type: event_type.into(),
            event_data,
            processed_on_utc: None,
            error: None,
        }
    }

    pub fn status(&self) -> OutboxStatus {
        if self.processed_on_utc.is_some() {
            OutboxStatus::Processed
        } else if self.error.is_some() {
            OutboxStatus::Failed
        } else {
            OutboxStatus::Pending
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status() == OutboxStatus::Pending
    }

    pub fn is_processed(&self) -> bool {
        self.status() == OutboxStatus::Processed
    }

    pub fn is_failed(&self) -> bool {
        self.status() == OutboxStatus::Failed
    }

    /// Pending → Processed. Returns false if the row already left pending.
    pub fn complete(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.processed_on_utc = Some(at);
        true
    }

    /// Pending → Failed. Returns false if the row already left pending.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.error = Some(error.into());
        true
    }

    /// Failed → Pending, for manual re-queue. Processed rows stay processed.
    pub fn requeue(&mut self) -> bool {
        if !self.is_failed() {
            return false;
        }
        self.error = None;
        true
    }
}
