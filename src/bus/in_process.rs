use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use super::{DeliveryContext, EventHandler, HandlerFailure, PublishError, Publisher};
use crate::event::{DecodedEvent, DomainEvent};

type ErasedHandler = Arc<dyn Fn(DecodedEvent) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

struct Subscription {
    name: String,
    handler: ErasedHandler,
}

/// Fans decoded events out to every handler registered for their type.
///
/// Handlers run one after another in registration order. A handler that
/// returns `Err` or panics does not stop the others; all failures are
/// collected into one [`PublishError`].
#[derive(Default)]
pub struct InProcessBus {
    subscriptions: HashMap<String, Vec<Subscription>>,
}

impl InProcessBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `E` under a name used in logs
    /// and failure reports.
    pub fn subscribe<E, H>(&mut self, name: impl Into<String>, handler: H) -> &mut Self
    where
        E: DomainEvent,
        H: EventHandler<E>,
    {
        let handler = Arc::new(handler);
        let erased: ErasedHandler = Arc::new(move |event: DecodedEvent| {
            let handler = Arc::clone(&handler);
            async move {
                let ctx = DeliveryContext::from(&event);
                let payload = event.downcast_ref::<E>().ok_or_else(|| {
                    anyhow::anyhow!("payload for '{}' is not the registered type", ctx.event_type)
                })?;
                handler.handle(payload, &ctx).await
            }
            .boxed()
        });

        self.subscriptions
            .entry(E::EVENT_TYPE.to_string())
            .or_default()
            .push(Subscription {
                name: name.into(),
                handler: erased,
            });
        self
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.subscriptions.get(event_type).map_or(0, Vec::len)
    }
}

impl fmt::Debug for InProcessBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self
            .subscriptions
            .iter()
            .map(|(event_type, subs)| (event_type.as_str(), subs.len()))
            .collect();
        types.sort();
        f.debug_struct("InProcessBus").field("subscriptions", &types).finish()
    }
}

#[async_trait]
impl Publisher for InProcessBus {
    async fn publish(&self, event: &DecodedEvent) -> Result<(), PublishError> {
        let Some(subscriptions) = self.subscriptions.get(&event.event_type) else {
            debug!(event_type = %event.event_type, "no subscribers");
            return Ok(());
        };

        let mut failures = Vec::new();
        for sub in subscriptions {
            let outcome = AssertUnwindSafe((sub.handler)(event.clone()))
                .catch_unwind()
                .await;

            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => format!("{err:#}"),
                Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
            };

            warn!(
                message_id = %event.message_id,
                event_type = %event.event_type,
                handler = %sub.name,
                %error,
                "event handler failed"
            );
            failures.push(HandlerFailure {
                handler: sub.name.clone(),
                error,
            });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PublishError::HandlersFailed {
                event_type: event.event_type.clone(),
                failures,
            })
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
