use async_trait::async_trait;
use tracing::info;

use super::{UserCreated, UserRenamed};
use crate::bus::{DeliveryContext, EventHandler, InProcessBus};

/// Writes every delivered users event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogUserEvents;

#[async_trait]
impl EventHandler<UserCreated> for LogUserEvents {
    async fn handle(&self, event: &UserCreated, ctx: &DeliveryContext) -> anyhow::Result<()> {
        info!(message_id = %ctx.message_id, user_id = %event.user_id, "user created");
        Ok(())
    }
}

#[async_trait]
impl EventHandler<UserRenamed> for LogUserEvents {
    async fn handle(&self, event: &UserRenamed, ctx: &DeliveryContext) -> anyhow::Result<()> {
        info!(message_id = %ctx.message_id, user_id = %event.user_id, name = %event.name, "user renamed");
        Ok(())
    }
}

/// Subscribe [`LogUserEvents`] to every users event.
pub fn subscribe_logging(bus: &mut InProcessBus) {
    bus.subscribe::<UserCreated, _>("users.log", LogUserEvents)
        .subscribe::<UserRenamed, _>("users.log", LogUserEvents);
}
