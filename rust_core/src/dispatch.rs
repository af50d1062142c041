use async_trait::async_trait;

use crate::models::{channels, DispatchResult, NotificationPayload};
use crate::redis::MessageBus;

/// Outbound delivery seam. Failures are reported in the result, never
/// thrown; a failed delivery must not unwind the match state that
/// produced the payload.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, payload: &NotificationPayload) -> DispatchResult;
}

/// Dispatcher that hands payloads to the notifications channel, where the
/// webhook service picks them up for delivery.
pub struct BusDispatcher {
    bus: MessageBus,
    channel: String,
}

impl BusDispatcher {
    pub fn new(bus: MessageBus) -> Self {
        Self::with_channel(bus, channels::NOTIFICATIONS)
    }

    pub fn with_channel(bus: MessageBus, channel: impl Into<String>) -> Self {
        Self {
            bus,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for BusDispatcher {
    async fn dispatch(&self, payload: &NotificationPayload) -> DispatchResult {
        match self.bus.publish(&self.channel, payload).await {
            Ok(()) => DispatchResult::ok(),
            Err(e) => DispatchResult::failed(format!("publish failed: {e:#}")),
        }
    }
}
