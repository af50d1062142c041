use anyhow::{Context, Result};
use redis::{aio::Connection, AsyncCommands, Client};
use serde::Serialize;
use std::env;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared pub/sub handle for the match-day services. Publishing reuses one
/// connection behind a lock; each subscription gets a dedicated connection
/// handed off to the consuming task.
#[derive(Clone)]
pub struct MessageBus {
    client: Client,
    connection: Arc<Mutex<Connection>>,
}

impl MessageBus {
    pub async fn new() -> Result<Self> {
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::with_url(&redis_url).await
    }

    pub async fn with_url(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).context("invalid redis url")?;
        let connection = client
            .get_async_connection()
            .await
            .context("failed to connect to redis")?;
        Ok(Self {
            client,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    pub async fn publish<T: Serialize>(&self, channel: &str, message: &T) -> Result<()> {
        let payload = serde_json::to_string(message)?;
        let mut conn = self.connection.lock().await;
        conn.publish::<_, _, ()>(channel, payload)
            .await
            .context("failed to publish message")?;
        Ok(())
    }

    pub async fn subscribe(&self, channel: &str) -> Result<redis::aio::PubSub> {
        self.subscribe_many(&[channel]).await
    }

    /// One pub/sub connection covering several channels, so a consumer can
    /// interleave event and control traffic in a single loop.
    pub async fn subscribe_many(&self, channels: &[&str]) -> Result<redis::aio::PubSub> {
        let conn = self.client.get_async_connection().await?;
        let mut pubsub = conn.into_pubsub();
        for channel in channels {
            pubsub
                .subscribe(*channel)
                .await
                .with_context(|| format!("failed to subscribe to {channel}"))?;
        }
        Ok(pubsub)
    }
}
