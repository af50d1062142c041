//! Webhook Dispatch Rust Service
//!
//! Outbound delivery for assembled match notifications.
//!
//! This service:
//! - Consumes notification payloads from the Redis bus
//! - POSTs each one to the configured webhook URL with a bounded timeout
//! - Makes a single attempt per payload; failures are logged and counted,
//!   never retried here, and never fed back into match state

mod client;
mod config;
mod formatters;

use anyhow::Result;
use client::WebhookClient;
use config::Config;
use dotenv::dotenv;
use futures_util::StreamExt;
use log::{error, info, warn};
use matchday_rust_core::models::{channels, NotificationPayload};
use matchday_rust_core::redis::MessageBus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Delivery counters for the periodic stats line
#[derive(Default)]
struct Metrics {
    received: AtomicU64,
    delivered: AtomicU64,
    parse_errors: AtomicU64,
    delivery_errors: AtomicU64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    info!("Starting Webhook Dispatch Rust Service...");

    let config = Config::from_env()?;
    info!(
        "Config: url={} timeout={:?} auth={}",
        config.webhook_url,
        config.request_timeout,
        if config.auth_token.is_some() { "bearer" } else { "none" }
    );

    let client = WebhookClient::new(
        config.webhook_url.clone(),
        config.request_timeout,
        config.auth_token.clone(),
    )?;

    let bus = MessageBus::new().await?;
    info!("Connected to Redis");

    let metrics = Arc::new(Metrics::default());

    let stats_metrics = metrics.clone();
    let stats_interval = config.stats_interval;
    tokio::spawn(async move {
        stats_logging_loop(stats_metrics, stats_interval).await;
    });

    consume_loop(bus, client, metrics).await
}

async fn consume_loop(bus: MessageBus, client: WebhookClient, metrics: Arc<Metrics>) -> Result<()> {
    loop {
        let mut pubsub = match bus.subscribe(channels::NOTIFICATIONS).await {
            Ok(p) => p,
            Err(e) => {
                error!("Subscribe failed: {}, retrying in 5s", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };
        info!("Subscribed to {}", channels::NOTIFICATIONS);

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            let payload_bytes: Vec<u8> = match msg.get_payload::<Vec<u8>>() {
                Ok(p) => p,
                Err(e) => {
                    warn!("Payload read error: {}", e);
                    continue;
                }
            };
            metrics.received.fetch_add(1, Ordering::Relaxed);

            let payload: NotificationPayload = match serde_json::from_slice(&payload_bytes) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Payload JSON parse error: {}", e);
                    metrics.parse_errors.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            let summary = formatters::summary_line(&payload);
            match client.send(&payload).await {
                Ok(()) => {
                    info!("Delivered: {} [{}]", summary, payload.match_id);
                    metrics.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    error!("Delivery failed: {} [{}]: {:#}", summary, payload.match_id, e);
                    metrics.delivery_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        // Brief delay before reconnect
        warn!("Notification stream ended, reconnecting in 2s");
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

async fn stats_logging_loop(metrics: Arc<Metrics>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        info!(
            "Stats: received={} delivered={} parse_errors={} delivery_errors={}",
            metrics.received.load(Ordering::Relaxed),
            metrics.delivered.load(Ordering::Relaxed),
            metrics.parse_errors.load(Ordering::Relaxed),
            metrics.delivery_errors.load(Ordering::Relaxed),
        );
    }
}
