//! Match Engine Rust Service
//!
//! Per-match coordination for match-day content automation.
//!
//! This service:
//! - Consumes operator input and match open/close commands from Redis
//! - Runs one task per open match so its state has a single writer
//! - Drives the core pipeline: duplicate guard, lifecycle gate,
//!   classification, derived-state fold, payload assembly
//! - Publishes notification payloads, anomalies and state snapshots
//!   back onto the bus

mod config;
mod engine;

use anyhow::Result;
use config::EngineConfig;
use dotenv::dotenv;
use engine::MatchEngine;
use log::info;
use matchday_rust_core::redis::MessageBus;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    info!("Starting Match Engine Rust Service...");

    let config = EngineConfig::from_env();
    info!(
        "Config: regulation={}m dispatch_timeout={:?} idempotency_ttl={}h",
        config.regulation_minutes, config.dispatch_timeout, config.idempotency_ttl_hours
    );

    let bus = MessageBus::new().await?;
    info!("Connected to Redis");

    let engine = MatchEngine::new(bus, config);
    engine.start().await?;

    // Keep running
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    }
}
