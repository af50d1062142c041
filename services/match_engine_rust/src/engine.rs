use anyhow::Result;
use chrono::Utc;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use matchday_rust_core::dispatch::BusDispatcher;
use matchday_rust_core::idempotency::{
    start_cleanup_task, IdempotencyGuard, InMemoryIdempotencyStore,
};
use matchday_rust_core::ledger::InMemoryLedger;
use matchday_rust_core::models::{channels, Anomaly, RawMatchInput};
use matchday_rust_core::processor::{EventOutcome, MatchProcessor, ProcessorConfig};
use matchday_rust_core::redis::MessageBus;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::config::EngineConfig;

/// Per-match coordinator. Every open match gets one dedicated task fed by
/// an mpsc queue, so all submissions for a match apply in arrival order
/// with no concurrent writer.
#[derive(Clone)]
pub struct MatchEngine {
    bus: MessageBus,
    config: EngineConfig,
    matches: Arc<Mutex<HashMap<String, MatchEntry>>>,
    ledger: Arc<InMemoryLedger>,
    idempotency: Arc<InMemoryIdempotencyStore>,
}

struct MatchEntry {
    queue: mpsc::Sender<RawMatchInput>,
    task: tokio::task::JoinHandle<()>,
}

#[derive(Debug, Deserialize)]
struct ControlCommand {
    action: String,
    match_id: Option<String>,
    #[serde(default)]
    is_home_team: Option<bool>,
}

/// Anomaly as published for human review, tied back to its match.
#[derive(Debug, Serialize)]
struct AnomalyRecord<'a> {
    match_id: &'a str,
    event_kind: &'a str,
    minute: u8,
    #[serde(flatten)]
    anomaly: &'a Anomaly,
    ts: String,
}

impl MatchEngine {
    pub fn new(bus: MessageBus, config: EngineConfig) -> Self {
        Self {
            bus,
            config,
            matches: Arc::new(Mutex::new(HashMap::new())),
            ledger: Arc::new(InMemoryLedger::new()),
            idempotency: Arc::new(InMemoryIdempotencyStore::new()),
        }
    }

    pub async fn start(&self) -> Result<()> {
        info!("Starting MatchEngine");

        start_cleanup_task(self.idempotency.clone(), self.config.cleanup_interval);

        let heartbeat_engine = self.clone();
        tokio::spawn(async move {
            if let Err(e) = heartbeat_engine.heartbeat_loop().await {
                error!("Heartbeat loop exited: {}", e);
            }
        });

        let consume_engine = self.clone();
        tokio::spawn(async move {
            if let Err(e) = consume_engine.consume_loop().await {
                error!("Consume loop exited: {}", e);
            }
        });

        Ok(())
    }

    pub async fn open_match(&self, match_id: String, is_home_team: bool) -> Result<()> {
        let mut matches = self.matches.lock().await;
        if matches.contains_key(&match_id) {
            warn!("Match already open: {}", match_id);
            return Ok(());
        }
        info!(
            "Opening match: {} (tracked team {})",
            match_id,
            if is_home_team { "home" } else { "away" }
        );

        let guard = IdempotencyGuard::new(
            self.idempotency.clone(),
            chrono::Duration::hours(self.config.idempotency_ttl_hours),
        );
        let processor = MatchProcessor::new(
            match_id.clone(),
            is_home_team,
            ProcessorConfig {
                regulation_minutes: self.config.regulation_minutes,
                dispatch_timeout: self.config.dispatch_timeout,
            },
            self.ledger.clone(),
            guard,
        )
        .with_dispatcher(Arc::new(BusDispatcher::new(self.bus.clone())));

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let bus = self.bus.clone();
        let mid = match_id.clone();
        let task = tokio::spawn(async move {
            run_match(mid, rx, processor, bus).await;
        });

        matches.insert(match_id, MatchEntry { queue: tx, task });
        Ok(())
    }

    pub async fn close_match(&self, match_id: &str) -> Result<()> {
        let mut matches = self.matches.lock().await;
        match matches.remove(match_id) {
            Some(entry) => {
                info!("Closing match: {}", match_id);
                // dropping the queue lets the task drain and finish
                drop(entry.queue);
                let _ = entry.task;
            }
            None => warn!("close_match for unknown match: {}", match_id),
        }
        Ok(())
    }

    /// Interleaved operator input and control traffic, one subscription.
    async fn consume_loop(&self) -> Result<()> {
        let mut pubsub = self
            .bus
            .subscribe_many(&[channels::MATCH_EVENTS, channels::MATCH_CONTROL])
            .await?;
        info!(
            "Subscribed to {} and {}",
            channels::MATCH_EVENTS,
            channels::MATCH_CONTROL
        );

        let mut stream = pubsub.on_message();
        while let Some(msg) = stream.next().await {
            let channel: String = match msg.get_channel::<String>() {
                Ok(c) => c,
                Err(_) => continue,
            };
            let payload: Vec<u8> = match msg.get_payload::<Vec<u8>>() {
                Ok(p) => p,
                Err(e) => {
                    warn!("Payload read error on {}: {}", channel, e);
                    continue;
                }
            };

            if channel == channels::MATCH_CONTROL {
                self.handle_control(&payload).await;
            } else {
                self.handle_event(&payload).await;
            }
        }

        Ok(())
    }

    async fn handle_control(&self, payload: &[u8]) {
        let command: ControlCommand = match serde_json::from_slice(payload) {
            Ok(c) => c,
            Err(e) => {
                warn!("Control JSON parse error: {}", e);
                return;
            }
        };

        match command.action.as_str() {
            "open_match" => match (command.match_id, command.is_home_team) {
                (Some(match_id), Some(is_home_team)) => {
                    if let Err(e) = self.open_match(match_id, is_home_team).await {
                        error!("Failed to open match: {}", e);
                    }
                }
                _ => warn!("open_match command missing match_id or is_home_team"),
            },
            "close_match" => match command.match_id {
                Some(match_id) => {
                    if let Err(e) = self.close_match(&match_id).await {
                        error!("Failed to close match: {}", e);
                    }
                }
                None => warn!("close_match command missing match_id"),
            },
            other => warn!("Unknown control action: {}", other),
        }
    }

    async fn handle_event(&self, payload: &[u8]) {
        let raw: RawMatchInput = match serde_json::from_slice(payload) {
            Ok(r) => r,
            Err(e) => {
                warn!("Event JSON parse error: {}", e);
                return;
            }
        };

        let matches = self.matches.lock().await;
        match matches.get(&raw.match_id) {
            Some(entry) => {
                // home/away cannot be guessed for an unopened match, so
                // only explicitly opened matches accept events
                if let Err(e) = entry.queue.send(raw).await {
                    error!("Match queue send failed: {}", e);
                }
            }
            None => warn!(
                "Dropping {} event for unopened match {}",
                raw.kind, raw.match_id
            ),
        }
    }

    async fn heartbeat_loop(&self) -> Result<()> {
        let instance_id = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());

        loop {
            let match_ids = {
                let matches = self.matches.lock().await;
                matches.keys().cloned().collect::<Vec<_>>()
            };

            let payload = json!({
                "service": "match_engine_rust",
                "instance_id": instance_id,
                "open_matches": match_ids.len(),
                "matches": match_ids,
                "timestamp": Utc::now().to_rfc3339(),
            });

            if let Err(e) = self.bus.publish(channels::HEALTH_HEARTBEATS, &payload).await {
                warn!("Heartbeat publish error: {}", e);
            }

            tokio::time::sleep(self.config.heartbeat_interval).await;
        }
    }
}

/// One match's serialized processing loop. Runs until the engine drops the
/// sending side of the queue.
async fn run_match(
    match_id: String,
    mut queue: mpsc::Receiver<RawMatchInput>,
    mut processor: MatchProcessor,
    bus: MessageBus,
) {
    while let Some(raw) = queue.recv().await {
        match processor.submit(&raw).await {
            Ok(EventOutcome::Applied {
                event, anomalies, ..
            }) => {
                info!(
                    "Match {}: applied {} at {}'",
                    match_id,
                    event.detail.kind_str(),
                    event.minute
                );

                for anomaly in &anomalies {
                    let record = AnomalyRecord {
                        match_id: &match_id,
                        event_kind: event.detail.kind_str(),
                        minute: event.minute,
                        anomaly,
                        ts: Utc::now().to_rfc3339(),
                    };
                    if let Err(e) = bus.publish(channels::ANOMALIES, &record).await {
                        warn!("Anomaly publish error: {}", e);
                    }
                }

                if let Err(e) = bus.publish(channels::MATCH_STATE, &processor.snapshot()).await {
                    warn!("Snapshot publish error: {}", e);
                }
            }
            Ok(EventOutcome::DuplicateNoOp { key, .. }) => {
                debug!(
                    "Match {}: duplicate {} submission ignored (key {})",
                    match_id,
                    raw.kind,
                    &key[..12.min(key.len())]
                );
            }
            Err(e) => {
                warn!("Match {}: rejected {} event: {}", match_id, raw.kind, e);
            }
        }
    }
    info!("Match task finished: {}", match_id);
}
