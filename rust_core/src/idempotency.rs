//! Duplicate-submission guard for match events.
//!
//! Keys are derived from what the event says happened, never from when it
//! was submitted, so an operator double-tap or a retried webhook collapses
//! onto the key of the first attempt. Entries expire after a configurable
//! retention window; a best-effort background sweep keeps the store from
//! growing without bound.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use crate::classify::normalize_name;
use crate::models::RawMatchInput;

/// Maximum number of keys to keep before the oldest are evicted.
const MAX_ENTRIES: usize = 10_000;
/// Default retention for processed keys.
pub const DEFAULT_TTL_HOURS: i64 = 24;

/// Content hash identifying the logical event. Submission metadata such as
/// the received-at timestamp is deliberately excluded, and names and notes
/// go through the same normalization as classification so trivial
/// formatting differences collapse onto one key.
pub fn derive_key(raw: &RawMatchInput) -> String {
    let actor = raw.player.as_deref().map(normalize_name).unwrap_or_default();
    let secondary = raw
        .secondary
        .as_deref()
        .map(normalize_name)
        .unwrap_or_default();
    let card = raw
        .card
        .as_deref()
        .map(|c| c.trim().to_lowercase())
        .unwrap_or_default();
    let minute = raw.minute.map(|m| m.to_string()).unwrap_or_default();
    let notes = raw.notes.as_deref().map(normalize_name).unwrap_or_default();

    let mut hasher = Sha256::new();
    for part in [
        raw.match_id.as_str(),
        raw.kind.as_str(),
        actor.as_str(),
        secondary.as_str(),
        card.as_str(),
        minute.as_str(),
        notes.as_str(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// What was recorded when a key was first processed.
#[derive(Debug, Clone)]
pub struct ProcessedEntry {
    pub summary: String,
    pub first_seen_at: DateTime<Utc>,
}

/// Lookup and record interface for processed keys, swappable so a shared
/// store can replace the in-memory one without touching the pipeline.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn has(&self, key: &str) -> bool;
    async fn get(&self, key: &str) -> Option<ProcessedEntry>;
    async fn put(&self, key: &str, entry: ProcessedEntry, ttl: Duration);
}

/// In-memory store with TTL expiry and oldest-first eviction at capacity.
pub struct InMemoryIdempotencyStore {
    entries: Mutex<HashMap<String, (ProcessedEntry, DateTime<Utc>)>>,
    max_entries: usize,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::with_max_entries(MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(1024.min(max_entries))),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        let initial_len = entries.len();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        let removed = initial_len - entries.len();
        if removed > 0 {
            debug!("idempotency cleanup removed {} expired entries", removed);
        }
        removed
    }

    fn evict_oldest_locked(entries: &mut HashMap<String, (ProcessedEntry, DateTime<Utc>)>) {
        let mut by_age: Vec<_> = entries
            .iter()
            .map(|(key, (entry, _))| (key.clone(), entry.first_seen_at))
            .collect();
        by_age.sort_by_key(|(_, first_seen)| *first_seen);

        let to_remove = by_age.len() / 10;
        for (key, _) in by_age.iter().take(to_remove) {
            entries.remove(key);
        }
        warn!(
            "idempotency store at capacity, evicted {} oldest entries",
            to_remove
        );
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn has(&self, key: &str) -> bool {
        let now = Utc::now();
        let entries = self.entries.lock();
        matches!(entries.get(key), Some((_, expires_at)) if *expires_at > now)
    }

    async fn get(&self, key: &str) -> Option<ProcessedEntry> {
        let now = Utc::now();
        let entries = self.entries.lock();
        match entries.get(key) {
            Some((entry, expires_at)) if *expires_at > now => Some(entry.clone()),
            _ => None,
        }
    }

    async fn put(&self, key: &str, entry: ProcessedEntry, ttl: Duration) {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        if entries.len() >= self.max_entries {
            let cutoff_len = entries.len();
            entries.retain(|_, (_, expires_at)| *expires_at > now);
            if entries.len() >= self.max_entries {
                Self::evict_oldest_locked(&mut entries);
            }
            debug!(
                "idempotency store over capacity: {} -> {} entries",
                cutoff_len,
                entries.len()
            );
        }
        entries.insert(key.to_string(), (entry, now + ttl));
    }
}

/// Pipeline-facing wrapper pairing a store with the retention window.
pub struct IdempotencyGuard {
    store: Arc<dyn IdempotencyStore>,
    ttl: Duration,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn IdempotencyStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn with_default_ttl(store: Arc<dyn IdempotencyStore>) -> Self {
        Self::new(store, Duration::hours(DEFAULT_TTL_HOURS))
    }

    pub fn key_for(&self, raw: &RawMatchInput) -> String {
        derive_key(raw)
    }

    /// Entry recorded for this key, if one exists and has not expired.
    pub async fn already_processed(&self, key: &str) -> Option<ProcessedEntry> {
        self.store.get(key).await
    }

    /// Record a key once its event has been applied. Called only after the
    /// mutation commits, so a rejected submission stays retryable.
    pub async fn mark_processed(&self, key: &str, summary: impl Into<String>) {
        let entry = ProcessedEntry {
            summary: summary.into(),
            first_seen_at: Utc::now(),
        };
        self.store.put(key, entry, self.ttl).await;
    }
}

/// Background sweep of expired keys, best effort by design.
pub fn start_cleanup_task(
    store: Arc<InMemoryIdempotencyStore>,
    every: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            store.cleanup_expired();
        }
    })
}
