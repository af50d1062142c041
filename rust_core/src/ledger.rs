//! Append-only store for accepted match events.
//!
//! The event sequence is the source of truth; scores, cards and minutes
//! are all derivable by replaying it. Read order is submission order, and
//! the minute on each event is data, never a sort key.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::models::MatchEvent;

#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Append one accepted event to its match's sequence.
    async fn append(&self, event: MatchEvent) -> Result<()>;

    /// Every event for a match, in the order it was appended.
    async fn read_all(&self, match_id: &str) -> Result<Vec<MatchEvent>>;
}

/// Process-local ledger keyed by match id.
#[derive(Default)]
pub struct InMemoryLedger {
    events: RwLock<FxHashMap<String, Vec<MatchEvent>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self, match_id: &str) -> usize {
        self.events
            .read()
            .get(match_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventLedger for InMemoryLedger {
    async fn append(&self, event: MatchEvent) -> Result<()> {
        let mut events = self.events.write();
        let sequence = events.entry(event.match_id.clone()).or_default();
        debug!(
            match_id = %event.match_id,
            kind = event.detail.kind_str(),
            minute = event.minute,
            position = sequence.len(),
            "ledger append"
        );
        sequence.push(event);
        Ok(())
    }

    async fn read_all(&self, match_id: &str) -> Result<Vec<MatchEvent>> {
        Ok(self
            .events
            .read()
            .get(match_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventDetail;
    use chrono::Utc;

    fn event(match_id: &str, minute: u8, detail: EventDetail) -> MatchEvent {
        MatchEvent::new(match_id, minute, detail, None, Utc::now())
    }

    #[tokio::test]
    async fn test_read_preserves_append_order_not_minute_order() {
        let ledger = InMemoryLedger::new();
        // a late correction arrives after later-minute events
        ledger
            .append(event("m1", 50, EventDetail::HalfTime))
            .await
            .unwrap();
        ledger
            .append(event("m1", 12, EventDetail::SecondHalf))
            .await
            .unwrap();

        let events = ledger.read_all("m1").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].minute, 50);
        assert_eq!(events[1].minute, 12);
    }

    #[tokio::test]
    async fn test_matches_are_isolated() {
        let ledger = InMemoryLedger::new();
        ledger
            .append(event("m1", 10, EventDetail::HalfTime))
            .await
            .unwrap();
        ledger
            .append(event("m2", 20, EventDetail::HalfTime))
            .await
            .unwrap();

        assert_eq!(ledger.read_all("m1").await.unwrap().len(), 1);
        assert_eq!(ledger.read_all("m2").await.unwrap().len(), 1);
        assert!(ledger.read_all("m3").await.unwrap().is_empty());
        assert_eq!(ledger.event_count("m2"), 1);
    }
}
