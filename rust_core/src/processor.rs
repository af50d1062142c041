//! Per-match processing pipeline: duplicate guard, lifecycle gate,
//! classification, the event-log fold, payload assembly and dispatch.
//!
//! One processor owns one match. The shard layer above serializes callers,
//! so nothing here needs interior locking, and state always commits before
//! anything outbound happens.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::assembler::assemble;
use crate::classify::{classify, Classified, PlayerRegistry};
use crate::discipline::DisciplineLog;
use crate::dispatch::NotificationDispatcher;
use crate::errors::ValidationError;
use crate::idempotency::IdempotencyGuard;
use crate::ledger::EventLedger;
use crate::lifecycle;
use crate::models::{
    Anomaly, CardDetail, DispatchResult, EventDetail, MatchEvent, MatchPhase, MatchSnapshot,
    NotificationPayload, RawMatchInput, Score,
};
use crate::pitch_time::PitchTimeLedger;
use crate::scoreboard::apply_goal;

/// Tunables for one match's processing.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Scheduled match length, used when a transition arrives without a
    /// minute and as the fallback close minute at full time.
    pub regulation_minutes: u8,
    /// Ceiling on one outbound delivery attempt. Applies only to the
    /// dispatcher call, never to state handling.
    pub dispatch_timeout: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            regulation_minutes: 90,
            dispatch_timeout: Duration::from_secs(5),
        }
    }
}

/// All derived state for one match. Everything in here is a cache of the
/// event sequence and can be rebuilt by replaying it.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchContext {
    pub match_id: String,
    pub is_home_team: bool,
    pub phase: MatchPhase,
    pub score: Score,
    pub pitch: PitchTimeLedger,
    pub discipline: DisciplineLog,
    pub registry: PlayerRegistry,
    pub events_applied: u64,
    pub anomaly_count: u64,
}

impl MatchContext {
    pub fn new(match_id: impl Into<String>, is_home_team: bool) -> Self {
        Self {
            match_id: match_id.into(),
            is_home_team,
            phase: MatchPhase::Pre,
            score: Score::default(),
            pitch: PitchTimeLedger::new(),
            discipline: DisciplineLog::default(),
            registry: PlayerRegistry::new(),
            events_applied: 0,
            anomaly_count: 0,
        }
    }

    /// The single fold step shared by the live path and replay. Every
    /// derived cache moves here and nowhere else, which is what keeps a
    /// replayed context identical to the live one.
    pub fn apply_event(&mut self, event: &MatchEvent) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        match &event.detail {
            EventDetail::Goal(goal) => {
                apply_goal(&mut self.score, goal, self.is_home_team);
            }
            EventDetail::Card(detail) => {
                self.discipline.record(event.minute, detail);
                if let CardDetail::Tracked { player, card } = detail {
                    if card.is_orphaned() {
                        anomalies.push(Anomaly::OrphanedSecondYellow {
                            player_id: player.player_id.clone(),
                            minute: event.minute,
                        });
                    }
                }
            }
            EventDetail::Substitution {
                player_off,
                player_on,
            } => {
                anomalies.extend(self.pitch.substitution(event.minute, player_off, player_on));
            }
            EventDetail::KickOff { lineup } => {
                anomalies.extend(self.pitch.kickoff(lineup));
                self.phase = MatchPhase::First;
            }
            EventDetail::HalfTime => self.phase = MatchPhase::HalfTime,
            EventDetail::SecondHalf => self.phase = MatchPhase::Second,
            EventDetail::FullTime => {
                anomalies.extend(self.pitch.full_time(event.minute));
                self.phase = MatchPhase::Full;
            }
        }
        for player in event.detail.players() {
            self.registry.register(player.clone());
        }
        self.events_applied += 1;
        self.anomaly_count += anomalies.len() as u64;
        anomalies
    }

    /// Rebuild a context by folding an event sequence from scratch.
    pub fn replay(
        match_id: impl Into<String>,
        is_home_team: bool,
        events: &[MatchEvent],
    ) -> Self {
        let mut ctx = Self::new(match_id, is_home_team);
        for event in events {
            ctx.apply_event(event);
        }
        ctx
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            match_id: self.match_id.clone(),
            phase: self.phase,
            is_home_team: self.is_home_team,
            home_score: self.score.home,
            away_score: self.score.away,
            on_pitch: self.pitch.on_pitch_ids(),
            events_applied: self.events_applied,
            anomaly_count: self.anomaly_count,
            updated_at: Utc::now(),
        }
    }
}

/// What one submission produced.
#[derive(Debug, Clone)]
pub enum EventOutcome {
    /// Accepted and applied; the payload was assembled and, when a
    /// dispatcher is attached, a delivery was attempted.
    Applied {
        event: MatchEvent,
        anomalies: Vec<Anomaly>,
        payload: NotificationPayload,
        dispatch: Option<DispatchResult>,
    },
    /// Same logical event seen before; nothing changed and the caller can
    /// treat the submission as already handled.
    DuplicateNoOp {
        key: String,
        first_seen_at: Option<DateTime<Utc>>,
    },
}

impl EventOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EventOutcome::Applied { .. })
    }
}

/// Submission failure. Validation rejections happen before any mutation
/// and are safe to resubmit once corrected; a ledger failure likewise
/// leaves the event unmarked so a retry is clean.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("ledger append failed: {0}")]
    Ledger(anyhow::Error),
}

pub struct MatchProcessor {
    ctx: MatchContext,
    config: ProcessorConfig,
    ledger: Arc<dyn EventLedger>,
    guard: IdempotencyGuard,
    dispatcher: Option<Arc<dyn NotificationDispatcher>>,
}

impl MatchProcessor {
    pub fn new(
        match_id: impl Into<String>,
        is_home_team: bool,
        config: ProcessorConfig,
        ledger: Arc<dyn EventLedger>,
        guard: IdempotencyGuard,
    ) -> Self {
        Self {
            ctx: MatchContext::new(match_id, is_home_team),
            config,
            ledger,
            guard,
            dispatcher: None,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn context(&self) -> &MatchContext {
        &self.ctx
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        self.ctx.snapshot()
    }

    /// Run one submission through the pipeline.
    ///
    /// The duplicate lookup runs before the lifecycle gate so a
    /// re-submitted transition reports already-handled instead of failing
    /// as an illegal move out of the phase it already caused. Marking the
    /// key happens only after the ledger append and the fold commit, which
    /// keeps rejected or failed submissions retryable.
    pub async fn submit(&mut self, raw: &RawMatchInput) -> Result<EventOutcome, SubmitError> {
        let key = self.guard.key_for(raw);
        if let Some(entry) = self.guard.already_processed(&key).await {
            debug!(
                "match {} duplicate submission ({}), first seen {}",
                self.ctx.match_id, entry.summary, entry.first_seen_at
            );
            return Ok(EventOutcome::DuplicateNoOp {
                key,
                first_seen_at: Some(entry.first_seen_at),
            });
        }

        lifecycle::validate(self.ctx.phase, raw.kind)?;

        let Classified {
            event,
            mut anomalies,
        } = classify(
            raw,
            &mut self.ctx.registry,
            &self.ctx.discipline,
            self.config.regulation_minutes,
        )?;

        self.ledger
            .append(event.clone())
            .await
            .map_err(SubmitError::Ledger)?;
        anomalies.extend(self.ctx.apply_event(&event));

        let summary = format!("{} at {}'", event.detail.kind_str(), event.minute);
        self.guard.mark_processed(&key, summary).await;

        for anomaly in &anomalies {
            warn!(
                "match {} anomaly on {} at {}': {}",
                self.ctx.match_id,
                event.detail.kind_str(),
                event.minute,
                anomaly.label()
            );
        }

        let snapshot = self.ctx.snapshot();
        let payload = assemble(&event, &snapshot);

        let dispatch = match self.dispatcher.clone() {
            Some(dispatcher) => Some(
                dispatch_with_timeout(dispatcher.as_ref(), &payload, self.config.dispatch_timeout)
                    .await,
            ),
            None => None,
        };

        Ok(EventOutcome::Applied {
            event,
            anomalies,
            payload,
            dispatch,
        })
    }

    /// Fold the ledger's sequence into a fresh context. Recovery and
    /// consistency checks both go through here.
    pub async fn replay(&self) -> anyhow::Result<MatchContext> {
        let events = self.ledger.read_all(&self.ctx.match_id).await?;
        Ok(MatchContext::replay(
            self.ctx.match_id.clone(),
            self.ctx.is_home_team,
            &events,
        ))
    }
}

/// Delivery is fire-and-forget with a ceiling: a slow or failing
/// downstream shows up in the outcome, never in the match state.
async fn dispatch_with_timeout(
    dispatcher: &dyn NotificationDispatcher,
    payload: &NotificationPayload,
    limit: Duration,
) -> DispatchResult {
    match tokio::time::timeout(limit, dispatcher.dispatch(payload)).await {
        Ok(result) => {
            if !result.success {
                warn!(
                    "notification dispatch failed: {}",
                    result.error_detail.as_deref().unwrap_or("unknown error")
                );
            }
            result
        }
        Err(_) => {
            warn!("notification dispatch timed out after {:?}", limit);
            DispatchResult::failed(format!("timed out after {limit:?}"))
        }
    }
}
