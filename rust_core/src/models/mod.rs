// Shared models for Matchday Rust services
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod event;

pub use event::{
    Anomaly, CardDetail, CardKind, EventDetail, GoalDetail, MatchEvent, PitchStatus, Player,
    MAX_EVENT_MINUTE,
};

// ============================================================================
// Match Lifecycle
// ============================================================================

/// Phase of a fixture on match day. Transitions only ever move forward
/// through the listed order; `Full` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Pre,
    First,
    HalfTime,
    Second,
    Full,
}

impl MatchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchPhase::Pre => "pre",
            MatchPhase::First => "first",
            MatchPhase::HalfTime => "half_time",
            MatchPhase::Second => "second",
            MatchPhase::Full => "full",
        }
    }

    /// The only phase that may legally follow this one.
    pub fn successor(&self) -> Option<MatchPhase> {
        match self {
            MatchPhase::Pre => Some(MatchPhase::First),
            MatchPhase::First => Some(MatchPhase::HalfTime),
            MatchPhase::HalfTime => Some(MatchPhase::Second),
            MatchPhase::Second => Some(MatchPhase::Full),
            MatchPhase::Full => None,
        }
    }

    /// Goals, cards and substitutions are only legal while the ball is in
    /// play.
    pub fn allows_play_events(&self) -> bool {
        matches!(self, MatchPhase::First | MatchPhase::Second)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchPhase::Full)
    }
}

impl std::fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Scoreboard
// ============================================================================

/// One scoreboard per match. Which side the tracked team occupies depends
/// on the per-match home/away designation, never on a fixed column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u16,
    pub away: u16,
}

impl Score {
    pub fn new(home: u16, away: u16) -> Self {
        Self { home, away }
    }
}

// ============================================================================
// Raw Operator Input
// ============================================================================

/// Event kind as the operator console submits it, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawEventKind {
    Goal,
    Card,
    Substitution,
    KickOff,
    HalfTime,
    SecondHalf,
    FullTime,
}

impl RawEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawEventKind::Goal => "goal",
            RawEventKind::Card => "card",
            RawEventKind::Substitution => "substitution",
            RawEventKind::KickOff => "kick_off",
            RawEventKind::HalfTime => "half_time",
            RawEventKind::SecondHalf => "second_half",
            RawEventKind::FullTime => "full_time",
        }
    }

    pub fn is_play_event(&self) -> bool {
        matches!(
            self,
            RawEventKind::Goal | RawEventKind::Card | RawEventKind::Substitution
        )
    }

    pub fn is_period_transition(&self) -> bool {
        !self.is_play_event()
    }
}

impl std::fmt::Display for RawEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operator action as received from the console layer. Free-text
/// fields are untrusted; the classifier validates and normalizes them
/// before anything mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMatchInput {
    pub match_id: String,
    pub kind: RawEventKind,
    #[serde(default)]
    pub minute: Option<i64>,
    /// Scorer, carded player, or the player going off. Reserved opposition
    /// markers arrive here too.
    #[serde(default)]
    pub player: Option<String>,
    /// Assist provider or the player coming on.
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default)]
    pub card: Option<String>,
    /// Starting set, kick-off only.
    #[serde(default)]
    pub lineup: Option<Vec<String>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Notification Payloads (outbound webhook schema)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Goal,
    GoalOpposition,
    Card,
    CardOpposition,
    CardSecondYellow,
    Substitution,
    KickOff,
    HalfTime,
    SecondHalf,
    FullTime,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Goal => "goal",
            NotificationType::GoalOpposition => "goal_opposition",
            NotificationType::Card => "card",
            NotificationType::CardOpposition => "card_opposition",
            NotificationType::CardSecondYellow => "card_second_yellow",
            NotificationType::Substitution => "substitution",
            NotificationType::KickOff => "kick_off",
            NotificationType::HalfTime => "half_time",
            NotificationType::SecondHalf => "second_half",
            NotificationType::FullTime => "full_time",
        }
    }
}

/// Flat outbound payload. Event-specific fields are optional and omitted
/// when absent so the dispatcher always receives well-formed JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub event_type: NotificationType,
    pub match_id: String,
    pub minute: u8,
    pub home_score: u16,
    pub away_score: u16,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub player: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub assist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub card: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub card_orphaned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub first_yellow_minute: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub player_off: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub player_on: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub lineup: Option<Vec<String>>,
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
}

/// Outcome of one delivery attempt by the external dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_detail: Option<String>,
}

impl DispatchResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error_detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            error_detail: Some(detail.into()),
        }
    }
}

// ============================================================================
// Derived State Snapshot
// ============================================================================

/// Point-in-time view of a match's derived state, published after every
/// applied event. Consumers must treat this as a cache of the event log,
/// never as independent truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: String,
    pub phase: MatchPhase,
    pub is_home_team: bool,
    pub home_score: u16,
    pub away_score: u16,
    pub on_pitch: Vec<String>,
    pub events_applied: u64,
    pub anomaly_count: u64,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Redis Channels
// ============================================================================

pub mod channels {
    pub const MATCH_EVENTS: &str = "matchday:events";
    pub const MATCH_CONTROL: &str = "matchday:control";
    pub const NOTIFICATIONS: &str = "matchday:notifications";
    pub const ANOMALIES: &str = "matchday:anomalies";
    pub const MATCH_STATE: &str = "matchday:state";
    pub const HEALTH_HEARTBEATS: &str = "matchday:heartbeats";
}
