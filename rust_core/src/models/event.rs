use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest minute an event may carry (regulation plus generous stoppage).
pub const MAX_EVENT_MINUTE: u8 = 150;

/// A tracked-team player: stable slug id plus the display name the
/// operator entered. All derived state is keyed by `player_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: String,
    pub name: String,
}

impl Player {
    pub fn new(player_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            name: name.into(),
        }
    }
}

/// Where a player currently stands within a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchStatus {
    NotYetOnPitch,
    OnPitch,
    OffPitch,
}

impl PitchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PitchStatus::NotYetOnPitch => "not_yet_on_pitch",
            PitchStatus::OnPitch => "on_pitch",
            PitchStatus::OffPitch => "off_pitch",
        }
    }
}

/// Card classification after escalation checks.
///
/// A second yellow keeps the minute of the originating yellow when it was
/// found in the match history; when absent the entry is orphaned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Yellow,
    Red,
    SecondYellow {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        first_yellow_minute: Option<u8>,
    },
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Yellow => "yellow",
            CardKind::Red => "red",
            CardKind::SecondYellow { .. } => "second_yellow",
        }
    }

    /// True for a second yellow whose originating yellow was never found.
    pub fn is_orphaned(&self) -> bool {
        matches!(
            self,
            CardKind::SecondYellow {
                first_yellow_minute: None
            }
        )
    }
}

/// Goal attribution. Opposition goals carry no player detail because
/// opposition players are not tracked individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scored_by", rename_all = "lowercase")]
pub enum GoalDetail {
    Tracked {
        scorer: Player,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        assist: Option<Player>,
    },
    Opposition,
}

/// Card attribution. Opposition cards are recorded against the opposition
/// as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shown_to", rename_all = "lowercase")]
pub enum CardDetail {
    Tracked { player: Player, card: CardKind },
    Opposition { card: CardKind },
}

impl CardDetail {
    pub fn card(&self) -> &CardKind {
        match self {
            CardDetail::Tracked { card, .. } => card,
            CardDetail::Opposition { card } => card,
        }
    }
}

/// What happened, one variant per event kind. Each variant carries exactly
/// the fields that kind needs, so a payload can never mix (say) a scorer
/// with a substitution pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDetail {
    Goal(GoalDetail),
    Card(CardDetail),
    Substitution {
        player_off: Player,
        player_on: Player,
    },
    KickOff {
        lineup: Vec<Player>,
    },
    HalfTime,
    SecondHalf,
    FullTime,
}

impl EventDetail {
    pub fn kind_str(&self) -> &'static str {
        match self {
            EventDetail::Goal(_) => "goal",
            EventDetail::Card(_) => "card",
            EventDetail::Substitution { .. } => "substitution",
            EventDetail::KickOff { .. } => "kick_off",
            EventDetail::HalfTime => "half_time",
            EventDetail::SecondHalf => "second_half",
            EventDetail::FullTime => "full_time",
        }
    }

    /// Goals, cards and substitutions happen in open play; period
    /// transitions do not.
    pub fn is_play_event(&self) -> bool {
        matches!(
            self,
            EventDetail::Goal(_) | EventDetail::Card(_) | EventDetail::Substitution { .. }
        )
    }

    /// Every tracked player the event names. Opposition involvement has no
    /// player record, so it contributes nothing here.
    pub fn players(&self) -> Vec<&Player> {
        match self {
            EventDetail::Goal(GoalDetail::Tracked { scorer, assist }) => {
                let mut players = vec![scorer];
                if let Some(assist) = assist {
                    players.push(assist);
                }
                players
            }
            EventDetail::Card(CardDetail::Tracked { player, .. }) => vec![player],
            EventDetail::Substitution {
                player_off,
                player_on,
            } => vec![player_off, player_on],
            EventDetail::KickOff { lineup } => lineup.iter().collect(),
            _ => Vec::new(),
        }
    }
}

/// An accepted match fact. Append-only: once written to the ledger an
/// event is never edited, and every derived value folds over these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub id: String,
    pub match_id: String,
    pub minute: u8,
    pub detail: EventDetail,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl MatchEvent {
    pub fn new(
        match_id: impl Into<String>,
        minute: u8,
        detail: EventDetail,
        notes: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            match_id: match_id.into(),
            minute,
            detail,
            notes,
            recorded_at,
        }
    }
}

/// A data-quality warning raised while applying an event. The event is
/// still applied; anomalies ride along in the outcome for human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "anomaly", rename_all = "snake_case")]
pub enum Anomaly {
    /// Second yellow recorded without a matching prior yellow.
    OrphanedSecondYellow { player_id: String, minute: u8 },
    /// Substitution named a player whose current status did not match the
    /// expected one; the correction was applied anyway.
    UnexpectedPitchState {
        player_id: String,
        expected: PitchStatus,
        found: PitchStatus,
        minute: u8,
    },
    /// Interval close minute preceded the entry minute; credited as zero.
    NegativeStintClamped {
        player_id: String,
        entered_at: u8,
        closed_at: u8,
    },
    /// A newly entered name sits very close to an existing roster name,
    /// which usually means a typo or an inconsistent spelling.
    NameSuggestion {
        entered: String,
        closest: String,
        similarity: f64,
    },
}

impl Anomaly {
    /// Short tag for logs and counters.
    pub fn label(&self) -> &'static str {
        match self {
            Anomaly::OrphanedSecondYellow { .. } => "orphaned_second_yellow",
            Anomaly::UnexpectedPitchState { .. } => "unexpected_pitch_state",
            Anomaly::NegativeStintClamped { .. } => "negative_stint_clamped",
            Anomaly::NameSuggestion { .. } => "name_suggestion",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_detail_round_trips_with_kind_tag() {
        let detail = EventDetail::Goal(GoalDetail::Tracked {
            scorer: Player::new("smith", "Smith"),
            assist: Some(Player::new("jones", "Jones")),
        });
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["kind"], "goal");
        assert_eq!(json["scored_by"], "tracked");

        let back: EventDetail = serde_json::from_value(json).unwrap();
        assert_eq!(back, detail);
    }

    #[test]
    fn test_opposition_goal_carries_no_scorer() {
        let json = serde_json::to_value(EventDetail::Goal(GoalDetail::Opposition)).unwrap();
        assert_eq!(json["kind"], "goal");
        assert_eq!(json["scored_by"], "opposition");
        assert!(json.get("scorer").is_none());
    }

    #[test]
    fn test_second_yellow_orphan_flag() {
        let referenced = CardKind::SecondYellow {
            first_yellow_minute: Some(31),
        };
        let orphaned = CardKind::SecondYellow {
            first_yellow_minute: None,
        };
        assert!(!referenced.is_orphaned());
        assert!(orphaned.is_orphaned());
        assert_eq!(referenced.as_str(), "second_yellow");
    }

    #[test]
    fn test_period_transitions_are_not_play_events() {
        assert!(!EventDetail::HalfTime.is_play_event());
        assert!(!EventDetail::KickOff { lineup: vec![] }.is_play_event());
        assert!(EventDetail::Substitution {
            player_off: Player::new("a", "A"),
            player_on: Player::new("b", "B"),
        }
        .is_play_event());
    }
}
