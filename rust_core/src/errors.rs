use serde::Serialize;
use thiserror::Error;

use crate::models::{MatchPhase, RawEventKind, MAX_EVENT_MINUTE};

/// Rejection raised before any state mutation. Safe to retry after the
/// operator corrects the input; nothing was applied and nothing was marked
/// processed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("minute {0} is outside 0..={MAX_EVENT_MINUTE}")]
    MinuteOutOfRange(i64),

    #[error("minute is required for a {kind} event")]
    MissingMinute { kind: RawEventKind },

    #[error("player name is empty")]
    EmptyPlayerName,

    #[error("'{0}' is a reserved opposition marker, not a player name")]
    ReservedPlayerName(String),

    #[error("{field} is required for a {kind} event")]
    MissingField {
        kind: RawEventKind,
        field: &'static str,
    },

    #[error("unknown card type '{0}' (expected yellow or red)")]
    UnknownCardKind(String),

    #[error("kick-off requires a non-empty starting lineup")]
    EmptyLineup,

    #[error("cannot move from {from} to {to}")]
    IllegalTransition { from: MatchPhase, to: MatchPhase },

    #[error("{kind} events are not allowed during {phase}")]
    EventNotAllowedInPhase {
        kind: RawEventKind,
        phase: MatchPhase,
    },
}
