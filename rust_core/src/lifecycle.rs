use crate::errors::ValidationError;
use crate::models::{MatchPhase, RawEventKind};

/// Phase a period-transition kind lands in. Play events have no target.
pub fn target_phase(kind: RawEventKind) -> Option<MatchPhase> {
    match kind {
        RawEventKind::KickOff => Some(MatchPhase::First),
        RawEventKind::HalfTime => Some(MatchPhase::HalfTime),
        RawEventKind::SecondHalf => Some(MatchPhase::Second),
        RawEventKind::FullTime => Some(MatchPhase::Full),
        RawEventKind::Goal | RawEventKind::Card | RawEventKind::Substitution => None,
    }
}

/// Gate an incoming event kind against the current phase. Pure check, no
/// state change; the phase only moves when the event is later applied.
pub fn validate(phase: MatchPhase, kind: RawEventKind) -> Result<(), ValidationError> {
    match target_phase(kind) {
        Some(to) => {
            if phase.successor() == Some(to) {
                Ok(())
            } else {
                Err(ValidationError::IllegalTransition { from: phase, to })
            }
        }
        None => {
            if phase.allows_play_events() {
                Ok(())
            } else {
                Err(ValidationError::EventNotAllowedInPhase { kind, phase })
            }
        }
    }
}
