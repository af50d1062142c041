use chrono::Utc;
use rustc_hash::FxHashMap;
use strsim::jaro_winkler;

use crate::discipline::DisciplineLog;
use crate::errors::ValidationError;
use crate::models::{
    Anomaly, CardDetail, CardKind, EventDetail, GoalDetail, MatchEvent, Player, RawEventKind,
    RawMatchInput, MAX_EVENT_MINUTE,
};

/// Similarity above which a newly entered name is flagged as a likely
/// variant of one already seen. Suggestions are advisory only; attribution
/// always follows the name as entered.
const SUGGESTION_THRESHOLD: f64 = 0.95;
/// Very short names produce spurious high similarity, so skip them.
const MIN_SUGGESTION_LEN: usize = 5;

/// Canonical lowercase form used for player identity and marker detection.
/// Punctuation is dropped and whitespace collapsed, so "J.  O'Brien" and
/// "j obrien" resolve to the same player.
pub fn normalize_name(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stable player id derived from the normalized name.
pub fn slug_id(normalized: &str) -> String {
    normalized.replace(' ', "_")
}

fn tidy_display(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True when the entered name is one of the reserved opposition markers.
/// Roster matching never decides this.
pub fn is_opposition_marker(raw: &str) -> bool {
    matches!(normalize_name(raw).as_str(), "opposition" | "opposition goal")
}

struct Resolution {
    player: Player,
    newly_minted: bool,
    suggestion: Option<Anomaly>,
}

/// Players seen so far in one match, keyed by normalized name. The registry
/// grows as the operator types names; there is no pre-loaded roster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerRegistry {
    players: FxHashMap<String, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, raw_name: &str) -> Option<&Player> {
        self.players.get(&normalize_name(raw_name))
    }

    /// Record a resolved player. Replaying an event sequence calls this for
    /// every player an event carries, so a rebuilt registry converges on the
    /// live one.
    pub fn register(&mut self, player: Player) {
        self.players.insert(normalize_name(&player.name), player);
    }

    fn resolve(&self, raw_name: &str) -> Result<Resolution, ValidationError> {
        let key = normalize_name(raw_name);
        if key.is_empty() {
            return Err(ValidationError::EmptyPlayerName);
        }
        if is_opposition_marker(raw_name) {
            return Err(ValidationError::ReservedPlayerName(tidy_display(raw_name)));
        }
        if let Some(existing) = self.players.get(&key) {
            return Ok(Resolution {
                player: existing.clone(),
                newly_minted: false,
                suggestion: None,
            });
        }
        let player = Player::new(slug_id(&key), tidy_display(raw_name));
        let suggestion = self
            .closest_known(&key)
            .map(|(closest, similarity)| Anomaly::NameSuggestion {
                entered: player.name.clone(),
                closest,
                similarity,
            });
        Ok(Resolution {
            player,
            newly_minted: true,
            suggestion,
        })
    }

    fn closest_known(&self, key: &str) -> Option<(String, f64)> {
        if key.len() < MIN_SUGGESTION_LEN {
            return None;
        }
        let mut best: Option<(String, f64)> = None;
        for (known_key, player) in &self.players {
            if known_key.len() < MIN_SUGGESTION_LEN {
                continue;
            }
            let similarity = jaro_winkler(key, known_key);
            if similarity > SUGGESTION_THRESHOLD
                && best.as_ref().map_or(true, |(_, s)| similarity > *s)
            {
                best = Some((player.name.clone(), similarity));
            }
        }
        best
    }
}

/// A classified event plus any data-quality warnings raised on the way.
#[derive(Debug, Clone)]
pub struct Classified {
    pub event: MatchEvent,
    pub anomalies: Vec<Anomaly>,
}

/// Turn raw operator input into a structured event. Validation failures
/// reject the whole submission; the registry is only updated when
/// classification succeeds, so a rejected event mints no players.
pub fn classify(
    raw: &RawMatchInput,
    registry: &mut PlayerRegistry,
    discipline: &DisciplineLog,
    regulation_minutes: u8,
) -> Result<Classified, ValidationError> {
    let minute = effective_minute(raw, regulation_minutes)?;
    let mut anomalies = Vec::new();
    let mut minted: Vec<Player> = Vec::new();

    let detail = match raw.kind {
        RawEventKind::Goal => {
            let scorer_raw = required(raw.player.as_deref(), raw.kind, "player")?;
            if is_opposition_marker(scorer_raw) {
                EventDetail::Goal(GoalDetail::Opposition)
            } else {
                let scorer = resolve_into(registry, scorer_raw, &mut minted, &mut anomalies)?;
                let assist = match raw.secondary.as_deref().map(str::trim) {
                    Some(s) if !s.is_empty() => {
                        Some(resolve_into(registry, s, &mut minted, &mut anomalies)?)
                    }
                    _ => None,
                };
                EventDetail::Goal(GoalDetail::Tracked { scorer, assist })
            }
        }
        RawEventKind::Card => {
            let player_raw = required(raw.player.as_deref(), raw.kind, "player")?;
            let card_raw = required(raw.card.as_deref(), raw.kind, "card")?;
            let entered = parse_card_kind(card_raw)?;
            if is_opposition_marker(player_raw) {
                // Opposition players are not tracked individually, so a red
                // against them never escalates into a second yellow.
                EventDetail::Card(CardDetail::Opposition { card: entered })
            } else {
                let player = resolve_into(registry, player_raw, &mut minted, &mut anomalies)?;
                // a red always lands as a second yellow; whether it links to
                // a prior booking decides the orphan flag, and the fold that
                // applies the event raises the matching anomaly
                let card = match entered {
                    CardKind::Yellow => CardKind::Yellow,
                    _ => CardKind::SecondYellow {
                        first_yellow_minute: discipline.standing_yellow(&player.player_id),
                    },
                };
                EventDetail::Card(CardDetail::Tracked { player, card })
            }
        }
        RawEventKind::Substitution => {
            let off_raw = required(raw.player.as_deref(), raw.kind, "player")?;
            let on_raw = required(raw.secondary.as_deref(), raw.kind, "secondary")?;
            let player_off = resolve_into(registry, off_raw, &mut minted, &mut anomalies)?;
            let player_on = resolve_into(registry, on_raw, &mut minted, &mut anomalies)?;
            EventDetail::Substitution {
                player_off,
                player_on,
            }
        }
        RawEventKind::KickOff => {
            let names = raw
                .lineup
                .as_ref()
                .filter(|l| !l.is_empty())
                .ok_or(ValidationError::EmptyLineup)?;
            let mut lineup = Vec::with_capacity(names.len());
            for name in names {
                lineup.push(resolve_into(registry, name, &mut minted, &mut anomalies)?);
            }
            EventDetail::KickOff { lineup }
        }
        RawEventKind::HalfTime => EventDetail::HalfTime,
        RawEventKind::SecondHalf => EventDetail::SecondHalf,
        RawEventKind::FullTime => EventDetail::FullTime,
    };

    for player in minted {
        registry.register(player);
    }

    let notes = raw
        .notes
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);
    let recorded_at = raw.recorded_at.unwrap_or_else(Utc::now);
    let event = MatchEvent::new(&raw.match_id, minute, detail, notes, recorded_at);
    Ok(Classified { event, anomalies })
}

/// Minute bounds are checked before anything else so a bad minute rejects
/// the event with no side effects. Period transitions fall back to their
/// scheduled minute when the operator omits one.
fn effective_minute(raw: &RawMatchInput, regulation_minutes: u8) -> Result<u8, ValidationError> {
    match raw.minute {
        Some(m) if (0..=i64::from(MAX_EVENT_MINUTE)).contains(&m) => Ok(m as u8),
        Some(m) => Err(ValidationError::MinuteOutOfRange(m)),
        None => match raw.kind {
            RawEventKind::KickOff => Ok(0),
            RawEventKind::HalfTime | RawEventKind::SecondHalf => Ok(regulation_minutes / 2),
            RawEventKind::FullTime => Ok(regulation_minutes),
            kind => Err(ValidationError::MissingMinute { kind }),
        },
    }
}

fn required<'a>(
    value: Option<&'a str>,
    kind: RawEventKind,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(v) => Ok(v),
        None => Err(ValidationError::MissingField { kind, field }),
    }
}

fn parse_card_kind(raw: &str) -> Result<CardKind, ValidationError> {
    match raw.trim().to_lowercase().as_str() {
        "yellow" => Ok(CardKind::Yellow),
        "red" => Ok(CardKind::Red),
        other => Err(ValidationError::UnknownCardKind(other.to_string())),
    }
}

fn resolve_into(
    registry: &PlayerRegistry,
    raw_name: &str,
    minted: &mut Vec<Player>,
    anomalies: &mut Vec<Anomaly>,
) -> Result<Player, ValidationError> {
    let resolution = registry.resolve(raw_name)?;
    if let Some(suggestion) = resolution.suggestion {
        anomalies.push(suggestion);
    }
    if resolution.newly_minted
        && !minted
            .iter()
            .any(|p| p.player_id == resolution.player.player_id)
    {
        minted.push(resolution.player.clone());
    }
    Ok(resolution.player)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: RawEventKind) -> RawMatchInput {
        RawMatchInput {
            match_id: "m1".to_string(),
            kind,
            minute: Some(10),
            player: None,
            secondary: None,
            card: None,
            lineup: None,
            notes: None,
            recorded_at: None,
        }
    }

    #[test]
    fn test_normalize_collapses_case_and_punctuation() {
        assert_eq!(normalize_name("  J.  O'Brien "), "j obrien");
        assert_eq!(normalize_name("SMITH"), "smith");
        assert_eq!(slug_id(&normalize_name("J. O'Brien")), "j_obrien");
    }

    #[test]
    fn test_marker_detection_survives_formatting() {
        assert!(is_opposition_marker("Opposition"));
        assert!(is_opposition_marker("  OPPOSITION GOAL "));
        assert!(is_opposition_marker("opposition!"));
        assert!(!is_opposition_marker("Opposition Town FC"));
    }

    #[test]
    fn test_same_name_variants_resolve_to_one_player() {
        let mut registry = PlayerRegistry::new();
        let discipline = DisciplineLog::default();

        let mut first = raw(RawEventKind::Goal);
        first.player = Some("J. Smith".to_string());
        let mut second = raw(RawEventKind::Goal);
        second.player = Some("  j  smith ".to_string());

        let a = classify(&first, &mut registry, &discipline, 90).unwrap();
        let b = classify(&second, &mut registry, &discipline, 90).unwrap();

        let id_of = |c: &Classified| match &c.event.detail {
            EventDetail::Goal(GoalDetail::Tracked { scorer, .. }) => scorer.player_id.clone(),
            other => panic!("expected tracked goal, got {other:?}"),
        };
        assert_eq!(id_of(&a), "j_smith");
        assert_eq!(id_of(&a), id_of(&b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_player_name_is_rejected() {
        let mut registry = PlayerRegistry::new();
        let mut input = raw(RawEventKind::Goal);
        input.player = Some("   ".to_string());
        let err = classify(&input, &mut registry, &DisciplineLog::default(), 90).unwrap_err();
        assert_eq!(err, ValidationError::MissingField {
            kind: RawEventKind::Goal,
            field: "player",
        });

        // punctuation-only names normalize to empty as well
        input.player = Some("...".to_string());
        let err = classify(&input, &mut registry, &DisciplineLog::default(), 90).unwrap_err();
        assert_eq!(err, ValidationError::EmptyPlayerName);
    }

    #[test]
    fn test_minute_bounds_are_enforced() {
        let mut registry = PlayerRegistry::new();
        let discipline = DisciplineLog::default();

        let mut input = raw(RawEventKind::Goal);
        input.player = Some("Smith".to_string());

        input.minute = Some(-1);
        assert_eq!(
            classify(&input, &mut registry, &discipline, 90).unwrap_err(),
            ValidationError::MinuteOutOfRange(-1)
        );

        input.minute = Some(151);
        assert_eq!(
            classify(&input, &mut registry, &discipline, 90).unwrap_err(),
            ValidationError::MinuteOutOfRange(151)
        );

        input.minute = Some(150);
        assert!(classify(&input, &mut registry, &discipline, 90).is_ok());

        input.minute = None;
        assert_eq!(
            classify(&input, &mut registry, &discipline, 90).unwrap_err(),
            ValidationError::MissingMinute {
                kind: RawEventKind::Goal
            }
        );
    }

    #[test]
    fn test_period_transitions_default_their_minute() {
        let mut registry = PlayerRegistry::new();
        let discipline = DisciplineLog::default();

        let mut kick_off = raw(RawEventKind::KickOff);
        kick_off.minute = None;
        kick_off.lineup = Some(vec!["Smith".to_string()]);
        assert_eq!(
            classify(&kick_off, &mut registry, &discipline, 90)
                .unwrap()
                .event
                .minute,
            0
        );

        let mut half_time = raw(RawEventKind::HalfTime);
        half_time.minute = None;
        assert_eq!(
            classify(&half_time, &mut registry, &discipline, 90)
                .unwrap()
                .event
                .minute,
            45
        );

        let mut full_time = raw(RawEventKind::FullTime);
        full_time.minute = None;
        assert_eq!(
            classify(&full_time, &mut registry, &discipline, 90)
                .unwrap()
                .event
                .minute,
            90
        );
    }

    #[test]
    fn test_opposition_marker_yields_opposition_goal() {
        let mut registry = PlayerRegistry::new();
        let mut input = raw(RawEventKind::Goal);
        input.player = Some("Opposition Goal".to_string());
        let classified = classify(&input, &mut registry, &DisciplineLog::default(), 90).unwrap();
        assert!(matches!(
            classified.event.detail,
            EventDetail::Goal(GoalDetail::Opposition)
        ));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_marker_in_tracked_position_is_rejected() {
        let mut registry = PlayerRegistry::new();
        let discipline = DisciplineLog::default();

        let mut sub = raw(RawEventKind::Substitution);
        sub.player = Some("Smith".to_string());
        sub.secondary = Some("Opposition".to_string());
        let err = classify(&sub, &mut registry, &discipline, 90).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ReservedPlayerName("Opposition".to_string())
        );
        // rejected submission minted nothing
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_unknown_card_kind_is_rejected() {
        let mut registry = PlayerRegistry::new();
        let mut input = raw(RawEventKind::Card);
        input.player = Some("Smith".to_string());
        input.card = Some("orange".to_string());
        assert_eq!(
            classify(&input, &mut registry, &DisciplineLog::default(), 90).unwrap_err(),
            ValidationError::UnknownCardKind("orange".to_string())
        );
    }

    #[test]
    fn test_red_with_standing_yellow_escalates() {
        let mut registry = PlayerRegistry::new();
        let mut discipline = DisciplineLog::default();

        let mut yellow = raw(RawEventKind::Card);
        yellow.minute = Some(30);
        yellow.player = Some("Smith".to_string());
        yellow.card = Some("yellow".to_string());
        let classified = classify(&yellow, &mut registry, &discipline, 90).unwrap();
        if let EventDetail::Card(detail) = &classified.event.detail {
            discipline.record(classified.event.minute, detail);
        }

        let mut red = raw(RawEventKind::Card);
        red.minute = Some(55);
        red.player = Some("smith".to_string());
        red.card = Some("RED".to_string());
        let classified = classify(&red, &mut registry, &discipline, 90).unwrap();

        match &classified.event.detail {
            EventDetail::Card(CardDetail::Tracked { card, .. }) => {
                assert_eq!(
                    card,
                    &CardKind::SecondYellow {
                        first_yellow_minute: Some(30)
                    }
                );
            }
            other => panic!("expected tracked card, got {other:?}"),
        }
        assert!(classified.anomalies.is_empty());
    }

    #[test]
    fn test_red_without_prior_yellow_is_orphaned_but_accepted() {
        let mut registry = PlayerRegistry::new();
        let mut input = raw(RawEventKind::Card);
        input.minute = Some(70);
        input.player = Some("Jones".to_string());
        input.card = Some("red".to_string());

        let classified = classify(&input, &mut registry, &DisciplineLog::default(), 90).unwrap();
        match &classified.event.detail {
            EventDetail::Card(CardDetail::Tracked { card, .. }) => {
                assert!(card.is_orphaned());
            }
            other => panic!("expected tracked card, got {other:?}"),
        }
    }

    #[test]
    fn test_opposition_red_does_not_escalate() {
        let mut registry = PlayerRegistry::new();
        let mut input = raw(RawEventKind::Card);
        input.player = Some("Opposition".to_string());
        input.card = Some("red".to_string());
        let classified = classify(&input, &mut registry, &DisciplineLog::default(), 90).unwrap();
        assert!(matches!(
            classified.event.detail,
            EventDetail::Card(CardDetail::Opposition {
                card: CardKind::Red
            })
        ));
        assert!(classified.anomalies.is_empty());
    }

    #[test]
    fn test_kickoff_requires_lineup() {
        let mut registry = PlayerRegistry::new();
        let discipline = DisciplineLog::default();

        let mut kick_off = raw(RawEventKind::KickOff);
        kick_off.minute = Some(0);
        assert_eq!(
            classify(&kick_off, &mut registry, &discipline, 90).unwrap_err(),
            ValidationError::EmptyLineup
        );

        kick_off.lineup = Some(vec![]);
        assert_eq!(
            classify(&kick_off, &mut registry, &discipline, 90).unwrap_err(),
            ValidationError::EmptyLineup
        );
    }

    #[test]
    fn test_near_miss_name_raises_suggestion() {
        let mut registry = PlayerRegistry::new();
        let discipline = DisciplineLog::default();

        let mut first = raw(RawEventKind::Goal);
        first.player = Some("Tom Greene".to_string());
        classify(&first, &mut registry, &discipline, 90).unwrap();

        let mut second = raw(RawEventKind::Goal);
        second.player = Some("Tom Green".to_string());
        let classified = classify(&second, &mut registry, &discipline, 90).unwrap();

        assert_eq!(classified.anomalies.len(), 1);
        match &classified.anomalies[0] {
            Anomaly::NameSuggestion {
                entered, closest, ..
            } => {
                assert_eq!(entered, "Tom Green");
                assert_eq!(closest, "Tom Greene");
            }
            other => panic!("expected name suggestion, got {other:?}"),
        }
        // the suggestion never changes attribution
        assert_eq!(registry.len(), 2);
    }
}
