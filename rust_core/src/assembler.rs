//! Pure translation from an applied event and the derived state to the
//! flat outbound payload. No I/O happens here; delivery belongs to the
//! dispatcher behind the pipeline.

use crate::models::{
    CardDetail, CardKind, EventDetail, GoalDetail, MatchEvent, MatchSnapshot, NotificationPayload,
    NotificationType,
};

pub fn assemble(event: &MatchEvent, snapshot: &MatchSnapshot) -> NotificationPayload {
    match &event.detail {
        EventDetail::Goal(GoalDetail::Tracked { scorer, assist }) => {
            let mut payload = base(event, snapshot, NotificationType::Goal);
            payload.player = Some(scorer.name.clone());
            payload.assist = assist.as_ref().map(|a| a.name.clone());
            payload
        }
        EventDetail::Goal(GoalDetail::Opposition) => {
            base(event, snapshot, NotificationType::GoalOpposition)
        }
        EventDetail::Card(CardDetail::Tracked { player, card }) => {
            let event_type = match card {
                CardKind::SecondYellow { .. } => NotificationType::CardSecondYellow,
                CardKind::Yellow | CardKind::Red => NotificationType::Card,
            };
            let mut payload = base(event, snapshot, event_type);
            payload.player = Some(player.name.clone());
            payload.card = Some(card.as_str().to_string());
            if let CardKind::SecondYellow { first_yellow_minute } = card {
                payload.first_yellow_minute = *first_yellow_minute;
                if card.is_orphaned() {
                    payload.card_orphaned = Some(true);
                }
            }
            payload
        }
        EventDetail::Card(CardDetail::Opposition { card }) => {
            let mut payload = base(event, snapshot, NotificationType::CardOpposition);
            payload.card = Some(card.as_str().to_string());
            payload
        }
        EventDetail::Substitution {
            player_off,
            player_on,
        } => {
            let mut payload = base(event, snapshot, NotificationType::Substitution);
            payload.player_off = Some(player_off.name.clone());
            payload.player_on = Some(player_on.name.clone());
            payload
        }
        EventDetail::KickOff { lineup } => {
            let mut payload = base(event, snapshot, NotificationType::KickOff);
            payload.lineup = Some(lineup.iter().map(|p| p.name.clone()).collect());
            payload
        }
        EventDetail::HalfTime => base(event, snapshot, NotificationType::HalfTime),
        EventDetail::SecondHalf => base(event, snapshot, NotificationType::SecondHalf),
        EventDetail::FullTime => base(event, snapshot, NotificationType::FullTime),
    }
}

fn base(
    event: &MatchEvent,
    snapshot: &MatchSnapshot,
    event_type: NotificationType,
) -> NotificationPayload {
    NotificationPayload {
        event_type,
        match_id: event.match_id.clone(),
        minute: event.minute,
        home_score: snapshot.home_score,
        away_score: snapshot.away_score,
        player: None,
        assist: None,
        card: None,
        card_orphaned: None,
        first_yellow_minute: None,
        player_off: None,
        player_on: None,
        lineup: None,
        ts: Some(event.recorded_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchPhase, Player};
    use chrono::Utc;

    fn snapshot(home: u16, away: u16) -> MatchSnapshot {
        MatchSnapshot {
            match_id: "m1".to_string(),
            phase: MatchPhase::First,
            is_home_team: true,
            home_score: home,
            away_score: away,
            on_pitch: vec![],
            events_applied: 1,
            anomaly_count: 0,
            updated_at: Utc::now(),
        }
    }

    fn event(detail: EventDetail) -> MatchEvent {
        MatchEvent::new("m1", 57, detail, None, Utc::now())
    }

    #[test]
    fn test_tracked_goal_payload_names_scorer_and_assist() {
        let detail = EventDetail::Goal(GoalDetail::Tracked {
            scorer: Player::new("j_smith", "J. Smith"),
            assist: Some(Player::new("t_green", "T. Green")),
        });
        let payload = assemble(&event(detail), &snapshot(2, 1));

        assert_eq!(payload.event_type, NotificationType::Goal);
        assert_eq!(payload.player.as_deref(), Some("J. Smith"));
        assert_eq!(payload.assist.as_deref(), Some("T. Green"));
        assert_eq!((payload.home_score, payload.away_score), (2, 1));
        assert_eq!(payload.minute, 57);
    }

    #[test]
    fn test_opposition_goal_payload_omits_player_fields() {
        let payload = assemble(&event(EventDetail::Goal(GoalDetail::Opposition)), &snapshot(0, 1));
        assert_eq!(payload.event_type, NotificationType::GoalOpposition);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event_type"], "goal_opposition");
        assert!(json.get("player").is_none());
        assert!(json.get("assist").is_none());
        // payload stays flat: no nested objects for downstream templates
        assert!(json.as_object().unwrap().values().all(|v| !v.is_object()));
    }

    #[test]
    fn test_second_yellow_payload_references_first_yellow() {
        let detail = EventDetail::Card(CardDetail::Tracked {
            player: Player::new("smith", "Smith"),
            card: CardKind::SecondYellow {
                first_yellow_minute: Some(30),
            },
        });
        let payload = assemble(&event(detail), &snapshot(0, 0));

        assert_eq!(payload.event_type, NotificationType::CardSecondYellow);
        assert_eq!(payload.card.as_deref(), Some("second_yellow"));
        assert_eq!(payload.first_yellow_minute, Some(30));
        assert_eq!(payload.card_orphaned, None);
    }

    #[test]
    fn test_orphaned_second_yellow_is_flagged() {
        let detail = EventDetail::Card(CardDetail::Tracked {
            player: Player::new("smith", "Smith"),
            card: CardKind::SecondYellow {
                first_yellow_minute: None,
            },
        });
        let payload = assemble(&event(detail), &snapshot(0, 0));

        assert_eq!(payload.card_orphaned, Some(true));
        assert_eq!(payload.first_yellow_minute, None);
    }

    #[test]
    fn test_opposition_card_carries_kind_only() {
        let detail = EventDetail::Card(CardDetail::Opposition {
            card: CardKind::Yellow,
        });
        let payload = assemble(&event(detail), &snapshot(0, 0));

        assert_eq!(payload.event_type, NotificationType::CardOpposition);
        assert_eq!(payload.card.as_deref(), Some("yellow"));
        assert!(payload.player.is_none());
    }

    #[test]
    fn test_substitution_payload_names_both_players() {
        let detail = EventDetail::Substitution {
            player_off: Player::new("smith", "Smith"),
            player_on: Player::new("jones", "Jones"),
        };
        let payload = assemble(&event(detail), &snapshot(1, 0));

        assert_eq!(payload.event_type, NotificationType::Substitution);
        assert_eq!(payload.player_off.as_deref(), Some("Smith"));
        assert_eq!(payload.player_on.as_deref(), Some("Jones"));
    }

    #[test]
    fn test_kickoff_payload_lists_lineup_names() {
        let detail = EventDetail::KickOff {
            lineup: vec![Player::new("a", "A"), Player::new("b", "B")],
        };
        let payload = assemble(&event(detail), &snapshot(0, 0));

        assert_eq!(payload.event_type, NotificationType::KickOff);
        assert_eq!(
            payload.lineup,
            Some(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn test_transitions_still_carry_the_score() {
        let payload = assemble(&event(EventDetail::FullTime), &snapshot(3, 2));
        assert_eq!(payload.event_type, NotificationType::FullTime);
        assert_eq!((payload.home_score, payload.away_score), (3, 2));
        assert!(payload.player.is_none());
    }
}
