use matchday_rust_core::models::{NotificationPayload, NotificationType};

/// One-line summary of a payload for the delivery log.
pub fn summary_line(p: &NotificationPayload) -> String {
    let score = format!("{}-{}", p.home_score, p.away_score);
    match p.event_type {
        NotificationType::Goal => format!(
            "GOAL {}' {} ({}){}",
            p.minute,
            p.player.as_deref().unwrap_or("?"),
            score,
            p.assist
                .as_deref()
                .map(|a| format!(" assist={a}"))
                .unwrap_or_default()
        ),
        NotificationType::GoalOpposition => {
            format!("GOAL (opposition) {}' ({})", p.minute, score)
        }
        NotificationType::Card => format!(
            "CARD {}' {} {}",
            p.minute,
            p.card.as_deref().unwrap_or("?"),
            p.player.as_deref().unwrap_or("?")
        ),
        NotificationType::CardOpposition => format!(
            "CARD (opposition) {}' {}",
            p.minute,
            p.card.as_deref().unwrap_or("?")
        ),
        NotificationType::CardSecondYellow => format!(
            "SECOND YELLOW {}' {}{}",
            p.minute,
            p.player.as_deref().unwrap_or("?"),
            if p.card_orphaned.unwrap_or(false) {
                " (no prior yellow on record)"
            } else {
                ""
            }
        ),
        NotificationType::Substitution => format!(
            "SUB {}' {} off, {} on",
            p.minute,
            p.player_off.as_deref().unwrap_or("?"),
            p.player_on.as_deref().unwrap_or("?")
        ),
        NotificationType::KickOff => format!(
            "KICK OFF ({} starting)",
            p.lineup.as_ref().map(Vec::len).unwrap_or(0)
        ),
        NotificationType::HalfTime => format!("HALF TIME ({})", score),
        NotificationType::SecondHalf => format!("SECOND HALF ({})", score),
        NotificationType::FullTime => format!("FULL TIME ({})", score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(event_type: NotificationType, minute: u8) -> NotificationPayload {
        NotificationPayload {
            event_type,
            match_id: "m1".to_string(),
            minute,
            home_score: 2,
            away_score: 1,
            player: None,
            assist: None,
            card: None,
            card_orphaned: None,
            first_yellow_minute: None,
            player_off: None,
            player_on: None,
            lineup: None,
            ts: None,
        }
    }

    #[test]
    fn test_goal_line_includes_scorer_assist_and_score() {
        let mut p = payload(NotificationType::Goal, 23);
        p.player = Some("Archer".to_string());
        p.assist = Some("Barnes".to_string());
        let line = summary_line(&p);
        assert!(line.contains("23'"));
        assert!(line.contains("Archer"));
        assert!(line.contains("assist=Barnes"));
        assert!(line.contains("2-1"));
    }

    #[test]
    fn test_orphaned_second_yellow_is_called_out() {
        let mut p = payload(NotificationType::CardSecondYellow, 85);
        p.player = Some("Barnes".to_string());
        p.card_orphaned = Some(true);
        assert!(summary_line(&p).contains("no prior yellow"));

        p.card_orphaned = None;
        assert!(!summary_line(&p).contains("no prior yellow"));
    }

    #[test]
    fn test_substitution_names_both_players() {
        let mut p = payload(NotificationType::Substitution, 60);
        p.player_off = Some("Archer".to_string());
        p.player_on = Some("Day".to_string());
        let line = summary_line(&p);
        assert!(line.contains("Archer off"));
        assert!(line.contains("Day on"));
    }

    #[test]
    fn test_full_time_carries_the_score() {
        assert_eq!(
            summary_line(&payload(NotificationType::FullTime, 90)),
            "FULL TIME (2-1)"
        );
    }
}
