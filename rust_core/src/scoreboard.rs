use crate::models::{EventDetail, GoalDetail, MatchEvent, Score};

/// Credit one goal to the right side of the scoreboard. Which side the
/// tracked team occupies comes from the per-match home/away flag, never
/// from configuration shared across matches.
pub fn apply_goal(score: &mut Score, goal: &GoalDetail, is_home_team: bool) {
    let tracked_scored = matches!(goal, GoalDetail::Tracked { .. });
    if tracked_scored == is_home_team {
        score.home += 1;
    } else {
        score.away += 1;
    }
}

/// Score as a fold over the event sequence. The live path applies goals
/// incrementally; replaying through this fold must land on the same score.
pub fn fold_score(events: &[MatchEvent], is_home_team: bool) -> Score {
    let mut score = Score::default();
    for event in events {
        if let EventDetail::Goal(goal) = &event.detail {
            apply_goal(&mut score, goal, is_home_team);
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventDetail, Player};
    use chrono::Utc;

    fn tracked_goal() -> GoalDetail {
        GoalDetail::Tracked {
            scorer: Player::new("smith", "Smith"),
            assist: None,
        }
    }

    fn goal_event(goal: GoalDetail) -> MatchEvent {
        MatchEvent::new("m1", 10, EventDetail::Goal(goal), None, Utc::now())
    }

    #[test]
    fn test_tracked_goal_when_home_bumps_home() {
        let mut score = Score::default();
        apply_goal(&mut score, &tracked_goal(), true);
        assert_eq!((score.home, score.away), (1, 0));
    }

    #[test]
    fn test_tracked_goal_when_away_bumps_away() {
        let mut score = Score::default();
        apply_goal(&mut score, &tracked_goal(), false);
        assert_eq!((score.home, score.away), (0, 1));
    }

    #[test]
    fn test_opposition_goal_lands_on_the_other_side() {
        let mut score = Score::default();
        apply_goal(&mut score, &GoalDetail::Opposition, true);
        assert_eq!((score.home, score.away), (0, 1));

        let mut score = Score::default();
        apply_goal(&mut score, &GoalDetail::Opposition, false);
        assert_eq!((score.home, score.away), (1, 0));
    }

    #[test]
    fn test_away_fixture_with_opposition_goals() {
        // tracked team playing away: two of ours, one of theirs
        let events = vec![
            goal_event(tracked_goal()),
            goal_event(GoalDetail::Opposition),
            goal_event(tracked_goal()),
        ];
        let score = fold_score(&events, false);
        assert_eq!((score.home, score.away), (1, 2));
    }

    #[test]
    fn test_fold_matches_incremental_application() {
        let events = vec![
            goal_event(tracked_goal()),
            goal_event(GoalDetail::Opposition),
            goal_event(GoalDetail::Opposition),
            goal_event(tracked_goal()),
        ];

        let mut incremental = Score::default();
        for event in &events {
            if let EventDetail::Goal(goal) = &event.detail {
                apply_goal(&mut incremental, goal, true);
            }
        }

        assert_eq!(fold_score(&events, true), incremental);
        // replaying is stable
        assert_eq!(fold_score(&events, true), fold_score(&events, true));
    }

    #[test]
    fn test_non_goal_events_leave_score_untouched() {
        let events = vec![
            MatchEvent::new("m1", 0, EventDetail::HalfTime, None, Utc::now()),
            goal_event(tracked_goal()),
        ];
        let score = fold_score(&events, true);
        assert_eq!((score.home, score.away), (1, 0));
    }
}
