use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::models::{CardDetail, CardKind, EventDetail, MatchEvent};

/// Who a card was shown to. Opposition players are not tracked
/// individually, so their cards aggregate against the opposition as a
/// whole.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardRecipient {
    Player(String),
    Opposition,
}

/// One card, in the order it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub minute: u8,
    pub recipient: CardRecipient,
    pub card: CardKind,
}

/// Yellow and red counts. A second yellow contributes exactly one red and
/// no additional yellow; orphaned second yellows count the same way, with
/// the orphan flag kept on the record itself for review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineTotals {
    pub yellows: u16,
    pub reds: u16,
}

impl DisciplineTotals {
    fn add(&mut self, card: &CardKind) {
        match card {
            CardKind::Yellow => self.yellows += 1,
            CardKind::Red => self.reds += 1,
            CardKind::SecondYellow { .. } => self.reds += 1,
        }
    }
}

/// Ordered card history for one match. Totals are always a fold over the
/// records, recomputed on read, so they can never drift from the log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisciplineLog {
    records: Vec<CardRecord>,
}

impl DisciplineLog {
    pub fn record(&mut self, minute: u8, detail: &CardDetail) {
        let (recipient, card) = match detail {
            CardDetail::Tracked { player, card } => {
                (CardRecipient::Player(player.player_id.clone()), card.clone())
            }
            CardDetail::Opposition { card } => (CardRecipient::Opposition, card.clone()),
        };
        self.records.push(CardRecord {
            minute,
            recipient,
            card,
        });
    }

    pub fn records(&self) -> &[CardRecord] {
        &self.records
    }

    /// Minute of the most recent plain yellow held by this player, used to
    /// escalate an incoming red into a second yellow.
    pub fn standing_yellow(&self, player_id: &str) -> Option<u8> {
        self.records.iter().rev().find_map(|r| match r {
            CardRecord {
                minute,
                recipient: CardRecipient::Player(id),
                card: CardKind::Yellow,
            } if id == player_id => Some(*minute),
            _ => None,
        })
    }

    pub fn totals_for(&self, recipient: &CardRecipient) -> DisciplineTotals {
        let mut totals = DisciplineTotals::default();
        for r in &self.records {
            if &r.recipient == recipient {
                totals.add(&r.card);
            }
        }
        totals
    }

    /// Tracked-team totals across all players.
    pub fn team_totals(&self) -> DisciplineTotals {
        let mut totals = DisciplineTotals::default();
        for r in &self.records {
            if matches!(r.recipient, CardRecipient::Player(_)) {
                totals.add(&r.card);
            }
        }
        totals
    }

    pub fn opposition_totals(&self) -> DisciplineTotals {
        self.totals_for(&CardRecipient::Opposition)
    }

    pub fn totals_by_player(&self) -> FxHashMap<String, DisciplineTotals> {
        let mut by_player: FxHashMap<String, DisciplineTotals> = FxHashMap::default();
        for r in &self.records {
            if let CardRecipient::Player(id) = &r.recipient {
                by_player.entry(id.clone()).or_default().add(&r.card);
            }
        }
        by_player
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Rebuild the card history from an event sequence.
pub fn fold_discipline(events: &[MatchEvent]) -> DisciplineLog {
    let mut log = DisciplineLog::default();
    for event in events {
        if let EventDetail::Card(detail) = &event.detail {
            log.record(event.minute, detail);
        }
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Player;

    fn tracked(player_id: &str, card: CardKind) -> CardDetail {
        CardDetail::Tracked {
            player: Player::new(player_id, player_id),
            card,
        }
    }

    #[test]
    fn test_second_yellow_counts_once_as_red() {
        let mut log = DisciplineLog::default();
        log.record(10, &tracked("smith", CardKind::Yellow));
        log.record(
            55,
            &tracked(
                "smith",
                CardKind::SecondYellow {
                    first_yellow_minute: Some(10),
                },
            ),
        );

        let totals = log.totals_for(&CardRecipient::Player("smith".to_string()));
        assert_eq!(totals.yellows, 1);
        assert_eq!(totals.reds, 1);
    }

    #[test]
    fn test_orphaned_second_yellow_counts_toward_reds() {
        let mut log = DisciplineLog::default();
        log.record(
            70,
            &tracked(
                "jones",
                CardKind::SecondYellow {
                    first_yellow_minute: None,
                },
            ),
        );

        let totals = log.totals_for(&CardRecipient::Player("jones".to_string()));
        assert_eq!(totals.yellows, 0);
        assert_eq!(totals.reds, 1);
        assert!(log.records()[0].card.is_orphaned());
    }

    #[test]
    fn test_standing_yellow_finds_most_recent() {
        let mut log = DisciplineLog::default();
        log.record(12, &tracked("smith", CardKind::Yellow));
        log.record(30, &tracked("jones", CardKind::Yellow));
        log.record(44, &tracked("smith", CardKind::Yellow));

        assert_eq!(log.standing_yellow("smith"), Some(44));
        assert_eq!(log.standing_yellow("jones"), Some(30));
        assert_eq!(log.standing_yellow("brown"), None);
    }

    #[test]
    fn test_opposition_cards_aggregate_separately() {
        let mut log = DisciplineLog::default();
        log.record(20, &CardDetail::Opposition {
            card: CardKind::Yellow,
        });
        log.record(65, &CardDetail::Opposition { card: CardKind::Red });
        log.record(80, &tracked("smith", CardKind::Yellow));

        let opposition = log.opposition_totals();
        assert_eq!(opposition.yellows, 1);
        assert_eq!(opposition.reds, 1);

        let team = log.team_totals();
        assert_eq!(team.yellows, 1);
        assert_eq!(team.reds, 0);

        // opposition cards never escalate a tracked player
        assert_eq!(log.standing_yellow("opposition"), None);
    }

    #[test]
    fn test_totals_recompute_identically_on_every_read() {
        let mut log = DisciplineLog::default();
        log.record(5, &tracked("a", CardKind::Yellow));
        log.record(15, &tracked("b", CardKind::Yellow));
        log.record(25, &tracked("a", CardKind::Red));

        let first = log.team_totals();
        let second = log.team_totals();
        assert_eq!(first, second);
        assert_eq!(first.yellows, 2);
        assert_eq!(first.reds, 1);

        let by_player = log.totals_by_player();
        assert_eq!(by_player["a"].reds, 1);
        assert_eq!(by_player["b"].yellows, 1);
    }
}
