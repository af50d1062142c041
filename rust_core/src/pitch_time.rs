use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::models::{Anomaly, PitchStatus, Player};

/// One closed on-pitch interval, inclusive of entry and exit minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stint {
    pub on: u8,
    pub off: u8,
}

impl Stint {
    pub fn minutes(&self) -> u16 {
        u16::from(self.off.saturating_sub(self.on))
    }
}

/// Per-player pitch presence. At most one interval is ever open, and
/// cumulative minutes only grow when an interval closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPitchState {
    pub player: Player,
    pub status: PitchStatus,
    pub entered_at_minute: Option<u8>,
    pub cumulative_minutes: u16,
    pub stints: Vec<Stint>,
}

impl PlayerPitchState {
    fn new(player: Player) -> Self {
        Self {
            player,
            status: PitchStatus::NotYetOnPitch,
            entered_at_minute: None,
            cumulative_minutes: 0,
            stints: Vec::new(),
        }
    }
}

/// Minutes-played ledger for one match. Corrections are defensive: an
/// event naming a player in an unexpected state is still applied, with an
/// anomaly riding along instead of a rejection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PitchTimeLedger {
    players: FxHashMap<String, PlayerPitchState>,
}

impl PitchTimeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put the starting lineup on the pitch at minute zero.
    pub fn kickoff(&mut self, lineup: &[Player]) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        for player in lineup {
            let state = self.entry_for(player);
            match state.status {
                PitchStatus::NotYetOnPitch => enter(state, 0),
                found => {
                    anomalies.push(Anomaly::UnexpectedPitchState {
                        player_id: player.player_id.clone(),
                        expected: PitchStatus::NotYetOnPitch,
                        found,
                        minute: 0,
                    });
                    if found == PitchStatus::OffPitch {
                        enter(state, 0);
                    }
                }
            }
        }
        anomalies
    }

    /// Close the leaving player's interval and open one for the player
    /// coming on. Re-entry after an earlier exit is a normal path.
    pub fn substitution(
        &mut self,
        minute: u8,
        player_off: &Player,
        player_on: &Player,
    ) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        let off_state = self.entry_for(player_off);
        match off_state.status {
            PitchStatus::OnPitch => {
                if let Some(anomaly) = close_interval(off_state, minute) {
                    anomalies.push(anomaly);
                }
            }
            found => {
                anomalies.push(Anomaly::UnexpectedPitchState {
                    player_id: player_off.player_id.clone(),
                    expected: PitchStatus::OnPitch,
                    found,
                    minute,
                });
                off_state.status = PitchStatus::OffPitch;
                off_state.entered_at_minute = None;
            }
        }

        let on_state = self.entry_for(player_on);
        match on_state.status {
            PitchStatus::NotYetOnPitch | PitchStatus::OffPitch => enter(on_state, minute),
            PitchStatus::OnPitch => {
                // keep the original entry minute; restarting the interval
                // would double-count the overlap
                anomalies.push(Anomaly::UnexpectedPitchState {
                    player_id: player_on.player_id.clone(),
                    expected: PitchStatus::NotYetOnPitch,
                    found: PitchStatus::OnPitch,
                    minute,
                });
            }
        }

        anomalies
    }

    /// Close every open interval at the final whistle.
    pub fn full_time(&mut self, minute: u8) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();
        for state in self.players.values_mut() {
            if state.status == PitchStatus::OnPitch {
                if let Some(anomaly) = close_interval(state, minute) {
                    anomalies.push(anomaly);
                }
            }
        }
        anomalies
    }

    pub fn minutes_for(&self, player_id: &str) -> Option<u16> {
        self.players.get(player_id).map(|s| s.cumulative_minutes)
    }

    pub fn state_for(&self, player_id: &str) -> Option<&PlayerPitchState> {
        self.players.get(player_id)
    }

    /// Ids currently on the pitch, sorted for stable output.
    pub fn on_pitch_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .players
            .values()
            .filter(|s| s.status == PitchStatus::OnPitch)
            .map(|s| s.player.player_id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerPitchState> {
        self.players.values()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn entry_for(&mut self, player: &Player) -> &mut PlayerPitchState {
        self.players
            .entry(player.player_id.clone())
            .or_insert_with(|| PlayerPitchState::new(player.clone()))
    }
}

fn enter(state: &mut PlayerPitchState, minute: u8) {
    state.status = PitchStatus::OnPitch;
    state.entered_at_minute = Some(minute);
}

/// Close the open interval at `minute`. A close minute before the entry
/// minute credits zero and reports the clamp instead of going negative.
fn close_interval(state: &mut PlayerPitchState, minute: u8) -> Option<Anomaly> {
    let entered = state.entered_at_minute.take()?;
    state.status = PitchStatus::OffPitch;
    let off = minute.max(entered);
    state.stints.push(Stint { on: entered, off });
    state.cumulative_minutes += u16::from(off - entered);
    if minute < entered {
        Some(Anomaly::NegativeStintClamped {
            player_id: state.player.player_id.clone(),
            entered_at: entered,
            closed_at: minute,
        })
    } else {
        None
    }
}
