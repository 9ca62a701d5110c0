//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::room::Phase;

/// Fewest participants a game can start with.
pub const MIN_PARTICIPANTS: usize = 4;
/// Roster cap; at exactly this size the classic fixed composition is used.
pub const MAX_PARTICIPANTS: usize = 12;

/// Per-session settings: roster limits and phase durations.
///
/// Durations are lower bounds — timeout checks are opportunistic, so a
/// phase ends at the first check *after* its duration elapses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Minimum participants required by `start()`.
    pub min_players: usize,
    /// Maximum participants accepted by `join()`.
    pub max_players: usize,
    /// How long roles stay on screen before the first night.
    pub role_reveal: Duration,
    /// Night phase duration.
    pub night: Duration,
    /// Day discussion duration.
    pub day: Duration,
    /// Voting duration. Voting never resolves early, even with every
    /// ballot in — only at timeout or an explicit end trigger.
    pub voting: Duration,
    /// Grace period for revenge targets and human last words before
    /// defaults are substituted.
    pub resolution_grace: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_PARTICIPANTS,
            max_players: MAX_PARTICIPANTS,
            role_reveal: Duration::from_secs(15),
            night: Duration::from_secs(120),
            day: Duration::from_secs(180),
            voting: Duration::from_secs(60),
            resolution_grace: Duration::from_secs(30),
        }
    }
}

impl GameConfig {
    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Roster limits are forced into `[MIN_PARTICIPANTS, MAX_PARTICIPANTS]`
    /// and every duration to at least one second.
    pub fn validated(mut self) -> Self {
        self.min_players = self.min_players.clamp(MIN_PARTICIPANTS, MAX_PARTICIPANTS);
        self.max_players = self.max_players.clamp(self.min_players, MAX_PARTICIPANTS);
        let floor = Duration::from_secs(1);
        for d in [
            &mut self.role_reveal,
            &mut self.night,
            &mut self.day,
            &mut self.voting,
            &mut self.resolution_grace,
        ] {
            if *d < floor {
                *d = floor;
            }
        }
        self
    }

    /// The fixed duration for a phase, or `None` for the untimed ones
    /// (Waiting, Ended).
    pub fn phase_duration(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Waiting | Phase::Ended => None,
            Phase::RoleReveal => Some(self.role_reveal),
            Phase::Night => Some(self.night),
            Phase::Day => Some(self.day),
            Phase::Voting => Some(self.voting),
            Phase::Resolution => Some(self.resolution_grace),
        }
    }
}
