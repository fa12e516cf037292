//! Room configuration.

use std::time::Duration;

use lycan_protocol::GameSettings;
use serde::{Deserialize, Serialize};

use crate::RoomError;

/// Smallest roster a game can start with.
pub const MIN_PLAYERS_TO_START: usize = 4;

/// Bounds on a room's `max_players`.
pub const MAX_PLAYERS_RANGE: std::ops::RangeInclusive<usize> = 4..=12;

// ---------------------------------------------------------------------------
// PhaseDurations
// ---------------------------------------------------------------------------

/// How long each timed phase may last before it is forced to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDurations {
    /// Night action window.
    pub night: Duration,
    /// Day voting window.
    pub day: Duration,
    /// How long an ended room lingers for a restart before it is torn down.
    pub teardown_grace: Duration,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            night: Duration::from_secs(60),
            day: Duration::from_secs(120),
            teardown_grace: Duration::from_secs(300),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for one room, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Display name shown in room listings.
    pub name: String,

    /// Seats in the room.
    pub max_players: usize,

    /// Which roles are dealt.
    pub settings: GameSettings,

    /// Phase deadlines.
    pub durations: PhaseDurations,

    /// Chat lines kept for players who join later.
    pub message_log_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            name: "Lycan room".to_string(),
            max_players: 8,
            settings: GameSettings::default(),
            durations: PhaseDurations::default(),
            message_log_capacity: 100,
        }
    }
}

impl RoomConfig {
    /// Creates a config with the given name, seats, and settings, and
    /// default durations.
    pub fn new(name: impl Into<String>, max_players: usize, settings: GameSettings) -> Self {
        Self {
            name: name.into(),
            max_players,
            settings,
            ..Self::default()
        }
    }

    /// Replaces the phase durations.
    pub fn with_durations(mut self, durations: PhaseDurations) -> Self {
        self.durations = durations;
        self
    }

    /// Checks `4 <= max_players <= 12` and `1 <= werewolves < max_players`.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidConfig`] naming the first violated rule.
    pub fn validate(&self) -> Result<(), RoomError> {
        if !MAX_PLAYERS_RANGE.contains(&self.max_players) {
            return Err(RoomError::InvalidConfig(format!(
                "maxPlayers must be between {} and {}, got {}",
                MAX_PLAYERS_RANGE.start(),
                MAX_PLAYERS_RANGE.end(),
                self.max_players
            )));
        }
        let wolves = self.settings.num_werewolves;
        if wolves == 0 || wolves >= self.max_players {
            return Err(RoomError::InvalidConfig(format!(
                "numWerewolves must be at least 1 and below maxPlayers ({}), got {wolves}",
                self.max_players
            )));
        }
        if self.message_log_capacity == 0 {
            return Err(RoomError::InvalidConfig(
                "message log capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
