//! Error types for the room layer.

use lycan_protocol::{Phase, PlayerId, RoomCode, ServerEvent};

/// Errors that can occur during room operations.
///
/// Every variant is reported to the player who caused it and never
/// broadcast. A rejected operation leaves the room exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Room settings are out of range, or the room is not ready to start.
    #[error("invalid room configuration: {0}")]
    InvalidConfig(String),

    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Another member already uses this name (compared case-insensitively).
    #[error("the name {0:?} is already taken in this room")]
    NameTaken(String),

    /// The room has no free seat.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The room is not in the lobby, so it cannot be joined.
    #[error("a game is already in progress in room {0}")]
    GameInProgress(RoomCode),

    /// The player may not perform this operation.
    #[error("not allowed: {0}")]
    Unauthorized(String),

    /// Werewolves picked different kill targets.
    #[error("werewolves must agree on a single target")]
    AmbiguousNightAction,

    /// The configured special roles do not fit the roster.
    #[error("{special} special roles cannot be dealt to {roster} players")]
    ConfigMismatch { special: usize, roster: usize },

    /// The action is not accepted in the room's current phase.
    #[error("not allowed during the {0} phase")]
    InvalidPhase(Phase),

    /// The target is unknown, dead, or forbidden for this action.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// The player is not a member of this room.
    #[error("player {0} is not in room {1}")]
    NotInRoom(PlayerId, RoomCode),

    /// The player is already seated in a room.
    #[error("player {0} is already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    /// The room's actor has stopped.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

impl RoomError {
    /// Stable name of the variant, sent to clients as the error `kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "InvalidConfig",
            Self::NotFound(_) => "NotFound",
            Self::NameTaken(_) => "NameTaken",
            Self::RoomFull(_) => "RoomFull",
            Self::GameInProgress(_) => "GameInProgress",
            Self::Unauthorized(_) => "Unauthorized",
            Self::AmbiguousNightAction => "AmbiguousNightAction",
            Self::ConfigMismatch { .. } => "ConfigMismatch",
            Self::InvalidPhase(_) => "InvalidPhase",
            Self::InvalidTarget(_) => "InvalidTarget",
            Self::NotInRoom(..) => "NotInRoom",
            Self::AlreadyInRoom(..) => "AlreadyInRoom",
            Self::Unavailable(_) => "Unavailable",
        }
    }

    /// The `error` event telling a player why their request was rejected.
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::Error {
            kind: self.kind().to_string(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_matches_variant_name() {
        let code = RoomCode::parse("AB12CD").unwrap();
        assert_eq!(RoomError::NotFound(code.clone()).kind(), "NotFound");
        assert_eq!(RoomError::AmbiguousNightAction.kind(), "AmbiguousNightAction");
        assert_eq!(
            RoomError::ConfigMismatch { special: 5, roster: 4 }.kind(),
            "ConfigMismatch"
        );
        assert_eq!(RoomError::InvalidPhase(Phase::Day).kind(), "InvalidPhase");
        assert_eq!(RoomError::Unavailable(code).kind(), "Unavailable");
    }

    #[test]
    fn test_error_messages_are_readable() {
        let code = RoomCode::parse("AB12CD").unwrap();
        assert_eq!(RoomError::RoomFull(code).to_string(), "room AB12CD is full");
        assert_eq!(
            RoomError::InvalidPhase(Phase::Night).to_string(),
            "not allowed during the night phase"
        );
    }
}
