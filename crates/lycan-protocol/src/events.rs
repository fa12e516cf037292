//! Named events exchanged with clients.
//!
//! Every frame on the wire is one event:
//!
//! ```text
//! { "event": "join-room", "data": { "playerName": "Ana", "roomCode": "K3P9QZ" } }
//! ```
//!
//! Inbound frames decode into [`ClientEvent`], a closed set of variants,
//! each with its own payload struct. Anything that does not match one of
//! them fails to decode, and [`ClientEvent::validated`] then checks the
//! field contents (name lengths, empty messages) before the event is
//! allowed anywhere near a room.

use serde::{Deserialize, Serialize};

use crate::types::{
    ActionKind, ChatEntry, GameSettings, GameStateView, Phase, PlayerId, PlayerView, Role,
    RoomCode, RoomListEntry, VoteCount, Winner,
};
use crate::ProtocolError;

/// Longest accepted display name, in characters, after trimming.
pub const MAX_NAME_LEN: usize = 20;

/// Longest accepted room name, in characters, after trimming.
pub const MAX_ROOM_NAME_LEN: usize = 40;

/// Longest accepted chat message, in characters, after trimming.
pub const MAX_MESSAGE_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Payload of `create-room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    pub host_name: String,
    pub max_players: usize,
    pub game_settings: GameSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
}

/// Payload of `join-room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub player_name: String,
    pub room_code: RoomCode,
}

/// Payload of events that only name the room (`start-game`, `leave-room`,
/// `restart-game`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    pub room_code: RoomCode,
}

/// Payload of `send-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub room_code: RoomCode,
    pub message: String,
}

/// Payload of `vote`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteIntent {
    pub room_code: RoomCode,
    pub target_id: PlayerId,
}

/// Payload of `night-action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NightActionIntent {
    pub room_code: RoomCode,
    pub target_id: PlayerId,
    pub action: ActionKind,
}

/// Everything a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    CreateRoom(CreateRoom),
    JoinRoom(JoinRoom),
    StartGame(RoomRef),
    LeaveRoom(RoomRef),
    SendMessage(SendMessage),
    Vote(VoteIntent),
    NightAction(NightActionIntent),
    RestartGame(RoomRef),
    ListRooms,
}

impl ClientEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => "create-room",
            Self::JoinRoom(_) => "join-room",
            Self::StartGame(_) => "start-game",
            Self::LeaveRoom(_) => "leave-room",
            Self::SendMessage(_) => "send-message",
            Self::Vote(_) => "vote",
            Self::NightAction(_) => "night-action",
            Self::RestartGame(_) => "restart-game",
            Self::ListRooms => "list-rooms",
        }
    }

    /// Normalizes free-text fields and rejects out-of-range content.
    ///
    /// Names and messages are trimmed. Numeric room settings are *not*
    /// checked here; those belong to the room registry, which owns the
    /// rules for a valid configuration.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] describing the first
    /// offending field.
    pub fn validated(self) -> Result<Self, ProtocolError> {
        Ok(match self {
            Self::CreateRoom(mut p) => {
                p.host_name = bounded_text("hostName", &p.host_name, MAX_NAME_LEN)?;
                p.room_name = match p.room_name.as_deref().map(str::trim) {
                    None | Some("") => None,
                    Some(name) => Some(bounded_text("roomName", name, MAX_ROOM_NAME_LEN)?),
                };
                Self::CreateRoom(p)
            }
            Self::JoinRoom(mut p) => {
                p.player_name = bounded_text("playerName", &p.player_name, MAX_NAME_LEN)?;
                Self::JoinRoom(p)
            }
            Self::SendMessage(mut p) => {
                p.message = bounded_text("message", &p.message, MAX_MESSAGE_LEN)?;
                Self::SendMessage(p)
            }
            other => other,
        })
    }
}

/// Just the event name of an inbound frame.
///
/// Used to answer frames whose payload fails to decode with the reply
/// that matches what the client was attempting.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventTag {
    pub event: String,
}

fn bounded_text(field: &str, raw: &str, max: usize) -> Result<String, ProtocolError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ProtocolError::InvalidMessage(format!("{field} must not be empty")));
    }
    if text.chars().count() > max {
        return Err(ProtocolError::InvalidMessage(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(text.to_string())
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Everything the server may send.
///
/// Room-wide events go to every connected member of one room; replies,
/// errors, `role-assigned` and `peek-result` go to exactly one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    RoomCreated {
        room_code: RoomCode,
        player_id: PlayerId,
    },
    CreateRoomError {
        message: String,
    },
    JoinSuccess {
        room_code: RoomCode,
        room_name: String,
        player_id: PlayerId,
        players: Vec<PlayerView>,
        max_players: usize,
        messages: Vec<ChatEntry>,
    },
    JoinError {
        message: String,
    },
    PlayerJoined {
        players: Vec<PlayerView>,
        max_players: usize,
    },
    PlayerLeft {
        players: Vec<PlayerView>,
        max_players: usize,
    },
    GameStarted,
    RoleAssigned {
        role: Role,
    },
    PhaseChange {
        phase: Phase,
        round: u32,
        /// Seconds until the phase is forced to resolve; absent for
        /// phases without a deadline.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u64>,
    },
    GameStateUpdate {
        game_state: GameStateView,
        players: Vec<PlayerView>,
    },
    ChatMessage {
        sender: String,
        message: String,
    },
    VoteCast {
        voter_id: PlayerId,
        target_id: PlayerId,
    },
    VoteResult {
        eliminated: Option<PlayerId>,
        tally: Vec<VoteCount>,
    },
    NightResult {
        victim: Option<PlayerId>,
    },
    PeekResult {
        target_id: PlayerId,
        is_werewolf: bool,
    },
    GameEnded {
        winner: Winner,
        roles: Vec<PlayerView>,
    },
    RoomLeft {
        room_code: RoomCode,
    },
    RoomList {
        rooms: Vec<RoomListEntry>,
    },
    Error {
        kind: String,
        message: String,
    },
}

// =========================================================================
// Tests
// =========================================================================
