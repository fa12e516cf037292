//! Core protocol types for Lycan's wire format.
//!
//! Everything in this module travels "on the wire": it is serialized to
//! JSON by the gateway and read by browser clients. Field and variant
//! spellings are part of the contract with those clients, which is why
//! most types carry explicit `serde` renames.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// One player per connection: the gateway allocates the id when the socket
/// is accepted and it lives exactly as long as that socket.
///
/// `#[serde(transparent)]` makes `PlayerId(42)` serialize as `42`, which is
/// what clients send back as `targetId`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The short code players type to find a room.
///
/// Always [`RoomCode::LEN`] characters drawn from [`RoomCode::ALPHABET`].
/// The inner string is private so that every `RoomCode` in the system has
/// been through [`RoomCode::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Number of characters in a room code.
    pub const LEN: usize = 6;

    /// Characters a room code may contain (uppercase alphanumerics).
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Parses user input into a room code.
    ///
    /// Surrounding whitespace is ignored and letters are upper-cased, so
    /// `" ab12cd "` parses to `AB12CD`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidRoomCode`] if the trimmed input is
    /// not exactly six ASCII letters or digits.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let code = raw.trim().to_ascii_uppercase();
        let valid = code.len() == Self::LEN
            && code.bytes().all(|b| Self::ALPHABET.contains(&b));
        if valid {
            Ok(Self(code))
        } else {
            Err(ProtocolError::InvalidRoomCode(raw.to_string()))
        }
    }

    /// Builds a code one character at a time.
    ///
    /// `pick` receives the alphabet size and returns an index into
    /// [`RoomCode::ALPHABET`]; indices past the end wrap around, so any
    /// source of numbers yields a well-formed code.
    pub fn from_indices(mut pick: impl FnMut(usize) -> usize) -> Self {
        let n = Self::ALPHABET.len();
        let code = (0..Self::LEN)
            .map(|_| char::from(Self::ALPHABET[pick(n) % n]))
            .collect();
        Self(code)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

// ---------------------------------------------------------------------------
// Phase: the per-room state machine
// ---------------------------------------------------------------------------

/// The phase a room is in.
///
/// ```text
/// Lobby → Night → Day → Night → Day → … → Ended
///           │             │                  │
///           └──→ Ended ←──┘                  └──→ Lobby (restart)
/// ```
///
/// - **Lobby**: accepting joins, no roles yet.
/// - **Night**: role-gated secret actions are collected.
/// - **Day**: every living player votes.
/// - **Ended**: a side has won. No actions are accepted; the host may
///   restart, otherwise the room is torn down after a grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lobby,
    Night,
    Day,
    Ended,
}

impl Phase {
    /// Returns `true` if the room accepts new players.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Returns `true` while a game is being played (night or day).
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Night | Self::Day)
    }

    /// Returns `true` if moving from `self` to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Lobby, Self::Night)
                | (Self::Night, Self::Day)
                | (Self::Night, Self::Ended)
                | (Self::Day, Self::Night)
                | (Self::Day, Self::Ended)
                | (Self::Ended, Self::Lobby)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lobby => "lobby",
            Self::Night => "night",
            Self::Day => "day",
            Self::Ended => "ended",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Roles, actions, outcomes
// ---------------------------------------------------------------------------

/// A secret role dealt at game start.
///
/// The rules attached to each role (which night action it may take, who it
/// may target) live in the room crate; this type is only the wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Werewolf,
    Villager,
    Doctor,
    LittleGirl,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Werewolf => "werewolf",
            Self::Villager => "villager",
            Self::Doctor => "doctor",
            Self::LittleGirl => "little-girl",
        };
        f.write_str(name)
    }
}

/// What a night action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Werewolves: eliminate the target unless protected.
    Kill,
    /// Doctor: protect the target from tonight's kill.
    Revive,
    /// Little girl: privately learn whether the target is a werewolf.
    Peek,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Kill => "kill",
            Self::Revive => "revive",
            Self::Peek => "peek",
        };
        f.write_str(name)
    }
}

/// The side that won a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Villagers,
    Werewolves,
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Villagers => f.write_str("villagers"),
            Self::Werewolves => f.write_str("werewolves"),
        }
    }
}

/// Game settings chosen by the host when creating a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// How many werewolves are dealt. Must be at least 1 and below the
    /// room's player limit.
    pub num_werewolves: usize,
    /// Deal one doctor.
    #[serde(default)]
    pub enable_doctor: bool,
    /// Deal one little girl.
    #[serde(default)]
    pub enable_little_girl: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            num_werewolves: 2,
            enable_doctor: true,
            enable_little_girl: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Recipient: routing inside the server, never serialized
// ---------------------------------------------------------------------------

/// Who should receive an outbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    /// Every connected member of the room.
    All,
    /// Exactly one player.
    Player(PlayerId),
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// One roster entry as a particular viewer is allowed to see it.
///
/// `role` is only present when the viewer may know it: their own role,
/// fellow werewolves for a werewolf, or everyone once the game has ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    pub is_alive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Public game state pushed with every `game-state-update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub phase: Phase,
    pub round: u32,
    pub alive_players: Vec<PlayerId>,
    pub dead_players: Vec<PlayerId>,
}

/// A chat line kept in the room's message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub sender: String,
    pub message: String,
}

/// Votes received by one target in a day resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCount {
    pub target_id: PlayerId,
    pub votes: u32,
}

/// A summary of a joinable room returned in room listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomListEntry {
    pub room_code: RoomCode,
    pub room_name: String,
    pub player_count: usize,
    pub max_players: usize,
}

// =========================================================================
// Tests
// =========================================================================
