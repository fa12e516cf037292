//! Wire protocol for Lycan.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`PlayerId`], [`RoomCode`], [`Phase`], [`Role`], …):
//!   identities and game vocabulary shared by every other crate.
//! - **Events** ([`ClientEvent`], [`ServerEvent`]): the named events
//!   carried one per text frame.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how events become text.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about sockets or rooms.
//!
//! ```text
//! Transport (text frames) → Protocol (events) → Room (game rules)
//! ```

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{
    ClientEvent, CreateRoom, EventTag, JoinRoom, MAX_MESSAGE_LEN, MAX_NAME_LEN, MAX_ROOM_NAME_LEN,
    NightActionIntent, RoomRef, SendMessage, ServerEvent, VoteIntent,
};
pub use types::{
    ActionKind, ChatEntry, GameSettings, GameStateView, Phase, PlayerId, PlayerView, Recipient,
    Role, RoomCode, RoomListEntry, VoteCount, Winner,
};
