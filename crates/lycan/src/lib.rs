//! # Lycan
//!
//! Authoritative game server for werewolf-style party games.
//!
//! The server owns every rule: clients send intents (`join-room`, `vote`,
//! `night-action`, …) and receive the events the rooms decide to emit.
//! Roles stay secret to whoever is allowed to see them.
//!
//! ```text
//! Transport (WebSocket) → Gateway (one task per connection)
//!                       → Room registry → Room actor (one task per room)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lycan::prelude::*;
//!
//! # async fn run() -> Result<(), LycanError> {
//! let server = LycanServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::LycanError;
pub use server::{LycanServer, LycanServerBuilder, ServerConfig};

pub use lycan_protocol as protocol;
pub use lycan_room as room;
pub use lycan_transport as transport;

/// Everything needed to run a server and speak its protocol.
pub mod prelude {
    pub use crate::{LycanError, LycanServer, LycanServerBuilder, ServerConfig};
    pub use lycan_protocol::{
        ActionKind, ClientEvent, Codec, GameSettings, JsonCodec, Phase, PlayerId, Role, RoomCode,
        ServerEvent, Winner,
    };
    pub use lycan_room::{PhaseDurations, RoomConfig, RoomError, RoomRegistry};
}
