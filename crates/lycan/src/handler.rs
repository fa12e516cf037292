//! Per-connection handler: decode intents, route them, stream events back.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Allocate a `PlayerId` and an outbound event channel
//!   2. Loop: select over inbound frames and outbound events
//!   3. On exit, the session guard posts a leave to the player's room
//!
//! Every event bound for the client, replies included, goes through the
//! outbound channel, so the client sees them in the order they were
//! produced.

use std::sync::Arc;

use lycan_protocol::{
    ClientEvent, Codec, CreateRoom, EventTag, JoinRoom, PlayerId, RoomCode, ServerEvent,
};
use lycan_room::{PlayerSender, RoomConfig, RoomError, RoomHandle};
use lycan_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::LycanError;
use crate::server::ServerState;

/// One connected player.
///
/// Doubles as the drop guard: when the handler exits for any reason,
/// including a panic, the player's room is told they left. Since `Drop`
/// is synchronous the leave is posted from a detached task.
struct Session {
    player_id: PlayerId,
    sender: PlayerSender,
    room: Option<RoomHandle>,
}

impl Session {
    fn reply(&self, event: ServerEvent) {
        // The receiver lives in the handler loop that owns this session.
        let _ = self.sender.send(event);
    }

    /// The room handle if `code` names the room this player is in.
    fn room_for(&self, code: &RoomCode) -> Result<&RoomHandle, RoomError> {
        self.room
            .as_ref()
            .filter(|h| h.code() == code)
            .ok_or_else(|| RoomError::NotInRoom(self.player_id, code.clone()))
    }

    fn ensure_roomless(&self) -> Result<(), RoomError> {
        match &self.room {
            Some(h) => Err(RoomError::AlreadyInRoom(self.player_id, h.code().clone())),
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(room) = self.room.take() {
            tracing::debug!(player_id = %self.player_id, room = %room.code(), "posting leave on disconnect");
            room.leave_detached(self.player_id);
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), LycanError> {
    let conn_id = conn.id();
    let player_id = state.allocate_player_id();
    let (sender, mut outbound) = mpsc::unbounded_channel();
    let mut session = Session {
        player_id,
        sender,
        room: None,
    };
    tracing::info!(%conn_id, %player_id, "player connected");

    loop {
        tokio::select! {
            frame = conn.recv() => match frame {
                Ok(Some(text)) => handle_frame(&state, &mut session, &text).await,
                Ok(None) => {
                    tracing::info!(%player_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%player_id, error = %e, "recv error");
                    break;
                }
            },
            Some(event) = outbound.recv() => {
                if let ServerEvent::RoomLeft { room_code } = &event {
                    // Evicted by the room itself (shutdown or teardown).
                    if session.room.as_ref().is_some_and(|h| h.code() == room_code) {
                        session.room = None;
                    }
                }
                let text = state.codec.encode(&event)?;
                conn.send(&text).await?;
            }
        }
    }

    // session drops here → leave fires.
    Ok(())
}

/// Decodes, validates, and routes one inbound frame.
///
/// Failures never end the connection; they are reported to the client as
/// the matching error event.
async fn handle_frame<C: Codec>(state: &ServerState<C>, session: &mut Session, text: &str) {
    let player_id = session.player_id;

    let event: ClientEvent = match state.codec.decode(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%player_id, error = %e, "failed to decode event");
            let name = state
                .codec
                .decode::<EventTag>(text)
                .map(|tag| tag.event)
                .unwrap_or_default();
            session.reply(rejection(&name, malformed(e.to_string())));
            return;
        }
    };
    let name = event.name();
    let event = match event.validated() {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%player_id, event = name, error = %e, "payload rejected");
            session.reply(rejection(name, malformed(e.to_string())));
            return;
        }
    };
    tracing::debug!(%player_id, event = name, "event received");

    let result = match event {
        ClientEvent::CreateRoom(p) => create_room(state, session, p).await,
        ClientEvent::JoinRoom(p) => join_room(state, session, p).await,
        ClientEvent::LeaveRoom(p) => leave_room(session, &p.room_code).await,
        ClientEvent::StartGame(p) => match session.room_for(&p.room_code) {
            Ok(room) => room.start(player_id).await,
            Err(e) => Err(e),
        },
        ClientEvent::RestartGame(p) => match session.room_for(&p.room_code) {
            Ok(room) => room.restart(player_id).await,
            Err(e) => Err(e),
        },
        ClientEvent::SendMessage(p) => match session.room_for(&p.room_code) {
            Ok(room) => room.chat(player_id, p.message).await,
            Err(e) => Err(e),
        },
        ClientEvent::Vote(p) => match session.room_for(&p.room_code) {
            Ok(room) => room.vote(player_id, p.target_id).await,
            Err(e) => Err(e),
        },
        ClientEvent::NightAction(p) => match session.room_for(&p.room_code) {
            Ok(room) => room.night_action(player_id, p.action, p.target_id).await,
            Err(e) => Err(e),
        },
        ClientEvent::ListRooms => {
            let rooms = state.registry.list_rooms().await;
            session.reply(ServerEvent::RoomList { rooms });
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::debug!(%player_id, event = name, error = %e, "event rejected");
        session.reply(rejection(name, e.to_event()));
    }
}

async fn create_room<C: Codec>(
    state: &ServerState<C>,
    session: &mut Session,
    p: CreateRoom,
) -> Result<(), RoomError> {
    session.ensure_roomless()?;
    let name = p
        .room_name
        .unwrap_or_else(|| format!("{}'s room", p.host_name));
    let config =
        RoomConfig::new(name, p.max_players, p.game_settings).with_durations(state.durations);

    // The room queues `room-created` on our channel itself.
    let handle = state
        .registry
        .create_room(session.player_id, p.host_name, session.sender.clone(), config)
        .await?;
    session.room = Some(handle);
    Ok(())
}

async fn join_room<C: Codec>(
    state: &ServerState<C>,
    session: &mut Session,
    p: JoinRoom,
) -> Result<(), RoomError> {
    session.ensure_roomless()?;
    let handle = state.registry.get_room(&p.room_code).await?;
    handle
        .join(session.player_id, p.player_name, session.sender.clone())
        .await?;
    session.room = Some(handle);
    Ok(())
}

async fn leave_room(session: &mut Session, code: &RoomCode) -> Result<(), RoomError> {
    session.room_for(code)?.leave(session.player_id).await?;
    session.room = None;
    session.reply(ServerEvent::RoomLeft {
        room_code: code.clone(),
    });
    Ok(())
}

/// A payload that failed decoding or validation.
fn malformed(message: String) -> ServerEvent {
    ServerEvent::Error {
        kind: "InvalidConfig".to_string(),
        message,
    }
}

/// Maps a failure of `event` to what the client expects back: creation
/// and join failures have their own events, everything else is `error`.
fn rejection(event: &str, error: ServerEvent) -> ServerEvent {
    let ServerEvent::Error { message, .. } = &error else {
        return error;
    };
    match event {
        "create-room" => ServerEvent::CreateRoomError {
            message: message.clone(),
        },
        "join-room" => ServerEvent::JoinError {
            message: message.clone(),
        },
        _ => error,
    }
}
