//! Room registry: creates, finds, lists, and removes rooms by code.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lycan_protocol::{Phase, PlayerId, RoomCode, RoomListEntry};
use tokio::sync::Mutex;

use crate::code;
use crate::room::{RoomSeed, spawn_room};
use crate::{PlayerSender, RoomConfig, RoomError, RoomHandle};

/// Default command queue size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Live rooms keyed by code.
pub(crate) type RoomTable = Mutex<HashMap<RoomCode, RoomHandle>>;

/// Every live room in the process.
///
/// Constructed once by the server and shared by cloning (clones share the
/// same table). All create, lookup, and remove calls serialize on one lock;
/// the lock is never held while waiting on a room.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<RoomTable>,
    next_instance: Arc<AtomicU64>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `config`, draws an unused code, and opens a room with the
    /// host already seated. The host's `room-created` reply is queued on
    /// `host_sender` by the room itself, ahead of any room event.
    ///
    /// # Errors
    /// [`RoomError::InvalidConfig`] if the config is out of range.
    pub async fn create_room(
        &self,
        host: PlayerId,
        host_name: String,
        host_sender: PlayerSender,
        config: RoomConfig,
    ) -> Result<RoomHandle, RoomError> {
        config.validate()?;

        let mut rooms = self.rooms.lock().await;
        let code = code::generate_unique(&mut rand::rng(), |c| rooms.contains_key(c));
        let seed = RoomSeed {
            code: code.clone(),
            instance: self.next_instance.fetch_add(1, Ordering::Relaxed),
            config,
            host,
            host_name,
            host_sender,
        };
        let handle = spawn_room(seed, Arc::downgrade(&self.rooms), DEFAULT_CHANNEL_SIZE);
        rooms.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, %host, rooms = rooms.len(), "room created");
        Ok(handle)
    }

    /// Looks up a live room.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no live room has this code.
    pub async fn get_room(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .lock()
            .await
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Removes a room and shuts its actor down.
    ///
    /// Idempotent: returns `false` if the room was already gone.
    pub async fn remove_room(&self, code: &RoomCode) -> bool {
        let removed = self.rooms.lock().await.remove(code);
        match removed {
            Some(handle) => {
                let _ = handle.shutdown().await;
                tracing::info!(room = %code, "room removed");
                true
            }
            None => false,
        }
    }

    /// Lists rooms that are still in the lobby.
    ///
    /// Handles are cloned under the lock and queried after it is released.
    /// Rooms that fail to answer (shutting down) are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomListEntry> {
        let handles: Vec<RoomHandle> = self.rooms.lock().await.values().cloned().collect();

        let mut entries = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(info) = handle.get_info().await {
                if info.phase == Phase::Lobby {
                    entries.push(info.to_list_entry());
                }
            }
        }
        entries.sort_by(|a, b| a.room_code.cmp(&b.room_code));
        entries
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Codes of all live rooms.
    pub async fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.lock().await.keys().cloned().collect()
    }
}
