//! Per-room membership.

use lycan_protocol::{PlayerId, PlayerView, Role, RoomCode};

use crate::RoomError;
use crate::roles::RoleRules;

/// One seated player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub alive: bool,
    /// False once the player left a running game. Such players stay in the
    /// roster as dead until the room returns to the lobby.
    pub connected: bool,
}

impl Player {
    fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            role: None,
            alive: true,
            connected: true,
        }
    }

    /// Whether this player holds a werewolf role.
    pub fn is_werewolf(&self) -> bool {
        self.role.is_some_and(RoleRules::is_werewolf)
    }
}

/// Players of one room, in join order, plus the host designation.
#[derive(Debug, Clone)]
pub struct Roster {
    players: Vec<Player>,
    host: PlayerId,
    max_players: usize,
}

impl Roster {
    /// Creates a roster seating `host` as its only member.
    pub fn new(host: PlayerId, host_name: String, max_players: usize) -> Self {
        Self {
            players: vec![Player::new(host, host_name)],
            host,
            max_players,
        }
    }

    /// Checks seat and name availability for a newcomer.
    ///
    /// Seats are checked before names.
    ///
    /// # Errors
    /// [`RoomError::AlreadyInRoom`], [`RoomError::RoomFull`] or
    /// [`RoomError::NameTaken`].
    pub fn check_join(&self, code: &RoomCode, id: PlayerId, name: &str) -> Result<(), RoomError> {
        if self.contains(id) {
            return Err(RoomError::AlreadyInRoom(id, code.clone()));
        }
        if self.players.len() >= self.max_players {
            return Err(RoomError::RoomFull(code.clone()));
        }
        if self.name_taken(name) {
            return Err(RoomError::NameTaken(name.to_string()));
        }
        Ok(())
    }

    /// Seats a player. Call [`check_join`](Self::check_join) first.
    pub fn add(&mut self, id: PlayerId, name: String) {
        self.players.push(Player::new(id, name));
    }

    /// Removes a player, handing host to the earliest-joined connected
    /// member if needed. Returns the removed player.
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let idx = self.players.iter().position(|p| p.id == id)?;
        let player = self.players.remove(idx);
        if id == self.host {
            self.reassign_host();
        }
        Some(player)
    }

    /// Marks a player as departed mid-game: dead and disconnected.
    ///
    /// Returns `false` if the player is unknown or already departed.
    pub fn depart(&mut self, id: PlayerId) -> bool {
        let Some(player) = self.get_mut(id) else {
            return false;
        };
        if !player.connected {
            return false;
        }
        player.connected = false;
        player.alive = false;
        if id == self.host {
            self.reassign_host();
        }
        true
    }

    /// Drops every departed player.
    pub fn prune_departed(&mut self) -> usize {
        let before = self.players.len();
        self.players.retain(|p| p.connected);
        before - self.players.len()
    }

    fn reassign_host(&mut self) {
        if let Some(next) = self.players.iter().find(|p| p.connected && p.id != self.host) {
            tracing::debug!(from = %self.host, to = %next.id, "host reassigned");
            self.host = next.id;
        }
    }

    fn name_taken(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.players.iter().any(|p| p.name.to_lowercase() == lower)
    }

    pub fn host(&self) -> PlayerId {
        self.host
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.host == id
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.iter_mut()
    }

    /// Members still holding a connection, in join order.
    pub fn connected_ids(&self) -> Vec<PlayerId> {
        self.players.iter().filter(|p| p.connected).map(|p| p.id).collect()
    }

    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.players.iter().filter(|p| p.alive).map(|p| p.id).collect()
    }

    pub fn dead_ids(&self) -> Vec<PlayerId> {
        self.players.iter().filter(|p| !p.alive).map(|p| p.id).collect()
    }

    /// Whether `id` is a member who is still alive.
    pub fn is_alive(&self, id: PlayerId) -> bool {
        self.get(id).is_some_and(|p| p.alive)
    }

    /// The roster as `viewer` may see it.
    ///
    /// A role is shown if it is the viewer's own, if viewer and player are
    /// both werewolves, or if `reveal_all` is set (the game has ended).
    pub fn views_for(&self, viewer: PlayerId, reveal_all: bool) -> Vec<PlayerView> {
        let viewer_is_wolf = self.get(viewer).is_some_and(Player::is_werewolf);
        self.players
            .iter()
            .map(|p| {
                let visible =
                    reveal_all || p.id == viewer || (viewer_is_wolf && p.is_werewolf());
                PlayerView {
                    id: p.id,
                    name: p.name.clone(),
                    is_host: p.id == self.host,
                    is_alive: p.alive,
                    role: if visible { p.role } else { None },
                }
            })
            .collect()
    }
}
