//! Room actor: an isolated Tokio task that owns one [`Game`].
//!
//! Each room runs in its own task and talks to the outside world through
//! a bounded mpsc queue. Commands are processed strictly one at a time in
//! arrival order, interleaved with the room's phase deadline, so the game
//! state needs no locking.

use std::collections::HashMap;
use std::sync::Weak;

use lycan_protocol::{
    ActionKind, Phase, PlayerId, Recipient, RoomCode, RoomListEntry, ServerEvent,
};
use lycan_timer::PhaseTimer;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::game::{DeadlineOutcome, Game, Outbox};
use crate::registry::RoomTable;
use crate::{RoomConfig, RoomError};

/// Channel sender for delivering outbound events to one player.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its queue.
///
/// Variants with a `reply` answer the caller directly. The rest are
/// fire-and-forget intents whose rejections go to the player's own
/// outbound channel as `error` events.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: Option<oneshot::Sender<Result<(), RoomError>>>,
    },
    Start {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Restart {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Chat {
        player_id: PlayerId,
        message: String,
    },
    Vote {
        player_id: PlayerId,
        target: PlayerId,
    },
    NightAction {
        player_id: PlayerId,
        kind: ActionKind,
        target: PlayerId,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub name: String,
    pub phase: Phase,
    pub round: u32,
    /// Connected members.
    pub player_count: usize,
    pub max_players: usize,
    pub host: PlayerId,
}

impl RoomInfo {
    /// The entry shown in room listings.
    pub fn to_list_entry(&self) -> RoomListEntry {
        RoomListEntry {
            room_code: self.code.clone(),
            room_name: self.name.clone(),
            player_count: self.player_count,
            max_players: self.max_players,
        }
    }
}

/// Handle to a running room actor.
///
/// Cheap to clone. The registry holds one per room and every gateway
/// session in the room holds another.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    instance: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl std::fmt::Debug for RoomHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomHandle")
            .field("code", &self.code)
            .field("instance", &self.instance)
            .finish()
    }
}

impl RoomHandle {
    /// Returns the room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Identifies this actor among every room ever created under the same
    /// registry, including rooms that later reused the code.
    pub(crate) fn instance(&self) -> u64 {
        self.instance
    }

    /// Whether the actor is still running.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }

    async fn post(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(make(reply_tx)).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Seats a player. On success the player's `join-success` is already
    /// queued on `sender`.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            player_id,
            name,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a player and waits for the room to confirm.
    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave {
            player_id,
            reply: Some(reply),
        })
        .await?
    }

    /// Queues a leave without waiting for it. Usable from synchronous
    /// contexts such as `Drop`; requires a Tokio runtime.
    pub fn leave_detached(&self, player_id: PlayerId) {
        let sender = self.sender.clone();
        let code = self.code.clone();
        tokio::spawn(async move {
            let cmd = RoomCommand::Leave {
                player_id,
                reply: None,
            };
            if sender.send(cmd).await.is_err() {
                debug!(room = %code, %player_id, "room already closed, leave dropped");
            }
        });
    }

    /// Asks the room to start the game. Only the host may.
    pub async fn start(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Start { player_id, reply })
            .await?
    }

    /// Asks an ended room to return to the lobby. Only the host may.
    pub async fn restart(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Restart { player_id, reply })
            .await?
    }

    /// Posts a chat line (fire-and-forget).
    pub async fn chat(&self, player_id: PlayerId, message: String) -> Result<(), RoomError> {
        self.post(RoomCommand::Chat { player_id, message }).await
    }

    /// Posts a day vote (fire-and-forget).
    pub async fn vote(&self, player_id: PlayerId, target: PlayerId) -> Result<(), RoomError> {
        self.post(RoomCommand::Vote { player_id, target }).await
    }

    /// Posts a night action (fire-and-forget).
    pub async fn night_action(
        &self,
        player_id: PlayerId,
        kind: ActionKind,
        target: PlayerId,
    ) -> Result<(), RoomError> {
        self.post(RoomCommand::NightAction {
            player_id,
            kind,
            target,
        })
        .await
    }

    /// Requests the current room info.
    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// Tells the room to shut down. Members receive `room-left`.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.post(RoomCommand::Shutdown).await
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

enum Wakeup {
    Command(Option<RoomCommand>),
    Deadline(u64),
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    game: Game,
    instance: u64,
    /// Outbound channels of connected members.
    senders: HashMap<PlayerId, PlayerSender>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Tagged with the game epoch the deadline was armed for.
    timer: PhaseTimer<u64>,
    synced_epoch: Option<u64>,
    table: Weak<RoomTable>,
}

impl RoomActor {
    async fn run(mut self) {
        info!(room = %self.game.code(), instance = self.instance, "room actor started");

        let welcome = self.game.welcome_host();
        self.dispatch(welcome);
        self.sync_timer();

        loop {
            let wakeup = tokio::select! {
                cmd = self.receiver.recv() => Wakeup::Command(cmd),
                fired = self.timer.expired() => Wakeup::Deadline(fired.tag),
            };
            let keep_running = match wakeup {
                Wakeup::Command(Some(cmd)) => self.handle_command(cmd),
                // Every handle is gone, nobody can reach the room again.
                Wakeup::Command(None) => false,
                Wakeup::Deadline(epoch) => self.handle_deadline(epoch),
            };
            if !keep_running {
                break;
            }
            self.sync_timer();
        }

        self.deregister().await;
        info!(room = %self.game.code(), instance = self.instance, "room actor stopped");
    }

    /// Returns `false` when the room should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                name,
                sender,
                reply,
            } => {
                let result = match self.game.join(player_id, name) {
                    Ok(out) => {
                        self.senders.insert(player_id, sender);
                        self.dispatch(out);
                        Ok(())
                    }
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => match self.game.leave(player_id) {
                Ok(outcome) => {
                    self.senders.remove(&player_id);
                    self.dispatch(outcome.events);
                    if let Some(reply) = reply {
                        let _ = reply.send(Ok(()));
                    }
                    if outcome.room_empty {
                        info!(room = %self.game.code(), "last player left, tearing down");
                        return false;
                    }
                }
                Err(e) => {
                    debug!(room = %self.game.code(), %player_id, error = %e, "leave rejected");
                    if let Some(reply) = reply {
                        let _ = reply.send(Err(e));
                    }
                }
            },
            RoomCommand::Start { player_id, reply } => {
                let result = self.game.start(player_id, &mut rand::rng());
                let _ = reply.send(self.settle(result));
            }
            RoomCommand::Restart { player_id, reply } => {
                let result = self.game.restart(player_id);
                let _ = reply.send(self.settle(result));
            }
            RoomCommand::Chat { player_id, message } => {
                let result = self.game.chat(player_id, message);
                self.settle_intent(player_id, result);
            }
            RoomCommand::Vote { player_id, target } => {
                let result = self.game.vote(player_id, target);
                self.settle_intent(player_id, result);
            }
            RoomCommand::NightAction {
                player_id,
                kind,
                target,
            } => {
                let result = self.game.night_action(player_id, kind, target);
                self.settle_intent(player_id, result);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                info!(room = %self.game.code(), "room shutting down");
                self.evict_all();
                return false;
            }
        }
        true
    }

    fn handle_deadline(&mut self, epoch: u64) -> bool {
        match self.game.on_deadline(epoch) {
            DeadlineOutcome::Stale => true,
            DeadlineOutcome::Resolved(out) => {
                self.dispatch(out);
                true
            }
            DeadlineOutcome::Teardown => {
                info!(room = %self.game.code(), "grace period over, tearing down");
                self.evict_all();
                false
            }
        }
    }

    /// Dispatches a successful result's events and strips them from the
    /// reply.
    fn settle(&self, result: Result<Outbox, RoomError>) -> Result<(), RoomError> {
        result.map(|out| self.dispatch(out))
    }

    /// Dispatches an intent's events, or reports its rejection to the
    /// player who sent it.
    fn settle_intent(&self, player_id: PlayerId, result: Result<Outbox, RoomError>) {
        match result {
            Ok(out) => self.dispatch(out),
            Err(e) => {
                debug!(room = %self.game.code(), %player_id, error = %e, "intent rejected");
                self.send_to(player_id, e.to_event());
            }
        }
    }

    /// Re-arms the deadline whenever the game entered a new phase.
    fn sync_timer(&mut self) {
        let epoch = self.game.epoch();
        if self.synced_epoch == Some(epoch) {
            return;
        }
        self.synced_epoch = Some(epoch);
        match self.game.deadline() {
            Some(after) => {
                self.timer.arm(after, epoch);
            }
            None => self.timer.disarm(),
        }
    }

    /// Dispatches outbound events to their recipients.
    fn dispatch(&self, out: Outbox) {
        for (recipient, event) in out {
            match recipient {
                Recipient::All => {
                    for sender in self.senders.values() {
                        let _ = sender.send(event.clone());
                    }
                }
                Recipient::Player(id) => self.send_to(id, event),
            }
        }
    }

    /// Sends to one player. Silently drops if the receiver is gone; that
    /// player's leave is already on its way through the queue.
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }

    fn evict_all(&mut self) {
        let room_code = self.game.code().clone();
        for (_, sender) in self.senders.drain() {
            let _ = sender.send(ServerEvent::RoomLeft {
                room_code: room_code.clone(),
            });
        }
    }

    /// Removes this room from the registry, unless the code already
    /// belongs to a newer room.
    async fn deregister(&self) {
        let Some(table) = self.table.upgrade() else {
            return;
        };
        let code = self.game.code();
        let mut rooms = table.lock().await;
        if rooms.get(code).is_some_and(|h| h.instance() == self.instance) {
            rooms.remove(code);
            debug!(room = %code, remaining = rooms.len(), "room deregistered");
        }
    }

    fn info(&self) -> RoomInfo {
        let roster = self.game.roster();
        RoomInfo {
            code: self.game.code().clone(),
            name: self.game.config().name.clone(),
            phase: self.game.phase(),
            round: self.game.round(),
            player_count: roster.connected_ids().len(),
            max_players: roster.max_players(),
            host: roster.host(),
        }
    }
}

/// Everything needed to open a room with its creator seated.
pub(crate) struct RoomSeed {
    pub code: RoomCode,
    pub instance: u64,
    pub config: RoomConfig,
    pub host: PlayerId,
    pub host_name: String,
    pub host_sender: PlayerSender,
}

/// Spawns a new room actor task and returns a handle to communicate with it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_room(seed: RoomSeed, table: Weak<RoomTable>, channel_size: usize) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let RoomSeed {
        code,
        instance,
        config,
        host,
        host_name,
        host_sender,
    } = seed;

    let mut senders = HashMap::new();
    senders.insert(host, host_sender);

    let actor = RoomActor {
        game: Game::new(code.clone(), config, host, host_name),
        instance,
        senders,
        receiver: rx,
        timer: PhaseTimer::new(),
        synced_epoch: None,
        table,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        code,
        instance,
        sender: tx,
    }
}
