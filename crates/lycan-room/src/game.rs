//! The game engine for one room.
//!
//! [`Game`] is plain synchronous state: every operation validates first,
//! mutates second, and returns the events it wants delivered. It never
//! touches channels or clocks. The room actor owns one `Game`, feeds it
//! commands and deadlines one at a time, and routes the returned events.
//!
//! Each phase transition bumps [`Game::epoch`]. Deadlines are armed with
//! the epoch current at arming time, and [`Game::on_deadline`] ignores any
//! deadline from an earlier epoch, so a phase can only resolve once.

use std::collections::VecDeque;
use std::time::Duration;

use lycan_protocol::{
    ActionKind, ChatEntry, GameStateView, Phase, PlayerId, PlayerView, Recipient, RoomCode,
    ServerEvent, Winner,
};
use rand::Rng;
use tracing::{debug, info};

use crate::config::MIN_PLAYERS_TO_START;
use crate::resolver::{self, NightAction, NightActions, Votes};
use crate::roles::{self, RoleRules};
use crate::roster::Roster;
use crate::win;
use crate::{RoomConfig, RoomError};

/// Events produced by one engine step, in delivery order.
pub type Outbox = Vec<(Recipient, ServerEvent)>;

/// Result of a player leaving.
#[derive(Debug)]
pub struct LeaveOutcome {
    pub events: Outbox,
    /// No connected member remains; the room should be torn down.
    pub room_empty: bool,
}

/// Result of a phase deadline firing.
#[derive(Debug)]
pub enum DeadlineOutcome {
    /// The deadline belonged to a phase that already ended.
    Stale,
    /// The phase was force-resolved.
    Resolved(Outbox),
    /// The post-game grace period ran out.
    Teardown,
}

/// State of one room's game.
#[derive(Debug)]
pub struct Game {
    code: RoomCode,
    config: RoomConfig,
    roster: Roster,
    phase: Phase,
    round: u32,
    epoch: u64,
    night: NightActions,
    votes: Votes,
    log: VecDeque<ChatEntry>,
    winner: Option<Winner>,
}

impl Game {
    /// Creates a room in the lobby with `host` seated.
    pub fn new(code: RoomCode, config: RoomConfig, host: PlayerId, host_name: String) -> Self {
        let roster = Roster::new(host, host_name, config.max_players);
        let log = VecDeque::with_capacity(config.message_log_capacity);
        Self {
            code,
            config,
            roster,
            phase: Phase::Lobby,
            round: 0,
            epoch: 0,
            night: NightActions::default(),
            votes: Votes::default(),
            log,
            winner: None,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Bumped on every phase transition.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    /// Chat history, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &ChatEntry> {
        self.log.iter()
    }

    /// How long the current phase may run before its deadline fires.
    pub fn deadline(&self) -> Option<Duration> {
        let d = &self.config.durations;
        match self.phase {
            Phase::Lobby => None,
            Phase::Night => Some(d.night),
            Phase::Day => Some(d.day),
            Phase::Ended => Some(d.teardown_grace),
        }
    }

    /// The public state snapshot.
    pub fn state_view(&self) -> GameStateView {
        GameStateView {
            phase: self.phase,
            round: self.round,
            alive_players: self.roster.alive_ids(),
            dead_players: self.roster.dead_ids(),
        }
    }

    /// The roster as `viewer` may see it.
    pub fn players_for(&self, viewer: PlayerId) -> Vec<PlayerView> {
        self.roster.views_for(viewer, self.phase == Phase::Ended)
    }

    /// The creator's `room-created` reply and first roster snapshot, sent
    /// right after the room opens.
    pub fn welcome_host(&self) -> Outbox {
        let host = self.roster.host();
        vec![
            (
                Recipient::Player(host),
                ServerEvent::RoomCreated {
                    room_code: self.code.clone(),
                    player_id: host,
                },
            ),
            (
                Recipient::Player(host),
                ServerEvent::PlayerJoined {
                    players: self.players_for(host),
                    max_players: self.config.max_players,
                },
            ),
        ]
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Seats a new player.
    ///
    /// # Errors
    /// [`RoomError::GameInProgress`] outside the lobby, then the roster's
    /// seat and name checks.
    pub fn join(&mut self, id: PlayerId, name: String) -> Result<Outbox, RoomError> {
        if !self.phase.is_joinable() {
            return Err(RoomError::GameInProgress(self.code.clone()));
        }
        self.roster.check_join(&self.code, id, &name)?;

        self.roster.add(id, name);
        info!(room = %self.code, player_id = %id, players = self.roster.len(), "player joined");

        let mut out = vec![(
            Recipient::Player(id),
            ServerEvent::JoinSuccess {
                room_code: self.code.clone(),
                room_name: self.config.name.clone(),
                player_id: id,
                players: self.players_for(id),
                max_players: self.config.max_players,
                messages: self.log.iter().cloned().collect(),
            },
        )];
        self.push_roster(&mut out, |players, max_players| ServerEvent::PlayerJoined {
            players,
            max_players,
        });
        Ok(out)
    }

    /// Removes a player, or during a game marks them dead and departed.
    ///
    /// A mid-game departure discards the player's pending action and vote
    /// (and those aimed at them), then runs the win check and the
    /// phase-completion check in the same step. Players whose action or
    /// vote was aimed at the departed player get a private
    /// `InvalidTarget` error so they know to resubmit.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] if the player is not a connected member.
    pub fn leave(&mut self, id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        if !self.roster.get(id).is_some_and(|p| p.connected) {
            return Err(RoomError::NotInRoom(id, self.code.clone()));
        }

        let mut out = Vec::new();
        if self.phase.is_playing() {
            self.roster.depart(id);
            let mut orphaned = self.night.discard_involving(id);
            orphaned.extend(self.votes.discard_involving(id));
            info!(room = %self.code, player_id = %id, phase = %self.phase, "player left mid-game");

            self.push_roster(&mut out, |players, max_players| ServerEvent::PlayerLeft {
                players,
                max_players,
            });
            if !self.check_win(&mut out) {
                // Whoever aimed at the departed player must choose again.
                let notice = RoomError::InvalidTarget(format!(
                    "{id} left the room, choose another target"
                ))
                .to_event();
                out.extend(orphaned.into_iter().map(|p| (Recipient::Player(p), notice.clone())));
                self.push_state(&mut out);
                self.advance_if_complete(&mut out);
            }
        } else {
            self.roster.remove(id);
            info!(room = %self.code, player_id = %id, players = self.roster.len(), "player left");
            self.push_roster(&mut out, |players, max_players| ServerEvent::PlayerLeft {
                players,
                max_players,
            });
        }

        Ok(LeaveOutcome {
            events: out,
            room_empty: self.roster.connected_ids().is_empty(),
        })
    }

    // -----------------------------------------------------------------------
    // Host commands
    // -----------------------------------------------------------------------

    /// Deals roles and opens the first night.
    ///
    /// # Errors
    /// [`RoomError::Unauthorized`] for anyone but the host,
    /// [`RoomError::InvalidPhase`] outside the lobby,
    /// [`RoomError::InvalidConfig`] below the minimum roster, and
    /// [`RoomError::ConfigMismatch`] if the roles do not fit.
    pub fn start<R: Rng + ?Sized>(&mut self, by: PlayerId, rng: &mut R) -> Result<Outbox, RoomError> {
        self.require_host(by, "start the game")?;
        if self.phase != Phase::Lobby {
            return Err(RoomError::InvalidPhase(self.phase));
        }
        if self.roster.len() < MIN_PLAYERS_TO_START {
            return Err(RoomError::InvalidConfig(format!(
                "at least {MIN_PLAYERS_TO_START} players are needed to start, the room has {}",
                self.roster.len()
            )));
        }
        let ids = self.roster.connected_ids();
        let dealt = roles::assign(&ids, &self.config.settings, rng)?;

        for (id, role) in &dealt {
            if let Some(p) = self.roster.get_mut(*id) {
                p.role = Some(*role);
                p.alive = true;
            }
        }
        self.round = 1;
        self.winner = None;
        self.night.clear();
        self.votes.clear();
        self.enter(Phase::Night);
        info!(room = %self.code, players = ids.len(), "game started");

        let mut out = vec![(Recipient::All, ServerEvent::GameStarted)];
        out.extend(
            dealt
                .into_iter()
                .map(|(id, role)| (Recipient::Player(id), ServerEvent::RoleAssigned { role })),
        );
        self.push_phase(&mut out);
        self.push_state(&mut out);
        Ok(out)
    }

    /// Returns an ended room to the lobby.
    ///
    /// Departed players are dropped, roles are cleared, everyone is alive
    /// again and the round resets to 0.
    ///
    /// # Errors
    /// [`RoomError::Unauthorized`] for anyone but the host and
    /// [`RoomError::InvalidPhase`] unless the game has ended.
    pub fn restart(&mut self, by: PlayerId) -> Result<Outbox, RoomError> {
        self.require_host(by, "restart the game")?;
        if self.phase != Phase::Ended {
            return Err(RoomError::InvalidPhase(self.phase));
        }

        let dropped = self.roster.prune_departed();
        for p in self.roster.iter_mut() {
            p.role = None;
            p.alive = true;
        }
        self.round = 0;
        self.winner = None;
        self.night.clear();
        self.votes.clear();
        self.enter(Phase::Lobby);
        info!(room = %self.code, dropped, players = self.roster.len(), "room reset to lobby");

        let mut out = Vec::new();
        self.push_phase(&mut out);
        self.push_state(&mut out);
        Ok(out)
    }

    fn require_host(&self, by: PlayerId, what: &str) -> Result<(), RoomError> {
        if !self.roster.get(by).is_some_and(|p| p.connected) {
            return Err(RoomError::NotInRoom(by, self.code.clone()));
        }
        if !self.roster.is_host(by) {
            return Err(RoomError::Unauthorized(format!("only the host can {what}")));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Player intents
    // -----------------------------------------------------------------------

    /// Appends a chat line and broadcasts it.
    ///
    /// # Errors
    /// [`RoomError::NotInRoom`] for non-members and
    /// [`RoomError::Unauthorized`] for dead players while a game runs.
    pub fn chat(&mut self, by: PlayerId, message: String) -> Result<Outbox, RoomError> {
        let Some(player) = self.roster.get(by).filter(|p| p.connected) else {
            return Err(RoomError::NotInRoom(by, self.code.clone()));
        };
        if self.phase.is_playing() && !player.alive {
            return Err(RoomError::Unauthorized(
                "dead players cannot chat during a game".to_string(),
            ));
        }

        let entry = ChatEntry {
            sender: player.name.clone(),
            message,
        };
        if self.log.len() >= self.config.message_log_capacity {
            self.log.pop_front();
        }
        self.log.push_back(entry.clone());

        Ok(vec![(
            Recipient::All,
            ServerEvent::ChatMessage {
                sender: entry.sender,
                message: entry.message,
            },
        )])
    }

    /// Records a day vote; resolves the day once every living player voted.
    ///
    /// # Errors
    /// [`RoomError::InvalidPhase`] outside the day,
    /// [`RoomError::Unauthorized`] if the voter is not alive, and
    /// [`RoomError::InvalidTarget`] if the target is not alive.
    pub fn vote(&mut self, voter: PlayerId, target: PlayerId) -> Result<Outbox, RoomError> {
        if self.phase != Phase::Day {
            return Err(RoomError::InvalidPhase(self.phase));
        }
        if !self.roster.is_alive(voter) {
            return Err(RoomError::Unauthorized("only living players can vote".to_string()));
        }
        if !self.roster.is_alive(target) {
            return Err(RoomError::InvalidTarget(format!("{target} is not a living player")));
        }

        self.votes.cast(voter, target);
        debug!(room = %self.code, %voter, %target, "vote cast");

        let mut out = vec![(
            Recipient::All,
            ServerEvent::VoteCast {
                voter_id: voter,
                target_id: target,
            },
        )];
        self.advance_if_complete(&mut out);
        Ok(out)
    }

    /// Records a night action; resolves the night once every expected
    /// action is in.
    ///
    /// # Errors
    /// [`RoomError::InvalidPhase`] outside the night,
    /// [`RoomError::Unauthorized`] if the actor is not alive or their role
    /// does not grant `kind`, and [`RoomError::InvalidTarget`] for dead,
    /// unknown, or forbidden targets.
    pub fn night_action(
        &mut self,
        actor: PlayerId,
        kind: ActionKind,
        target: PlayerId,
    ) -> Result<Outbox, RoomError> {
        if self.phase != Phase::Night {
            return Err(RoomError::InvalidPhase(self.phase));
        }
        let Some(role) = self.roster.get(actor).filter(|p| p.alive).and_then(|p| p.role) else {
            return Err(RoomError::Unauthorized(
                "only living players can act at night".to_string(),
            ));
        };
        if role.night_action() != Some(kind) {
            return Err(RoomError::Unauthorized(format!("a {role} cannot {kind}")));
        }
        let Some(target_role) = self.roster.get(target).filter(|p| p.alive).and_then(|p| p.role)
        else {
            return Err(RoomError::InvalidTarget(format!("{target} is not a living player")));
        };
        if !role.may_target(actor, target, target_role) {
            return Err(RoomError::InvalidTarget(format!("a {role} cannot {kind} {target}")));
        }

        self.night.submit(NightAction {
            actor,
            target,
            kind,
            round: self.round,
        });
        debug!(room = %self.code, %actor, %kind, %target, "night action recorded");

        let mut out = Vec::new();
        self.advance_if_complete(&mut out);
        Ok(out)
    }

    /// Handles a fired deadline armed at `epoch`.
    pub fn on_deadline(&mut self, epoch: u64) -> DeadlineOutcome {
        if epoch != self.epoch {
            debug!(room = %self.code, epoch, current = self.epoch, "stale deadline ignored");
            return DeadlineOutcome::Stale;
        }
        let mut out = Vec::new();
        match self.phase {
            Phase::Night => {
                info!(room = %self.code, round = self.round, "night timed out");
                self.resolve_night(true, &mut out);
            }
            Phase::Day => {
                info!(room = %self.code, round = self.round, "day timed out");
                self.resolve_day(&mut out);
            }
            Phase::Ended => return DeadlineOutcome::Teardown,
            Phase::Lobby => return DeadlineOutcome::Stale,
        }
        DeadlineOutcome::Resolved(out)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn enter(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {} -> {next}",
            self.phase
        );
        self.phase = next;
        self.epoch += 1;
        info!(room = %self.code, phase = %next, round = self.round, epoch = self.epoch, "phase change");
    }

    fn night_complete(&self) -> bool {
        self.roster
            .iter()
            .filter(|p| p.alive && p.role.is_some_and(|r| r.night_action().is_some()))
            .all(|p| self.night.has_submitted(p.id))
    }

    fn day_complete(&self) -> bool {
        self.roster
            .iter()
            .filter(|p| p.alive)
            .all(|p| self.votes.has_voted(p.id))
    }

    fn advance_if_complete(&mut self, out: &mut Outbox) {
        match self.phase {
            Phase::Night if self.night_complete() => self.resolve_night(false, out),
            Phase::Day if self.day_complete() => self.resolve_day(out),
            _ => {}
        }
    }

    fn resolve_night(&mut self, forced: bool, out: &mut Outbox) {
        let outcome = match resolver::resolve_night(&self.night, &self.roster, forced) {
            Ok(outcome) => outcome,
            Err(err) => {
                debug!(room = %self.code, round = self.round, "werewolves disagree, night held");
                let wolves = self.roster.iter().filter(|p| p.alive && p.is_werewolf());
                out.extend(wolves.map(|p| (Recipient::Player(p.id), err.to_event())));
                return;
            }
        };

        if let Some(p) = outcome.victim.and_then(|v| self.roster.get_mut(v)) {
            p.alive = false;
        }
        for peek in &outcome.peeks {
            out.push((
                Recipient::Player(peek.peeker),
                ServerEvent::PeekResult {
                    target_id: peek.target,
                    is_werewolf: peek.is_werewolf,
                },
            ));
        }
        out.push((
            Recipient::All,
            ServerEvent::NightResult {
                victim: outcome.victim,
            },
        ));
        self.night.clear();

        if !self.check_win(out) {
            self.enter(Phase::Day);
            self.push_phase(out);
            self.push_state(out);
        }
    }

    fn resolve_day(&mut self, out: &mut Outbox) {
        let outcome = resolver::resolve_votes(&self.votes);
        if let Some(p) = outcome.eliminated.and_then(|id| self.roster.get_mut(id)) {
            p.alive = false;
        }
        out.push((
            Recipient::All,
            ServerEvent::VoteResult {
                eliminated: outcome.eliminated,
                tally: outcome.tally,
            },
        ));
        self.votes.clear();

        if !self.check_win(out) {
            self.round += 1;
            self.enter(Phase::Night);
            self.push_phase(out);
            self.push_state(out);
        }
    }

    /// Ends the game if a side has won. Returns whether it ended.
    fn check_win(&mut self, out: &mut Outbox) -> bool {
        let Some(winner) = win::evaluate(&self.roster).winner() else {
            return false;
        };
        self.winner = Some(winner);
        self.night.clear();
        self.votes.clear();
        self.enter(Phase::Ended);
        info!(room = %self.code, %winner, round = self.round, "game ended");

        self.push_phase(out);
        out.push((
            Recipient::All,
            ServerEvent::GameEnded {
                winner,
                roles: self.roster.views_for(self.roster.host(), true),
            },
        ));
        self.push_state(out);
        true
    }

    // -----------------------------------------------------------------------
    // Event helpers
    // -----------------------------------------------------------------------

    fn push_phase(&self, out: &mut Outbox) {
        let duration_secs = match self.phase {
            Phase::Night | Phase::Day => self.deadline().map(|d| d.as_secs()),
            Phase::Lobby | Phase::Ended => None,
        };
        out.push((
            Recipient::All,
            ServerEvent::PhaseChange {
                phase: self.phase,
                round: self.round,
                duration_secs,
            },
        ));
    }

    /// One personalised `game-state-update` per connected member.
    fn push_state(&self, out: &mut Outbox) {
        let state = self.state_view();
        for id in self.roster.connected_ids() {
            out.push((
                Recipient::Player(id),
                ServerEvent::GameStateUpdate {
                    game_state: state.clone(),
                    players: self.players_for(id),
                },
            ));
        }
    }

    /// One personalised roster event per connected member.
    fn push_roster(&self, out: &mut Outbox, make: impl Fn(Vec<PlayerView>, usize) -> ServerEvent) {
        for id in self.roster.connected_ids() {
            out.push((
                Recipient::Player(id),
                make(self.players_for(id), self.config.max_players),
            ));
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use lycan_protocol::{GameSettings, Role};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::PhaseDurations;

    const HOST: PlayerId = PlayerId(1);

    fn code() -> RoomCode {
        RoomCode::parse("LYC4N1").unwrap()
    }

    fn settings(wolves: usize, doctor: bool, girl: bool) -> GameSettings {
        GameSettings {
            num_werewolves: wolves,
            enable_doctor: doctor,
            enable_little_girl: girl,
        }
    }

    fn lobby(players: u64, max: usize, settings: GameSettings) -> Game {
        let config = RoomConfig::new("test room", max, settings);
        let mut game = Game::new(code(), config, HOST, "P1".into());
        for i in 2..=players {
            game.join(PlayerId(i), format!("P{i}")).unwrap();
        }
        game
    }

    fn started(players: u64, settings: GameSettings) -> Game {
        let mut game = lobby(players, 12, settings);
        game.start(HOST, &mut StdRng::seed_from_u64(1)).unwrap();
        game
    }

    fn with_role(game: &Game, role: Role) -> Vec<PlayerId> {
        game.roster()
            .iter()
            .filter(|p| p.role == Some(role))
            .map(|p| p.id)
            .collect()
    }

    fn first_with(game: &Game, role: Role) -> PlayerId {
        with_role(game, role)[0]
    }

    fn events_to(out: &Outbox, id: PlayerId) -> Vec<&ServerEvent> {
        out.iter()
            .filter(|(r, _)| matches!(r, Recipient::All) || *r == Recipient::Player(id))
            .map(|(_, e)| e)
            .collect()
    }

    /// Every alive player votes for `target`.
    fn all_vote(game: &mut Game, target: PlayerId) -> Outbox {
        let mut out = Vec::new();
        for voter in game.roster().alive_ids() {
            out.extend(game.vote(voter, target).unwrap());
        }
        out
    }

    // -- joining ------------------------------------------------------------

    #[test]
    fn test_join_replies_and_broadcasts_roster() {
        let mut game = lobby(1, 6, settings(1, false, false));
        game.chat(HOST, "hello".into()).unwrap();

        let out = game.join(PlayerId(2), "Bo".into()).unwrap();
        let ServerEvent::JoinSuccess { players, messages, room_name, .. } = &out[0].1 else {
            panic!("first event should be join-success, got {:?}", out[0]);
        };
        assert_eq!(out[0].0, Recipient::Player(PlayerId(2)));
        assert_eq!(players.len(), 2);
        assert_eq!(room_name, "test room");
        assert_eq!(messages.len(), 1);

        let joined = out
            .iter()
            .filter(|(_, e)| matches!(e, ServerEvent::PlayerJoined { .. }))
            .count();
        assert_eq!(joined, 2, "one personalised roster push per member");
    }

    #[test]
    fn test_join_checks_in_order() {
        let mut game = lobby(4, 4, settings(1, false, false));
        assert_eq!(
            game.join(PlayerId(9), "p1".into()),
            Err(RoomError::RoomFull(code())),
            "a full room reports RoomFull before NameTaken"
        );

        game.leave(PlayerId(4)).unwrap();
        assert_eq!(
            game.join(PlayerId(9), "p1".into()),
            Err(RoomError::NameTaken("p1".into()))
        );

        game.join(PlayerId(4), "P4".into()).unwrap();
        game.start(HOST, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(
            game.join(PlayerId(9), "New".into()),
            Err(RoomError::GameInProgress(code()))
        );
        assert_eq!(game.roster().len(), 4, "rejected join must not touch the roster");
    }

    // -- starting -----------------------------------------------------------

    #[test]
    fn test_start_requires_host() {
        let mut game = lobby(4, 8, settings(1, false, false));
        let err = game.start(PlayerId(2), &mut rand::rng()).unwrap_err();
        assert_eq!(err.kind(), "Unauthorized");
        assert_eq!(game.phase(), Phase::Lobby);
    }

    #[test]
    fn test_start_requires_four_players() {
        let mut game = lobby(3, 8, settings(1, false, false));
        let err = game.start(HOST, &mut rand::rng()).unwrap_err();
        assert_eq!(err.kind(), "InvalidConfig");
        assert_eq!(game.phase(), Phase::Lobby);
    }

    #[test]
    fn test_start_config_mismatch_leaves_lobby_untouched() {
        let mut game = lobby(4, 5, settings(3, true, true));
        let err = game.start(HOST, &mut rand::rng()).unwrap_err();
        assert_eq!(err, RoomError::ConfigMismatch { special: 5, roster: 4 });
        assert_eq!(game.phase(), Phase::Lobby);
        assert_eq!(game.epoch(), 0);
        assert!(game.roster().iter().all(|p| p.role.is_none()));
    }

    #[test]
    fn test_start_emits_events_in_order() {
        let mut game = lobby(5, 8, settings(1, true, true));
        let out = game.start(HOST, &mut StdRng::seed_from_u64(9)).unwrap();

        assert_eq!(out[0], (Recipient::All, ServerEvent::GameStarted));
        for (recipient, event) in &out[1..6] {
            assert!(matches!(recipient, Recipient::Player(_)));
            assert!(matches!(event, ServerEvent::RoleAssigned { .. }));
        }
        assert_eq!(
            out[6].1,
            ServerEvent::PhaseChange {
                phase: Phase::Night,
                round: 1,
                duration_secs: Some(60),
            }
        );
        assert!(out[7..].iter().all(|(_, e)| matches!(e, ServerEvent::GameStateUpdate { .. })));
        assert_eq!(out.len(), 7 + 5);

        assert_eq!(game.phase(), Phase::Night);
        assert_eq!(game.round(), 1);
        assert_eq!(game.state_view().alive_players.len(), 5);
        assert!(game.state_view().dead_players.is_empty());
    }

    #[test]
    fn test_state_update_never_leaks_roles_to_villagers() {
        let mut game = lobby(6, 8, settings(2, false, false));
        let out = game.start(HOST, &mut StdRng::seed_from_u64(5)).unwrap();
        let villager = first_with(&game, Role::Villager);

        for event in events_to(&out, villager) {
            if let ServerEvent::GameStateUpdate { players, .. } = event {
                let visible: Vec<_> = players.iter().filter(|v| v.role.is_some()).collect();
                assert_eq!(visible.len(), 1);
                assert_eq!(visible[0].id, villager);
            }
        }

        let wolf = first_with(&game, Role::Werewolf);
        let wolf_view = game.players_for(wolf);
        assert_eq!(wolf_view.iter().filter(|v| v.role == Some(Role::Werewolf)).count(), 2);
    }

    // -- night --------------------------------------------------------------

    #[test]
    fn test_night_action_validation() {
        let mut game = started(6, settings(2, true, false));
        let wolves = with_role(&game, Role::Werewolf);
        let villager = first_with(&game, Role::Villager);
        let doctor = first_with(&game, Role::Doctor);

        assert_eq!(
            game.night_action(villager, ActionKind::Kill, doctor).unwrap_err().kind(),
            "Unauthorized"
        );
        assert_eq!(
            game.night_action(doctor, ActionKind::Kill, villager).unwrap_err().kind(),
            "Unauthorized"
        );
        assert_eq!(
            game.night_action(wolves[0], ActionKind::Kill, wolves[1]).unwrap_err().kind(),
            "InvalidTarget"
        );
        assert_eq!(
            game.night_action(wolves[0], ActionKind::Kill, PlayerId(99)).unwrap_err().kind(),
            "InvalidTarget"
        );
        assert_eq!(
            game.vote(villager, doctor).unwrap_err(),
            RoomError::InvalidPhase(Phase::Night)
        );
    }

    #[test]
    fn test_little_girl_cannot_peek_herself() {
        let mut game = started(5, settings(1, false, true));
        let girl = first_with(&game, Role::LittleGirl);
        assert_eq!(
            game.night_action(girl, ActionKind::Peek, girl).unwrap_err().kind(),
            "InvalidTarget"
        );
    }

    #[test]
    fn test_complete_night_kills_and_moves_to_day() {
        let mut game = started(6, settings(2, true, false));
        let wolves = with_role(&game, Role::Werewolf);
        let doctor = first_with(&game, Role::Doctor);
        let villager = first_with(&game, Role::Villager);

        assert!(game.night_action(wolves[0], ActionKind::Kill, villager).unwrap().is_empty());
        assert!(game.night_action(wolves[1], ActionKind::Kill, villager).unwrap().is_empty());
        let out = game.night_action(doctor, ActionKind::Revive, doctor).unwrap();

        assert!(out.contains(&(
            Recipient::All,
            ServerEvent::NightResult {
                victim: Some(villager)
            }
        )));
        assert_eq!(game.phase(), Phase::Day);
        assert!(!game.roster().is_alive(villager));
        assert!(game.state_view().dead_players.contains(&villager));
    }

    #[test]
    fn test_revived_target_survives() {
        let mut game = started(6, settings(2, true, false));
        let wolves = with_role(&game, Role::Werewolf);
        let doctor = first_with(&game, Role::Doctor);
        let villager = first_with(&game, Role::Villager);

        game.night_action(doctor, ActionKind::Revive, villager).unwrap();
        game.night_action(wolves[0], ActionKind::Kill, villager).unwrap();
        let out = game.night_action(wolves[1], ActionKind::Kill, villager).unwrap();

        assert!(out.contains(&(Recipient::All, ServerEvent::NightResult { victim: None })));
        assert!(game.roster().is_alive(villager));
        assert_eq!(game.phase(), Phase::Day);
    }

    #[test]
    fn test_disagreeing_wolves_hold_the_night() {
        let mut game = started(6, settings(2, true, false));
        let wolves = with_role(&game, Role::Werewolf);
        let doctor = first_with(&game, Role::Doctor);
        let villagers = with_role(&game, Role::Villager);

        game.night_action(doctor, ActionKind::Revive, doctor).unwrap();
        game.night_action(wolves[0], ActionKind::Kill, villagers[0]).unwrap();
        let out = game.night_action(wolves[1], ActionKind::Kill, villagers[1]).unwrap();

        assert_eq!(game.phase(), Phase::Night);
        assert_eq!(out.len(), 2, "each werewolf is told privately");
        for (recipient, event) in &out {
            let Recipient::Player(id) = recipient else {
                panic!("ambiguity must not be broadcast");
            };
            assert!(wolves.contains(id));
            assert!(matches!(event, ServerEvent::Error { kind, .. } if kind == "AmbiguousNightAction"));
        }

        game.night_action(wolves[1], ActionKind::Kill, villagers[0]).unwrap();
        assert_eq!(game.phase(), Phase::Day);
        assert!(!game.roster().is_alive(villagers[0]));
    }

    #[test]
    fn test_night_timeout_drops_disputed_kill() {
        let mut game = started(6, settings(2, false, false));
        let wolves = with_role(&game, Role::Werewolf);
        let villagers = with_role(&game, Role::Villager);
        game.night_action(wolves[0], ActionKind::Kill, villagers[0]).unwrap();
        game.night_action(wolves[1], ActionKind::Kill, villagers[1]).unwrap();

        let DeadlineOutcome::Resolved(out) = game.on_deadline(game.epoch()) else {
            panic!("current-epoch deadline must resolve");
        };
        assert!(out.contains(&(Recipient::All, ServerEvent::NightResult { victim: None })));
        assert_eq!(game.phase(), Phase::Day);
    }

    #[test]
    fn test_stale_deadline_is_ignored() {
        let mut game = started(5, settings(1, false, false));
        let night_epoch = game.epoch();
        let wolf = first_with(&game, Role::Werewolf);
        let villager = first_with(&game, Role::Villager);
        game.night_action(wolf, ActionKind::Kill, villager).unwrap();
        assert_eq!(game.phase(), Phase::Day);

        assert!(matches!(game.on_deadline(night_epoch), DeadlineOutcome::Stale));
        assert_eq!(game.phase(), Phase::Day, "old night deadline must not resolve the day");
    }

    #[test]
    fn test_peek_goes_only_to_little_girl() {
        let mut game = started(5, settings(1, false, true));
        let wolf = first_with(&game, Role::Werewolf);
        let girl = first_with(&game, Role::LittleGirl);
        let villager = first_with(&game, Role::Villager);

        game.night_action(girl, ActionKind::Peek, wolf).unwrap();
        let out = game.night_action(wolf, ActionKind::Kill, villager).unwrap();

        let peeks: Vec<_> = out
            .iter()
            .filter(|(_, e)| matches!(e, ServerEvent::PeekResult { .. }))
            .collect();
        assert_eq!(
            peeks,
            vec![&(
                Recipient::Player(girl),
                ServerEvent::PeekResult {
                    target_id: wolf,
                    is_werewolf: true
                }
            )]
        );
    }

    // -- day ----------------------------------------------------------------

    #[test]
    fn test_day_vote_eliminates_and_reopens_night() {
        let mut game = started(6, settings(1, false, false));
        let wolf = first_with(&game, Role::Werewolf);
        let villagers = with_role(&game, Role::Villager);
        game.night_action(wolf, ActionKind::Kill, villagers[0]).unwrap();
        assert_eq!(game.phase(), Phase::Day);

        // Four villagers left: wolf survives a 1-vs-4 split vote.
        let out = all_vote(&mut game, villagers[1]);
        assert!(out.iter().any(|(_, e)| matches!(
            e,
            ServerEvent::VoteResult { eliminated: Some(id), .. } if *id == villagers[1]
        )));
        assert_eq!(game.phase(), Phase::Night);
        assert_eq!(game.round(), 2);
    }

    #[test]
    fn test_day_timeout_with_tie_eliminates_nobody() {
        let mut game = started(6, settings(1, false, false));
        let wolf = first_with(&game, Role::Werewolf);
        let villagers = with_role(&game, Role::Villager);
        game.night_action(wolf, ActionKind::Kill, villagers[0]).unwrap();

        game.vote(villagers[1], villagers[2]).unwrap();
        game.vote(villagers[2], villagers[1]).unwrap();
        let DeadlineOutcome::Resolved(out) = game.on_deadline(game.epoch()) else {
            panic!("day deadline must resolve");
        };
        assert!(out.iter().any(|(_, e)| matches!(
            e,
            ServerEvent::VoteResult { eliminated: None, tally } if tally.len() == 2
        )));
        assert_eq!(game.roster().alive_ids().len(), 5);
        assert_eq!(game.phase(), Phase::Night);
    }

    #[test]
    fn test_voting_out_last_wolf_ends_game() {
        let mut game = started(5, settings(1, false, false));
        let wolf = first_with(&game, Role::Werewolf);
        let villagers = with_role(&game, Role::Villager);
        game.night_action(wolf, ActionKind::Kill, villagers[0]).unwrap();

        let out = all_vote(&mut game, wolf);
        assert_eq!(game.phase(), Phase::Ended);
        assert_eq!(game.winner(), Some(Winner::Villagers));
        let roles = out.iter().find_map(|(_, e)| match e {
            ServerEvent::GameEnded { roles, .. } => Some(roles),
            _ => None,
        });
        assert!(roles.is_some_and(|r| r.iter().all(|v| v.role.is_some())));
    }

    // -- leaving ------------------------------------------------------------

    #[test]
    fn test_leave_mid_game_marks_dead_and_checks_win() {
        let mut game = started(5, settings(1, false, false));
        let wolf = first_with(&game, Role::Werewolf);

        let left = game.leave(wolf).unwrap();
        assert!(!left.room_empty);
        assert!(game.roster().contains(wolf), "departed players stay in the roster");
        assert!(!game.roster().is_alive(wolf));
        assert_eq!(game.phase(), Phase::Ended);
        assert_eq!(game.winner(), Some(Winner::Villagers));
        assert!(left.events.iter().any(|(_, e)| matches!(e, ServerEvent::GameEnded { .. })));
    }

    #[test]
    fn test_leave_mid_night_can_complete_the_night() {
        let mut game = started(6, settings(1, true, false));
        let wolf = first_with(&game, Role::Werewolf);
        let doctor = first_with(&game, Role::Doctor);
        let villager = first_with(&game, Role::Villager);
        game.night_action(wolf, ActionKind::Kill, villager).unwrap();
        assert_eq!(game.phase(), Phase::Night);

        game.leave(doctor).unwrap();
        assert_eq!(game.phase(), Phase::Day, "the doctor was the last missing action");
        assert!(!game.roster().is_alive(villager));
    }

    #[test]
    fn test_target_leaving_mid_night_tells_the_attacker() {
        let mut game = started(6, settings(2, false, false));
        let wolves = with_role(&game, Role::Werewolf);
        let villager = first_with(&game, Role::Villager);
        game.night_action(wolves[0], ActionKind::Kill, villager).unwrap();

        let left = game.leave(villager).unwrap();
        assert_eq!(game.phase(), Phase::Night);
        assert!(!game.night.has_submitted(wolves[0]));

        let notices: Vec<_> = left
            .events
            .iter()
            .filter(|(_, e)| matches!(e, ServerEvent::Error { kind, .. } if kind == "InvalidTarget"))
            .collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0, Recipient::Player(wolves[0]));
    }

    #[test]
    fn test_target_leaving_mid_day_tells_the_voters() {
        let mut game = started(6, settings(1, false, false));
        let wolf = first_with(&game, Role::Werewolf);
        let villagers = with_role(&game, Role::Villager);
        game.night_action(wolf, ActionKind::Kill, villagers[0]).unwrap();
        assert_eq!(game.phase(), Phase::Day);

        game.vote(villagers[1], villagers[2]).unwrap();
        game.vote(villagers[3], wolf).unwrap();
        let left = game.leave(villagers[2]).unwrap();

        assert_eq!(game.phase(), Phase::Day);
        assert!(!game.votes.has_voted(villagers[1]));
        assert!(game.votes.has_voted(villagers[3]));
        let notified: Vec<_> = left
            .events
            .iter()
            .filter(|(_, e)| matches!(e, ServerEvent::Error { .. }))
            .map(|(r, _)| *r)
            .collect();
        assert_eq!(notified, vec![Recipient::Player(villagers[1])]);
    }

    #[test]
    fn test_join_rejected_in_every_phase_but_lobby() {
        let mut game = started(5, settings(1, false, false));
        let wolf = first_with(&game, Role::Werewolf);
        let villager = first_with(&game, Role::Villager);
        let in_progress = Err(RoomError::GameInProgress(code()));

        assert_eq!(game.phase(), Phase::Night);
        assert_eq!(game.join(PlayerId(9), "New".into()), in_progress);

        game.night_action(wolf, ActionKind::Kill, villager).unwrap();
        assert_eq!(game.phase(), Phase::Day);
        assert_eq!(game.join(PlayerId(9), "New".into()), in_progress);

        all_vote(&mut game, wolf);
        assert_eq!(game.phase(), Phase::Ended);
        assert_eq!(game.join(PlayerId(9), "New".into()), in_progress);
        assert_eq!(game.roster().len(), 5);
    }

    #[test]
    fn test_host_leaving_lobby_promotes_earliest_member() {
        let mut game = lobby(3, 6, settings(1, false, false));
        let out = game.leave(HOST).unwrap();
        assert!(!out.room_empty);
        assert_eq!(game.roster().host(), PlayerId(2));
        assert!(!game.roster().contains(HOST));
    }

    #[test]
    fn test_last_leave_empties_room() {
        let mut game = lobby(1, 6, settings(1, false, false));
        assert!(game.leave(HOST).unwrap().room_empty);
        assert!(matches!(game.leave(HOST), Err(RoomError::NotInRoom(..))));
    }

    // -- ended & restart ----------------------------------------------------

    fn ended_game() -> Game {
        let mut game = started(4, settings(1, false, false));
        let wolf = first_with(&game, Role::Werewolf);
        let villager = first_with(&game, Role::Villager);
        game.night_action(wolf, ActionKind::Kill, villager).unwrap();
        all_vote(&mut game, wolf);
        assert_eq!(game.phase(), Phase::Ended);
        game
    }

    #[test]
    fn test_ended_room_rejects_actions() {
        let mut game = ended_game();
        let alive = game.roster().alive_ids();
        assert_eq!(game.vote(alive[0], alive[1]), Err(RoomError::InvalidPhase(Phase::Ended)));
        assert_eq!(
            game.night_action(alive[0], ActionKind::Kill, alive[1]),
            Err(RoomError::InvalidPhase(Phase::Ended))
        );
        assert!(matches!(game.on_deadline(game.epoch()), DeadlineOutcome::Teardown));
    }

    #[test]
    fn test_dead_players_chat_only_after_the_game() {
        let mut game = started(5, settings(1, false, false));
        let wolf = first_with(&game, Role::Werewolf);
        let villager = first_with(&game, Role::Villager);
        game.night_action(wolf, ActionKind::Kill, villager).unwrap();

        assert_eq!(game.chat(villager, "boo".into()).unwrap_err().kind(), "Unauthorized");
        all_vote(&mut game, wolf);
        assert!(game.chat(villager, "gg".into()).is_ok());
    }

    #[test]
    fn test_restart_returns_to_joinable_lobby() {
        let mut game = ended_game();
        let other = game.roster().iter().map(|p| p.id).find(|id| *id != HOST).unwrap();
        game.leave(other).unwrap();
        assert_eq!(game.restart(PlayerId(3)).map(|_| ()).unwrap_err().kind(), "Unauthorized");

        let out = game.restart(HOST).unwrap();
        assert_eq!(
            out[0].1,
            ServerEvent::PhaseChange {
                phase: Phase::Lobby,
                round: 0,
                duration_secs: None
            }
        );
        assert_eq!(game.phase(), Phase::Lobby);
        assert_eq!(game.round(), 0);
        assert_eq!(game.roster().len(), 3);
        assert!(game.roster().iter().all(|p| p.alive && p.role.is_none()));
        assert!(game.join(PlayerId(10), "Late".into()).is_ok());
    }

    #[test]
    fn test_restart_only_from_ended() {
        let mut game = lobby(4, 6, settings(1, false, false));
        assert_eq!(game.restart(HOST).unwrap_err(), RoomError::InvalidPhase(Phase::Lobby));
    }

    // -- chat ---------------------------------------------------------------

    #[test]
    fn test_message_log_is_bounded() {
        let config = RoomConfig {
            message_log_capacity: 3,
            durations: PhaseDurations::default(),
            ..RoomConfig::new("chatty", 6, settings(1, false, false))
        };
        let mut game = Game::new(code(), config, HOST, "Ana".into());
        for i in 0..5 {
            game.chat(HOST, format!("line {i}")).unwrap();
        }
        let kept: Vec<&str> = game.messages().map(|m| m.message.as_str()).collect();
        assert_eq!(kept, vec!["line 2", "line 3", "line 4"]);
    }
}
