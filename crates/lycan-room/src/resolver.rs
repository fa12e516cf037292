//! Collecting and resolving night actions and day votes.
//!
//! Records live only for the phase they were submitted in. Both
//! collections are keyed by the submitting player, so a resubmission
//! replaces the earlier one.

use std::collections::{BTreeMap, BTreeSet};

use lycan_protocol::{ActionKind, PlayerId, VoteCount};

use crate::RoomError;
use crate::roster::Roster;

// ---------------------------------------------------------------------------
// Night
// ---------------------------------------------------------------------------

/// A submitted night action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NightAction {
    pub actor: PlayerId,
    pub target: PlayerId,
    pub kind: ActionKind,
    pub round: u32,
}

/// Night actions collected for one round.
#[derive(Debug, Default)]
pub struct NightActions {
    actions: BTreeMap<PlayerId, NightAction>,
}

impl NightActions {
    /// Records an action, replacing the actor's earlier one.
    pub fn submit(&mut self, action: NightAction) {
        self.actions.insert(action.actor, action);
    }

    /// Discards everything submitted by `player` or aimed at them.
    ///
    /// Returns the other actors whose action was aimed at `player`; they
    /// have to act again.
    pub fn discard_involving(&mut self, player: PlayerId) -> Vec<PlayerId> {
        let mut orphaned = Vec::new();
        self.actions.retain(|actor, a| {
            if *actor == player {
                return false;
            }
            if a.target == player {
                orphaned.push(*actor);
                return false;
            }
            true
        });
        orphaned
    }

    pub fn has_submitted(&self, actor: PlayerId) -> bool {
        self.actions.contains_key(&actor)
    }

    pub fn get(&self, actor: PlayerId) -> Option<&NightAction> {
        self.actions.get(&actor)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    fn of_kind(&self, kind: ActionKind) -> impl Iterator<Item = &NightAction> {
        self.actions.values().filter(move |a| a.kind == kind)
    }
}

/// A private peek answer for one little girl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeekResult {
    pub peeker: PlayerId,
    pub target: PlayerId,
    pub is_werewolf: bool,
}

/// What a night did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightOutcome {
    /// The player killed tonight, if the kill landed.
    pub victim: Option<PlayerId>,
    /// Players protected by a revive.
    pub protected: BTreeSet<PlayerId>,
    pub peeks: Vec<PeekResult>,
}

/// Resolves a night: revives first, then the single kill, then peeks.
///
/// Werewolves must agree on one target. With `forced` unset, disagreement
/// is an error and nothing is resolved; with `forced` set (the night timed
/// out) the kill is dropped instead.
///
/// # Errors
/// [`RoomError::AmbiguousNightAction`] when kill targets differ and the
/// night is not forced.
pub fn resolve_night(
    actions: &NightActions,
    roster: &Roster,
    forced: bool,
) -> Result<NightOutcome, RoomError> {
    let kill_targets: BTreeSet<PlayerId> =
        actions.of_kind(ActionKind::Kill).map(|a| a.target).collect();
    let kill = match kill_targets.len() {
        0 => None,
        1 => kill_targets.first().copied(),
        _ if forced => {
            tracing::debug!(targets = kill_targets.len(), "werewolves disagreed, kill dropped");
            None
        }
        _ => return Err(RoomError::AmbiguousNightAction),
    };

    let protected: BTreeSet<PlayerId> =
        actions.of_kind(ActionKind::Revive).map(|a| a.target).collect();

    let victim = kill.filter(|target| !protected.contains(target));

    let peeks = actions
        .of_kind(ActionKind::Peek)
        .map(|a| PeekResult {
            peeker: a.actor,
            target: a.target,
            is_werewolf: roster.get(a.target).is_some_and(|p| p.is_werewolf()),
        })
        .collect();

    Ok(NightOutcome {
        victim,
        protected,
        peeks,
    })
}

// ---------------------------------------------------------------------------
// Day
// ---------------------------------------------------------------------------

/// Day ballots, one per voter.
#[derive(Debug, Default)]
pub struct Votes {
    ballots: BTreeMap<PlayerId, PlayerId>,
}

impl Votes {
    /// Records or changes a ballot.
    pub fn cast(&mut self, voter: PlayerId, target: PlayerId) {
        self.ballots.insert(voter, target);
    }

    /// Discards the ballot cast by `player` and every ballot against them.
    ///
    /// Returns the other voters whose ballot was against `player`.
    pub fn discard_involving(&mut self, player: PlayerId) -> Vec<PlayerId> {
        let mut orphaned = Vec::new();
        self.ballots.retain(|voter, target| {
            if *voter == player {
                return false;
            }
            if *target == player {
                orphaned.push(*voter);
                return false;
            }
            true
        });
        orphaned
    }

    pub fn has_voted(&self, voter: PlayerId) -> bool {
        self.ballots.contains_key(&voter)
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }

    pub fn clear(&mut self) {
        self.ballots.clear();
    }

    /// Votes per target, most votes first, ties by player id.
    pub fn tally(&self) -> Vec<VoteCount> {
        let mut counts: BTreeMap<PlayerId, u32> = BTreeMap::new();
        for target in self.ballots.values() {
            *counts.entry(*target).or_default() += 1;
        }
        let mut tally: Vec<VoteCount> = counts
            .into_iter()
            .map(|(target_id, votes)| VoteCount { target_id, votes })
            .collect();
        tally.sort_by(|a, b| b.votes.cmp(&a.votes).then(a.target_id.cmp(&b.target_id)));
        tally
    }
}

/// What a day vote did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    pub eliminated: Option<PlayerId>,
    pub tally: Vec<VoteCount>,
}

/// Eliminates the unique strict maximum. A tie at the top, or no votes at
/// all, eliminates nobody.
pub fn resolve_votes(votes: &Votes) -> VoteOutcome {
    let tally = votes.tally();
    let eliminated = match tally.as_slice() {
        [] => None,
        [only] => Some(only.target_id),
        [first, second, ..] if first.votes > second.votes => Some(first.target_id),
        _ => None,
    };
    VoteOutcome { eliminated, tally }
}
