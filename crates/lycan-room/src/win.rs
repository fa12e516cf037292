//! Win evaluation.

use lycan_protocol::Winner;

use crate::roster::Roster;

/// Result of checking the win conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoWinner,
    VillagersWin,
    WerewolvesWin,
}

impl Outcome {
    /// The winning side, if the game is decided.
    pub fn winner(self) -> Option<Winner> {
        match self {
            Self::NoWinner => None,
            Self::VillagersWin => Some(Winner::Villagers),
            Self::WerewolvesWin => Some(Winner::Werewolves),
        }
    }
}

/// Checks the conditions in order: no werewolf alive, then werewolves at
/// least as many as everyone else alive.
pub fn evaluate_counts(alive_werewolves: usize, alive_others: usize) -> Outcome {
    if alive_werewolves == 0 {
        Outcome::VillagersWin
    } else if alive_werewolves >= alive_others {
        Outcome::WerewolvesWin
    } else {
        Outcome::NoWinner
    }
}

/// Evaluates the roster's current alive set.
pub fn evaluate(roster: &Roster) -> Outcome {
    let (wolves, others) = roster
        .iter()
        .filter(|p| p.alive)
        .fold((0, 0), |(w, o), p| {
            if p.is_werewolf() { (w + 1, o) } else { (w, o + 1) }
        });
    evaluate_counts(wolves, others)
}
