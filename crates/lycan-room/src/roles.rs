//! Role rules and dealing roles at game start.

use lycan_protocol::{ActionKind, GameSettings, PlayerId, Role};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::RoomError;

/// Game rules attached to each [`Role`].
///
/// Adding a role means adding a `Role` variant and an arm to each method
/// here; nothing else in the engine matches on concrete roles.
pub trait RoleRules {
    /// The night action this role may take, if any.
    fn night_action(self) -> Option<ActionKind>;

    /// Whether this role counts as a werewolf for wins and peeks.
    fn is_werewolf(self) -> bool;

    /// Whether a player with this role may aim its night action at
    /// `target` (whose role is `target_role`).
    fn may_target(self, actor: PlayerId, target: PlayerId, target_role: Role) -> bool;
}

impl RoleRules for Role {
    fn night_action(self) -> Option<ActionKind> {
        match self {
            Role::Werewolf => Some(ActionKind::Kill),
            Role::Doctor => Some(ActionKind::Revive),
            Role::LittleGirl => Some(ActionKind::Peek),
            Role::Villager => None,
        }
    }

    fn is_werewolf(self) -> bool {
        matches!(self, Role::Werewolf)
    }

    fn may_target(self, actor: PlayerId, target: PlayerId, target_role: Role) -> bool {
        match self {
            Role::Werewolf => !target_role.is_werewolf(),
            Role::LittleGirl => actor != target,
            Role::Doctor => true,
            Role::Villager => false,
        }
    }
}

/// Builds the multiset of roles dealt to `roster_size` players.
///
/// # Errors
/// Returns [`RoomError::ConfigMismatch`] if werewolves plus enabled
/// special roles exceed the roster.
pub fn role_pool(roster_size: usize, settings: &GameSettings) -> Result<Vec<Role>, RoomError> {
    let special = settings.num_werewolves
        + usize::from(settings.enable_doctor)
        + usize::from(settings.enable_little_girl);
    if special > roster_size {
        return Err(RoomError::ConfigMismatch {
            special,
            roster: roster_size,
        });
    }

    let mut pool = Vec::with_capacity(roster_size);
    pool.extend(std::iter::repeat_n(Role::Werewolf, settings.num_werewolves));
    if settings.enable_doctor {
        pool.push(Role::Doctor);
    }
    if settings.enable_little_girl {
        pool.push(Role::LittleGirl);
    }
    pool.resize(roster_size, Role::Villager);
    Ok(pool)
}

/// Deals one role to every player, uniformly at random.
///
/// # Errors
/// See [`role_pool`].
pub fn assign<R: Rng + ?Sized>(
    players: &[PlayerId],
    settings: &GameSettings,
    rng: &mut R,
) -> Result<Vec<(PlayerId, Role)>, RoomError> {
    let mut pool = role_pool(players.len(), settings)?;
    pool.shuffle(rng);
    Ok(players.iter().copied().zip(pool).collect())
}
