//! Rooms for Lycan: registry, game rules, and per-room actors.
//!
//! Each room runs as an isolated Tokio task (actor model) owning its
//! roster, phase state machine, and phase deadline. The pure game rules
//! live in synchronous modules that the actor drives.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates, finds, lists, and removes rooms
//! - [`RoomHandle`]: sends commands to a running room actor
//! - [`Game`]: the synchronous engine behind one room
//! - [`RoomConfig`]: seats, role settings, and phase durations
//! - [`RoleRules`]: what each role may do at night

mod code;
mod config;
mod error;
mod game;
mod registry;
mod resolver;
mod roles;
mod room;
mod roster;
mod win;

pub use code::{generate as generate_code, generate_unique as generate_unique_code};
pub use config::{MAX_PLAYERS_RANGE, MIN_PLAYERS_TO_START, PhaseDurations, RoomConfig};
pub use error::RoomError;
pub use game::{DeadlineOutcome, Game, LeaveOutcome, Outbox};
pub use registry::RoomRegistry;
pub use resolver::{
    NightAction, NightActions, NightOutcome, PeekResult, VoteOutcome, Votes, resolve_night,
    resolve_votes,
};
pub use roles::{RoleRules, assign as assign_roles, role_pool};
pub use room::{PlayerSender, RoomHandle, RoomInfo};
pub use roster::{Player, Roster};
pub use win::{Outcome, evaluate as evaluate_win, evaluate_counts};
