//! Phase deadline timer for Lycan.
//!
//! Every timed phase in a room (night, day, the grace period after a game
//! ends) has one deadline. [`PhaseTimer`] holds at most one armed deadline
//! and tags it with a caller-chosen value plus a generation number.
//! Re-arming replaces the previous deadline and bumps the generation, so a
//! deadline that belonged to an earlier phase can never fire into a later
//! one.
//!
//! # Integration
//!
//! The timer sits inside a room actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         cmd = cmd_rx.recv() => { /* handle commands */ }
//!         fired = timer.expired() => {
//!             game.on_deadline(fired.tag);
//!         }
//!     }
//! }
//! ```
//!
//! When nothing is armed, [`PhaseTimer::expired`] pends forever and
//! `select!` only sees the other branches.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// A deadline that has fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry<T> {
    /// The value passed to [`PhaseTimer::arm`].
    pub tag: T,
    /// Generation of the deadline that fired.
    pub generation: u64,
    /// How far past the deadline the timer actually woke up.
    pub late_by: Duration,
}

#[derive(Debug)]
struct Deadline<T> {
    at: Instant,
    tag: T,
    generation: u64,
}

/// A single, re-armable, one-shot deadline.
#[derive(Debug)]
pub struct PhaseTimer<T> {
    deadline: Option<Deadline<T>>,
    generation: u64,
    fired: u64,
}

impl<T> Default for PhaseTimer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PhaseTimer<T> {
    /// Lateness beyond which a firing is logged as a warning.
    pub const LATE_WARN: Duration = Duration::from_millis(250);

    /// Creates a disarmed timer.
    pub fn new() -> Self {
        Self {
            deadline: None,
            generation: 0,
            fired: 0,
        }
    }

    /// Arms the timer to fire `after` from now, replacing any armed deadline.
    ///
    /// Returns the generation assigned to the new deadline.
    pub fn arm(&mut self, after: Duration, tag: T) -> u64 {
        self.generation += 1;
        if self.deadline.is_some() {
            trace!(generation = self.generation, "replacing armed deadline");
        }
        self.deadline = Some(Deadline {
            at: Instant::now() + after,
            tag,
            generation: self.generation,
        });
        debug!(
            generation = self.generation,
            after_ms = after.as_millis() as u64,
            "deadline armed"
        );
        self.generation
    }

    /// Cancels the armed deadline, if any. Safe to call repeatedly.
    pub fn disarm(&mut self) {
        if let Some(d) = self.deadline.take() {
            debug!(generation = d.generation, "deadline disarmed");
        }
    }

    /// Whether a deadline is currently armed.
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// The tag of the armed deadline.
    pub fn armed_tag(&self) -> Option<&T> {
        self.deadline.as_ref().map(|d| &d.tag)
    }

    /// Time left before the armed deadline fires, or `None` when disarmed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .as_ref()
            .map(|d| d.at.saturating_duration_since(Instant::now()))
    }

    /// Generation of the most recently armed deadline (0 if never armed).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// How many deadlines have fired over the timer's lifetime.
    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    /// Waits for the armed deadline and disarms the timer.
    ///
    /// Pends forever while disarmed. Cancel-safe: if the future is dropped
    /// before the deadline, the deadline stays armed.
    pub async fn expired(&mut self) -> Expiry<T> {
        let Some(at) = self.deadline.as_ref().map(|d| d.at) else {
            return std::future::pending().await;
        };

        time::sleep_until(at).await;

        let late_by = Instant::now().saturating_duration_since(at);
        let Some(deadline) = self.deadline.take() else {
            unreachable!("deadline cannot be cleared while `expired` holds &mut self")
        };
        self.fired += 1;

        if late_by > Self::LATE_WARN {
            warn!(
                generation = deadline.generation,
                late_ms = late_by.as_millis() as u64,
                "deadline fired late"
            );
        } else {
            trace!(generation = deadline.generation, "deadline fired");
        }

        Expiry {
            tag: deadline.tag,
            generation: deadline.generation,
            late_by,
        }
    }
}
