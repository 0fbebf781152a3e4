//! Timers for Korero rooms.
//!
//! [`phase`] holds the pure timer rules: given a game snapshot and the
//! current time, decide whether to show a countdown or fire a timeout.
//! [`scheduler`] is the fixed-interval clock that drives the server-wide
//! sweep calling into those rules.

mod clock;
pub mod phase;
pub mod scheduler;

pub use clock::unix_millis;
pub use phase::{
    COUNTDOWN_FROM_SECS, TimeoutEffect, TimerOutcome, TimerSettings, evaluate, fire_timeout,
    remaining_secs, sync_timer,
};
pub use scheduler::{TickConfig, TickInfo, TickScheduler};
