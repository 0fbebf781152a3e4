//! Rooms for Korero.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! lobby and its game. All changes to one room go through that room's
//! mailbox in arrival order; different rooms run fully in parallel.
//!
//! # Key types
//!
//! - [`SessionManager`]: creates and reaps rooms, routes players, holds
//!   seats for reconnects
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Room`]: the lobby-plus-game model an actor owns
//! - [`BotPolicy`]: how computer players choose their moves
//! - [`RoomConfig`]: room settings (player limits, timers, bot delay)

mod actor;
mod bot;
mod code;
mod config;
mod error;
mod manager;
mod room;

pub use actor::{PlayerSender, RoomHandle, RoomRequest};
pub use bot::{BotPolicy, CasualBot, bots_due};
pub use code::generate_room_code;
pub use config::RoomConfig;
pub use error::RoomError;
pub use manager::{Joined, SessionManager, open_rooms, release_seats, room_list, stale_rooms};
pub use room::{DisconnectOutcome, Member, Room, RoomInfo, TickOutcome};
