//! Wire protocol for Korero.
//!
//! - **Messages** ([`ClientMessage`], [`ServerMessage`], [`Envelope`]):
//!   what travels over the socket.
//! - **Views** ([`GameView`], [`RoomView`]): the sanitized, per-player
//!   shape of room and game state.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes ↔ messages.
//!
//! The protocol layer knows nothing about connections or room ownership.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Room (GameAction)
//! ```

mod codec;
mod error;
mod types;
mod view;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ClientMessage, Envelope, ErrorKind, LeaderboardEntry, ROOM_CODE_ALPHABET, ROOM_CODE_LEN,
    RoomCode, RoomListEntry, ServerMessage,
};
pub use view::{
    CardView, GameView, MemberView, PlayerView, RoomView, TurnOrderCardView, TurnStateView,
};
