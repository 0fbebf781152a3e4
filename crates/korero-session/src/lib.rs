//! Reconnection for Korero players.
//!
//! Players have no accounts: a connection is a fresh `sock-N` identity.
//! When a seated player drops mid-game, their seat is held under their
//! display name for a grace period. Reconnecting with the same name
//! inside that window hands the old identity, seat, and hand back.
//!
//! ```text
//! Room Layer (above)     ← restores the seat, flips connection status
//!     ↕
//! Session Layer (this)   ← remembers who dropped, and when
//!     ↕
//! Protocol Layer (below) ← RoomCode
//! ```

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::ReconnectRegistry;
pub use session::{HeldSeat, SessionConfig, name_key};
