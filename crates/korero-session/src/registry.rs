//! The reconnection registry.
//!
//! ```text
//! disconnect ──→ hold() ──→ claim() within grace ──→ seat restored
//!                  │
//!                  └──→ sweep() after grace ──→ seat released
//!                                                  │
//!                           claim() ──→ Expired ←──┘ (remembered a while)
//! ```
//!
//! The registry is not thread-safe on its own. It lives inside the
//! server's session manager, behind the same lock as the room maps.
//! Every time-dependent method takes `now` so callers (and tests) own
//! the clock.

use std::collections::HashMap;
use std::time::Instant;

use korero_game::PlayerId;
use korero_protocol::RoomCode;

use crate::{HeldSeat, SessionConfig, SessionError, name_key};

pub struct ReconnectRegistry {
    /// Keyed by [`name_key`].
    held: HashMap<String, HeldSeat>,

    /// Seats the sweep released, with the instant they were released.
    /// Also keyed by [`name_key`].
    released: HashMap<String, (HeldSeat, Instant)>,

    config: SessionConfig,
}

impl ReconnectRegistry {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            held: HashMap::new(),
            released: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Holds `player_id`'s seat in `room_code` for the grace period.
    ///
    /// A second drop under the same name replaces the older entry.
    pub fn hold(
        &mut self,
        name: &str,
        player_id: PlayerId,
        room_code: RoomCode,
        now: Instant,
    ) {
        tracing::info!(%player_id, room = %room_code, "holding seat for reconnect");
        let key = name_key(name);
        self.released.remove(&key);
        self.held.insert(
            key,
            HeldSeat {
                player_id,
                room_code,
                name: name.trim().to_string(),
                since: now,
            },
        );
    }

    /// Claims the seat held under `name`.
    ///
    /// A successful claim consumes the entry. An expired one is left for
    /// [`sweep`](Self::sweep), which takes the player out of their game.
    ///
    /// # Errors
    /// - [`SessionError::NoSession`] if nothing is held under `name`
    /// - [`SessionError::Expired`] if the grace period has passed, whether
    ///   or not the sweep has released the seat yet
    pub fn claim(&mut self, name: &str, now: Instant) -> Result<HeldSeat, SessionError> {
        let key = name_key(name);
        if let Some(seat) = self.held.get(&key) {
            if seat.is_expired(self.config.reconnect_grace, now) {
                tracing::info!(player_id = %seat.player_id, "reconnect after grace period");
                return Err(SessionError::Expired(seat.name.clone()));
            }
        }

        match self.held.remove(&key) {
            Some(seat) => {
                tracing::info!(player_id = %seat.player_id, room = %seat.room_code, "seat reclaimed");
                Ok(seat)
            }
            None => {
                self.forget_released(now);
                match self.released.get(&key) {
                    Some((seat, _)) => Err(SessionError::Expired(seat.name.clone())),
                    None => Err(SessionError::NoSession(name.trim().to_string())),
                }
            }
        }
    }

    /// Removes and returns every entry whose grace period has passed.
    ///
    /// Released seats are remembered for
    /// [`expired_memory`](SessionConfig::expired_memory) so that
    /// [`claim`](Self::claim) can still report them as expired.
    pub fn sweep(&mut self, now: Instant) -> Vec<HeldSeat> {
        self.forget_released(now);

        let grace = self.config.reconnect_grace;
        let expired_keys: Vec<String> = self
            .held
            .iter()
            .filter(|(_, seat)| seat.is_expired(grace, now))
            .map(|(key, _)| key.clone())
            .collect();

        let mut expired = Vec::with_capacity(expired_keys.len());
        for key in expired_keys {
            if let Some(seat) = self.held.remove(&key) {
                self.released.insert(key, (seat.clone(), now));
                expired.push(seat);
            }
        }
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "released expired seats");
        }
        expired
    }

    fn forget_released(&mut self, now: Instant) {
        let memory = self.config.expired_memory;
        self.released
            .retain(|_, (_, at)| now.saturating_duration_since(*at) <= memory);
    }

    /// Drops any entry held for `player_id`.
    pub fn forget_player(&mut self, player_id: &PlayerId) {
        self.held.retain(|_, seat| &seat.player_id != player_id);
        self.released
            .retain(|_, (seat, _)| &seat.player_id != player_id);
    }

    pub fn get(&self, name: &str) -> Option<&HeldSeat> {
        self.held.get(&name_key(name))
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

#[cfg(test)]
mod tests {
    //! Time is passed in explicitly, so the grace boundary is tested
    //! exactly without sleeping.

    use std::time::Duration;

    use super::*;

    fn registry() -> ReconnectRegistry {
        ReconnectRegistry::new(SessionConfig::default())
    }

    fn pid(s: &str) -> PlayerId {
        PlayerId::new(s)
    }

    fn code() -> RoomCode {
        RoomCode::new("KTRW")
    }

    // =====================================================================
    // claim()
    // =====================================================================

    #[test]
    fn test_claim_at_59s_succeeds() {
        let mut reg = registry();
        let t0 = Instant::now();
        reg.hold("Aroha", pid("sock-1"), code(), t0);

        let seat = reg.claim("Aroha", t0 + Duration::from_secs(59)).unwrap();
        assert_eq!(seat.player_id, pid("sock-1"));
        assert_eq!(seat.room_code, code());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_claim_at_61s_is_expired() {
        let mut reg = registry();
        let t0 = Instant::now();
        reg.hold("Aroha", pid("sock-1"), code(), t0);

        let err = reg.claim("Aroha", t0 + Duration::from_secs(61)).unwrap_err();
        assert!(matches!(err, SessionError::Expired(ref name) if name == "Aroha"));
        assert_eq!(reg.len(), 1, "left for the sweep to release");
        assert_eq!(reg.sweep(t0 + Duration::from_secs(61)).len(), 1);
    }

    #[test]
    fn test_claim_at_exactly_grace_succeeds() {
        let mut reg = registry();
        let t0 = Instant::now();
        reg.hold("Aroha", pid("sock-1"), code(), t0);
        assert!(reg.claim("Aroha", t0 + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_claim_is_case_insensitive() {
        let mut reg = registry();
        let t0 = Instant::now();
        reg.hold("Aroha", pid("sock-1"), code(), t0);
        assert!(reg.claim("  aROHA ", t0).is_ok());
    }

    #[test]
    fn test_claim_unknown_name_is_no_session() {
        let mut reg = registry();
        let err = reg.claim("Tama", Instant::now()).unwrap_err();
        assert!(matches!(err, SessionError::NoSession(_)));
    }

    #[test]
    fn test_claim_twice_second_fails() {
        let mut reg = registry();
        let t0 = Instant::now();
        reg.hold("Aroha", pid("sock-1"), code(), t0);
        reg.claim("Aroha", t0).unwrap();
        assert!(matches!(
            reg.claim("Aroha", t0),
            Err(SessionError::NoSession(_))
        ));
    }

    // =====================================================================
    // hold()
    // =====================================================================

    #[test]
    fn test_hold_same_name_replaces_entry() {
        let mut reg = registry();
        let t0 = Instant::now();
        reg.hold("Aroha", pid("sock-1"), code(), t0);
        reg.hold("aroha", pid("sock-7"), RoomCode::new("MNPQ"), t0);

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("AROHA").unwrap().player_id, pid("sock-7"));
    }

    // =====================================================================
    // sweep() / forget
    // =====================================================================

    #[test]
    fn test_sweep_returns_only_expired() {
        let mut reg = registry();
        let t0 = Instant::now();
        reg.hold("Old", pid("sock-1"), code(), t0);
        reg.hold("New", pid("sock-2"), code(), t0 + Duration::from_secs(30));

        let expired = reg.sweep(t0 + Duration::from_secs(75));

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].player_id, pid("sock-1"));
        assert!(reg.get("New").is_some());
    }

    #[test]
    fn test_claim_after_sweep_is_expired() {
        let mut reg = registry();
        let t0 = Instant::now();
        reg.hold("Tama", pid("sock-2"), code(), t0);
        let t61 = t0 + Duration::from_secs(61);
        assert_eq!(reg.sweep(t61).len(), 1);

        let err = reg.claim("tama", t61).unwrap_err();
        assert_eq!(err, SessionError::Expired("Tama".into()));
    }

    #[test]
    fn test_claim_long_after_sweep_is_no_session() {
        let mut reg = registry();
        let t0 = Instant::now();
        reg.hold("Tama", pid("sock-2"), code(), t0);
        let t61 = t0 + Duration::from_secs(61);
        reg.sweep(t61);

        let later = t61 + reg.config().expired_memory + Duration::from_secs(1);
        assert!(matches!(
            reg.claim("Tama", later),
            Err(SessionError::NoSession(_))
        ));
    }

    #[test]
    fn test_hold_after_sweep_replaces_released_entry() {
        let mut reg = registry();
        let t0 = Instant::now();
        reg.hold("Tama", pid("sock-2"), code(), t0);
        let t61 = t0 + Duration::from_secs(61);
        reg.sweep(t61);

        reg.hold("Tama", pid("sock-9"), code(), t61);
        let seat = reg.claim("Tama", t61).unwrap();
        assert_eq!(seat.player_id, pid("sock-9"));
    }

    #[test]
    fn test_forget_player_drops_entry() {
        let mut reg = registry();
        reg.hold("A", pid("sock-1"), code(), Instant::now());
        reg.forget_player(&pid("sock-1"));
        assert!(reg.is_empty());
    }
}
