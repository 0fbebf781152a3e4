//! Session manager: creates, tracks, and routes players to rooms.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use korero_game::{PlayerId, StarterVocabulary, Vocabulary};
use korero_protocol::{RoomCode, RoomListEntry};
use korero_session::{HeldSeat, ReconnectRegistry, SessionConfig, SessionError};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::actor::spawn_room;
use crate::bot::{BotPolicy, CasualBot};
use crate::code::generate_room_code;
use crate::room::DisconnectOutcome;
use crate::{PlayerSender, RoomConfig, RoomError, RoomHandle, RoomInfo, RoomRequest};

/// Where a connection ended up after joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    pub room_code: RoomCode,
    pub is_host: bool,
}

/// Owns every room on the server and knows which player is in which.
///
/// One instance is constructed by the server and shared behind a lock.
/// Methods that talk to a room await its actor. Callers sharing the
/// manager should not hold its lock across many rooms: clone handles out
/// with [`handle_for`](Self::handle_for) or
/// [`room_handles`](Self::room_handles), release the lock, and query
/// them with the free functions at the bottom of this module.
pub struct SessionManager {
    rooms: HashMap<RoomCode, RoomHandle>,

    /// A player is in at most one room at a time. Entries survive a
    /// disconnect while the seat is held.
    player_rooms: HashMap<PlayerId, RoomCode>,

    reconnects: ReconnectRegistry,
    config: RoomConfig,
    vocabulary: Arc<dyn Vocabulary>,
    bot_policy: Arc<dyn BotPolicy>,
    rng: StdRng,
}

impl SessionManager {
    pub fn new(config: RoomConfig, session: SessionConfig) -> Self {
        Self::with_content(
            config,
            session,
            Arc::new(StarterVocabulary::new()),
            Arc::new(CasualBot::default()),
        )
    }

    pub fn with_content(
        config: RoomConfig,
        session: SessionConfig,
        vocabulary: Arc<dyn Vocabulary>,
        bot_policy: Arc<dyn BotPolicy>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            reconnects: ReconnectRegistry::new(session),
            config,
            vocabulary,
            bot_policy,
            rng,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    fn ensure_free(&self, player_id: &PlayerId) -> Result<(), RoomError> {
        match self.player_rooms.get(player_id) {
            Some(code) => Err(RoomError::AlreadyInRoom(player_id.clone(), code.clone())),
            None => Ok(()),
        }
    }

    fn clean_name(name: &str) -> Result<String, RoomError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RoomError::EmptyName);
        }
        Ok(name.to_string())
    }

    fn spawn(&mut self) -> RoomHandle {
        let rooms = &self.rooms;
        let code = generate_room_code(&mut self.rng, |c| rooms.contains_key(c));
        let handle = spawn_room(
            code.clone(),
            self.config.clone(),
            Arc::clone(&self.vocabulary),
            Arc::clone(&self.bot_policy),
        );
        self.rooms.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, "room created");
        handle
    }

    // -----------------------------------------------------------------------
    // Joining and leaving
    // -----------------------------------------------------------------------

    /// Creates a room with `player_id` as host.
    pub async fn create_room(
        &mut self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<Joined, RoomError> {
        self.ensure_free(&player_id)?;
        let name = Self::clean_name(name)?;
        let handle = self.spawn();
        let is_host = handle.join(player_id.clone(), name, sender, false).await?;
        self.player_rooms.insert(player_id, handle.code().clone());
        Ok(Joined {
            room_code: handle.code().clone(),
            is_host,
        })
    }

    /// Joins a room by code. A room with a game running rejects the join.
    pub async fn join_room(
        &mut self,
        code: &RoomCode,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<Joined, RoomError> {
        self.ensure_free(&player_id)?;
        let name = Self::clean_name(name)?;
        let code = RoomCode::new(code.as_str());
        let handle = self
            .rooms
            .get(&code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?;
        let is_host = handle.join(player_id.clone(), name, sender, false).await?;
        self.player_rooms.insert(player_id, code.clone());
        Ok(Joined {
            room_code: code,
            is_host,
        })
    }

    /// Matchmaking: join any room with space, preferring rooms still in
    /// the lobby, then running games (seated mid-game), else create one.
    pub async fn find_game(
        &mut self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender,
    ) -> Result<Joined, RoomError> {
        let (name, handles) = self.begin_find_game(&player_id, name)?;

        // A room may fill between the info query and the join; keep looking.
        for handle in open_rooms(&handles).await {
            if let Ok(is_host) = handle
                .join(player_id.clone(), name.clone(), sender.clone(), true)
                .await
            {
                if self.record_seat(player_id.clone(), handle.code()).is_ok() {
                    return Ok(Joined {
                        room_code: handle.code().clone(),
                        is_host,
                    });
                }
            }
        }

        self.create_room(player_id, &name, sender).await
    }

    /// The part of matchmaking that needs the manager: checks the player
    /// is free and snapshots the rooms to try. Returns the cleaned name.
    pub fn begin_find_game(
        &self,
        player_id: &PlayerId,
        name: &str,
    ) -> Result<(String, Vec<RoomHandle>), RoomError> {
        self.ensure_free(player_id)?;
        let name = Self::clean_name(name)?;
        Ok((name, self.room_handles()))
    }

    /// Records that `player_id` joined the room `code` through its handle.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room was destroyed meanwhile.
    pub fn record_seat(&mut self, player_id: PlayerId, code: &RoomCode) -> Result<(), RoomError> {
        if !self.rooms.contains_key(code) {
            return Err(RoomError::NotFound(code.clone()));
        }
        self.player_rooms.insert(player_id, code.clone());
        Ok(())
    }

    /// Removes a player from their room, destroying it once no humans
    /// are left.
    pub async fn leave(&mut self, player_id: &PlayerId) -> Result<RoomCode, RoomError> {
        let code = self
            .player_rooms
            .remove(player_id)
            .ok_or(RoomError::NoRoom)?;
        self.reconnects.forget_player(player_id);
        if let Some(handle) = self.rooms.get(&code) {
            handle.leave(player_id.clone()).await?;
        }
        self.destroy_if_abandoned(&code).await;
        Ok(code)
    }

    /// Adds a bot to the host's room.
    pub async fn add_bot(
        &self,
        player_id: &PlayerId,
        name: Option<String>,
    ) -> Result<(), RoomError> {
        let handle = self.handle_for(player_id).ok_or(RoomError::NoRoom)?;
        handle
            .request(player_id.clone(), RoomRequest::AddBot { name })
            .await
    }

    // -----------------------------------------------------------------------
    // Connection drops
    // -----------------------------------------------------------------------

    /// Handles a closed connection.
    ///
    /// In a lobby the player simply leaves. Mid-game the seat is held
    /// under their display name for the reconnect grace period.
    pub async fn disconnect(&mut self, player_id: &PlayerId) {
        let Some(code) = self.player_rooms.get(player_id).cloned() else {
            return;
        };
        let Some(handle) = self.rooms.get(&code).cloned() else {
            self.player_rooms.remove(player_id);
            return;
        };

        match handle.disconnect(player_id.clone()).await {
            Ok(DisconnectOutcome::Held { name }) => {
                self.reconnects
                    .hold(&name, player_id.clone(), code, Instant::now());
            }
            Ok(DisconnectOutcome::Left) => {
                self.player_rooms.remove(player_id);
                self.destroy_if_abandoned(&code).await;
            }
            Err(e) => {
                tracing::debug!(player = %player_id, room = %code, error = %e, "disconnect from room failed");
                self.player_rooms.remove(player_id);
            }
        }
    }

    /// Restores the seat held under `name` to a new connection.
    ///
    /// Returns the restored identity; the connection adopts it in place
    /// of the fresh one it was given.
    pub async fn reconnect(
        &mut self,
        connection_id: &PlayerId,
        name: &str,
        sender: PlayerSender,
        now: Instant,
    ) -> Result<(RoomCode, PlayerId), RoomError> {
        self.ensure_free(connection_id)?;
        let seat = self.reconnects.claim(name, now)?;

        let Some(handle) = self.rooms.get(&seat.room_code) else {
            self.player_rooms.remove(&seat.player_id);
            return Err(SessionError::RoomGone(seat.room_code).into());
        };
        if let Err(e) = handle.reconnect(seat.player_id.clone(), sender).await {
            self.player_rooms.remove(&seat.player_id);
            return Err(match e {
                RoomError::NotInRoom(..) | RoomError::Unavailable(_) => {
                    SessionError::RoomGone(seat.room_code).into()
                }
                other => other,
            });
        }
        self.player_rooms
            .insert(seat.player_id.clone(), seat.room_code.clone());
        Ok((seat.room_code, seat.player_id))
    }

    // -----------------------------------------------------------------------
    // Periodic maintenance
    // -----------------------------------------------------------------------

    /// Posts a timer tick to every room.
    pub fn tick_all(&self, now_ms: u64) {
        for handle in self.rooms.values() {
            handle.tick(now_ms);
        }
    }

    /// Releases seats whose grace period has passed, taking those
    /// players out of their games.
    pub async fn sweep(&mut self, now: Instant) -> usize {
        let expired = self.take_expired(now);
        release_seats(&self.room_handles(), &expired).await;
        for seat in &expired {
            self.destroy_if_abandoned(&seat.room_code).await;
        }
        expired.len()
    }

    /// Takes the expired seats out of the registry and the player map.
    /// The players are still seated in their rooms until
    /// [`release_seats`] runs.
    pub fn take_expired(&mut self, now: Instant) -> Vec<HeldSeat> {
        let expired = self.reconnects.sweep(now);
        for seat in &expired {
            self.player_rooms.remove(&seat.player_id);
        }
        expired
    }

    /// Destroys rooms with no humans left or no activity within the
    /// idle timeout. Returns the codes reaped.
    pub async fn reap(&mut self) -> Vec<RoomCode> {
        let doomed = stale_rooms(&self.room_handles(), self.config.idle_timeout).await;
        for code in &doomed {
            self.destroy_room(code).await;
        }
        doomed
    }

    async fn destroy_if_abandoned(&mut self, code: &RoomCode) {
        let Some(handle) = self.rooms.get(code) else {
            return;
        };
        match handle.info().await {
            Ok(info) if info.human_count > 0 => {}
            _ => self.destroy_room(code).await,
        }
    }

    /// Shuts a room down and forgets everyone in it.
    ///
    /// Seats held for the room stay in the registry until they expire,
    /// so a late reconnect learns the room is gone.
    pub async fn destroy_room(&mut self, code: &RoomCode) {
        if let Some(handle) = self.remove_room(code) {
            let _ = handle.shutdown().await;
        }
    }

    /// Forgets a room and everyone in it, handing back its handle so the
    /// caller can shut the actor down outside the lock.
    pub fn remove_room(&mut self, code: &RoomCode) -> Option<RoomHandle> {
        let handle = self.rooms.remove(code)?;
        self.player_rooms.retain(|_, c| c != code);
        tracing::info!(room = %code, "room destroyed");
        Some(handle)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// A clone of the handle for the room `player_id` is in.
    pub fn handle_for(&self, player_id: &PlayerId) -> Option<RoomHandle> {
        let code = self.player_rooms.get(player_id)?;
        self.rooms.get(code).cloned()
    }

    pub fn room_handle(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).cloned()
    }

    pub fn player_room(&self, player_id: &PlayerId) -> Option<&RoomCode> {
        self.player_rooms.get(player_id)
    }

    pub async fn room_info(&self, code: &RoomCode) -> Result<RoomInfo, RoomError> {
        self.rooms
            .get(code)
            .ok_or_else(|| RoomError::NotFound(code.clone()))?
            .info()
            .await
    }

    /// Every live room, for the room browser.
    pub async fn list_rooms(&self) -> Vec<RoomListEntry> {
        room_list(&self.room_handles()).await
    }

    /// Clones of every room handle.
    pub fn room_handles(&self) -> Vec<RoomHandle> {
        self.rooms.values().cloned().collect()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn held_seats(&self) -> usize {
        self.reconnects.len()
    }
}

// ---------------------------------------------------------------------------
// Queries over handles
//
// These take handle snapshots rather than the manager, so they run with
// the manager lock released.
// ---------------------------------------------------------------------------

/// Browser entries for the given rooms, sorted by code. Rooms that fail
/// to answer (shutting down) are skipped.
pub async fn room_list(handles: &[RoomHandle]) -> Vec<RoomListEntry> {
    let mut entries = Vec::with_capacity(handles.len());
    for handle in handles {
        if let Ok(info) = handle.info().await {
            entries.push(info.to_list_entry());
        }
    }
    entries.sort_by(|a, b| a.room_code.cmp(&b.room_code));
    entries
}

/// Rooms a matchmaking player could join: lobbies first, then running
/// games. Rooms without a human are passed over.
pub async fn open_rooms(handles: &[RoomHandle]) -> Vec<RoomHandle> {
    let mut candidates = Vec::new();
    for handle in handles {
        if let Ok(info) = handle.info().await {
            if info.has_space() && info.human_count > 0 {
                candidates.push((info.in_game, handle.clone()));
            }
        }
    }
    // `false` sorts first.
    candidates.sort_by_key(|(in_game, _)| *in_game);
    candidates.into_iter().map(|(_, handle)| handle).collect()
}

/// Codes of rooms with no humans, no activity within `idle_timeout`, or
/// a dead actor.
pub async fn stale_rooms(handles: &[RoomHandle], idle_timeout: Duration) -> Vec<RoomCode> {
    let mut stale = Vec::new();
    for handle in handles {
        match handle.info().await {
            Ok(info) if info.human_count > 0 && info.idle_for <= idle_timeout => {}
            _ => stale.push(handle.code().clone()),
        }
    }
    stale
}

/// Takes each expired seat's player out of their room.
pub async fn release_seats(handles: &[RoomHandle], seats: &[HeldSeat]) {
    for seat in seats {
        if let Some(handle) = handles.iter().find(|h| h.code() == &seat.room_code) {
            if let Err(e) = handle.leave(seat.player_id.clone()).await {
                tracing::debug!(player = %seat.player_id, error = %e, "expired seat already gone");
            }
        }
        tracing::info!(player = %seat.player_id, room = %seat.room_code, "held seat released");
    }
}
