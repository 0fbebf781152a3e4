//! The room model: lobby membership around an optional running game.
//!
//! [`Room`] is plain data with synchronous methods. Only the room's
//! actor (see [`crate::actor`]) ever holds one, so every method here runs
//! serialized with every other mutation of the same room.

use korero_game::{
    ConnectionStatus, Game, GameAction, GameEvent, GameError, PlayerId, Vocabulary, apply,
    note_player_action, remove_player, seat_player, set_connection, start_game,
};
use korero_protocol::{GameView, MemberView, RoomCode, RoomListEntry, RoomView, ServerMessage};
use korero_timer::{TimerOutcome, evaluate, fire_timeout, sync_timer};
use rand::RngCore;
use tokio::time::{Duration, Instant};

use crate::{RoomConfig, RoomError};

/// Someone sitting in the room, human or bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: PlayerId,
    pub name: String,
    pub is_ready: bool,
    pub is_bot: bool,
}

/// What became of a dropped connection's seat.
#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectOutcome {
    /// A game is running; the seat is kept for a reconnect under `name`.
    Held { name: String },
    /// No game to come back to; the member was removed.
    Left,
}

/// What a timer tick produced.
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Countdown to broadcast, if the running timer is low.
    pub countdown: Option<ServerMessage>,
    /// Events from a fired timeout; `Some` means the snapshot changed.
    pub events: Option<Vec<GameEvent>>,
}

/// Room metadata, without the game itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomInfo {
    pub code: RoomCode,
    /// Humans and bots.
    pub member_count: usize,
    pub human_count: usize,
    pub max_players: usize,
    pub in_game: bool,
    pub host_name: Option<String>,
    pub idle_for: Duration,
}

impl RoomInfo {
    pub fn has_space(&self) -> bool {
        self.member_count < self.max_players
    }

    pub fn to_list_entry(&self) -> RoomListEntry {
        RoomListEntry {
            room_code: self.code.clone(),
            player_count: self.member_count,
            max_players: self.max_players,
            in_game: self.in_game,
            host_name: self.host_name.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    config: RoomConfig,
    /// In join order; the first human becomes host when the host leaves.
    members: Vec<Member>,
    host_id: Option<PlayerId>,
    chill_mode: bool,
    game: Option<Game>,
    games_started: u64,
    bots_added: u64,
    last_activity: Instant,
}

impl Room {
    pub fn new(code: RoomCode, config: RoomConfig) -> Self {
        Self {
            code,
            config,
            members: Vec::new(),
            host_id: None,
            chill_mode: false,
            game: None,
            games_started: 0,
            bots_added: 0,
            last_activity: Instant::now(),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, id: &PlayerId) -> Option<&Member> {
        self.members.iter().find(|m| &m.id == id)
    }

    pub fn host_id(&self) -> Option<&PlayerId> {
        self.host_id.as_ref()
    }

    pub fn chill_mode(&self) -> bool {
        self.chill_mode
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    /// `true` while a game exists and has not finished.
    pub fn in_game(&self) -> bool {
        self.game.as_ref().is_some_and(|g| !g.phase.is_terminal())
    }

    pub fn human_count(&self) -> usize {
        self.members.iter().filter(|m| !m.is_bot).count()
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    fn require_member(&self, id: &PlayerId) -> Result<&Member, RoomError> {
        self.member(id)
            .ok_or_else(|| RoomError::NotInRoom(id.clone(), self.code.clone()))
    }

    fn require_host(&self, id: &PlayerId) -> Result<(), RoomError> {
        self.require_member(id)?;
        if self.host_id.as_ref() != Some(id) {
            return Err(RoomError::NotHost(id.clone()));
        }
        Ok(())
    }

    fn require_lobby(&self) -> Result<(), RoomError> {
        if self.in_game() {
            return Err(RoomError::AlreadyStarted(self.code.clone()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Adds a member. With `allow_mid_game`, a running game seats them at
    /// the end of the rotation; otherwise a running game rejects the join.
    pub fn join(
        &mut self,
        id: PlayerId,
        name: &str,
        allow_mid_game: bool,
    ) -> Result<(), RoomError> {
        if self.member(&id).is_some() {
            return Err(RoomError::AlreadyInRoom(id, self.code.clone()));
        }
        if self.members.len() >= self.config.max_players {
            return Err(RoomError::Full(self.code.clone()));
        }
        if self.in_game() {
            if !allow_mid_game {
                return Err(RoomError::AlreadyStarted(self.code.clone()));
            }
            if let Some(game) = &self.game {
                self.game = Some(seat_player(game, id.clone(), name, self.config.hand_size)?);
            }
        }

        self.members.push(Member {
            id: id.clone(),
            name: name.to_string(),
            is_ready: false,
            is_bot: id.is_bot(),
        });
        if self.host_id.is_none() && !id.is_bot() {
            self.host_id = Some(id.clone());
        }
        self.touch();
        tracing::info!(room = %self.code, player = %id, members = self.members.len(), "player joined");
        Ok(())
    }

    /// Removes a member, taking them out of a running game first.
    pub fn leave(&mut self, id: &PlayerId, now_ms: u64) -> Result<Vec<GameEvent>, RoomError> {
        self.require_member(id)?;

        let mut events = Vec::new();
        if self.in_game() {
            let seated = self.game.as_ref().and_then(|g| g.player(id)).is_some();
            if seated {
                if let Some(game) = &self.game {
                    let transition = remove_player(game, id)?;
                    events = transition.events;
                    self.commit(transition.game, now_ms);
                }
            }
        }

        self.members.retain(|m| &m.id != id);
        if self.host_id.as_ref() == Some(id) {
            self.host_id = self.members.iter().find(|m| !m.is_bot).map(|m| m.id.clone());
            if let Some(host) = &self.host_id {
                tracing::info!(room = %self.code, %host, "host reassigned");
            }
        }
        self.touch();
        tracing::info!(room = %self.code, player = %id, members = self.members.len(), "player left");
        Ok(events)
    }

    /// Handles a dropped connection.
    pub fn disconnect(
        &mut self,
        id: &PlayerId,
        now_ms: u64,
    ) -> Result<DisconnectOutcome, RoomError> {
        let name = self.require_member(id)?.name.clone();
        let seated_active = self
            .game
            .as_ref()
            .and_then(|g| g.player(id))
            .is_some_and(|p| p.is_active);

        if self.in_game() && seated_active {
            if let Some(game) = &self.game {
                self.game = Some(set_connection(game, id, ConnectionStatus::Disconnected)?);
            }
            self.touch();
            tracing::info!(room = %self.code, player = %id, "player disconnected, seat held");
            return Ok(DisconnectOutcome::Held { name });
        }

        self.leave(id, now_ms)?;
        Ok(DisconnectOutcome::Left)
    }

    /// Marks a held seat connected again.
    pub fn reconnect(&mut self, id: &PlayerId) -> Result<(), RoomError> {
        self.require_member(id)?;
        if let Some(game) = &self.game {
            if game.player(id).is_some() {
                self.game = Some(set_connection(game, id, ConnectionStatus::Connected)?);
            }
        }
        self.touch();
        tracing::info!(room = %self.code, player = %id, "player reconnected");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lobby
    // -----------------------------------------------------------------------

    pub fn set_ready(&mut self, id: &PlayerId, ready: bool) -> Result<(), RoomError> {
        self.require_member(id)?;
        self.require_lobby()?;
        if let Some(member) = self.members.iter_mut().find(|m| &m.id == id) {
            member.is_ready = ready;
        }
        self.touch();
        Ok(())
    }

    /// Turning chill mode off restarts a running phase timer at `now_ms`,
    /// so the current turn gets its full time.
    pub fn set_chill_mode(
        &mut self,
        id: &PlayerId,
        enabled: bool,
        now_ms: u64,
    ) -> Result<(), RoomError> {
        self.require_host(id)?;
        let resuming = self.chill_mode && !enabled;
        self.chill_mode = enabled;
        if resuming {
            if let Some(game) = self.game.as_mut() {
                if game.timer_started_at.is_some() {
                    game.timer_started_at = Some(now_ms);
                }
            }
        }
        self.touch();
        tracing::info!(room = %self.code, enabled, "chill mode changed");
        Ok(())
    }

    /// Adds a bot seat. Bots are always ready.
    pub fn add_bot(&mut self, id: &PlayerId, name: Option<String>) -> Result<PlayerId, RoomError> {
        self.require_host(id)?;
        self.require_lobby()?;
        if self.members.len() >= self.config.max_players {
            return Err(RoomError::Full(self.code.clone()));
        }

        self.bots_added += 1;
        let bot_id = PlayerId::bot(self.bots_added);
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Bot {}", self.bots_added));
        self.members.push(Member {
            id: bot_id.clone(),
            name,
            is_ready: true,
            is_bot: true,
        });
        self.touch();
        tracing::info!(room = %self.code, bot = %bot_id, "bot added");
        Ok(bot_id)
    }

    /// Deals a new game to every member. Also restarts after a finished game.
    pub fn start_game(
        &mut self,
        id: &PlayerId,
        vocabulary: &dyn Vocabulary,
        rng: &mut dyn RngCore,
        now_ms: u64,
    ) -> Result<(), RoomError> {
        self.require_host(id)?;
        self.require_lobby()?;
        if self.members.len() < self.config.min_players {
            return Err(GameError::NotEnoughPlayers {
                min: self.config.min_players,
                have: self.members.len(),
            }
            .into());
        }
        let unready: Vec<&str> = self
            .members
            .iter()
            .filter(|m| !m.is_bot && !m.is_ready && Some(&m.id) != self.host_id.as_ref())
            .map(|m| m.name.as_str())
            .collect();
        if !unready.is_empty() {
            return Err(RoomError::NotReady(unready.join(", ")));
        }

        let seats: Vec<(PlayerId, String)> = self
            .members
            .iter()
            .map(|m| (m.id.clone(), m.name.clone()))
            .collect();
        self.games_started += 1;
        let game_id = format!("{}-{}", self.code, self.games_started);
        let game = start_game(game_id, &seats, vocabulary, &self.config.game_config(), rng)?;
        self.game = None;
        self.commit(game, now_ms);
        self.touch();
        tracing::info!(room = %self.code, players = seats.len(), "game started");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Game
    // -----------------------------------------------------------------------

    /// Applies a player's (or bot's) action and commits the result.
    pub fn apply_action(
        &mut self,
        actor: &PlayerId,
        action: GameAction,
        vocabulary: &dyn Vocabulary,
        rng: &mut dyn RngCore,
        now_ms: u64,
    ) -> Result<Vec<GameEvent>, RoomError> {
        self.require_member(actor)?;
        let game = self.game.as_ref().ok_or(RoomError::NoGame)?;
        let name = action.name();

        let transition = apply(game, actor, action, vocabulary, rng).inspect_err(|e| {
            tracing::debug!(room = %self.code, player = %actor, action = name, error = %e, "action rejected");
        })?;
        let mut next = transition.game;
        if !actor.is_bot() {
            note_player_action(&mut next, actor);
        }
        self.commit(next, now_ms);
        self.touch();
        tracing::debug!(room = %self.code, player = %actor, action = name, "action applied");
        Ok(transition.events)
    }

    /// Evaluates the phase timer and fires at most one timeout.
    pub fn tick(
        &mut self,
        vocabulary: &dyn Vocabulary,
        rng: &mut dyn RngCore,
        now_ms: u64,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let Some(game) = &self.game else {
            return outcome;
        };
        match evaluate(game, now_ms, self.config.timer_settings(self.chill_mode)) {
            TimerOutcome::Quiet => {}
            TimerOutcome::Countdown {
                phase,
                remaining_secs,
            } => {
                outcome.countdown = Some(ServerMessage::TimerUpdate {
                    phase,
                    remaining_secs,
                });
            }
            TimerOutcome::Expired(effect) => {
                match fire_timeout(game, &effect, vocabulary, rng, now_ms) {
                    Ok(Some(transition)) => {
                        tracing::info!(room = %self.code, ?effect, "timeout fired");
                        self.commit(transition.game, now_ms);
                        outcome.events = Some(transition.events);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(room = %self.code, ?effect, error = %e, "timeout effect rejected");
                    }
                }
            }
        }
        outcome
    }

    /// Replaces the snapshot, restarting the phase timer if the turn moved.
    fn commit(&mut self, mut next: Game, now_ms: u64) {
        sync_timer(self.game.as_ref(), &mut next, now_ms);
        self.game = Some(next);
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn view(&self) -> RoomView {
        let members = self
            .members
            .iter()
            .map(|m| MemberView {
                id: m.id.clone(),
                name: m.name.clone(),
                is_ready: m.is_ready,
                is_bot: m.is_bot,
                is_host: self.host_id.as_ref() == Some(&m.id),
                connection_status: self
                    .game
                    .as_ref()
                    .and_then(|g| g.player(&m.id))
                    .map(|p| p.connection_status),
            })
            .collect();
        RoomView {
            code: self.code.clone(),
            members,
            host_id: self.host_id.clone(),
            chill_mode: self.chill_mode,
            max_players: self.config.max_players,
            in_game: self.in_game(),
        }
    }

    /// The full snapshot as `viewer` may see it.
    pub fn state_for(&self, viewer: &PlayerId) -> ServerMessage {
        ServerMessage::RoomState {
            room: self.view(),
            game: self.game.as_ref().map(|g| GameView::for_viewer(g, viewer)),
        }
    }

    pub fn info(&self) -> RoomInfo {
        let host_name = self
            .host_id
            .as_ref()
            .and_then(|h| self.member(h))
            .map(|m| m.name.clone());
        RoomInfo {
            code: self.code.clone(),
            member_count: self.members.len(),
            human_count: self.human_count(),
            max_players: self.config.max_players,
            in_game: self.in_game(),
            host_name,
            idle_for: self.last_activity.elapsed(),
        }
    }
}
