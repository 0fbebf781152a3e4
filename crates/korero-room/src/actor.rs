//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Every mutation of a room, whether a player's action, a timer tick, or
//! a bot's move, arrives as a [`RoomCommand`] on one mpsc channel and is
//! applied in arrival order. Nothing else holds the room, so a timeout
//! can never race a human action for the same seat.
//!
//! After each committed change the actor broadcasts a fresh, per-viewer
//! snapshot to every connected member, then the change's events.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use korero_game::{Game, GameAction, GameEvent, Phase, PlayerId, Vocabulary};
use korero_protocol::{RoomCode, ServerMessage};
use korero_timer::unix_millis;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};

use crate::bot::{BotPolicy, bots_due};
use crate::room::{DisconnectOutcome, Room, RoomInfo};
use crate::{RoomConfig, RoomError};

/// Channel sender for delivering outbound messages to one connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// A request a member makes of their room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomRequest {
    SetReady { ready: bool },
    SetChillMode { enabled: bool },
    AddBot { name: Option<String> },
    StartGame,
    Game(GameAction),
    Chat { content: String },
    Reaction { emoji: String },
    VoiceSignal {
        target: PlayerId,
        payload: serde_json::Value,
    },
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: String,
        sender: PlayerSender,
        allow_mid_game: bool,
        reply: oneshot::Sender<Result<bool, RoomError>>,
    },

    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Request {
        player_id: PlayerId,
        request: RoomRequest,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Disconnect {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<DisconnectOutcome, RoomError>>,
    },

    Reconnect {
        player_id: PlayerId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Evaluate phase timers at `now_ms`. Fire-and-forget.
    Tick { now_ms: u64 },

    /// A scheduled bot move, valid only while the game is still in `phase`.
    BotTurn { bot: PlayerId, phase: Phase },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    Snapshot {
        reply: oneshot::Sender<Option<Game>>,
    },

    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone. The session manager holds one per room, and the
/// connection handler clones it out so it can await the room without
/// holding the manager lock.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| self.unavailable())?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Adds a member. Returns whether they are the host.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: impl Into<String>,
        sender: PlayerSender,
        allow_mid_game: bool,
    ) -> Result<bool, RoomError> {
        let name = name.into();
        self.call(|reply| RoomCommand::Join {
            player_id,
            name,
            sender,
            allow_mid_game,
            reply,
        })
        .await?
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    pub async fn request(
        &self,
        player_id: PlayerId,
        request: RoomRequest,
    ) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Request {
            player_id,
            request,
            reply,
        })
        .await?
    }

    pub async fn disconnect(&self, player_id: PlayerId) -> Result<DisconnectOutcome, RoomError> {
        self.call(|reply| RoomCommand::Disconnect { player_id, reply })
            .await?
    }

    pub async fn reconnect(
        &self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        self.call(|reply| RoomCommand::Reconnect {
            player_id,
            sender,
            reply,
        })
        .await?
    }

    /// Posts a timer tick without waiting. A full mailbox drops the tick;
    /// the next one recomputes from the stored timestamp.
    pub fn tick(&self, now_ms: u64) {
        if let Err(mpsc::error::TrySendError::Full(_)) =
            self.sender.try_send(RoomCommand::Tick { now_ms })
        {
            tracing::warn!(room = %self.code, "mailbox full, tick dropped");
        }
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.call(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// The unsanitized game snapshot, for diagnostics and tests.
    pub async fn snapshot(&self) -> Result<Option<Game>, RoomError> {
        self.call(|reply| RoomCommand::Snapshot { reply }).await
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| self.unavailable())
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    /// Outbound channels of connected members. Held seats and bots have none.
    senders: HashMap<PlayerId, PlayerSender>,
    vocabulary: Arc<dyn Vocabulary>,
    bot_policy: Arc<dyn BotPolicy>,
    /// Bots with a move already scheduled.
    pending_bots: HashSet<PlayerId>,
    rng: StdRng,
    /// Weak so that dropping every handle still closes the mailbox.
    mailbox: mpsc::WeakSender<RoomCommand>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room = %self.room.code(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                RoomCommand::Join {
                    player_id,
                    name,
                    sender,
                    allow_mid_game,
                    reply,
                } => {
                    let result = self.handle_join(player_id, &name, sender, allow_mid_game);
                    let _ = reply.send(result);
                }
                RoomCommand::Leave { player_id, reply } => {
                    let result = self.handle_leave(&player_id);
                    let _ = reply.send(result);
                }
                RoomCommand::Request {
                    player_id,
                    request,
                    reply,
                } => {
                    let result = self.handle_request(&player_id, request);
                    let _ = reply.send(result);
                }
                RoomCommand::Disconnect { player_id, reply } => {
                    let result = self.handle_disconnect(&player_id);
                    let _ = reply.send(result);
                }
                RoomCommand::Reconnect {
                    player_id,
                    sender,
                    reply,
                } => {
                    let result = self.handle_reconnect(player_id, sender);
                    let _ = reply.send(result);
                }
                RoomCommand::Tick { now_ms } => self.handle_tick(now_ms),
                RoomCommand::BotTurn { bot, phase } => self.handle_bot_turn(bot, phase),
                RoomCommand::GetInfo { reply } => {
                    let _ = reply.send(self.room.info());
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(self.room.game().cloned());
                }
                RoomCommand::Shutdown => {
                    tracing::info!(room = %self.room.code(), "room shutting down");
                    break;
                }
            }
        }

        tracing::info!(room = %self.room.code(), "room actor stopped");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: &str,
        sender: PlayerSender,
        allow_mid_game: bool,
    ) -> Result<bool, RoomError> {
        self.room.join(player_id.clone(), name, allow_mid_game)?;
        let is_host = self.room.host_id() == Some(&player_id);
        let _ = sender.send(ServerMessage::RoomJoined {
            room_code: self.room.code().clone(),
            player_id: player_id.clone(),
            is_host,
        });
        self.senders.insert(player_id, sender);
        self.broadcast_state();
        Ok(is_host)
    }

    fn handle_leave(&mut self, player_id: &PlayerId) -> Result<(), RoomError> {
        let events = self.room.leave(player_id, unix_millis())?;
        if let Some(sender) = self.senders.remove(player_id) {
            let _ = sender.send(ServerMessage::RoomLeft);
        }
        self.after_commit(events);
        Ok(())
    }

    fn handle_disconnect(&mut self, player_id: &PlayerId) -> Result<DisconnectOutcome, RoomError> {
        let outcome = self.room.disconnect(player_id, unix_millis())?;
        self.senders.remove(player_id);
        self.after_commit(Vec::new());
        Ok(outcome)
    }

    fn handle_reconnect(&mut self, player_id: PlayerId, sender: PlayerSender) -> Result<(), RoomError> {
        self.room.reconnect(&player_id)?;
        let _ = sender.send(ServerMessage::Reconnected {
            room_code: self.room.code().clone(),
            player_id: player_id.clone(),
        });
        self.senders.insert(player_id, sender);
        self.broadcast_state();
        Ok(())
    }

    fn handle_request(&mut self, player_id: &PlayerId, request: RoomRequest) -> Result<(), RoomError> {
        let now_ms = unix_millis();
        match request {
            RoomRequest::SetReady { ready } => self.room.set_ready(player_id, ready)?,
            RoomRequest::SetChillMode { enabled } => {
                self.room.set_chill_mode(player_id, enabled, now_ms)?
            }
            RoomRequest::AddBot { name } => {
                self.room.add_bot(player_id, name)?;
            }
            RoomRequest::StartGame => {
                self.room
                    .start_game(player_id, self.vocabulary.as_ref(), &mut self.rng, now_ms)?;
                self.pending_bots.clear();
            }
            RoomRequest::Game(action) => {
                let events = self.room.apply_action(
                    player_id,
                    action,
                    self.vocabulary.as_ref(),
                    &mut self.rng,
                    now_ms,
                )?;
                self.after_commit(events);
                return Ok(());
            }
            RoomRequest::Chat { content } => {
                let name = self.member_name(player_id)?;
                self.broadcast(&ServerMessage::Chat {
                    from: player_id.clone(),
                    name,
                    content,
                });
                return Ok(());
            }
            RoomRequest::Reaction { emoji } => {
                self.member_name(player_id)?;
                self.broadcast(&ServerMessage::Reaction {
                    from: player_id.clone(),
                    emoji,
                });
                return Ok(());
            }
            RoomRequest::VoiceSignal { target, payload } => {
                self.member_name(player_id)?;
                let sender = self
                    .senders
                    .get(&target)
                    .ok_or_else(|| RoomError::NotInRoom(target.clone(), self.room.code().clone()))?;
                let _ = sender.send(ServerMessage::VoiceSignal {
                    from: player_id.clone(),
                    payload,
                });
                return Ok(());
            }
        }
        self.after_commit(Vec::new());
        Ok(())
    }

    fn handle_tick(&mut self, now_ms: u64) {
        let outcome = self
            .room
            .tick(self.vocabulary.as_ref(), &mut self.rng, now_ms);
        if let Some(events) = outcome.events {
            self.after_commit(events);
        }
        if let Some(countdown) = outcome.countdown {
            self.broadcast(&countdown);
        }
    }

    fn handle_bot_turn(&mut self, bot: PlayerId, phase: Phase) {
        self.pending_bots.remove(&bot);
        let Some(game) = self.room.game() else {
            return;
        };
        if game.phase != phase {
            tracing::debug!(room = %self.room.code(), %bot, expected = %phase, actual = %game.phase, "stale bot move dropped");
            self.schedule_bots();
            return;
        }
        let Some(action) =
            self.bot_policy
                .decide(game, &bot, self.vocabulary.as_ref(), &mut self.rng)
        else {
            return;
        };
        match self.room.apply_action(
            &bot,
            action,
            self.vocabulary.as_ref(),
            &mut self.rng,
            unix_millis(),
        ) {
            Ok(events) => self.after_commit(events),
            Err(e) => {
                tracing::debug!(room = %self.room.code(), %bot, error = %e, "bot move rejected");
            }
        }
    }

    fn member_name(&self, player_id: &PlayerId) -> Result<String, RoomError> {
        self.room
            .member(player_id)
            .map(|m| m.name.clone())
            .ok_or_else(|| RoomError::NotInRoom(player_id.clone(), self.room.code().clone()))
    }

    /// Broadcasts the new snapshot and `events`, then wakes any bots.
    fn after_commit(&mut self, events: Vec<GameEvent>) {
        self.broadcast_state();
        for event in events {
            self.broadcast(&ServerMessage::Event { event });
        }
        self.schedule_bots();
    }

    fn broadcast_state(&self) {
        for (id, sender) in &self.senders {
            let _ = sender.send(self.room.state_for(id));
        }
    }

    /// Sends to every connected member. A closed receiver is a
    /// disconnect in progress and is skipped.
    fn broadcast(&self, msg: &ServerMessage) {
        for sender in self.senders.values() {
            let _ = sender.send(msg.clone());
        }
    }

    /// Queues a delayed [`RoomCommand::BotTurn`] for each bot that has
    /// something to do and is not already scheduled.
    fn schedule_bots(&mut self) {
        let Some(game) = self.room.game() else {
            return;
        };
        let phase = game.phase;
        let delay = self.room.config().bot_delay;
        for bot in bots_due(game) {
            if !self.pending_bots.insert(bot.clone()) {
                continue;
            }
            let mailbox = self.mailbox.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(mailbox) = mailbox.upgrade() {
                    let _ = mailbox.send(RoomCommand::BotTurn { bot, phase }).await;
                }
            });
        }
    }
}

/// Spawns a new room actor task and returns a handle to communicate with it.
pub(crate) fn spawn_room(
    code: RoomCode,
    config: RoomConfig,
    vocabulary: Arc<dyn Vocabulary>,
    bot_policy: Arc<dyn BotPolicy>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.mailbox_size.max(1));
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let actor = RoomActor {
        room: Room::new(code.clone(), config),
        senders: HashMap::new(),
        vocabulary,
        bot_policy,
        pending_bots: HashSet::new(),
        rng,
        mailbox: tx.downgrade(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
