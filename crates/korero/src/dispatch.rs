//! Routes decoded client messages to the session manager, a room, or
//! the leaderboard.
//!
//! Room-bound requests clone room handles out of the manager and
//! release the manager lock before awaiting a room, so a busy room
//! never stalls the rest of the server. Failures are answered to the
//! sending connection only.

use std::time::Instant;

use korero_game::PlayerId;
use korero_protocol::{ClientMessage, Codec, ServerMessage};
use korero_room::{PlayerSender, RoomError, RoomRequest, open_rooms, room_list};
use korero_timer::unix_millis;
use time::OffsetDateTime;

use crate::KoreroError;
use crate::server::ServerState;

/// What the connection should do after a message was handled.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Dispatched {
    Done,
    /// The connection now speaks for a restored seat.
    Adopt(PlayerId),
}

/// Handles one message from `player_id`. Replies, including errors,
/// go through `outbox`.
pub(crate) async fn dispatch<C: Codec>(
    state: &ServerState<C>,
    player_id: &PlayerId,
    outbox: &PlayerSender,
    msg: ClientMessage,
) -> Dispatched {
    match route(state, player_id, outbox, msg).await {
        Ok(Reply::Nothing) => Dispatched::Done,
        Ok(Reply::Send(reply)) => {
            let _ = outbox.send(reply);
            Dispatched::Done
        }
        Ok(Reply::Adopt(restored)) => Dispatched::Adopt(restored),
        Err(e) => {
            tracing::debug!(player = %player_id, error = %e, "request rejected");
            let _ = outbox.send(ServerMessage::precondition(&e));
            Dispatched::Done
        }
    }
}

enum Reply {
    /// Anything the sender needs arrives from the room itself.
    Nothing,
    Send(ServerMessage),
    Adopt(PlayerId),
}

async fn route<C: Codec>(
    state: &ServerState<C>,
    player_id: &PlayerId,
    outbox: &PlayerSender,
    msg: ClientMessage,
) -> Result<Reply, KoreroError> {
    if let Some(action) = msg.to_game_action() {
        room_request(state, player_id, RoomRequest::Game(action)).await?;
        return Ok(Reply::Nothing);
    }

    match msg {
        // -- Lobby --
        ClientMessage::FindGame { player_name } => {
            find_game(state, player_id, &player_name, outbox).await?;
        }
        ClientMessage::CreateRoom { player_name } => {
            let mut sessions = state.sessions.lock().await;
            sessions
                .create_room(player_id.clone(), &player_name, outbox.clone())
                .await?;
        }
        ClientMessage::JoinRoom {
            room_code,
            player_name,
        } => {
            let mut sessions = state.sessions.lock().await;
            sessions
                .join_room(&room_code, player_id.clone(), &player_name, outbox.clone())
                .await?;
        }
        ClientMessage::Reconnect { player_name } => {
            let (room, restored) = state
                .sessions
                .lock()
                .await
                .reconnect(player_id, &player_name, outbox.clone(), Instant::now())
                .await?;
            tracing::info!(connection = %player_id, player = %restored, %room, "seat restored");
            return Ok(Reply::Adopt(restored));
        }
        ClientMessage::LeaveRoom => {
            state.sessions.lock().await.leave(player_id).await?;
        }
        ClientMessage::ListRooms => {
            let handles = state.sessions.lock().await.room_handles();
            let rooms = room_list(&handles).await;
            return Ok(Reply::Send(ServerMessage::RoomList { rooms }));
        }
        ClientMessage::AddBot { bot_name } => {
            state
                .sessions
                .lock()
                .await
                .add_bot(player_id, bot_name)
                .await?;
        }
        ClientMessage::SetReady { ready } => {
            room_request(state, player_id, RoomRequest::SetReady { ready }).await?;
        }
        ClientMessage::StartGame => {
            room_request(state, player_id, RoomRequest::StartGame).await?;
        }
        ClientMessage::SetChillMode { enabled } => {
            room_request(state, player_id, RoomRequest::SetChillMode { enabled }).await?;
        }

        // -- Social --
        ClientMessage::Chat { content } => {
            room_request(state, player_id, RoomRequest::Chat { content }).await?;
        }
        ClientMessage::Reaction { emoji } => {
            room_request(state, player_id, RoomRequest::Reaction { emoji }).await?;
        }
        ClientMessage::VoiceSignal {
            target_player_id,
            payload,
        } => {
            let request = RoomRequest::VoiceSignal {
                target: target_player_id,
                payload,
            };
            room_request(state, player_id, request).await?;
        }
        ClientMessage::Ping => {
            return Ok(Reply::Send(ServerMessage::Pong {
                server_time: unix_millis(),
            }));
        }

        // -- Leaderboard --
        ClientMessage::SubmitScore { initials, score } => {
            let mut leaderboard = state.leaderboard.lock().await;
            let rank = leaderboard.submit(&initials, score, OffsetDateTime::now_utc())?;
            if rank.is_some() {
                leaderboard.persist();
            }
            return Ok(Reply::Send(ServerMessage::ScoreSubmitted { rank }));
        }
        ClientMessage::GetLeaderboard => {
            let entries = state.leaderboard.lock().await.entries().to_vec();
            return Ok(Reply::Send(ServerMessage::Leaderboard { entries }));
        }

        // Game actions were routed above.
        ClientMessage::RevealTurnOrderCard
        | ClientMessage::SelectTopic { .. }
        | ClientMessage::PlayCard { .. }
        | ClientMessage::StackCard { .. }
        | ClientMessage::CreateSlot { .. }
        | ClientMessage::SubmitTurn { .. }
        | ClientMessage::Vote { .. }
        | ClientMessage::PassTurn
        | ClientMessage::Undo
        | ClientMessage::ConfirmTurnEnd
        | ClientMessage::DiscardCards { .. }
        | ClientMessage::SkipDiscard => {}
    }
    Ok(Reply::Nothing)
}

/// Forwards a request to the sender's room without holding the
/// manager lock while the room works.
async fn room_request<C: Codec>(
    state: &ServerState<C>,
    player_id: &PlayerId,
    request: RoomRequest,
) -> Result<(), RoomError> {
    let handle = state
        .sessions
        .lock()
        .await
        .handle_for(player_id)
        .ok_or(RoomError::NoRoom)?;
    handle.request(player_id.clone(), request).await
}

/// Matchmaking that queries and joins rooms with the manager lock
/// released, retaking it only to record where the player landed.
async fn find_game<C: Codec>(
    state: &ServerState<C>,
    player_id: &PlayerId,
    name: &str,
    outbox: &PlayerSender,
) -> Result<(), RoomError> {
    let (name, handles) = state
        .sessions
        .lock()
        .await
        .begin_find_game(player_id, name)?;

    for handle in open_rooms(&handles).await {
        let joined = handle
            .join(player_id.clone(), name.clone(), outbox.clone(), true)
            .await;
        if joined.is_ok()
            && state
                .sessions
                .lock()
                .await
                .record_seat(player_id.clone(), handle.code())
                .is_ok()
        {
            return Ok(());
        }
    }

    state
        .sessions
        .lock()
        .await
        .create_room(player_id.clone(), &name, outbox.clone())
        .await?;
    Ok(())
}
