//! Per-connection handler.
//!
//! Each accepted socket gets its own task running [`handle_connection`]:
//!   1. Assign the `sock-N` identity and greet with `CONNECTED`
//!   2. Start a writer task that drains the connection's outbox
//!   3. Read frames, decode, dispatch until close or idle timeout
//!   4. Report the disconnect so the room can hold or free the seat

use std::sync::Arc;

use korero_game::PlayerId;
use korero_protocol::{ClientMessage, Codec, Envelope, ServerMessage};
use korero_timer::unix_millis;
use korero_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::KoreroError;
use crate::dispatch::{Dispatched, dispatch};
use crate::server::ServerState;

/// Reports the disconnect when the handler exits, even by panic.
///
/// `Drop` is synchronous, so the async work runs on a spawned task.
struct DisconnectGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
    writer: JoinHandle<()>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        self.writer.abort();
        let player_id = self.player_id.clone();
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.sessions.lock().await.disconnect(&player_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), KoreroError> {
    let conn = Arc::new(conn);
    let player_id = PlayerId::for_socket(conn.id().into_inner());
    tracing::info!(player = %player_id, "player connected");

    let (outbox, inbox) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(Arc::clone(&conn), inbox, Arc::clone(&state)));
    let mut guard = DisconnectGuard {
        player_id: player_id.clone(),
        state: Arc::clone(&state),
        writer,
    };

    let _ = outbox.send(ServerMessage::Connected { player_id });

    loop {
        let data = match tokio::time::timeout(state.connection_idle_timeout, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(player = %guard.player_id, "connection closed");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(player = %guard.player_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(player = %guard.player_id, "connection idle, closing");
                let _ = conn.close().await;
                break;
            }
        };

        let msg: ClientMessage = match state.codec.decode(&data) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(player = %guard.player_id, error = %e, "undecodable frame");
                let _ = outbox.send(ServerMessage::transport_fault(&e));
                continue;
            }
        };

        if let Dispatched::Adopt(restored) = dispatch(&state, &guard.player_id, &outbox, msg).await
        {
            guard.player_id = restored;
        }
    }

    // The guard drops here and reports the disconnect.
    Ok(())
}

/// Wraps each outbound message in a sequenced envelope and sends it.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
    state: Arc<ServerState<C>>,
) {
    let mut seq: u64 = 0;
    while let Some(payload) = inbox.recv().await {
        let envelope = Envelope {
            seq: next_seq(&mut seq),
            timestamp: unix_millis(),
            payload,
        };
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(connection = %conn.id(), error = %e, "failed to encode message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(connection = %conn.id(), error = %e, "send failed, writer stopping");
            break;
        }
    }
}

/// Returns the current sequence number and advances it.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_seq_counts_from_zero() {
        let mut seq = 0;
        assert_eq!(next_seq(&mut seq), 0);
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(seq, 2);
    }
}
