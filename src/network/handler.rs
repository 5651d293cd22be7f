//! Datagram dispatch: identifies the sender and forwards to the game's
//! input operations. Nothing here touches game state directly.

use std::net::SocketAddr;
use std::sync::Arc;

use prost::Message;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::udp::UdpServer;
use crate::game::traits::{GameError, ParticipantId};
use crate::games::paperio::systems::{self, Turn};
use crate::games::paperio::PaperioGame;
use crate::protocol::client::{self, ClientMessage, Ping, client_message::Payload};
use crate::protocol::server::{Error, Joined, Pong, ServerMessage, server_message};
use crate::scheduler::GameHandle;
use crate::session::SessionManager;

/// Receives datagrams forever, answering each one.
pub async fn serve(
    server: Arc<UdpServer>,
    sessions: Arc<Mutex<SessionManager>>,
    game: GameHandle<PaperioGame>,
) {
    loop {
        let (data, addr) = match server.recv().await {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("recv error - sent to closed port. Ignoring. Error: {}", e);
                continue;
            }
        };

        if let Err(e) = handle_datagram(&server, &sessions, &game, &data, addr).await {
            tracing::warn!("Rejected datagram from {}: {}", addr, e);
            let response = ServerMessage {
                payload: Some(server_message::Payload::Error(Error {
                    message: e.to_string(),
                })),
            };
            if let Err(e) = server.send(&response.encode_to_vec(), addr).await {
                tracing::warn!("Failed to send error to {}: {}", addr, e);
            }
        }
    }
}

pub async fn handle_datagram(
    server: &UdpServer,
    sessions: &Mutex<SessionManager>,
    game: &GameHandle<PaperioGame>,
    data: &[u8],
    addr: SocketAddr,
) -> Result<(), GameError> {
    let msg = ClientMessage::decode(data)
        .map_err(|e| GameError::EncodingError(format!("Failed to decode client message: {}", e)))?;

    match msg.payload {
        Some(Payload::Join(join)) => handle_join(server, sessions, game, addr, join).await,
        Some(Payload::Turn(turn)) => handle_turn(sessions, game, addr, turn).await,
        Some(Payload::Ping(ping)) => {
            handle_ping(server, sessions, addr, ping).await;
            Ok(())
        }
        None => Err(GameError::InvalidInput("Empty message".to_string())),
    }
}

/// An unknown or malformed participant id gets a fresh identity, which the
/// client is expected to echo on later joins.
fn resolve_participant(raw: &str) -> ParticipantId {
    if raw.is_empty() {
        return Uuid::new_v4();
    }
    Uuid::parse_str(raw).unwrap_or_else(|e| {
        tracing::debug!("Unparsable participant id {:?} ({}), issuing a new one", raw, e);
        Uuid::new_v4()
    })
}

async fn handle_join(
    server: &UdpServer,
    sessions: &Mutex<SessionManager>,
    game: &GameHandle<PaperioGame>,
    addr: SocketAddr,
    join: client::Join,
) -> Result<(), GameError> {
    let participant = resolve_participant(&join.participant_id);
    sessions.lock().await.register(addr, participant);

    game.join(participant).await;
    let player_id = game
        .lock()
        .await
        .player_id(&participant)
        .ok_or_else(|| GameError::InvalidState(format!("Participant {} has no player after join", participant)))?;

    let response = ServerMessage {
        payload: Some(server_message::Payload::Joined(Joined {
            participant_id: participant.to_string(),
            player_id,
        })),
    };
    if let Err(e) = server.send(&response.encode_to_vec(), addr).await {
        tracing::warn!("Failed to send join reply to {}: {}", addr, e);
    }

    tracing::info!("Participant {} from {} is player {}", participant, addr, player_id);
    Ok(())
}

async fn handle_turn(
    sessions: &Mutex<SessionManager>,
    game: &GameHandle<PaperioGame>,
    addr: SocketAddr,
    turn: client::Turn,
) -> Result<(), GameError> {
    let participant = {
        let mut sessions = sessions.lock().await;
        sessions.update_last_seen(&addr);
        sessions
            .get_by_addr(&addr)
            .map(|s| s.participant)
            .ok_or_else(|| GameError::InvalidState(format!("Turn from unregistered address {}", addr)))?
    };

    match systems::turn_from_proto(turn.turn)? {
        Turn::Left => game.turn_left(participant).await,
        Turn::Right => game.turn_right(participant).await,
    }
    Ok(())
}

async fn handle_ping(
    server: &UdpServer,
    sessions: &Mutex<SessionManager>,
    addr: SocketAddr,
    ping: Ping,
) {
    {
        let mut sessions = sessions.lock().await;
        sessions.ping(&addr);

        if let Some(session) = sessions.get_by_addr(&addr) {
            tracing::trace!(
                "Ping from participant {} (seq={}, count={})",
                session.participant,
                ping.sequence,
                session.ping_count
            );
        } else {
            tracing::debug!("Ping from unknown address {}", addr);
        }
    }

    let pong_message = ServerMessage {
        payload: Some(server_message::Payload::Pong(Pong {
            timestamp: ping.timestamp,
            sequence: ping.sequence,
            server_time: current_timestamp_ms(),
        })),
    };

    if let Err(e) = server.send(&pong_message.encode_to_vec(), addr).await {
        tracing::warn!("Failed to send pong: {}", e);
    }
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
