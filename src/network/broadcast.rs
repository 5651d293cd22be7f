//! Sends published snapshots to every connected session as `Frame` datagrams.

use std::sync::Arc;
use std::time::{Duration, Instant};

use prost::Message;
use tokio::sync::{Mutex, watch};

use super::udp::{MAX_UDP_PAYLOAD, UdpServer};
use crate::games::paperio::GameSnapshot;
use crate::protocol::server::{ServerMessage, server_message};
use crate::session::SessionManager;

pub fn encode_frame(snapshot: &GameSnapshot) -> Vec<u8> {
    ServerMessage {
        payload: Some(server_message::Payload::Frame(snapshot.to_frame())),
    }
    .encode_to_vec()
}

/// Forwards snapshots until the publishing side is dropped.
///
/// Snapshots arriving less than `min_gap` after the previous send are
/// skipped; the watch channel already collapses bursts to the latest one.
pub async fn run(
    server: Arc<UdpServer>,
    sessions: Arc<Mutex<SessionManager>>,
    mut snapshots: watch::Receiver<Arc<GameSnapshot>>,
    min_gap: Duration,
) {
    let mut last_sent: Option<Instant> = None;
    let mut warned_oversize = false;

    while snapshots.changed().await.is_ok() {
        if last_sent.is_some_and(|at| at.elapsed() < min_gap) {
            continue;
        }

        let snapshot = snapshots.borrow_and_update().clone();
        let addrs = sessions.lock().await.addrs();
        if addrs.is_empty() {
            continue;
        }

        let bytes = encode_frame(&snapshot);
        if bytes.len() > MAX_UDP_PAYLOAD {
            if !warned_oversize {
                tracing::warn!(
                    "Frame for a {}x{} grid is {} bytes, over the datagram limit; not broadcasting",
                    snapshot.width,
                    snapshot.height,
                    bytes.len()
                );
                warned_oversize = true;
            }
            continue;
        }

        let delivered = server.send_to_many(&bytes, &addrs).await;
        tracing::trace!("Frame {} ({} bytes) sent to {}/{} sessions", snapshot.tick, bytes.len(), delivered, addrs.len());
        last_sent = Some(Instant::now());
    }

    tracing::debug!("Snapshot channel closed, broadcaster stopping");
}
