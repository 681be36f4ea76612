// Realtime relay: every open WebSocket connection sees every message.
// There is no addressing and no session model; receivers self-filter by
// inspecting payload shape.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;

use super::envelope::Envelope;
use super::server::AppState;

/// Frames a peer may have queued before the relay gives up on it.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// One open connection: its outbound queue and when it arrived.
#[derive(Debug)]
pub struct Peer {
    pub tx: mpsc::Sender<Message>,
    pub connected_at: DateTime<Utc>,
}

/// Shared fan-out state over every open connection.
///
/// Membership is simply "the socket is open": a peer registers on upgrade
/// and is removed when either half of its connection winds down, or when its
/// outbound queue overflows — slow consumers are disconnected rather than
/// buffered without bound.
#[derive(Clone)]
pub struct RelayState {
    peers: Arc<RwLock<HashMap<u64, Peer>>>,
    next_peer_id: Arc<AtomicU64>,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayState {
    pub fn new() -> Self {
        Self {
            peers: Arc::new(RwLock::new(HashMap::new())),
            next_peer_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Add a connection to the broadcast set; returns its peer id.
    pub async fn register(&self, tx: mpsc::Sender<Message>) -> u64 {
        let id = self.next_peer_id.fetch_add(1, Ordering::Relaxed);
        let peer = Peer {
            tx,
            connected_at: Utc::now(),
        };
        self.peers.write().await.insert(id, peer);
        id
    }

    /// Drop a connection from the broadcast set.
    pub async fn unregister(&self, id: u64) -> Option<Peer> {
        self.peers.write().await.remove(&id)
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Best-effort fan-out to every open peer, sender included.
    ///
    /// A failed hand-off never aborts the loop for the remaining peers: a
    /// full queue evicts that peer, and a queue whose forwarder already hung
    /// up is removed the same way.
    pub async fn broadcast(&self, message: Message) {
        let mut stale = Vec::new();
        {
            let peers = self.peers.read().await;
            for (id, peer) in peers.iter() {
                match peer.tx.try_send(message.clone()) {
                    Ok(()) => {},
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(peer_id = *id, "outbound queue overflow, dropping peer");
                        stale.push(*id);
                    },
                    Err(TrySendError::Closed(_)) => {
                        stale.push(*id);
                    },
                }
            }
        }

        if !stale.is_empty() {
            let mut peers = self.peers.write().await;
            for id in stale {
                peers.remove(&id);
            }
        }
    }
}

/// Accept a WebSocket upgrade and run the relay loop over the connection.
pub async fn handle_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_CAPACITY);

    let peer_id = state.relay.register(tx).await;
    tracing::info!(peer_id, "websocket connection established");

    // Forward queued frames into the socket until the peer goes away
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_message(&recv_state, &text).await,
                Message::Close(_) => break,
                // Binary frames and transport pings carry nothing for the bus
                _ => {},
            }
        }
    });

    // Whichever half finishes first tears the other down
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    if let Some(peer) = state.relay.unregister(peer_id).await {
        let connected_for = Utc::now() - peer.connected_at;
        tracing::info!(
            peer_id,
            seconds = connected_for.num_seconds(),
            "websocket connection closed"
        );
    }
}

/// Run one inbound text frame through the relay pipeline: the status side
/// effect, the raw fan-out, then the command re-broadcast.
async fn handle_message(state: &AppState, text: &str) {
    tracing::debug!(frame = text, "received");

    let envelope = match Envelope::parse(text) {
        Ok(envelope) => envelope,
        Err(err) => {
            // Per-message failure only: nothing is broadcast and nothing is
            // sent back, but the connection stays up.
            tracing::warn!(error = %err, "discarding non-JSON frame");
            return;
        },
    };

    if let Envelope::Status(report) = &envelope {
        let mut registry = state.registry.write().await;
        match registry.update_status(&report.device, &report.status) {
            Ok(true) => {
                tracing::debug!(
                    device = %report.device,
                    status = %report.status,
                    "device status updated"
                );
            },
            Ok(false) => {
                tracing::debug!(device = %report.device, "status report for unsaved device ignored");
            },
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    device = %report.device,
                    "failed to persist status update"
                );
            },
        }
    }

    // Always the original bytes, never the re-serialized parse
    state
        .relay
        .broadcast(Message::Text(text.to_string()))
        .await;

    if let Some(command) = envelope.command() {
        let frame = serde_json::json!({ "command": command }).to_string();
        state.relay.broadcast(Message::Text(frame)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_text(msg: Option<Message>) -> String {
        match msg {
            Some(Message::Text(text)) => text,
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_peer() {
        let relay = RelayState::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        relay.register(tx1).await;
        relay.register(tx2).await;

        relay.broadcast(Message::Text("hello".to_string())).await;

        assert_eq!(expect_text(rx1.recv().await), "hello");
        assert_eq!(expect_text(rx2.recv().await), "hello");
    }

    #[tokio::test]
    async fn test_unregister_removes_peer_from_fanout() {
        let relay = RelayState::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        let id1 = relay.register(tx1).await;
        relay.register(tx2).await;

        relay.unregister(id1).await;
        relay.broadcast(Message::Text("hello".to_string())).await;

        // The unregistered peer's queue is closed without a frame
        assert!(rx1.recv().await.is_none());
        assert_eq!(expect_text(rx2.recv().await), "hello");
        assert_eq!(relay.peer_count().await, 1);
    }

    #[tokio::test]
    async fn test_overflowing_peer_is_evicted() {
        let relay = RelayState::new();
        let (tx, mut rx) = mpsc::channel(1);
        relay.register(tx).await;

        relay.broadcast(Message::Text("one".to_string())).await;
        // Queue full now; the next frame evicts the peer
        relay.broadcast(Message::Text("two".to_string())).await;

        assert_eq!(relay.peer_count().await, 0);
        assert_eq!(expect_text(rx.recv().await), "one");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_peer_is_pruned_without_aborting_fanout() {
        let relay = RelayState::new();
        let (tx1, rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        relay.register(tx1).await;
        relay.register(tx2).await;
        drop(rx1);

        relay.broadcast(Message::Text("hello".to_string())).await;

        assert_eq!(expect_text(rx2.recv().await), "hello");
        assert_eq!(relay.peer_count().await, 1);
    }
}
