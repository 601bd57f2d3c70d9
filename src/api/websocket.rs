//! WebSocket Support for Live Rounds
//!
//! Pushes the current round snapshot on connect and then streams snapshot
//! updates and round events until the client disconnects.

use super::handlers::AppState;
use crate::games::{
    scheduler::EngineHandle,
    types::{RoundEvent, RoundSnapshot},
};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Frames sent to WebSocket clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum WsMessage {
    Snapshot(RoundSnapshot),
    Event(RoundEvent),
    /// The client fell behind and missed events
    Lagged { skipped: u64 },
}

/// WebSocket subscription filters
#[derive(Debug, Clone, Deserialize)]
pub struct WsSubscription {
    #[serde(default = "default_true")]
    pub snapshots: bool,
    #[serde(default = "default_true")]
    pub events: bool,
}

fn default_true() -> bool {
    true
}

impl Default for WsSubscription {
    fn default() -> Self {
        Self {
            snapshots: true,
            events: true,
        }
    }
}

/// WebSocket connection manager
#[derive(Clone)]
pub struct WebSocketManager {
    engine: EngineHandle,
    client_count: Arc<AtomicU64>,
}

impl WebSocketManager {
    pub fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            client_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn client_count(&self) -> u64 {
        self.client_count.load(Ordering::SeqCst)
    }

    pub fn handle_upgrade(&self, ws: WebSocketUpgrade, subscription: WsSubscription) -> Response {
        let manager = self.clone();
        ws.on_upgrade(move |socket| async move { manager.handle_connection(socket, subscription).await })
    }

    async fn handle_connection(&self, socket: WebSocket, subscription: WsSubscription) {
        let client_id = Uuid::new_v4().to_string();
        let total = self.client_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!("WebSocket client {} connected (total: {})", client_id, total);

        let (mut sender, mut receiver) = socket.split();
        let mut snapshots = self.engine.watch_snapshots();
        let mut events = self.engine.subscribe();

        let initial = WsMessage::Snapshot(snapshots.borrow_and_update().clone());
        if send_frame(&mut sender, &initial).await.is_err() {
            warn!("Failed to send initial snapshot to client {}", client_id);
            self.disconnect(&client_id);
            return;
        }

        let receive_id = client_id.clone();
        let mut receive_task = tokio::spawn(async move {
            while let Some(msg) = receiver.next().await {
                match msg {
                    Ok(Message::Close(_)) => {
                        debug!("Client {} requested close", receive_id);
                        break;
                    }
                    Ok(Message::Text(text)) => debug!("Ignoring message from client {}: {}", receive_id, text),
                    Err(e) => {
                        warn!("WebSocket error from client {}: {}", receive_id, e);
                        break;
                    }
                    _ => {}
                }
            }
        });

        let mut send_task = tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    changed = snapshots.changed(), if subscription.snapshots => match changed {
                        Ok(()) => WsMessage::Snapshot(snapshots.borrow_and_update().clone()),
                        Err(_) => break,
                    },
                    event = events.recv(), if subscription.events => match event {
                        Ok(event) => WsMessage::Event(event),
                        Err(RecvError::Lagged(skipped)) => WsMessage::Lagged { skipped },
                        Err(RecvError::Closed) => break,
                    },
                    else => break,
                };

                if send_frame(&mut sender, &frame).await.is_err() {
                    break;
                }
            }
        });

        tokio::select! {
            _ = &mut receive_task => send_task.abort(),
            _ = &mut send_task => receive_task.abort(),
        }

        self.disconnect(&client_id);
    }

    fn disconnect(&self, client_id: &str) {
        let remaining = self.client_count.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        info!("WebSocket client {} disconnected (remaining: {})", client_id, remaining);
    }
}

async fn send_frame<S>(sender: &mut S, frame: &WsMessage) -> Result<(), ()>
where
    S: futures_util::Sink<Message> + Unpin,
{
    let text = serde_json::to_string(frame).map_err(|e| warn!("Failed to serialize frame: {}", e))?;
    sender.send(Message::Text(text)).await.map_err(|_| ())
}

/// GET /ws?snapshots=true&events=true
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(subscription): Query<WsSubscription>,
    State(state): State<Arc<AppState>>,
) -> Response {
    state.websocket_manager.handle_upgrade(ws, subscription)
}
