//! Wirebench WebSocket Relay Server
//!
//! Forwards diagram updates between editors working on the same document.
//!
//! ## Protocol
//!
//! Text frames, one JSON object each:
//! ```json
//! { "event": "join_document", "data": "doc-id" }
//! { "event": "push_update", "data": { "docId": "doc-id", ... } }
//! { "event": "update", "data": { "docId": "doc-id", ... } }
//! ```
//! `push_update` payloads are forwarded untouched, as `update`, to every
//! other member of the `docId` room. Nothing is acknowledged, validated or
//! stored.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashSet, net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// Server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served at `/` (the editor front-end).
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("public"),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `WIREBENCH_PORT` and `WIREBENCH_STATIC_DIR`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(port) = lookup("WIREBENCH_PORT") {
            match port.parse() {
                Ok(port) => config.port = port,
                Err(e) => warn!("Ignoring invalid WIREBENCH_PORT {:?}: {}", port, e),
            }
        }
        if let Some(dir) = lookup("WIREBENCH_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        config
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// A message received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Leave the current document room and join this one.
    JoinDocument(Value),
    /// Forward to the other members of `data.docId`.
    PushUpdate(Value),
}

/// A message sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    Update(Value),
}

/// Room id carried by a join or push payload. Numbers are stringified.
pub fn document_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Room state.
struct Room {
    tx: broadcast::Sender<(String, ServerMessage)>,
    peers: HashSet<String>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

/// Shared application state.
#[derive(Default)]
pub struct AppState {
    rooms: DashMap<String, Room>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Members of a room.
    pub fn peer_count(&self, room_id: &str) -> usize {
        self.rooms.get(room_id).map(|room| room.peers.len()).unwrap_or(0)
    }

    fn join_room(
        &self,
        room_id: &str,
        peer_id: &str,
    ) -> broadcast::Receiver<(String, ServerMessage)> {
        let mut room = self.rooms.entry(room_id.to_string()).or_insert_with(Room::new);
        room.peers.insert(peer_id.to_string());
        room.tx.subscribe()
    }

    fn leave_room(&self, room_id: &str, peer_id: &str) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.peers.remove(peer_id);
            if room.peers.is_empty() {
                drop(room);
                self.rooms.remove(room_id);
            }
        }
    }

    /// Send to every member of `room_id`; the sender filters itself out on receipt.
    fn broadcast(&self, room_id: &str, from: &str, msg: ServerMessage) {
        match self.rooms.get(room_id) {
            Some(room) => {
                let _ = room.tx.send((from.to_string(), msg));
            }
            None => debug!("No members in room {}, dropping update", room_id),
        }
    }
}

/// Build the HTTP router: `/ws`, `/health` and static files.
pub fn router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let assets = ServeDir::new(&config.static_dir).append_index_html_on_directories(true);
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .fallback_service(assets)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Per-connection relay state.
struct Peer {
    id: String,
    room: Option<String>,
    rx: Option<broadcast::Receiver<(String, ServerMessage)>>,
}

impl Peer {
    fn handle_text(&mut self, state: &AppState, text: &str) {
        let msg = match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Invalid message from {}: {}", self.id, e);
                return;
            }
        };

        match msg {
            ClientMessage::JoinDocument(data) => {
                let Some(doc_id) = document_id(&data) else {
                    debug!("Join from {} without a document id", self.id);
                    return;
                };
                if let Some(old) = self.room.take() {
                    state.leave_room(&old, &self.id);
                    info!("Peer {} left document {}", self.id, old);
                }
                self.rx = Some(state.join_room(&doc_id, &self.id));
                info!("Peer {} joined document {}", self.id, doc_id);
                self.room = Some(doc_id);
            }
            ClientMessage::PushUpdate(data) => {
                let Some(doc_id) = data.get("docId").and_then(document_id) else {
                    debug!("Dropping update from {} without a docId", self.id);
                    return;
                };
                state.broadcast(&doc_id, &self.id, ServerMessage::Update(data));
            }
        }
    }

    fn leave(&mut self, state: &AppState) {
        if let Some(room) = self.room.take() {
            state.leave_room(&room, &self.id);
        }
        self.rx = None;
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let mut peer = Peer {
        id: Uuid::new_v4().to_string(),
        room: None,
        rx: None,
    };
    info!("New connection: {}", peer.id);

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => peer.handle_text(&state, &text),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer.id, e);
                        break;
                    }
                }
            }

            msg = async {
                match &mut peer.rx {
                    Some(rx) => Some(rx.recv().await),
                    None => std::future::pending().await,
                }
            } => {
                let (from, server_msg) = match msg {
                    Some(Ok(pair)) => pair,
                    Some(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        warn!("Peer {} lagged, {} updates dropped", peer.id, skipped);
                        continue;
                    }
                    Some(Err(broadcast::error::RecvError::Closed)) | None => {
                        peer.rx = None;
                        continue;
                    }
                };
                if from == peer.id {
                    continue;
                }
                let json = match serde_json::to_string(&server_msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to encode update for {}: {}", peer.id, e);
                        continue;
                    }
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    peer.leave(&state);
    info!("Connection closed: {}", peer.id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.static_dir, PathBuf::from("public"));

        let config = ServerConfig::from_lookup(|key| match key {
            "WIREBENCH_PORT" => Some("8080".to_string()),
            "WIREBENCH_STATIC_DIR" => Some("/srv/wirebench".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, PathBuf::from("/srv/wirebench"));

        let config =
            ServerConfig::from_lookup(|key| (key == "WIREBENCH_PORT").then(|| "nope".to_string()));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_document_id() {
        assert_eq!(document_id(&json!("bench")), Some("bench".to_string()));
        assert_eq!(document_id(&json!(42)), Some("42".to_string()));
        assert_eq!(document_id(&json!(null)), None);
        assert_eq!(document_id(&json!({"a": 1})), None);
    }

    #[test]
    fn test_message_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"event":"push_update","data":{"docId":"d","x":1}}"#).unwrap();
        assert_eq!(msg, ClientMessage::PushUpdate(json!({"docId": "d", "x": 1})));
        let out = serde_json::to_value(ServerMessage::Update(json!({"docId": "d"}))).unwrap();
        assert_eq!(out, json!({"event": "update", "data": {"docId": "d"}}));
    }

    #[test]
    fn test_join_switches_rooms() {
        let state = AppState::new();
        let mut peer = Peer {
            id: "p1".to_string(),
            room: None,
            rx: None,
        };
        peer.handle_text(&state, r#"{"event":"join_document","data":"one"}"#);
        assert_eq!(state.peer_count("one"), 1);

        peer.handle_text(&state, r#"{"event":"join_document","data":"two"}"#);
        assert_eq!(state.peer_count("one"), 0);
        assert_eq!(state.peer_count("two"), 1);
        assert_eq!(state.room_count(), 1);

        peer.leave(&state);
        assert_eq!(state.room_count(), 0);
    }

    #[test]
    fn test_push_reaches_room_members() {
        let state = AppState::new();
        let mut sender = Peer {
            id: "a".to_string(),
            room: None,
            rx: None,
        };
        let mut rx = state.join_room("doc", "b");

        sender.handle_text(&state, r#"{"event":"push_update","data":{"docId":"doc","n":1}}"#);
        let (from, msg) = rx.try_recv().unwrap();
        assert_eq!(from, "a");
        assert_eq!(msg, ServerMessage::Update(json!({"docId": "doc", "n": 1})));

        // Missing or non-scalar docId is dropped.
        sender.handle_text(&state, r#"{"event":"push_update","data":{"n":2}}"#);
        sender.handle_text(&state, r#"{"event":"push_update","data":{"docId":[1],"n":3}}"#);
        sender.handle_text(&state, "garbage");
        assert!(rx.try_recv().is_err());
    }
}
