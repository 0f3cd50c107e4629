//! Relay protocol and WebSocket client.
//!
//! The relay forwards whatever a client pushes to the other members of the
//! same document room. It never merges: the last update applied wins.

use crate::model::{Connection, ConnectionId, Diagram, Part, PartId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("No document joined")]
    NotJoined,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Messages sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Leave the current document room and join this one.
    JoinDocument(String),
    /// Forward the payload to the other members of `payload.docId`.
    PushUpdate(serde_json::Value),
}

/// Messages received from the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A payload pushed by another member of the room, untouched.
    Update(serde_json::Value),
}

/// A single local mutation, as shared with other editors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateOp {
    /// A part was added or changed.
    UpsertPart { part: Part },
    /// A part was deleted, together with its connections.
    RemovePart { id: PartId },
    UpsertConnection { connection: Connection },
    RemoveConnection { id: ConnectionId },
    /// The whole diagram was replaced.
    Snapshot { diagram: Diagram },
}

/// Payload of a `push_update` / `update` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramUpdate {
    #[serde(rename = "docId")]
    pub doc_id: String,
    pub op: UpdateOp,
}

impl DiagramUpdate {
    pub fn new(doc_id: impl Into<String>, op: UpdateOp) -> Self {
        Self {
            doc_id: doc_id.into(),
            op,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the relay client.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Connected,
    Disconnected,
    /// An update pushed by another editor on the same document.
    Update(DiagramUpdate),
    Error { message: String },
}

/// Turn a raw text frame into an event. Frames that are not updates are skipped.
pub fn decode_frame(text: &str) -> Option<RelayEvent> {
    let ServerMessage::Update(data) = match serde_json::from_str::<ServerMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            log::warn!("Failed to parse relay message: {}", e);
            return None;
        }
    };
    match serde_json::from_value::<DiagramUpdate>(data) {
        Ok(update) => Some(RelayEvent::Update(update)),
        Err(e) => {
            log::debug!("Ignoring foreign update payload: {}", e);
            None
        }
    }
}

/// At most the first 100 characters of a frame, cut on a char boundary.
fn log_preview(msg: &str) -> &str {
    msg.char_indices().nth(100).map_or(msg, |(i, _)| &msg[..i])
}

mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// Relay client.
    ///
    /// Runs the socket on a background thread; events must be polled via
    /// [`RelayClient::poll_events`].
    pub struct RelayClient {
        state: ConnectionState,
        events: Vec<RelayEvent>,
        document: Option<String>,
        cmd_tx: Option<Sender<WsCommand>>,
        event_rx: Option<Receiver<RelayEvent>>,
        _thread: Option<JoinHandle<()>>,
    }

    impl RelayClient {
        /// Create a new disconnected client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                document: None,
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a relay at a `ws://` or `wss://` URL.
        pub fn connect(&mut self, url: &str) -> Result<(), RelayError> {
            if self.cmd_tx.is_some() {
                return Err(RelayError::AlreadyConnected);
            }

            let parsed = Url::parse(url).map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
            if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
                return Err(RelayError::InvalidUrl(format!(
                    "unsupported scheme {}",
                    parsed.scheme()
                )));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<RelayEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || {
                log::info!("Relay thread: connecting to {}", url);

                let (mut socket, response) = match connect(&url) {
                    Ok(pair) => pair,
                    Err(e) => {
                        log::error!("Relay connection failed: {}", e);
                        let _ = event_tx.send(RelayEvent::Error {
                            message: format!("Connection failed: {}", e),
                        });
                        return;
                    }
                };
                log::info!("Relay connected, status: {}", response.status());
                let _ = event_tx.send(RelayEvent::Connected);

                if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
                    let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
                    let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
                }

                loop {
                    match cmd_rx.try_recv() {
                        Ok(WsCommand::Send(msg)) => {
                            log::debug!("Relay sending: {}", log_preview(&msg));
                            if let Err(e) = socket.send(Message::Text(msg)) {
                                log::error!("Relay send error: {}", e);
                                break;
                            }
                        }
                        Ok(WsCommand::Close) => {
                            log::info!("Relay close requested");
                            let _ = socket.close(None);
                            break;
                        }
                        Err(TryRecvError::Disconnected) => {
                            log::info!("Relay command channel disconnected");
                            break;
                        }
                        Err(TryRecvError::Empty) => {}
                    }

                    match socket.read() {
                        Ok(Message::Text(txt)) => {
                            if let Some(event) = decode_frame(&txt) {
                                let _ = event_tx.send(event);
                            }
                        }
                        Ok(Message::Ping(data)) => {
                            let _ = socket.send(Message::Pong(data));
                        }
                        Ok(Message::Close(_)) => {
                            log::info!("Relay sent close frame");
                            break;
                        }
                        Ok(_) => {}
                        Err(tungstenite::Error::Io(ref e))
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut => {}
                        Err(e) => {
                            log::error!("Relay read error: {}", e);
                            break;
                        }
                    }
                }

                log::info!("Relay thread exiting");
                let _ = event_tx.send(RelayEvent::Disconnected);
            });

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);
            Ok(())
        }

        /// Disconnect from the relay.
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.document = None;
            self.state = ConnectionState::Disconnected;
        }

        fn send(&self, message: &ClientMessage) -> Result<(), RelayError> {
            let tx = self.cmd_tx.as_ref().ok_or(RelayError::NotConnected)?;
            let text = serde_json::to_string(message)?;
            tx.send(WsCommand::Send(text))
                .map_err(|_| RelayError::NotConnected)
        }

        /// Join a document room, leaving the previous one.
        pub fn join(&mut self, doc_id: &str) -> Result<(), RelayError> {
            self.send(&ClientMessage::JoinDocument(doc_id.to_string()))?;
            self.document = Some(doc_id.to_string());
            Ok(())
        }

        /// The joined document, if any.
        pub fn document(&self) -> Option<&str> {
            self.document.as_deref()
        }

        /// Push a local mutation to the joined document.
        pub fn push(&self, op: UpdateOp) -> Result<(), RelayError> {
            let doc_id = self.document.as_ref().ok_or(RelayError::NotJoined)?;
            let payload = serde_json::to_value(DiagramUpdate::new(doc_id.clone(), op))?;
            self.send(&ClientMessage::PushUpdate(payload))
        }

        /// Poll for pending events (non-blocking).
        pub fn poll_events(&mut self) -> Vec<RelayEvent> {
            if let Some(ref rx) = self.event_rx {
                while let Ok(event) = rx.try_recv() {
                    match &event {
                        RelayEvent::Connected => self.state = ConnectionState::Connected,
                        RelayEvent::Disconnected => self.state = ConnectionState::Disconnected,
                        RelayEvent::Error { .. } => self.state = ConnectionState::Error,
                        RelayEvent::Update(_) => {}
                    }
                    self.events.push(event);
                }
            }
            std::mem::take(&mut self.events)
        }

        pub fn state(&self) -> ConnectionState {
            self.state
        }

        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Default for RelayClient {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for RelayClient {
        fn drop(&mut self) {
            self.disconnect();
        }
    }
}

pub use native_client::RelayClient;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_message_wire_format() {
        let join = serde_json::to_value(ClientMessage::JoinDocument("bench".into())).unwrap();
        assert_eq!(join, json!({"event": "join_document", "data": "bench"}));

        let push = ClientMessage::PushUpdate(json!({"docId": "bench", "x": 1}));
        assert_eq!(
            serde_json::to_value(push).unwrap(),
            json!({"event": "push_update", "data": {"docId": "bench", "x": 1}})
        );
    }

    #[test]
    fn test_update_payload_shape() {
        let update = DiagramUpdate::new("bench", UpdateOp::RemovePart { id: PartId::from("p1") });
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(
            value,
            json!({"docId": "bench", "op": {"kind": "remove_part", "id": "p1"}})
        );
    }

    #[test]
    fn test_decode_frame() {
        let frame = json!({
            "event": "update",
            "data": {"docId": "bench", "op": {"kind": "remove_connection", "id": "c1"}}
        })
        .to_string();
        assert_eq!(
            decode_frame(&frame),
            Some(RelayEvent::Update(DiagramUpdate::new(
                "bench",
                UpdateOp::RemoveConnection {
                    id: ConnectionId::from("c1")
                }
            )))
        );
        assert_eq!(decode_frame(r#"{"event":"update","data":{"docId":"x"}}"#), None);
        assert_eq!(decode_frame("not json"), None);
    }

    #[test]
    fn test_log_preview_respects_char_boundaries() {
        let doc_id = format!("x{}", "é".repeat(60));
        let frame = serde_json::to_string(&ClientMessage::PushUpdate(json!({"docId": doc_id})))
            .unwrap();
        assert!(frame.len() > 100);
        let preview = log_preview(&frame);
        assert_eq!(preview.chars().count(), 100);
        assert!(frame.starts_with(preview));

        assert_eq!(log_preview("short"), "short");
    }

    #[test]
    fn test_client_requires_connection() {
        let mut client = RelayClient::new();
        assert!(matches!(client.join("bench"), Err(RelayError::NotConnected)));
        assert!(matches!(
            client.push(UpdateOp::RemovePart { id: PartId::from("p") }),
            Err(RelayError::NotJoined)
        ));
        assert!(matches!(
            client.connect("http://localhost:3000"),
            Err(RelayError::InvalidUrl(_))
        ));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}
