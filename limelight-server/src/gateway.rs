use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use limelight_core::{ConnectionId, NewChatMessage, Outbox, SessionEvent};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::unbounded_channel;

use crate::{
    context::ServerContext,
    serialized::{ChatEvent, PeerEntry, ToSerialized},
    Router,
};

/// Frames sent by clients over the gateway socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum ClientMessage {
    /// Enter a room, either as the streamer or as a viewer.
    Join {
        room_id: String,
        display_name: String,
        is_streamer: bool,
    },
    /// Leave a room explicitly. Closing the socket has the same effect.
    Leave { room_id: String },
    /// Forward an opaque negotiation payload to another connection.
    Signal { to: ConnectionId, payload: Value },
    /// Send a chat message to a room.
    Chat {
        room_id: String,
        author: String,
        text: String,
        #[serde(default)]
        is_owner: bool,
        #[serde(default)]
        is_gift: bool,
        #[serde(default)]
        gift_type: Option<String>,
    },
}

/// Frames delivered to clients over the gateway socket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum GatewayMessage {
    /// The initial peer set, sent once after a join.
    PeersInRoom { peers: Vec<PeerEntry> },
    PeerJoined {
        peer_id: ConnectionId,
        name: String,
        is_streamer: bool,
    },
    PeerLeft {
        peer_id: ConnectionId,
        is_streamer: bool,
    },
    Signal { from: ConnectionId, payload: Value },
    Chat {
        #[serde(flatten)]
        message: ChatEvent,
    },
    Error { message: String },
}

impl From<SessionEvent> for GatewayMessage {
    fn from(value: SessionEvent) -> Self {
        match value {
            SessionEvent::PeersInRoom { peers } => Self::PeersInRoom {
                peers: peers.to_serialized(),
            },
            SessionEvent::PeerJoined {
                peer_id,
                name,
                is_streamer,
            } => Self::PeerJoined {
                peer_id,
                name,
                is_streamer,
            },
            SessionEvent::PeerLeft {
                peer_id,
                is_streamer,
            } => Self::PeerLeft {
                peer_id,
                is_streamer,
            },
            SessionEvent::Signal { from, payload } => Self::Signal { from, payload },
            SessionEvent::Chat { message } => Self::Chat {
                message: message.to_serialized(),
            },
            SessionEvent::Error { message } => Self::Error { message },
        }
    }
}

async fn gateway(ws: WebSocketUpgrade, State(context): State<ServerContext>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, context))
}

async fn handle_socket(socket: WebSocket, context: ServerContext) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut events) = unbounded_channel();

    let connection_id = context.limelight.connect(outbox.clone());

    // Writer half: drains the outbox into the socket. A slow socket stalls
    // only this task, never whoever queued the event.
    let writer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let message = GatewayMessage::from(event);
            let text = serde_json::to_string(&message).expect("gateway message serializes");

            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(message) => handle_message(&context, connection_id, &outbox, message),
                Err(err) => {
                    debug!("Dropping malformed frame from {}: {}", connection_id, err);

                    let _ = outbox.send(SessionEvent::Error {
                        message: "Malformed frame".to_string(),
                    });
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    context.limelight.disconnect(connection_id);

    // The last outbox clone drops here, which ends the writer once the
    // remaining events have been flushed.
    drop(outbox);
    let _ = writer.await;
}

fn handle_message(
    context: &ServerContext,
    connection_id: ConnectionId,
    outbox: &Outbox,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Join {
            room_id,
            display_name,
            is_streamer,
        } => {
            let result = context
                .limelight
                .rooms
                .join(connection_id, &room_id, &display_name, is_streamer);

            if let Err(error) = result {
                let _ = outbox.send(SessionEvent::Error {
                    message: error.to_string(),
                });
            }
        }
        ClientMessage::Leave { room_id } => {
            context.limelight.rooms.leave(connection_id, &room_id);
        }
        ClientMessage::Signal { to, payload } => {
            context.limelight.sessions.relay(connection_id, to, payload);
        }
        ClientMessage::Chat {
            room_id,
            author,
            text,
            is_owner,
            is_gift,
            gift_type,
        } => {
            context.limelight.rooms.send_chat(
                &room_id,
                NewChatMessage {
                    author,
                    text,
                    is_owner,
                    is_gift,
                    gift_type,
                },
            );
        }
    }
}

pub fn router() -> Router {
    Router::new().route("/", get(gateway))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_frames_deserialize() {
        let frame: ClientMessage = serde_json::from_str(
            r#"{"type": "join", "roomId": "r1", "displayName": "Alice", "isStreamer": true}"#,
        )
        .unwrap();

        assert!(matches!(
            frame,
            ClientMessage::Join {
                ref room_id,
                ref display_name,
                is_streamer: true,
            } if room_id == "r1" && display_name == "Alice"
        ));

        let frame: ClientMessage = serde_json::from_str(
            r#"{"type": "chat", "roomId": "r1", "author": "Bob", "text": "hi"}"#,
        )
        .unwrap();

        // Omitted flags default to off
        assert!(matches!(
            frame,
            ClientMessage::Chat {
                is_owner: false,
                is_gift: false,
                gift_type: None,
                ..
            }
        ));
    }

    #[test]
    fn signal_frames_carry_the_payload_verbatim() {
        let frame: ClientMessage = serde_json::from_str(
            r#"{"type": "signal", "to": 7, "payload": {"sdp": "offer", "nested": [1, 2]}}"#,
        )
        .unwrap();

        match frame {
            ClientMessage::Signal { payload, .. } => {
                assert_eq!(payload["sdp"], "offer");
                assert_eq!(payload["nested"][1], 2);
            }
            other => panic!("expected signal, got {:?}", other),
        }
    }

    #[test]
    fn gateway_frames_serialize_with_type_tags() {
        let message = GatewayMessage::PeerLeft {
            peer_id: ConnectionId::new(),
            is_streamer: true,
        };

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "peerLeft");
        assert_eq!(json["isStreamer"], true);
        assert!(json["peerId"].is_u64());
    }
}
